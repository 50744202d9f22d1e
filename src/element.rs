//! gpui as the compositor of a [`Video`].
//!
//! [`GpuiTextures`] is the texture registrar: promotions only raise a
//! per-texture flag. On the next prepaint the element pulls the current
//! frame, converts it into a `RenderImage`, releases the buffer and keeps the
//! image for repaints until the next promotion.

use crate::error::{Error, NotReady};
use crate::registrar::{TextureId, TextureRegistrar};
use crate::video::{GstSurface, Video};
use gpui::{
    Element, ElementId, GlobalElementId, InspectorElementId, IntoElement, LayoutId, Window,
};
use gstreamer_video as gst_video;
use gst_video::prelude::VideoFrameExt;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use yuv::{YuvBiPlanarImage, YuvConversionMode, YuvRange, YuvStandardMatrix, yuv_nv12_to_rgba};

/// Texture registrar backed by gpui's repaint loop.
#[derive(Debug, Default)]
pub struct GpuiTextures {
    next_id: AtomicI64,
    frame_ready: Mutex<HashMap<TextureId, bool>>,
}

impl GpuiTextures {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Consume the "new frame available" flag of `id`.
    pub fn take_frame_ready(&self, id: TextureId) -> bool {
        self.frame_ready
            .lock()
            .get_mut(&id)
            .is_some_and(|ready| std::mem::replace(ready, false))
    }
}

impl TextureRegistrar for GpuiTextures {
    fn register_texture(&self) -> Result<TextureId, Error> {
        let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.frame_ready.lock().insert(id, false);
        Ok(id)
    }

    fn unregister_texture(&self, id: TextureId) {
        self.frame_ready.lock().remove(&id);
    }

    fn mark_frame_available(&self, id: TextureId) -> Result<(), NotReady> {
        match self.frame_ready.lock().get_mut(&id) {
            Some(ready) => {
                *ready = true;
                Ok(())
            }
            None => Err(NotReady(id)),
        }
    }
}

/// Keeps the last composited image of a video across renders.
pub struct VideoView {
    video: Video,
    textures: Arc<GpuiTextures>,
    last_frame: Rc<RefCell<Option<Arc<gpui::RenderImage>>>>,
    display_width: Option<gpui::Pixels>,
    display_height: Option<gpui::Pixels>,
}

impl VideoView {
    pub fn new(video: Video, textures: Arc<GpuiTextures>) -> Self {
        Self {
            video,
            textures,
            last_frame: Rc::new(RefCell::new(None)),
            display_width: None,
            display_height: None,
        }
    }

    pub fn size(mut self, width: gpui::Pixels, height: gpui::Pixels) -> Self {
        self.display_width = Some(width);
        self.display_height = Some(height);
        self
    }

    pub fn video(&self) -> &Video {
        &self.video
    }
}

impl gpui::Render for VideoView {
    fn render(&mut self, _window: &mut Window, _cx: &mut gpui::Context<Self>) -> impl IntoElement {
        let mut element = VideoElement {
            video: self.video.clone(),
            textures: Arc::clone(&self.textures),
            last_frame: Rc::clone(&self.last_frame),
            display_width: None,
            display_height: None,
            element_id: None,
        };
        if let (Some(width), Some(height)) = (self.display_width, self.display_height) {
            element = element.size(width, height);
        }
        element
    }
}

/// A video element that implements Element trait similar to GPUI's img element
pub struct VideoElement {
    video: Video,
    textures: Arc<GpuiTextures>,
    last_frame: Rc<RefCell<Option<Arc<gpui::RenderImage>>>>,
    display_width: Option<gpui::Pixels>,
    display_height: Option<gpui::Pixels>,
    element_id: Option<ElementId>,
}

impl VideoElement {
    pub fn id(mut self, id: impl Into<ElementId>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    pub fn size(mut self, width: gpui::Pixels, height: gpui::Pixels) -> Self {
        self.display_width = Some(width);
        self.display_height = Some(height);
        self
    }

    /// Get the current display dimensions, falling back to video natural size.
    fn get_display_size(&self) -> (gpui::Pixels, gpui::Pixels) {
        match (self.display_width, self.display_height) {
            (Some(w), Some(h)) => (w, h),
            _ => {
                let (video_width, video_height) = self.video.size();
                (gpui::px(video_width as f32), gpui::px(video_height as f32))
            }
        }
    }

    /// Pull the promoted frame, convert it and hand the buffer back.
    fn composite_new_frame(&self) {
        let Some(buffer) = self.video.texture_source().obtain_gpu_buffer() else {
            return;
        };
        let (width, height) = (buffer.width(), buffer.height());
        let rgba = nv12_to_rgba(buffer.surface(), width, height);
        buffer.release();

        use image::{ImageBuffer, Rgba};
        use smallvec::SmallVec;

        let Some(image_buffer) =
            rgba.and_then(|rgba| ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba))
        else {
            return;
        };
        let frames: SmallVec<[image::Frame; 1]> =
            SmallVec::from_elem(image::Frame::new(image_buffer), 1);
        *self.last_frame.borrow_mut() = Some(Arc::new(gpui::RenderImage::new(frames)));
    }
}

/// Convert a mapped NV12 surface to packed RGBA, honouring plane strides.
fn nv12_to_rgba(surface: &GstSurface, width: u32, height: u32) -> Option<Vec<u8>> {
    let frame = match surface.map() {
        Ok(frame) => frame,
        Err(err) => {
            log::error!("failed to map video frame: {err}");
            return None;
        }
    };
    let y_plane = frame.plane_data(0).ok()?;
    let uv_plane = frame.plane_data(1).ok()?;
    let strides = frame.plane_stride();

    let yuv_bi_planar = YuvBiPlanarImage {
        y_plane,
        y_stride: strides[0] as u32,
        uv_plane,
        uv_stride: strides[1] as u32,
        width,
        height,
    };

    let colorimetry = surface.info().colorimetry();
    let range = match colorimetry.range() {
        gst_video::VideoColorRange::Range0_255 => YuvRange::Full,
        _ => YuvRange::Limited,
    };
    let matrix = match colorimetry.matrix() {
        gst_video::VideoColorMatrix::Bt601 => YuvStandardMatrix::Bt601,
        gst_video::VideoColorMatrix::Bt2020 => YuvStandardMatrix::Bt2020,
        _ => YuvStandardMatrix::Bt709,
    };

    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    match yuv_nv12_to_rgba(
        &yuv_bi_planar,
        &mut rgba,
        width * 4,
        range,
        matrix,
        YuvConversionMode::Balanced,
    ) {
        Ok(()) => Some(rgba),
        Err(err) => {
            log::error!("NV12 conversion failed: {err:?}");
            None
        }
    }
}

impl Element for VideoElement {
    type RequestLayoutState = ();
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        self.element_id.clone()
    }

    fn source_location(&self) -> Option<&'static core::panic::Location<'static>> {
        None
    }

    fn request_layout(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        window: &mut Window,
        cx: &mut gpui::App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let (width, height) = self.get_display_size();

        let style = gpui::Style {
            size: gpui::Size {
                width: gpui::Length::Definite(gpui::DefiniteLength::Absolute(
                    gpui::AbsoluteLength::Pixels(width),
                )),
                height: gpui::Length::Definite(gpui::DefiniteLength::Absolute(
                    gpui::AbsoluteLength::Pixels(height),
                )),
            },
            ..Default::default()
        };

        let layout_id = window.request_layout(style, [], cx);
        (layout_id, ())
    }

    fn prepaint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        _bounds: gpui::Bounds<gpui::Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        window: &mut Window,
        _cx: &mut gpui::App,
    ) -> Self::PrepaintState {
        let has_new_frame = self.textures.take_frame_ready(self.video.texture_id());
        if has_new_frame {
            self.composite_new_frame();
        }
        // Keep polling while playing; promotions only raise a flag.
        if has_new_frame || !self.video.paused() {
            window.request_animation_frame();
        }
    }

    fn paint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        bounds: gpui::Bounds<gpui::Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        _prepaint_state: &mut Self::PrepaintState,
        window: &mut Window,
        _cx: &mut gpui::App,
    ) {
        let Some(render_image) = self.last_frame.borrow().clone() else {
            return;
        };
        window
            .paint_image(
                bounds,
                gpui::Corners::default(),
                render_image,
                0,     // frame index
                false, // grayscale
            )
            .ok();
    }
}

impl IntoElement for VideoElement {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

/// Helper function to create a view compositing `video` through `textures`.
pub fn video_view(video: Video, textures: Arc<GpuiTextures>) -> VideoView {
    VideoView::new(video, textures)
}
