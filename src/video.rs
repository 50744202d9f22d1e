use crate::config::PipelineConfig;
use crate::error::SurfaceError;
use crate::frame::MediaPacket;
use crate::pipeline::{FramePipeline, TextureSource};
use crate::registrar::{TextureId, TextureRegistrar};
use crate::stats::PipelineStats;
use crate::Error;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_app::prelude::*;
use gstreamer_video as gst_video;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A decoded GStreamer buffer together with its layout.
///
/// Cloning only takes another reference on the buffer.
#[derive(Debug, Clone)]
pub struct GstSurface {
    buffer: gst::Buffer,
    info: gst_video::VideoInfo,
}

impl GstSurface {
    pub fn buffer(&self) -> &gst::Buffer {
        &self.buffer
    }

    pub fn info(&self) -> &gst_video::VideoInfo {
        &self.info
    }

    /// Map the planes of the surface for reading.
    pub fn map(&self) -> Result<gst_video::VideoFrameRef<&gst::BufferRef>, Error> {
        Ok(gst_video::VideoFrameRef::from_buffer_ref_readable(
            &self.buffer,
            &self.info,
        )?)
    }
}

impl MediaPacket for gst::Sample {
    type Surface = GstSurface;

    fn surface(&self) -> Result<GstSurface, SurfaceError> {
        let buffer = self.buffer_owned().ok_or(SurfaceError::MissingBuffer)?;
        let caps = self.caps().ok_or(SurfaceError::MissingCaps)?;
        let info = gst_video::VideoInfo::from_caps(caps).map_err(|_| SurfaceError::MissingCaps)?;
        Ok(GstSurface { buffer, info })
    }

    fn size(&self) -> (u32, u32) {
        self.caps()
            .and_then(|caps| gst_video::VideoInfo::from_caps(caps).ok())
            .map_or((0, 0), |info| (info.width(), info.height()))
    }
}

#[derive(Debug)]
struct Internal {
    id: u64,
    source: gst::Pipeline,
    frames: FramePipeline<gst::Sample>,

    width: i32,
    height: i32,
    framerate: f64,
    duration: Duration,
}

impl Drop for Internal {
    fn drop(&mut self) {
        // Stop the decoder first so no callback races the teardown sweep.
        if let Err(err) = self.source.set_state(gst::State::Null) {
            log::error!("video {}: failed to stop pipeline: {err}", self.id);
        }
        self.frames.shutdown();
    }
}

/// A playback session: a GStreamer decoder feeding a frame pipeline.
///
/// Decoded samples are posted from the appsink's streaming thread straight
/// into the pipeline; the compositor pulls them through
/// [`Video::texture_source`].
#[derive(Debug, Clone)]
pub struct Video(Arc<Internal>);

impl Video {
    /// Create a new video session which loads from `uri`.
    pub fn new(
        uri: &url::Url,
        registrar: Arc<dyn TextureRegistrar>,
        config: PipelineConfig,
    ) -> Result<Self, Error> {
        gst::init()?;

        let pipeline = format!(
            "playbin uri=\"{}\" video-sink=\"videoscale ! videoconvert ! appsink name=gpui_video caps=video/x-raw,format=NV12,pixel-aspect-ratio=1/1\"",
            uri.as_str()
        );
        let pipeline = gst::parse::launch(pipeline.as_ref())?
            .downcast::<gst::Pipeline>()
            .map_err(|_| Error::Cast)?;

        let video_sink: gst::Element = pipeline.property("video-sink");
        let pad = video_sink.pads().first().cloned().ok_or(Error::Cast)?;
        let pad = pad.dynamic_cast::<gst::GhostPad>().map_err(|_| Error::Cast)?;
        let bin = pad
            .parent_element()
            .ok_or(Error::Cast)?
            .downcast::<gst::Bin>()
            .map_err(|_| Error::Cast)?;
        let video_sink = bin.by_name("gpui_video").ok_or(Error::Cast)?;
        let video_sink = video_sink
            .downcast::<gst_app::AppSink>()
            .map_err(|_| Error::Cast)?;

        Self::from_gst_pipeline(pipeline, video_sink, registrar, config)
    }

    /// Creates a new video session based on an existing GStreamer pipeline
    /// and appsink.
    pub fn from_gst_pipeline(
        pipeline: gst::Pipeline,
        video_sink: gst_app::AppSink,
        registrar: Arc<dyn TextureRegistrar>,
        config: PipelineConfig,
    ) -> Result<Self, Error> {
        gst::init()?;
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        macro_rules! cleanup {
            ($expr:expr) => {
                $expr.map_err(|e| {
                    let _ = pipeline.set_state(gst::State::Null);
                    e
                })
            };
        }

        let frames = FramePipeline::new(registrar, config)?;
        let sender = frames.frame_sender();
        video_sink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    sender.submit(sample).map_err(|_| gst::FlowError::Flushing)?;
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        let pad = cleanup!(video_sink.pads().first().cloned().ok_or(Error::Caps))?;

        cleanup!(pipeline.set_state(gst::State::Playing))?;

        // Wait a brief moment for the pipeline to start playing
        let _ = pipeline.state(gst::ClockTime::from_mseconds(100));
        cleanup!(pipeline.state(gst::ClockTime::from_seconds(5)).0)?;

        let caps = cleanup!(pad.current_caps().ok_or(Error::Caps))?;
        let s = cleanup!(caps.structure(0).ok_or(Error::Caps))?;
        let width = cleanup!(s.get::<i32>("width").map_err(|_| Error::Caps))?;
        let height = cleanup!(s.get::<i32>("height").map_err(|_| Error::Caps))?;
        let framerate = cleanup!(s.get::<gst::Fraction>("framerate").map_err(|_| Error::Caps))?;
        let framerate = framerate.numer() as f64 / framerate.denom() as f64;

        if framerate.is_nan()
            || framerate.is_infinite()
            || framerate < 0.0
            || framerate.abs() < f64::EPSILON
        {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(Error::Framerate(framerate));
        }

        let duration = Duration::from_nanos(
            pipeline
                .query_duration::<gst::ClockTime>()
                .map(|duration| duration.nseconds())
                .unwrap_or(0),
        );

        log::debug!(
            "video {id}: {width}x{height} @ {framerate:.2} fps on texture {}",
            frames.texture_id()
        );

        Ok(Video(Arc::new(Internal {
            id,
            source: pipeline,
            frames,

            width,
            height,
            framerate,
            duration,
        })))
    }

    /// Get the size/resolution of the video as `(width, height)`.
    pub fn size(&self) -> (i32, i32) {
        (self.0.width, self.0.height)
    }

    /// Get the framerate of the video as frames per second.
    pub fn framerate(&self) -> f64 {
        self.0.framerate
    }

    /// Get the media duration.
    pub fn duration(&self) -> Duration {
        self.0.duration
    }

    /// Set if the media is paused or not.
    pub fn set_paused(&self, paused: bool) -> Result<(), Error> {
        self.0.source.set_state(if paused {
            gst::State::Paused
        } else {
            gst::State::Playing
        })?;
        Ok(())
    }

    /// Get if the media is paused or not.
    pub fn paused(&self) -> bool {
        self.0.source.state(gst::ClockTime::ZERO).1 == gst::State::Paused
    }

    pub fn texture_id(&self) -> TextureId {
        self.0.frames.texture_id()
    }

    /// Pull side of the session, for the compositor.
    pub fn texture_source(&self) -> TextureSource<gst::Sample> {
        self.0.frames.texture_source()
    }

    pub fn stats(&self) -> PipelineStats {
        self.0.frames.stats()
    }

    /// Get the underlying GStreamer pipeline.
    pub fn pipeline(&self) -> gst::Pipeline {
        self.0.source.clone()
    }
}
