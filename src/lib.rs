//! # GPUI Video Texture
//!
//! Delivers decoded video frames from a GStreamer decoder to a gpui texture
//! without copying pixel data on the way.
//!
//! ## Pipeline
//!
//! - The decoder's streaming thread wraps each sample into a move-only
//!   [`Frame`] and posts it to a mailbox; posting never blocks.
//! - A dedicated admission thread queues arrivals and promotes one frame at a
//!   time to "current" whenever the compositor is not holding a buffer.
//! - The compositor pulls the current frame as a [`GpuBuffer`] and releases it
//!   once it is done reading, which frees the frame shown before it and lets
//!   the next one through.
//!
//! [`FramePipeline`] is independent of GStreamer and gpui: anything
//! implementing [`MediaPacket`] can be fed in, and any [`TextureRegistrar`]
//! can act as the compositor.
//!
//! ## Example
//!
//! ```no_run
//! use gpui_video_texture::{GpuiTextures, PipelineConfig, Url, Video, video_view};
//!
//! let textures = GpuiTextures::new();
//! let uri = Url::parse("file:///path/to/video.mp4").unwrap();
//! let video = Video::new(&uri, textures.clone(), PipelineConfig::default()).unwrap();
//! let view = video_view(video, textures);
//! // Hand `view` to a gpui window.
//! ```

mod admission;
mod config;
mod element;
mod error;
mod frame;
mod gpu_buffer;
mod mailbox;
mod pipeline;
mod registrar;
mod stats;
mod video;

pub use config::{PipelineConfig, QueuePolicy};
pub use element::{GpuiTextures, VideoElement, VideoView, video_view};
pub use error::{Error, NotReady, SurfaceError};
pub use frame::{Frame, MediaPacket};
pub use gpu_buffer::GpuBuffer;
pub use mailbox::{MailboxReceiver, MailboxSender, Message, mailbox};
pub use pipeline::{FramePipeline, FrameSender, PipelineState, TextureSource};
pub use registrar::{TextureId, TextureRegistrar};
pub use stats::PipelineStats;
pub use video::{GstSurface, Video};

// Re-export commonly used types
pub use gstreamer as gst;
pub use url::Url;
