use crate::registrar::TextureId;
use gstreamer as gst;

/// Errors surfaced to the owner of a pipeline or video session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Glib(#[from] glib::Error),
    #[error("{0}")]
    Bool(#[from] glib::BoolError),
    #[error("failed to change pipeline state: {0}")]
    StateChange(#[from] gst::StateChangeError),
    #[error("failed to cast gstreamer element")]
    Cast,
    #[error("invalid caps on the video sink")]
    Caps,
    #[error("invalid framerate: {0}")]
    Framerate(f64),
    #[error("texture registration failed: {0}")]
    Registration(String),
    #[error("failed to spawn frame admission thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("frame pipeline is shut down")]
    Closed,
}

/// Why a frame's hardware surface could not be handed to the compositor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("frame carries no buffer")]
    MissingBuffer,
    #[error("frame caps are missing or unreadable")]
    MissingCaps,
    #[error("surface unavailable: {0}")]
    Unavailable(String),
}

/// The compositor refused a "new frame available" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("compositor is not ready for texture {0}")]
pub struct NotReady(pub TextureId);
