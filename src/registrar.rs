use crate::error::{Error, NotReady};
use std::fmt;

/// Opaque handle of a texture registered with the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub i64);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The compositor side of a frame pipeline.
///
/// A pipeline registers one texture when it starts, notifies the compositor
/// each time it promotes a frame, and unregisters the texture at teardown.
///
/// `mark_frame_available` runs on the admission thread right after a frame
/// is promoted, without any pipeline lock held. The compositor may pull the
/// frame as soon as it is called. Returning [`NotReady`] withdraws the
/// promotion unless the frame was already pulled; it is retried on the next
/// pipeline event.
pub trait TextureRegistrar: Send + Sync + 'static {
    fn register_texture(&self) -> Result<TextureId, Error>;

    fn unregister_texture(&self, id: TextureId);

    /// Tell the compositor a new frame can be pulled for `id`.
    fn mark_frame_available(&self, id: TextureId) -> Result<(), NotReady>;
}
