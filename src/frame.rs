use crate::error::SurfaceError;
use std::fmt;

/// A decoded frame as delivered by the decoder.
///
/// Dropping the packet returns its hardware buffer to the decoder.
pub trait MediaPacket: Send + 'static {
    /// Reference to the hardware surface. Cloning it must not copy pixels.
    type Surface: Clone + Send + 'static;

    fn surface(&self) -> Result<Self::Surface, SurfaceError>;

    /// Frame size in pixels as `(width, height)`.
    fn size(&self) -> (u32, u32);
}

/// Single owner of one decoded hardware frame.
///
/// A `Frame` is never cloned; it moves from the mailbox to the admission
/// queue to the current and previous slots, and its packet is destroyed
/// exactly once when the frame is dropped.
pub struct Frame<P: MediaPacket> {
    packet: P,
    sequence: u64,
}

impl<P: MediaPacket> Frame<P> {
    pub fn new(packet: P) -> Self {
        Self {
            packet,
            sequence: 0,
        }
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Arrival order assigned when the frame entered its pipeline.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn size(&self) -> (u32, u32) {
        self.packet.size()
    }

    pub fn surface(&self) -> Result<P::Surface, SurfaceError> {
        self.packet.surface()
    }

    /// Return the hardware buffer to the decoder.
    pub fn destroy(self) {
        drop(self);
    }
}

impl<P: MediaPacket> Drop for Frame<P> {
    fn drop(&mut self) {
        log::trace!("destroying frame {}", self.sequence);
    }
}

impl<P: MediaPacket> fmt::Debug for Frame<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.size();
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted(Arc<AtomicUsize>);

    impl MediaPacket for Counted {
        type Surface = ();

        fn surface(&self) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn size(&self) -> (u32, u32) {
            (640, 360)
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn destroy_returns_packet_once() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let frame = Frame::new(Counted(destroyed.clone())).with_sequence(7);
        assert_eq!(frame.sequence(), 7);
        assert_eq!(frame.size(), (640, 360));

        frame.destroy();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn moving_a_frame_does_not_destroy_it() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let frame = Frame::new(Counted(destroyed.clone()));

        let mut slot = None;
        slot.replace(frame);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        let moved = slot.take();
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        drop(moved);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
