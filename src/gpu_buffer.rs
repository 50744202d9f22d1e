use std::fmt;
use std::sync::Arc;

/// Receiver of the compositor's "done reading" signal.
pub(crate) trait ReleaseContext: Send + Sync {
    fn release_buffer(&self, sequence: u64);
}

/// A renderable view of the current frame, handed to the compositor.
///
/// The surface is a reference into the decoder's buffer, not a copy. The
/// compositor reads it and then calls [`GpuBuffer::release`]; dropping the
/// buffer releases it as well, so the release path runs exactly once.
pub struct GpuBuffer<S> {
    surface: S,
    width: u32,
    height: u32,
    sequence: u64,
    context: Option<Arc<dyn ReleaseContext>>,
}

impl<S> GpuBuffer<S> {
    pub(crate) fn new(
        surface: S,
        (width, height): (u32, u32),
        sequence: u64,
        context: Arc<dyn ReleaseContext>,
    ) -> Self {
        Self {
            surface,
            width,
            height,
            sequence,
            context: Some(context),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Arrival sequence of the frame this buffer shows.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Signal that the compositor has finished reading the surface.
    pub fn release(self) {
        drop(self);
    }
}

impl<S> Drop for GpuBuffer<S> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            context.release_buffer(self.sequence);
        }
    }
}

impl<S> fmt::Debug for GpuBuffer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("sequence", &self.sequence)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    impl ReleaseContext for Recorder {
        fn release_buffer(&self, sequence: u64) {
            self.0.lock().push(sequence);
        }
    }

    #[test]
    fn release_signals_once() {
        let recorder = Arc::new(Recorder::default());
        let buffer = GpuBuffer::new("surface", (1280, 720), 4, recorder.clone());
        assert_eq!(*buffer.surface(), "surface");
        assert_eq!((buffer.width(), buffer.height()), (1280, 720));

        buffer.release();
        assert_eq!(*recorder.0.lock(), vec![4]);
    }

    #[test]
    fn dropping_an_unreleased_buffer_releases_it() {
        let recorder = Arc::new(Recorder::default());
        {
            let _buffer = GpuBuffer::new((), (2, 2), 11, recorder.clone());
        }
        assert_eq!(*recorder.0.lock(), vec![11]);
    }
}
