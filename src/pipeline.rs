use crate::Error;
use crate::admission::AdmissionLoop;
use crate::config::PipelineConfig;
use crate::frame::{Frame, MediaPacket};
use crate::gpu_buffer::{GpuBuffer, ReleaseContext};
use crate::mailbox::{MailboxSender, Message, mailbox};
use crate::registrar::{TextureId, TextureRegistrar};
use crate::stats::{PipelineStats, Stats};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

/// Observable state of a pipeline's render gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// No frame is checked out to the compositor.
    Idle,
    /// The current frame is checked out to the compositor.
    Rendering,
    /// The pipeline has been torn down.
    Stopped,
}

/// Frames owned by the render side of the pipeline.
pub(crate) struct Slots<P: MediaPacket> {
    pub(crate) is_rendering: bool,
    pub(crate) current: Option<Frame<P>>,
    pub(crate) previous: Option<Frame<P>>,
    /// Number of pulls that found a current frame.
    pub(crate) checkouts: u64,
}

pub(crate) struct Shared<P: MediaPacket> {
    pub(crate) slots: Mutex<Slots<P>>,
    pub(crate) mailbox: MailboxSender<P>,
    pub(crate) texture_id: TextureId,
    pub(crate) registrar: Arc<dyn TextureRegistrar>,
    pub(crate) stats: Stats,
    next_sequence: AtomicU64,
    stopped: AtomicBool,
}

impl<P: MediaPacket> Shared<P> {
    /// Free the previously displayed frame, open the render gate and wake the
    /// admission loop.
    pub(crate) fn finish_render(&self) {
        let released = {
            let mut slots = self.slots.lock();
            slots.is_rendering = false;
            slots.previous.take()
        };

        if let Some(frame) = released {
            log::trace!("texture {}: freeing frame {}", self.texture_id, frame.sequence());
            self.stats.released();
            frame.destroy();
        }

        if self.mailbox.send(Message::RenderFinished).is_err() {
            log::trace!("texture {}: admission loop already exited", self.texture_id);
        }
    }
}

impl<P: MediaPacket> ReleaseContext for Shared<P> {
    fn release_buffer(&self, sequence: u64) {
        log::trace!("texture {}: compositor released frame {sequence}", self.texture_id);
        self.finish_render();
    }
}

/// Delivery pipeline from a decoder callback to a compositor texture.
///
/// One pipeline exists per playback session. It registers a texture and
/// spawns its admission thread on creation; [`FramePipeline::shutdown`] (or
/// dropping the pipeline) stops the thread, destroys every frame it still
/// owns and unregisters the texture.
pub struct FramePipeline<P: MediaPacket> {
    shared: Arc<Shared<P>>,
    worker: Option<JoinHandle<()>>,
}

impl<P: MediaPacket> FramePipeline<P> {
    pub fn new(
        registrar: Arc<dyn TextureRegistrar>,
        config: PipelineConfig,
    ) -> Result<Self, Error> {
        let texture_id = registrar.register_texture()?;
        let (tx, rx) = mailbox();

        let shared = Arc::new(Shared {
            slots: Mutex::new(Slots {
                is_rendering: false,
                current: None,
                previous: None,
                checkouts: 0,
            }),
            mailbox: tx,
            texture_id,
            registrar: Arc::clone(&registrar),
            stats: Stats::default(),
            next_sequence: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        });

        let admission = AdmissionLoop::new(Arc::clone(&shared), rx, config.queue_policy);
        let worker = std::thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || admission.run());
        let worker = match worker {
            Ok(worker) => worker,
            Err(err) => {
                registrar.unregister_texture(texture_id);
                return Err(Error::Spawn(err));
            }
        };

        log::debug!("texture {texture_id}: frame pipeline started");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    pub fn texture_id(&self) -> TextureId {
        self.shared.texture_id
    }

    /// Handle for the decoder callback thread.
    pub fn frame_sender(&self) -> FrameSender<P> {
        FrameSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Handle for the compositor thread.
    pub fn texture_source(&self) -> TextureSource<P> {
        TextureSource {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.shared.slots.lock().is_rendering
    }

    /// Sequence of the frame currently on screen, if any.
    pub fn current_sequence(&self) -> Option<u64> {
        self.shared.slots.lock().current.as_ref().map(Frame::sequence)
    }

    pub fn state(&self) -> PipelineState {
        if self.worker.is_none() {
            return PipelineState::Stopped;
        }
        if self.is_rendering() {
            PipelineState::Rendering
        } else {
            PipelineState::Idle
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.stats.snapshot()
    }

    /// Stop the admission thread and destroy every frame still held.
    ///
    /// Calling this more than once is a no-op.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let texture_id = self.shared.texture_id;

        self.shared.stopped.store(true, Ordering::Release);
        if self.shared.mailbox.send(Message::Quit).is_err() {
            log::debug!("texture {texture_id}: admission loop exited before quit");
        }
        if let Err(err) = worker.join() {
            match err.downcast_ref::<String>() {
                Some(e) => log::error!("Frame admission thread panicked: {e}"),
                None => log::error!("Frame admission thread panicked with unknown reason"),
            }
        }

        let (current, previous) = {
            let mut slots = self.shared.slots.lock();
            slots.is_rendering = false;
            (slots.current.take(), slots.previous.take())
        };
        if let Some(frame) = previous {
            frame.destroy();
        }
        if let Some(frame) = current {
            frame.destroy();
        }
        self.shared.stats.set_queued(0);

        self.shared.registrar.unregister_texture(texture_id);
        log::debug!("texture {texture_id}: frame pipeline stopped");
    }
}

impl<P: MediaPacket> fmt::Debug for FramePipeline<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePipeline")
            .field("texture_id", &self.shared.texture_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<P: MediaPacket> Drop for FramePipeline<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decoder-side handle: wraps native frames and posts them to the admission
/// loop without blocking.
pub struct FrameSender<P: MediaPacket> {
    shared: Arc<Shared<P>>,
}

impl<P: MediaPacket> Clone for FrameSender<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: MediaPacket> FrameSender<P> {
    /// Take ownership of a decoded frame.
    ///
    /// After the pipeline is shut down the frame is destroyed immediately and
    /// [`Error::Closed`] is returned.
    pub fn submit(&self, packet: P) -> Result<(), Error> {
        let frame = Frame::new(packet);
        if self.shared.stopped.load(Ordering::Acquire) {
            frame.destroy();
            return Err(Error::Closed);
        }

        let sequence = self.shared.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = frame.with_sequence(sequence);
        log::trace!("texture {}: frame {sequence} decoded", self.shared.texture_id);

        self.shared
            .mailbox
            .send(Message::FrameArrived(frame))
            .map_err(|_rejected| Error::Closed)
    }
}

/// Compositor-side handle: the pull callback of the registered texture.
pub struct TextureSource<P: MediaPacket> {
    shared: Arc<Shared<P>>,
}

impl<P: MediaPacket> Clone for TextureSource<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: MediaPacket> TextureSource<P> {
    pub fn texture_id(&self) -> TextureId {
        self.shared.texture_id
    }

    /// Expose the current frame as a GPU buffer.
    ///
    /// Returns `None` when no frame is current or when the current frame's
    /// surface cannot be obtained; in both cases the render gate is reopened
    /// so the pipeline keeps flowing. The current frame stays in place until
    /// the next promotion replaces it.
    pub fn obtain_gpu_buffer(&self) -> Option<GpuBuffer<P::Surface>> {
        let texture_id = self.shared.texture_id;
        let mut slots = self.shared.slots.lock();

        let Some(current) = slots.current.as_ref() else {
            drop(slots);
            log::warn!("texture {texture_id}: buffer requested with no current frame");
            self.shared.stats.empty_request();
            self.shared.finish_render();
            return None;
        };
        let outcome = current.surface();
        let size = current.size();
        let sequence = current.sequence();
        slots.checkouts += 1;

        match outcome {
            Ok(surface) => {
                drop(slots);
                log::trace!("texture {texture_id}: frame {sequence} checked out");
                Some(GpuBuffer::new(
                    surface,
                    size,
                    sequence,
                    Arc::clone(&self.shared) as Arc<dyn ReleaseContext>,
                ))
            }
            Err(err) => {
                let failed = slots.current.take();
                drop(slots);
                if let Some(frame) = failed {
                    log::error!(
                        "texture {texture_id}: dropping frame {}: {err}",
                        frame.sequence()
                    );
                    frame.destroy();
                }
                self.shared.stats.surface_failure();
                self.shared.finish_render();
                None
            }
        }
    }
}
