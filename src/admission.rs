//! The admission loop: the only place frames are promoted to the screen.

use crate::config::QueuePolicy;
use crate::frame::{Frame, MediaPacket};
use crate::mailbox::{MailboxReceiver, Message};
use crate::pipeline::Shared;
use std::collections::VecDeque;
use std::sync::Arc;

pub(crate) struct AdmissionLoop<P: MediaPacket> {
    shared: Arc<Shared<P>>,
    inbox: MailboxReceiver<P>,
    queue: VecDeque<Frame<P>>,
    policy: QueuePolicy,
}

impl<P: MediaPacket> AdmissionLoop<P> {
    pub(crate) fn new(
        shared: Arc<Shared<P>>,
        inbox: MailboxReceiver<P>,
        policy: QueuePolicy,
    ) -> Self {
        Self {
            shared,
            inbox,
            queue: VecDeque::new(),
            policy,
        }
    }

    /// Pump the mailbox until `Quit`, then destroy everything still queued.
    pub(crate) fn run(mut self) {
        let texture_id = self.shared.texture_id;
        log::debug!("texture {texture_id}: admission loop started");

        loop {
            match self.inbox.receive() {
                Message::FrameArrived(frame) => self.admit(frame),
                Message::RenderFinished => {
                    log::trace!("texture {texture_id}: render finished");
                }
                Message::Quit => break,
            }
            self.try_promote();
        }

        let swept = self.drain();
        log::debug!("texture {texture_id}: admission loop exited, {swept} queued frames destroyed");
    }

    fn admit(&mut self, frame: Frame<P>) {
        self.shared.stats.arrived();

        let overflow = self.policy.overflow(self.queue.len());
        if overflow > 0 {
            log::warn!(
                "texture {}: compositor is behind, dropping {overflow} queued frames",
                self.shared.texture_id
            );
            for stale in self.queue.drain(..overflow) {
                stale.destroy();
            }
            self.shared.stats.dropped(overflow as u64);
        }

        self.queue.push_back(frame);
        self.shared.stats.set_queued(self.queue.len());
    }

    /// Move the queue head into the current slot if the render gate is open,
    /// then tell the compositor. A refused notification withdraws the
    /// promotion unless the compositor already pulled the frame.
    fn try_promote(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let texture_id = self.shared.texture_id;

        let (sequence, checkouts, superseded) = {
            let mut slots = self.shared.slots.lock();
            if slots.is_rendering {
                return;
            }
            let Some(frame) = self.queue.pop_front() else {
                return;
            };
            let sequence = frame.sequence();
            // The release path empties `previous` before it reopens the gate.
            let superseded = slots.previous.take();
            slots.previous = slots.current.replace(frame);
            slots.is_rendering = true;
            (sequence, slots.checkouts, superseded)
        };

        // Only this thread closes the gate, so the promotion stays put until
        // the compositor pulls it.
        if let Err(err) = self.shared.registrar.mark_frame_available(texture_id) {
            let mut slots = self.shared.slots.lock();
            if slots.checkouts == checkouts {
                log::debug!("texture {texture_id}: deferring frame {sequence}: {err}");
                let withdrawn = slots.current.take();
                slots.current = slots.previous.take();
                slots.previous = superseded;
                slots.is_rendering = false;
                drop(slots);

                if let Some(frame) = withdrawn {
                    self.queue.push_front(frame);
                }
                self.shared.stats.deferred();
                return;
            }
            drop(slots);
            log::debug!("texture {texture_id}: frame {sequence} pulled before refusal: {err}");
            self.finish_promotion(sequence, superseded);
            return;
        }

        self.finish_promotion(sequence, superseded);
    }

    fn finish_promotion(&self, sequence: u64, superseded: Option<Frame<P>>) {
        let texture_id = self.shared.texture_id;
        log::trace!("texture {texture_id}: promoted frame {sequence}");
        self.shared.stats.promoted();
        self.shared.stats.set_queued(self.queue.len());
        if let Some(frame) = superseded {
            log::warn!("texture {texture_id}: frame {} was never released", frame.sequence());
            frame.destroy();
        }
    }

    fn drain(&mut self) -> usize {
        let mut swept = self.queue.len();
        self.queue.clear();

        while let Some(message) = self.inbox.try_receive() {
            if let Message::FrameArrived(frame) = message {
                swept += 1;
                frame.destroy();
            }
        }

        self.shared.stats.set_queued(0);
        swept
    }
}
