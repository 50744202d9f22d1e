//! Blocking FIFO between the decoder callback and the admission loop.

use crate::frame::{Frame, MediaPacket};
use crossbeam_channel as channel;

/// Events delivered to the admission loop, in send order.
#[derive(Debug)]
pub enum Message<P: MediaPacket> {
    FrameArrived(Frame<P>),
    RenderFinished,
    Quit,
}

/// Create a connected sender/receiver pair.
pub fn mailbox<P: MediaPacket>() -> (MailboxSender<P>, MailboxReceiver<P>) {
    let (tx, rx) = channel::unbounded();
    (MailboxSender { tx }, MailboxReceiver { rx })
}

/// Producer half. Cheap to clone, safe to use from any thread.
#[derive(Debug)]
pub struct MailboxSender<P: MediaPacket> {
    tx: channel::Sender<Message<P>>,
}

impl<P: MediaPacket> Clone for MailboxSender<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P: MediaPacket> MailboxSender<P> {
    /// Append `message` without blocking.
    ///
    /// Fails only once the receiver is gone; the message is handed back so the
    /// caller decides what happens to any frame inside it.
    pub fn send(&self, message: Message<P>) -> Result<(), Message<P>> {
        self.tx.send(message).map_err(|channel::SendError(message)| message)
    }
}

/// Consumer half, owned by the admission-loop thread.
#[derive(Debug)]
pub struct MailboxReceiver<P: MediaPacket> {
    rx: channel::Receiver<Message<P>>,
}

impl<P: MediaPacket> MailboxReceiver<P> {
    /// Block until a message is available. Yields `Quit` once every sender
    /// has been dropped.
    pub fn receive(&self) -> Message<P> {
        match self.rx.recv() {
            Ok(message) => message,
            Err(channel::RecvError) => Message::Quit,
        }
    }

    /// Take the next message if one is already queued.
    pub fn try_receive(&self) -> Option<Message<P>> {
        self.rx.try_recv().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
