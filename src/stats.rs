use std::sync::atomic::{AtomicU64, Ordering};

/// Traffic counters updated by every stage of a pipeline.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    arrived: AtomicU64,
    promoted: AtomicU64,
    released: AtomicU64,
    dropped: AtomicU64,
    surface_failures: AtomicU64,
    empty_requests: AtomicU64,
    deferred: AtomicU64,
    queued: AtomicU64,
}

impl Stats {
    pub(crate) fn arrived(&self) {
        self.arrived.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn promoted(&self) {
        self.promoted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn surface_failure(&self) {
        self.surface_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn empty_request(&self) {
        self.empty_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deferred(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_queued(&self, depth: usize) {
        self.queued.store(depth as u64, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            arrived: self.arrived.load(Ordering::Relaxed),
            promoted: self.promoted.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            surface_failures: self.surface_failures.load(Ordering::Relaxed),
            empty_requests: self.empty_requests.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time copy of a pipeline's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    /// Frames taken off the mailbox by the admission loop.
    pub arrived: u64,
    /// Frames moved into the current slot.
    pub promoted: u64,
    /// Previously displayed frames freed by the release path.
    pub released: u64,
    /// Frames destroyed by the queue policy before being displayed.
    pub dropped: u64,
    /// Frames destroyed because their surface could not be obtained.
    pub surface_failures: u64,
    /// Buffer requests made while no frame was current.
    pub empty_requests: u64,
    /// Promotions postponed because the compositor was not ready.
    pub deferred: u64,
    /// Frames waiting in the admission queue.
    pub queued: u64,
}
