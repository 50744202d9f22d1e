/// What the admission loop does when frames pile up faster than the
/// compositor pulls them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Keep every decoded frame; the decoder's own scheduling applies backpressure.
    #[default]
    Unbounded,
    /// Keep at most this many queued frames, destroying the oldest first.
    DropOldest(usize),
}

impl QueuePolicy {
    /// Number of queued frames to destroy before admitting one more into a
    /// queue currently holding `queued` frames.
    pub(crate) fn overflow(&self, queued: usize) -> usize {
        match *self {
            QueuePolicy::Unbounded => 0,
            QueuePolicy::DropOldest(limit) => (queued + 1).saturating_sub(limit.max(1)),
        }
    }
}

/// Per-session pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub(crate) queue_policy: QueuePolicy,
    pub(crate) thread_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_policy: QueuePolicy::Unbounded,
            thread_name: "frame-admission".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue policy of the admission loop.
    pub fn queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }

    /// Set the name of the admission-loop thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn policy(&self) -> QueuePolicy {
        self.queue_policy
    }

    pub fn name(&self) -> &str {
        &self.thread_name
    }
}
