use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::task::TaskSnapshot;

/// Callbacks through which the tracker tells its consumer that displayed
/// data went stale. Handed in as `Arc<dyn UploadEventHandler>`.
#[async_trait]
pub trait UploadEventHandler: Debug + Send + Sync {
    /// A task reached a terminal state. Fired exactly once per task, whatever
    /// the path into the terminal state was.
    async fn task_resolved(&self, task: TaskSnapshot);

    /// The whole batch view is finished; the uploader can be closed.
    async fn batch_closed(&self);
}

/// Event sink for callers that do not observe tracker events.
#[derive(Debug, Default)]
pub struct NoOpUploadEventHandler;

impl NoOpUploadEventHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {})
    }
}

#[async_trait]
impl UploadEventHandler for NoOpUploadEventHandler {
    async fn task_resolved(&self, _task: TaskSnapshot) {}

    async fn batch_closed(&self) {}
}
