use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use ocr_types::{ServerTaskId, SubmitBatchResponse, TaskStatusResponse};

use crate::error::Result;

/// A file queued for submission: name plus contents. Owned by exactly one
/// upload task until the batch it belongs to is submitted.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: String,
    pub contents: Bytes,
}

impl UploadPayload {
    pub fn from_bytes(file_name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    /// Reads the file at `path`, naming the payload after its final component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path).await?;
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => path.display().to_string(),
        };
        Ok(Self {
            file_name,
            contents: contents.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Interface to the extraction service's asynchronous task API.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Submits a batch of files for extraction, with an optional destination
    /// label applied to every file in the batch. Success means the service
    /// accepted the batch for asynchronous processing and assigned one task
    /// per accepted file.
    async fn submit_batch(&self, files: Vec<UploadPayload>, destination: Option<String>)
        -> Result<SubmitBatchResponse>;

    /// Reads the current status of one task.
    async fn task_status(&self, task_id: &ServerTaskId) -> Result<TaskStatusResponse>;

    /// Requests best-effort cancellation of one task. The response body is
    /// not inspected.
    async fn cancel_task(&self, task_id: &ServerTaskId) -> Result<()>;

    /// Lists the destination labels known to the service.
    async fn list_destinations(&self) -> Result<Vec<String>>;
}
