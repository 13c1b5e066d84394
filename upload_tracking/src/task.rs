use std::fmt::Display;

use ocr_client::UploadPayload;
use ocr_types::{ServerTaskId, TaskState};
use serde::Serialize;
use serde_json::Value;

use crate::constants::NOTE_WAITING;

/// Client-side handle for one tracked upload. Minted from a per-tracker
/// counter and never reused, so repeated selections of identically named
/// files stay distinguishable for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One selected file and everything known about it so far.
#[derive(Debug)]
pub(crate) struct UploadTask {
    /// Stable handle, unique within the tracker.
    pub id: TaskId,

    /// Name the file was selected under; batch acknowledgments match on it.
    pub file_name: String,

    /// File contents, owned until the task goes out in a batch; taken on
    /// submission.
    pub payload: Option<UploadPayload>,

    /// Place in the lifecycle; starts at WAITING.
    pub status: TaskState,

    /// Human-readable descriptor of the current step. Never empty.
    pub progress_note: String,

    /// Server-assigned id; set only by a batch acknowledgment and used as
    /// the polling key.
    pub server_task_id: Option<ServerTaskId>,

    /// Opaque extraction outcome passed through from a status read.
    pub result: Option<Value>,
}

impl UploadTask {
    pub(crate) fn new_waiting(id: TaskId, payload: UploadPayload) -> Self {
        Self {
            id,
            file_name: payload.file_name.clone(),
            payload: Some(payload),
            status: TaskState::Waiting,
            progress_note: NOTE_WAITING.to_owned(),
            server_task_id: None,
            result: None,
        }
    }

    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            file_name: self.file_name.clone(),
            status: self.status,
            progress_note: self.progress_note.clone(),
            server_task_id: self.server_task_id.clone(),
            result: self.result.clone(),
        }
    }
}

/// Observable state of one task; the only form in which task state crosses
/// the tracker boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub file_name: String,
    pub status: TaskState,
    pub progress_note: String,
    pub server_task_id: Option<ServerTaskId>,
    pub result: Option<Value>,
}
