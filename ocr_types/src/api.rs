use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::TaskState;

/// Server-assigned identifier of an extraction task, opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerTaskId(String);

impl ServerTaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ServerTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerTaskId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ServerTaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One accepted file in a submission acknowledgment, keyed by filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedTask {
    pub task_id: ServerTaskId,
    pub filename: String,
}

/// Body of a 202 response to a batch submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBatchResponse {
    pub tasks: Vec<AcceptedTask>,
}

/// Free-form stage descriptor the service attaches to non-terminal statuses,
/// e.g. "Uploading to cloud..." or "Saving results to database...".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressNote {
    pub status: String,
}

impl ProgressNote {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}

/// Body of a status read for one task. `result` is passed through opaquely;
/// its shape belongs to the extraction pipeline, not to this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Error body the service returns on rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_submit_response_parse() {
        let body = json!({
            "tasks": [
                { "task_id": "11f1e8a0", "filename": "passport_a.jpg" },
                { "task_id": "58c2b917", "filename": "passport_b.jpg" },
            ]
        });

        let parsed: SubmitBatchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.tasks.len(), 2);
        assert_eq!(parsed.tasks[0].task_id, ServerTaskId::from("11f1e8a0"));
        assert_eq!(parsed.tasks[1].filename, "passport_b.jpg");
    }

    #[test]
    fn test_status_response_minimal() {
        let parsed: TaskStatusResponse = serde_json::from_value(json!({ "status": "PENDING" })).unwrap();
        assert_eq!(parsed.status, TaskState::Pending);
        assert!(parsed.progress.is_none());
        assert!(parsed.result.is_none());
    }

    #[test]
    fn test_status_response_with_progress_and_result() {
        let body = json!({
            "status": "SUCCESS",
            "progress": { "status": "Saving results to database..." },
            "result": { "successful_pages": 3, "failed_pages": [] }
        });

        let parsed: TaskStatusResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.status, TaskState::Success);
        assert_eq!(parsed.progress.unwrap().status, "Saving results to database...");
        assert_eq!(parsed.result.unwrap()["successful_pages"], 3);
    }
}
