use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of one upload task. The extraction service reports these
/// verbatim in SCREAMING CASE, and the client adopts them without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    /// Selected locally; not yet part of any submission.
    Waiting,
    /// Bundled into a submission whose acknowledgment has not arrived.
    Pending,
    /// Acknowledged by the service and being processed.
    Progress,
    Success,
    Failure,
    Cancelled,
}

impl TaskState {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure | TaskState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Waiting => "WAITING",
            TaskState::Pending => "PENDING",
            TaskState::Progress => "PROGRESS",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
            TaskState::Cancelled => "CANCELLED",
        }
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task state: {0}")]
pub struct TaskStateParseError(pub String);

impl FromStr for TaskState {
    type Err = TaskStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(TaskState::Waiting),
            "PENDING" => Ok(TaskState::Pending),
            "PROGRESS" => Ok(TaskState::Progress),
            "SUCCESS" => Ok(TaskState::Success),
            "FAILURE" => Ok(TaskState::Failure),
            "CANCELLED" => Ok(TaskState::Cancelled),
            other => Err(TaskStateParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_spelling_round_trip() {
        for state in [
            TaskState::Waiting,
            TaskState::Pending,
            TaskState::Progress,
            TaskState::Success,
            TaskState::Failure,
            TaskState::Cancelled,
        ] {
            let serialized = serde_json::to_string(&state).unwrap();
            assert_eq!(serialized, format!("\"{state}\""));

            let parsed: TaskState = serde_json::from_str(&serialized).unwrap();
            assert_eq!(parsed, state);

            assert_eq!(state.as_str().parse::<TaskState>().unwrap(), state);
        }
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!TaskState::Waiting.is_terminal());
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Progress.is_terminal());
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        assert!("STARTED".parse::<TaskState>().is_err());
        assert!(serde_json::from_str::<TaskState>("\"started\"").is_err());
    }
}
