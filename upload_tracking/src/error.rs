use ocr_types::TaskState;
use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum UploadTrackingError {
    #[error("No tracked task with id {0}")]
    TaskNotFound(TaskId),

    #[error("Task {id} ({state}) cannot be cancelled")]
    NotCancellable { id: TaskId, state: TaskState },

    #[error("Task {id} is still being processed; cancel it before removing")]
    RemoveWhileActive { id: TaskId },
}

pub type Result<T> = std::result::Result<T, UploadTrackingError>;
