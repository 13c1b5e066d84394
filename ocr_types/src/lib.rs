#![cfg_attr(feature = "strict", deny(warnings))]

pub use api::{AcceptedTask, ErrorDetail, ProgressNote, ServerTaskId, SubmitBatchResponse, TaskStatusResponse};
pub use task_state::{TaskState, TaskStateParseError};

mod api;
mod task_state;
