#![cfg_attr(feature = "strict", deny(warnings))]

pub use configurations::TrackerConfig;
pub use error::{Result, UploadTrackingError};
pub use event_interfaces::{NoOpUploadEventHandler, UploadEventHandler};
pub use task::{TaskId, TaskSnapshot};
pub use tracker::UploadTracker;

pub mod constants;

mod configurations;
mod error;
mod event_interfaces;
mod poller;
mod task;
mod tracker;
