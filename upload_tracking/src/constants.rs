use std::time::Duration;

/// Cadence of status reads for an acknowledged task. The first read happens
/// one full interval after the acknowledgment.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Progress note of a freshly added task.
pub const NOTE_WAITING: &str = "Waiting to be processed.";

/// Progress note while a batch submission is on the wire.
pub const NOTE_SUBMITTING: &str = "Submitting files...";

/// Progress note once the service has acknowledged a task.
pub const NOTE_PROCESSING_STARTED: &str = "Processing started.";

/// Progress note of a submitted task the batch acknowledgment never listed.
pub const NOTE_AWAITING_ACKNOWLEDGMENT: &str = "Awaiting acknowledgment from the extraction service.";

/// Progress note of a locally cancelled task.
pub const NOTE_CANCELLATION_REQUESTED: &str = "Cancellation requested.";

/// Note used when a submission could not reach the service at all.
pub const NOTE_NETWORK_ERROR: &str = "Network error.";

/// Note used when a status read fails and tracking stops.
pub const NOTE_TRACKING_ERROR: &str = "Tracking error.";

/// Fallback note for a polled SUCCESS that carries no progress text.
pub const NOTE_PROCESSING_COMPLETE: &str = "Processing complete.";

/// Fallback note for a polled FAILURE that carries no progress text.
pub const NOTE_PROCESSING_FAILED: &str = "Processing failed.";
