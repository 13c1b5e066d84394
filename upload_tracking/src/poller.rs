use std::sync::{Arc, Weak};
use std::time::Duration;

use ocr_client::ExtractionClient;
use ocr_types::ServerTaskId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::task::TaskId;
use crate::tracker::TrackerShared;

/// What the tracker decided after one status read was applied.
pub(crate) enum PollDisposition {
    /// Task still in flight; read again after the next interval.
    Continue,
    /// Task resolved or no longer tracked; the poller exits.
    Stop,
}

/// Owning handle for one polling sub-process. Dropping it detaches the task;
/// the task itself exits through its cancellation token.
pub(crate) struct PollerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl PollerHandle {
    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn into_join(self) -> JoinHandle<()> {
        self.join
    }
}

/// Spawns the polling sub-process for one acknowledged task. The loop reads
/// the task status once per interval, starting one full interval after the
/// acknowledgment, and exits when the token fires, the tracker goes away, or
/// the tracker reports the task resolved. A response that loses the race
/// against cancellation is dropped without being applied.
pub(crate) fn spawn(
    tracker: Weak<TrackerShared>,
    client: Arc<dyn ExtractionClient>,
    task_id: TaskId,
    server_task_id: ServerTaskId,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> PollerHandle {
    let token = cancel.clone();

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so the first read
        // happens one full interval after the acknowledgment.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {},
            }

            let outcome = tokio::select! {
                _ = token.cancelled() => break,
                outcome = client.task_status(&server_task_id) => outcome,
            };

            // A cancellation that raced the request wins over the response.
            if token.is_cancelled() {
                break;
            }

            let Some(shared) = tracker.upgrade() else {
                break;
            };

            match shared.apply_poll_outcome(task_id, outcome).await {
                PollDisposition::Continue => {},
                PollDisposition::Stop => break,
            }
        }

        if let Some(shared) = tracker.upgrade() {
            shared.release_poller(task_id).await;
        }

        debug!("Polling for task {task_id} finished");
    });

    PollerHandle { cancel, join }
}
