use std::collections::HashMap;
use std::sync::Arc;

use more_asserts::debug_assert_le;
use ocr_client::{ExtractionClient, OcrClientError, UploadPayload};
use ocr_types::{ServerTaskId, SubmitBatchResponse, TaskState, TaskStatusResponse};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::configurations::TrackerConfig;
use crate::constants::{
    NOTE_AWAITING_ACKNOWLEDGMENT, NOTE_CANCELLATION_REQUESTED, NOTE_NETWORK_ERROR, NOTE_PROCESSING_COMPLETE,
    NOTE_PROCESSING_FAILED, NOTE_PROCESSING_STARTED, NOTE_SUBMITTING, NOTE_TRACKING_ERROR,
};
use crate::error::{Result, UploadTrackingError};
use crate::event_interfaces::UploadEventHandler;
use crate::poller::{self, PollDisposition, PollerHandle};
use crate::task::{TaskId, TaskSnapshot, UploadTask};

/// How one applied status read left the task.
enum StatusApplyResult {
    /// Still non-terminal; keep polling.
    InProgress,
    /// Entered a terminal state with this read.
    Resolved(TaskSnapshot),
    /// Already terminal or no longer tracked; nothing was changed.
    Ignored,
}

/// What a batch acknowledgment did to the submitted tasks.
struct SubmissionOutcome {
    /// Tasks now in PROGRESS, each with its polling key.
    acknowledged: Vec<(TaskId, ServerTaskId)>,
    /// File names of batch tasks the acknowledgment never listed.
    unacknowledged: Vec<String>,
}

/// Note a terminal status read falls back to when it carries no progress
/// text of its own.
fn default_terminal_note(state: TaskState) -> Option<&'static str> {
    match state {
        TaskState::Success => Some(NOTE_PROCESSING_COMPLETE),
        TaskState::Failure => Some(NOTE_PROCESSING_FAILED),
        TaskState::Cancelled => Some(NOTE_CANCELLATION_REQUESTED),
        _ => None,
    }
}

/// Pure transition logic over the task collection. All networking and
/// locking lives in the wrapper below; everything here is synchronous and
/// directly testable.
#[derive(Default)]
struct UploadTrackerImpl {
    /// All tracked tasks in insertion order.
    tasks: Vec<UploadTask>,

    /// Source of the next task id. Monotonic and never reused, so removal
    /// cannot alias handles.
    next_task_id: u64,
}

impl UploadTrackerImpl {
    fn task_mut(&mut self, task_id: TaskId) -> Option<&mut UploadTask> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Appends one WAITING task per payload and hands back the new ids in
    /// insertion order.
    fn register_files(&mut self, payloads: Vec<UploadPayload>) -> Vec<TaskId> {
        let mut ids = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let id = TaskId::new(self.next_task_id);
            self.next_task_id += 1;
            self.tasks.push(UploadTask::new_waiting(id, payload));
            ids.push(id);
        }
        ids
    }

    /// Moves every WAITING task to PENDING and takes its payload for the
    /// wire. An empty return means there is nothing to submit.
    fn take_waiting_for_submission(&mut self) -> Vec<(TaskId, UploadPayload)> {
        let mut batch = Vec::new();
        for task in self.tasks.iter_mut().filter(|t| t.status == TaskState::Waiting) {
            debug_assert!(task.payload.is_some());
            let Some(payload) = task.payload.take() else {
                continue;
            };
            task.status = TaskState::Pending;
            task.progress_note = NOTE_SUBMITTING.to_owned();
            batch.push((task.id, payload));
        }
        batch
    }

    /// Matches a batch acknowledgment against the submitted tasks by
    /// filename. The first still-unmatched task with the name wins, so
    /// duplicate filenames consume one acknowledgment entry each.
    fn apply_batch_acknowledgment(&mut self, batch: &[TaskId], ack: SubmitBatchResponse) -> SubmissionOutcome {
        let mut acknowledged = Vec::with_capacity(ack.tasks.len());

        for accepted in ack.tasks {
            let matched = self.tasks.iter_mut().find(|t| {
                batch.contains(&t.id)
                    && t.status == TaskState::Pending
                    && t.server_task_id.is_none()
                    && t.file_name == accepted.filename
            });

            let Some(task) = matched else {
                debug!("Acknowledgment names no submitted file {}; ignored", accepted.filename);
                continue;
            };

            task.server_task_id = Some(accepted.task_id.clone());
            task.status = TaskState::Progress;
            task.progress_note = NOTE_PROCESSING_STARTED.to_owned();
            acknowledged.push((task.id, accepted.task_id));
        }

        debug_assert_le!(acknowledged.len(), batch.len());

        // Whatever the acknowledgment did not claim stays PENDING; the server
        // owns acknowledgment truth, so no synthetic transition happens here.
        let unacknowledged = self
            .tasks
            .iter_mut()
            .filter(|t| batch.contains(&t.id) && t.status == TaskState::Pending && t.server_task_id.is_none())
            .map(|task| {
                task.progress_note = NOTE_AWAITING_ACKNOWLEDGMENT.to_owned();
                task.file_name.clone()
            })
            .collect();

        SubmissionOutcome {
            acknowledged,
            unacknowledged,
        }
    }

    /// Fails every still-pending task of a rejected batch with the given
    /// message and returns their snapshots for notification.
    fn resolve_batch_rejected(&mut self, batch: &[TaskId], detail: &str) -> Vec<TaskSnapshot> {
        let mut resolved = Vec::with_capacity(batch.len());
        for &task_id in batch {
            let Some(task) = self.task_mut(task_id) else {
                continue;
            };
            if task.status != TaskState::Pending {
                continue;
            }
            task.status = TaskState::Failure;
            task.progress_note = detail.to_owned();
            resolved.push(task.snapshot());
        }
        resolved
    }

    /// Merges one status read into its task: status adopted verbatim, note
    /// replaced when the response carries one, result stored when present.
    fn apply_status_response(&mut self, task_id: TaskId, response: TaskStatusResponse) -> StatusApplyResult {
        let Some(task) = self.task_mut(task_id) else {
            return StatusApplyResult::Ignored;
        };
        if task.status.is_terminal() {
            return StatusApplyResult::Ignored;
        }

        task.status = response.status;
        match response.progress {
            Some(note) if !note.status.is_empty() => task.progress_note = note.status,
            _ => {
                if let Some(default_note) = default_terminal_note(task.status) {
                    task.progress_note = default_note.to_owned();
                }
            },
        }
        if let Some(result) = response.result {
            task.result = Some(result);
        }

        if task.status.is_terminal() {
            StatusApplyResult::Resolved(task.snapshot())
        } else {
            StatusApplyResult::InProgress
        }
    }

    /// A failed status read resolves the task on the spot; there is no retry.
    fn resolve_poll_failure(&mut self, task_id: TaskId) -> Option<TaskSnapshot> {
        let task = self.task_mut(task_id)?;
        if task.status.is_terminal() {
            return None;
        }
        task.status = TaskState::Failure;
        task.progress_note = NOTE_TRACKING_ERROR.to_owned();
        Some(task.snapshot())
    }

    /// Marks a server-acknowledged, in-flight task CANCELLED and returns its
    /// snapshot plus the key for the remote cancel.
    fn cancel_task(&mut self, task_id: TaskId) -> Result<(TaskSnapshot, ServerTaskId)> {
        let Some(task) = self.task_mut(task_id) else {
            return Err(UploadTrackingError::TaskNotFound(task_id));
        };

        let cancellable = matches!(task.status, TaskState::Pending | TaskState::Progress);
        let Some(server_task_id) = task.server_task_id.clone().filter(|_| cancellable) else {
            return Err(UploadTrackingError::NotCancellable {
                id: task_id,
                state: task.status,
            });
        };

        task.status = TaskState::Cancelled;
        task.progress_note = NOTE_CANCELLATION_REQUESTED.to_owned();
        Ok((task.snapshot(), server_task_id))
    }

    fn remove_task(&mut self, task_id: TaskId) -> Result<()> {
        let Some(position) = self.tasks.iter().position(|t| t.id == task_id) else {
            return Err(UploadTrackingError::TaskNotFound(task_id));
        };
        let status = self.tasks[position].status;
        if status == TaskState::Waiting || status.is_terminal() {
            self.tasks.remove(position);
            Ok(())
        } else {
            Err(UploadTrackingError::RemoveWhileActive { id: task_id })
        }
    }

    fn clear(&mut self) -> usize {
        let n = self.tasks.len();
        self.tasks.clear();
        n
    }

    fn snapshot_all(&self) -> Vec<TaskSnapshot> {
        self.tasks.iter().map(UploadTask::snapshot).collect()
    }

    fn snapshot_one(&self, task_id: TaskId) -> Option<TaskSnapshot> {
        self.tasks.iter().find(|t| t.id == task_id).map(UploadTask::snapshot)
    }
}

/// State shared between the public tracker handle and its polling
/// sub-processes. Pollers hold this only weakly; dropping the tracker
/// cancels the root token, which tears every poller down.
pub(crate) struct TrackerShared {
    state: Mutex<UploadTrackerImpl>,
    pollers: Mutex<HashMap<TaskId, PollerHandle>>,
    client: Arc<dyn ExtractionClient>,
    events: Arc<dyn UploadEventHandler>,
    config: TrackerConfig,
    shutdown: CancellationToken,
}

impl Drop for TrackerShared {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl TrackerShared {
    /// Applies one status read outcome and tells the poller whether to keep
    /// going. Fires the terminal notification when the read resolved the task.
    pub(crate) async fn apply_poll_outcome(
        &self,
        task_id: TaskId,
        outcome: ocr_client::Result<TaskStatusResponse>,
    ) -> PollDisposition {
        let mut state = self.state.lock().await;

        match outcome {
            Ok(response) => match state.apply_status_response(task_id, response) {
                StatusApplyResult::InProgress => PollDisposition::Continue,
                StatusApplyResult::Resolved(snapshot) => {
                    info!("Task {task_id} resolved as {}", snapshot.status);
                    self.events.task_resolved(snapshot).await;
                    PollDisposition::Stop
                },
                StatusApplyResult::Ignored => PollDisposition::Stop,
            },
            Err(e) => {
                warn!("Status read for task {task_id} failed: {e}");
                if let Some(snapshot) = state.resolve_poll_failure(task_id) {
                    self.events.task_resolved(snapshot).await;
                }
                PollDisposition::Stop
            },
        }
    }

    /// Drops a finished poller's handle. A no-op when cancel or clear_all
    /// already claimed it.
    pub(crate) async fn release_poller(&self, task_id: TaskId) {
        self.pollers.lock().await.remove(&task_id);
    }
}

/// Tracks a batch of file uploads against the extraction service. Added
/// files wait locally until submitted in one multipart batch; acknowledged
/// tasks are then polled until each resolves, and every state change is
/// observable through snapshots and the event handler.
pub struct UploadTracker {
    shared: Arc<TrackerShared>,
}

impl UploadTracker {
    pub fn new(
        client: Arc<dyn ExtractionClient>,
        events: Arc<dyn UploadEventHandler>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(TrackerShared {
                state: Mutex::new(UploadTrackerImpl::default()),
                pollers: Mutex::new(HashMap::new()),
                client,
                events,
                config,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Appends one WAITING task per payload. Nothing goes on the wire until
    /// `submit_waiting`.
    pub async fn add_files(&self, payloads: Vec<UploadPayload>) -> Vec<TaskId> {
        let mut state = self.shared.state.lock().await;
        state.register_files(payloads)
    }

    /// Submits every WAITING task as one multipart batch with an optional
    /// shared destination label. With nothing WAITING this is a complete
    /// no-op. A rejected or unreachable submission fails the whole batch in
    /// place rather than surfacing an error here.
    #[instrument(skip_all, name = "UploadTracker::submit_waiting")]
    pub async fn submit_waiting(&self, destination: Option<String>) {
        let batch = {
            let mut state = self.shared.state.lock().await;
            state.take_waiting_for_submission()
        };
        if batch.is_empty() {
            debug!("No waiting tasks; nothing submitted");
            return;
        }

        let (batch_ids, payloads): (Vec<TaskId>, Vec<UploadPayload>) = batch.into_iter().unzip();
        info!("Submitting {} file(s)", batch_ids.len());

        let outcome = self.shared.client.submit_batch(payloads, destination).await;

        let mut state = self.shared.state.lock().await;
        match outcome {
            Ok(ack) => {
                let SubmissionOutcome {
                    acknowledged,
                    unacknowledged,
                } = state.apply_batch_acknowledgment(&batch_ids, ack);

                if !unacknowledged.is_empty() {
                    warn!(
                        "Batch acknowledgment left {} file(s) unacknowledged: {}",
                        unacknowledged.len(),
                        unacknowledged.join(", ")
                    );
                }

                for (task_id, server_task_id) in acknowledged {
                    self.spawn_poller(task_id, server_task_id).await;
                }
            },
            Err(e) => {
                let detail = match e {
                    OcrClientError::SubmissionRejected { status, detail } => {
                        warn!("Submission rejected with {status}: {detail}");
                        detail
                    },
                    other => {
                        warn!("Submission failed: {other}");
                        NOTE_NETWORK_ERROR.to_owned()
                    },
                };
                for snapshot in state.resolve_batch_rejected(&batch_ids, &detail) {
                    self.shared.events.task_resolved(snapshot).await;
                }
            },
        }
    }

    /// Cancels a server-acknowledged task. The task's poller is stopped
    /// before this returns, a best-effort remote cancel goes out in the
    /// background, and the task itself resolves as CANCELLED immediately.
    #[instrument(skip_all, name = "UploadTracker::cancel", fields(task = %task_id))]
    pub async fn cancel(&self, task_id: TaskId) -> Result<()> {
        let mut state = self.shared.state.lock().await;
        let (snapshot, server_task_id) = state.cancel_task(task_id)?;

        if let Some(handle) = self.shared.pollers.lock().await.remove(&task_id) {
            handle.stop();
        }

        // The remote cancel is fire and forget; its outcome is only logged.
        let client = self.shared.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.cancel_task(&server_task_id).await {
                debug!("Remote cancel for {server_task_id} failed: {e}");
            }
        });

        info!("Task {task_id} cancelled");
        self.shared.events.task_resolved(snapshot).await;
        Ok(())
    }

    /// Removes a WAITING or resolved task. An in-flight task is refused;
    /// cancel it first.
    pub async fn remove(&self, task_id: TaskId) -> Result<()> {
        let mut state = self.shared.state.lock().await;
        state.remove_task(task_id)
    }

    /// Empties the tracker: stops every poller and waits them out so no
    /// further status read can fire, discards all tasks, then reports the
    /// batch as closed.
    #[instrument(skip_all, name = "UploadTracker::clear_all")]
    pub async fn clear_all(&self) {
        let handles: Vec<PollerHandle> = {
            let mut pollers = self.shared.pollers.lock().await;
            pollers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            handle.stop();
        }
        let _ = futures::future::join_all(handles.into_iter().map(PollerHandle::into_join)).await;

        let n_tasks = {
            let mut state = self.shared.state.lock().await;
            state.clear()
        };
        info!("Cleared {n_tasks} task(s)");
        self.shared.events.batch_closed().await;
    }

    /// All tasks in insertion order.
    pub async fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.shared.state.lock().await.snapshot_all()
    }

    pub async fn task(&self, task_id: TaskId) -> Option<TaskSnapshot> {
        self.shared.state.lock().await.snapshot_one(task_id)
    }

    pub async fn len(&self) -> usize {
        self.shared.state.lock().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shared.state.lock().await.tasks.is_empty()
    }

    async fn spawn_poller(&self, task_id: TaskId, server_task_id: ServerTaskId) {
        let handle = poller::spawn(
            Arc::downgrade(&self.shared),
            self.shared.client.clone(),
            task_id,
            server_task_id,
            self.shared.config.poll_interval,
            self.shared.shutdown.child_token(),
        );
        self.shared.pollers.lock().await.insert(task_id, handle);
    }
}
