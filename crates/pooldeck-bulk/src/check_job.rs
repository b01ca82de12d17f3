//! Server-side check jobs and the small synchronous check path.
//!
//! # Design
//! - Starting a job hands the batch to the server and clears the local
//!   selection.
//! - Progress is mirrored by a single cancellable poll task; a new poll loop
//!   always cancels the previous one.
//! - The poll task ends itself when the server reports `is_running = false`.
//! - The synchronous path refuses oversized batches without a network call.

use std::sync::Arc;
use std::time::Duration;

use pooldeck_api_models::{
    CheckStartResponse, CheckStatus, ListFilter, ResourceId, ResourceKind, StopCheckResponse,
    SyncCheckResponse,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::ListingCache;
use crate::client::ResourceClient;
use crate::error::{BulkError, BulkResult, ClientResult, ValidationError};
use crate::selection::SelectionModel;

/// Fixed delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Largest batch accepted by the synchronous check path.
pub const SYNC_CHECK_CAP: usize = 10;

/// Poll loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between status requests; the first request is immediate.
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
        }
    }
}

/// Admission limits for synchronous checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckLimits {
    /// Maximum ids per synchronous check, never above [`SYNC_CHECK_CAP`].
    pub sync_cap: usize,
}

impl Default for CheckLimits {
    fn default() -> Self {
        Self {
            sync_cap: SYNC_CHECK_CAP,
        }
    }
}

/// Final counts of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    /// Resources scheduled.
    pub total: u64,
    /// Resources checked.
    pub checked: u64,
    /// Resources found alive.
    pub active: u64,
    /// Resources found dead.
    pub dead: u64,
}

impl From<&CheckStatus> for CheckSummary {
    fn from(status: &CheckStatus) -> Self {
        Self {
            total: status.total,
            checked: status.checked,
            active: status.active,
            dead: status.dead,
        }
    }
}

/// What the poll task last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMirror {
    /// No status received yet.
    Waiting,
    /// Latest status of a running job.
    Running(CheckStatus),
    /// The job finished; the poll task has exited.
    Finished(CheckSummary),
}

/// Handle to a running poll task.
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
    mirror: watch::Receiver<JobMirror>,
}

impl PollHandle {
    /// Stop polling. Safe to call repeatedly and after the task has finished.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Latest observation.
    #[must_use]
    pub fn mirror(&self) -> JobMirror {
        self.mirror.borrow().clone()
    }

    /// Wait for the next observation. `None` once the task is gone.
    pub async fn changed(&mut self) -> Option<JobMirror> {
        self.mirror.changed().await.ok()?;
        Some(self.mirror.borrow_and_update().clone())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the status poll loop for `kind`.
///
/// The first request goes out immediately, then one every `options.interval`.
/// A failed request is logged and retried on the next tick. When a response
/// reports `is_running = false` the listing cache is invalidated, the summary
/// is published and the task exits.
#[must_use]
pub fn spawn_poller(
    client: Arc<dyn ResourceClient>,
    cache: Arc<ListingCache>,
    kind: ResourceKind,
    options: PollOptions,
) -> PollHandle {
    let (sender, mirror) = watch::channel(JobMirror::Waiting);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match client.check_status(kind).await {
                Ok(status) if status.is_running => {
                    debug!(
                        %kind,
                        total = status.total,
                        checked = status.checked,
                        "check job progress"
                    );
                    sender.send_replace(JobMirror::Running(status));
                }
                Ok(status) => {
                    let summary = CheckSummary::from(&status);
                    cache.invalidate().await;
                    info!(
                        %kind,
                        total = summary.total,
                        active = summary.active,
                        dead = summary.dead,
                        "check job finished"
                    );
                    sender.send_replace(JobMirror::Finished(summary));
                    break;
                }
                Err(err) => {
                    warn!(%kind, error = %err, "check status poll failed");
                }
            }
        }
    });
    PollHandle { task, mirror }
}

/// Progress event surfaced by [`CheckJobController::next_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    /// The job is still running.
    Progress(CheckStatus),
    /// The job finished; the controller is idle again.
    Finished(CheckSummary),
}

/// Observable phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPhase {
    /// No job tracked.
    Idle,
    /// Start request in flight.
    Starting,
    /// Poll loop active.
    Polling,
    /// Stop request in flight.
    StoppingRequested,
}

impl CheckPhase {
    const fn label(self) -> &'static str {
        match self {
            Self::Idle => "no check job is running",
            Self::Starting => "a check job is starting",
            Self::Polling => "a check job is running",
            Self::StoppingRequested => "a stop was requested",
        }
    }
}

/// Check-job state machine for one list view.
pub struct CheckJobController {
    client: Arc<dyn ResourceClient>,
    cache: Arc<ListingCache>,
    kind: ResourceKind,
    options: PollOptions,
    limits: CheckLimits,
    phase: CheckPhase,
    poll: Option<PollHandle>,
}

impl CheckJobController {
    /// Build a controller for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Unsupported`] for kinds without checks.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        cache: Arc<ListingCache>,
        kind: ResourceKind,
        options: PollOptions,
        limits: CheckLimits,
    ) -> BulkResult<Self> {
        if !kind.capabilities().checkable {
            return Err(ValidationError::Unsupported {
                kind: kind.plural(),
                action: "checks",
            }
            .into());
        }
        Ok(Self {
            client,
            cache,
            kind,
            options,
            limits,
            phase: CheckPhase::Idle,
            poll: None,
        })
    }

    /// Current phase, folding in a poll task that finished on its own.
    #[must_use]
    pub fn phase(&self) -> CheckPhase {
        match (&self.poll, self.phase) {
            (Some(poll), CheckPhase::Polling)
                if matches!(poll.mirror(), JobMirror::Finished(_)) =>
            {
                CheckPhase::Idle
            }
            _ => self.phase,
        }
    }

    /// Latest status of the running job, or `None` when idle.
    #[must_use]
    pub fn mirror(&self) -> Option<CheckStatus> {
        match self.poll.as_ref()?.mirror() {
            JobMirror::Running(status) => Some(status),
            JobMirror::Waiting | JobMirror::Finished(_) => None,
        }
    }

    /// Start a job over everything matching `filter`.
    pub async fn start_all(
        &mut self,
        filter: &ListFilter,
        selection: &mut SelectionModel<ResourceId>,
    ) -> BulkResult<CheckStartResponse> {
        self.enter_starting("start a check job")?;
        let result = self.client.check_all(self.kind, filter).await;
        self.finish_start(result, selection)
    }

    /// Start a job over `ids`. No size cap applies on this path.
    pub async fn start_selected(
        &mut self,
        ids: &[ResourceId],
        selection: &mut SelectionModel<ResourceId>,
    ) -> BulkResult<CheckStartResponse> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        self.enter_starting("start a check job")?;
        let result = self.client.check_selected(self.kind, ids).await;
        self.finish_start(result, selection)
    }

    /// Attach to a job that is already running server-side.
    ///
    /// Returns the observed status when a job is running.
    pub async fn resume_if_running(&mut self) -> BulkResult<Option<CheckStatus>> {
        self.reap_finished();
        if self.phase != CheckPhase::Idle {
            return Ok(self.mirror());
        }
        let status = self.client.check_status(self.kind).await?;
        if !status.is_running {
            return Ok(None);
        }
        self.begin_polling();
        Ok(Some(status))
    }

    /// Wait for the next progress event. `None` when nothing is being polled.
    pub async fn next_update(&mut self) -> Option<JobUpdate> {
        let poll = self.poll.as_mut()?;
        if let JobMirror::Finished(summary) = poll.mirror() {
            self.teardown_poll();
            return Some(JobUpdate::Finished(summary));
        }
        loop {
            match poll.changed().await {
                Some(JobMirror::Running(status)) => return Some(JobUpdate::Progress(status)),
                Some(JobMirror::Finished(summary)) => {
                    self.teardown_poll();
                    return Some(JobUpdate::Finished(summary));
                }
                Some(JobMirror::Waiting) => {}
                None => {
                    self.teardown_poll();
                    return None;
                }
            }
        }
    }

    /// Stop the running job.
    ///
    /// Once the server acknowledges, polling stops and the mirror is cleared
    /// without waiting for another status response.
    pub async fn stop(&mut self) -> BulkResult<StopCheckResponse> {
        self.reap_finished();
        if self.phase != CheckPhase::Polling {
            return Err(self.invalid("stop the check job"));
        }
        self.phase = CheckPhase::StoppingRequested;
        match self.client.stop_check(self.kind).await {
            Ok(response) => {
                info!(kind = %self.kind, message = %response.message, "check job stopped");
                self.teardown_poll();
                self.cache.invalidate().await;
                Ok(response)
            }
            Err(err) => {
                self.phase = CheckPhase::Polling;
                Err(err.into())
            }
        }
    }

    /// Check a small batch synchronously.
    pub async fn check_now(&self, ids: &[ResourceId]) -> BulkResult<SyncCheckResponse> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let cap = self.limits.sync_cap.min(SYNC_CHECK_CAP);
        if ids.len() > cap {
            return Err(ValidationError::CheckBatchTooLarge {
                requested: ids.len(),
                cap,
            }
            .into());
        }
        let response = self.client.check_batch(self.kind, ids).await?;
        let alive = response.results.iter().filter(|result| result.alive).count();
        info!(kind = %self.kind, checked = response.results.len(), alive, "synchronous check finished");
        Ok(response)
    }

    /// Cancel polling unconditionally. Call when the owning view goes away.
    pub fn teardown(&mut self) {
        self.teardown_poll();
    }

    fn enter_starting(&mut self, action: &'static str) -> BulkResult<()> {
        self.reap_finished();
        if self.phase != CheckPhase::Idle {
            return Err(self.invalid(action));
        }
        self.phase = CheckPhase::Starting;
        Ok(())
    }

    fn finish_start(
        &mut self,
        result: ClientResult<CheckStartResponse>,
        selection: &mut SelectionModel<ResourceId>,
    ) -> BulkResult<CheckStartResponse> {
        match result {
            Ok(response) => {
                info!(kind = %self.kind, total = response.total, "check job started");
                selection.clear();
                self.begin_polling();
                Ok(response)
            }
            Err(err) => {
                self.phase = CheckPhase::Idle;
                Err(err.into())
            }
        }
    }

    fn begin_polling(&mut self) {
        self.teardown_poll();
        self.poll = Some(spawn_poller(
            Arc::clone(&self.client),
            Arc::clone(&self.cache),
            self.kind,
            self.options,
        ));
        self.phase = CheckPhase::Polling;
    }

    fn reap_finished(&mut self) {
        if matches!(
            self.poll.as_ref().map(PollHandle::mirror),
            Some(JobMirror::Finished(_))
        ) {
            self.teardown_poll();
        }
    }

    fn teardown_poll(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
        self.phase = CheckPhase::Idle;
    }

    fn invalid(&self, action: &'static str) -> BulkError {
        ValidationError::InvalidState {
            action,
            state: self.phase().label(),
        }
        .into()
    }
}

impl Drop for CheckJobController {
    fn drop(&mut self) {
        self.teardown_poll();
    }
}
