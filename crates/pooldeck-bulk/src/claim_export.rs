//! Usage-check → conflict disclosure → claim → export.
//!
//! # Design
//! - The usage check is read-only and always completes before any claim for
//!   the same batch is issued.
//! - A batch with prior claims parks in `ConflictPending` until the caller
//!   picks a [`ConflictResolution`].
//! - A failed claim never proceeds to the export step.

use std::collections::HashSet;
use std::sync::Arc;

use pooldeck_api_models::{ResourceId, ResourceKind, UsageConflict};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::ListingCache;
use crate::client::{ExportArtifact, ExportSink, ResourceClient};
use crate::error::{BulkError, BulkResult, ValidationError};

/// How the caller wants to proceed after a usage conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Drop the pending export without further calls.
    Cancel,
    /// Claim and export only the ids without prior claims.
    ExportAvailable,
    /// Claim and export the whole original batch.
    ExportAll,
}

/// Conflicts disclosed to the user for one export attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageConflictReport {
    /// Ids in the attempted batch.
    pub requested: usize,
    /// Ids with no prior claim, as counted by the server.
    pub never_used: u64,
    /// Ids with prior claims and who made them.
    pub conflicts: Vec<UsageConflict>,
    /// Batch ids without a reported conflict, in batch order.
    pub available_ids: Vec<ResourceId>,
}

impl UsageConflictReport {
    /// Build the report for `ids`, matching conflicts by id.
    ///
    /// Conflicts for ids outside the batch and repeated conflicts for one id
    /// do not shrink the available set.
    #[must_use]
    pub fn new(ids: &[ResourceId], never_used: u64, conflicts: Vec<UsageConflict>) -> Self {
        Self {
            requested: ids.len(),
            never_used,
            available_ids: without_conflicts(ids, &conflicts),
            conflicts,
        }
    }

    /// Number of ids that would be exported with [`ConflictResolution::ExportAvailable`].
    #[must_use]
    pub fn available(&self) -> usize {
        self.available_ids.len()
    }
}

/// Result of a committed export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Ids that were claimed and exported.
    pub exported_ids: Vec<ResourceId>,
    /// Ids the server reports as owned by the caller.
    pub claimed: u64,
    /// Ids whose owner changed.
    pub new_owner_assigned: u64,
    /// Artifact location, absent when nothing was left to export.
    pub artifact: Option<ExportArtifact>,
}

impl ExportReport {
    const fn empty() -> Self {
        Self {
            exported_ids: Vec::new(),
            claimed: 0,
            new_owner_assigned: 0,
            artifact: None,
        }
    }
}

/// Outcome of [`ClaimExportWorkflow::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No prior claims; the batch was claimed and exported.
    Exported(ExportReport),
    /// Prior claims found; waiting for [`ClaimExportWorkflow::resolve`].
    ConflictPending(UsageConflictReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingExport {
    ids: Vec<ResourceId>,
    report: UsageConflictReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExportState {
    Idle,
    Checking,
    ConflictPending(PendingExport),
    Exporting,
}

/// Observable phase of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    /// Nothing in flight.
    Idle,
    /// Usage check in flight.
    Checking,
    /// Waiting for a conflict decision.
    ConflictPending,
    /// Claim/export in flight.
    Exporting,
}

impl ExportPhase {
    const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking usage",
            Self::ConflictPending => "a usage conflict is pending",
            Self::Exporting => "exporting",
        }
    }
}

/// Claim/export state machine for one list view.
pub struct ClaimExportWorkflow {
    client: Arc<dyn ResourceClient>,
    sink: Arc<dyn ExportSink>,
    cache: Arc<ListingCache>,
    kind: ResourceKind,
    state: ExportState,
}

impl ClaimExportWorkflow {
    /// Build a workflow for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Unsupported`] for kinds without claim support.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        sink: Arc<dyn ExportSink>,
        cache: Arc<ListingCache>,
        kind: ResourceKind,
    ) -> BulkResult<Self> {
        if !kind.capabilities().claimable {
            return Err(ValidationError::Unsupported {
                kind: kind.plural(),
                action: "claim/export",
            }
            .into());
        }
        Ok(Self {
            client,
            sink,
            cache,
            kind,
            state: ExportState::Idle,
        })
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ExportPhase {
        match self.state {
            ExportState::Idle => ExportPhase::Idle,
            ExportState::Checking => ExportPhase::Checking,
            ExportState::ConflictPending(_) => ExportPhase::ConflictPending,
            ExportState::Exporting => ExportPhase::Exporting,
        }
    }

    /// Conflicts awaiting a decision, if any.
    #[must_use]
    pub const fn pending_conflicts(&self) -> Option<&UsageConflictReport> {
        match &self.state {
            ExportState::ConflictPending(pending) => Some(&pending.report),
            _ => None,
        }
    }

    /// Start an export of `ids`.
    ///
    /// Checking or Exporting here can only be left over from a dropped future,
    /// since `&mut self` rules out a concurrent attempt; both restart cleanly.
    pub async fn begin(&mut self, ids: Vec<ResourceId>) -> BulkResult<ExportOutcome> {
        if matches!(self.state, ExportState::ConflictPending(_)) {
            return Err(self.invalid("start a new export"));
        }
        let ids = dedup_preserving_order(ids);
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        self.state = ExportState::Checking;
        debug!(kind = %self.kind, count = ids.len(), "checking prior usage");
        let usage = match self.client.check_usage(self.kind, &ids).await {
            Ok(usage) => usage,
            Err(err) => {
                self.state = ExportState::Idle;
                return Err(err.into());
            }
        };

        if usage.already_used.is_empty() {
            return self.commit(ids).await.map(ExportOutcome::Exported);
        }

        let report = UsageConflictReport::new(&ids, usage.never_used_count, usage.already_used);
        info!(
            kind = %self.kind,
            requested = report.requested,
            conflicts = report.conflicts.len(),
            "usage conflict pending"
        );
        self.state = ExportState::ConflictPending(PendingExport {
            ids,
            report: report.clone(),
        });
        Ok(ExportOutcome::ConflictPending(report))
    }

    /// Apply the user's decision to the pending conflict.
    ///
    /// Returns `None` when the export was cancelled.
    pub async fn resolve(
        &mut self,
        resolution: ConflictResolution,
    ) -> BulkResult<Option<ExportReport>> {
        if !matches!(self.state, ExportState::ConflictPending(_)) {
            return Err(self.invalid("resolve a usage conflict"));
        }
        let ExportState::ConflictPending(pending) =
            std::mem::replace(&mut self.state, ExportState::Idle)
        else {
            return Err(self.invalid("resolve a usage conflict"));
        };

        match resolution {
            ConflictResolution::Cancel => {
                debug!(kind = %self.kind, "pending export cancelled");
                Ok(None)
            }
            ConflictResolution::ExportAvailable => {
                let available = pending.report.available_ids;
                if available.is_empty() {
                    debug!(kind = %self.kind, "every pending id has prior usage");
                    return Ok(Some(ExportReport::empty()));
                }
                self.commit(available).await.map(Some)
            }
            ConflictResolution::ExportAll => self.commit(pending.ids).await.map(Some),
        }
    }

    async fn commit(&mut self, ids: Vec<ResourceId>) -> BulkResult<ExportReport> {
        self.state = ExportState::Exporting;
        let result = self.claim_and_export(ids).await;
        self.state = ExportState::Idle;
        result
    }

    async fn claim_and_export(&self, ids: Vec<ResourceId>) -> BulkResult<ExportReport> {
        let claim = self.client.claim_ownership(self.kind, &ids).await?;
        info!(
            kind = %self.kind,
            claimed = claim.claimed,
            new_owner_assigned = claim.new_owner_assigned,
            "ownership claimed"
        );
        self.cache.invalidate().await;

        let rows = self.client.lookup(self.kind, &ids).await?;
        let artifact = self
            .sink
            .write(self.kind, &rows)
            .await
            .map_err(BulkError::Export)?;
        info!(kind = %self.kind, rows = artifact.rows, location = %artifact.location, "export written");

        Ok(ExportReport {
            exported_ids: ids,
            claimed: claim.claimed,
            new_owner_assigned: claim.new_owner_assigned,
            artifact: Some(artifact),
        })
    }

    fn invalid(&self, action: &'static str) -> BulkError {
        ValidationError::InvalidState {
            action,
            state: self.phase().label(),
        }
        .into()
    }
}

fn dedup_preserving_order(ids: Vec<ResourceId>) -> Vec<ResourceId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// `pending − conflicts`, matched by id and kept in pending order.
fn without_conflicts(pending: &[ResourceId], conflicts: &[UsageConflict]) -> Vec<ResourceId> {
    let used: HashSet<ResourceId> = conflicts.iter().map(|conflict| conflict.resource_id).collect();
    pending
        .iter()
        .copied()
        .filter(|id| !used.contains(id))
        .collect()
}
