//! Scriptable in-memory [`ResourceClient`].
//!
//! Every call is recorded before failure injection is consulted, so suites can
//! assert on ordering and on calls that failed.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use pooldeck_api_models::{
    BulkCreateRequest, BulkCreateResponse, BulkDeleteResponse, CheckStartResponse, CheckStatus,
    ClaimResponse, FailedItem, ListFilter, ListPage, PageMeta, ResourceId, ResourceKind,
    ResourceSummary, StopCheckResponse, SyncCheckResponse, SyncCheckResult, UsageCheckResponse,
    UsageConflict,
};
use pooldeck_bulk::{ClientError, ClientResult, ResourceClient};
use tokio::sync::Mutex;

use crate::fixtures::{FAKE_OWNER, finished_status};

/// Operations the fake can record and fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOperation {
    /// `list`
    List,
    /// `lookup`
    Lookup,
    /// `check_usage`
    CheckUsage,
    /// `claim_ownership`
    Claim,
    /// `bulk_create`
    BulkCreate,
    /// `bulk_delete`
    BulkDelete,
    /// `delete`
    Delete,
    /// `check_all`
    CheckAll,
    /// `check_selected`
    CheckSelected,
    /// `check_status`
    CheckStatus,
    /// `stop_check`
    StopCheck,
    /// `check_batch`
    CheckBatch,
}

impl FakeOperation {
    const fn label(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Lookup => "lookup",
            Self::CheckUsage => "usage check",
            Self::Claim => "claim",
            Self::BulkCreate => "bulk create",
            Self::BulkDelete => "bulk delete",
            Self::Delete => "delete",
            Self::CheckAll => "check all",
            Self::CheckSelected => "check selected",
            Self::CheckStatus => "check status",
            Self::StopCheck => "stop check",
            Self::CheckBatch => "check batch",
        }
    }
}

/// A call received by [`FakeResourceClient`], with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// `list`
    List {
        /// Kind requested.
        kind: ResourceKind,
        /// Filter forwarded.
        filter: ListFilter,
        /// 1-based page.
        page: u32,
        /// Page size.
        page_size: u32,
    },
    /// `lookup`
    Lookup {
        /// Kind requested.
        kind: ResourceKind,
        /// Ids requested.
        ids: Vec<ResourceId>,
    },
    /// `check_usage`
    CheckUsage {
        /// Kind requested.
        kind: ResourceKind,
        /// Ids checked.
        ids: Vec<ResourceId>,
    },
    /// `claim_ownership`
    Claim {
        /// Kind requested.
        kind: ResourceKind,
        /// Ids claimed.
        ids: Vec<ResourceId>,
    },
    /// `bulk_create`
    BulkCreate {
        /// Kind requested.
        kind: ResourceKind,
        /// Request body.
        request: BulkCreateRequest,
    },
    /// `bulk_delete`
    BulkDelete {
        /// Kind requested.
        kind: ResourceKind,
        /// Ids deleted.
        ids: Vec<ResourceId>,
    },
    /// `delete`
    Delete {
        /// Kind requested.
        kind: ResourceKind,
        /// Id deleted.
        id: ResourceId,
    },
    /// `check_all`
    CheckAll {
        /// Kind requested.
        kind: ResourceKind,
        /// Filter forwarded.
        filter: ListFilter,
    },
    /// `check_selected`
    CheckSelected {
        /// Kind requested.
        kind: ResourceKind,
        /// Ids scheduled.
        ids: Vec<ResourceId>,
    },
    /// `check_status`
    CheckStatus {
        /// Kind requested.
        kind: ResourceKind,
    },
    /// `stop_check`
    StopCheck {
        /// Kind requested.
        kind: ResourceKind,
    },
    /// `check_batch`
    CheckBatch {
        /// Kind requested.
        kind: ResourceKind,
        /// Ids checked.
        ids: Vec<ResourceId>,
    },
}

impl RecordedCall {
    /// Operation this call belongs to.
    #[must_use]
    pub const fn operation(&self) -> FakeOperation {
        match self {
            Self::List { .. } => FakeOperation::List,
            Self::Lookup { .. } => FakeOperation::Lookup,
            Self::CheckUsage { .. } => FakeOperation::CheckUsage,
            Self::Claim { .. } => FakeOperation::Claim,
            Self::BulkCreate { .. } => FakeOperation::BulkCreate,
            Self::BulkDelete { .. } => FakeOperation::BulkDelete,
            Self::Delete { .. } => FakeOperation::Delete,
            Self::CheckAll { .. } => FakeOperation::CheckAll,
            Self::CheckSelected { .. } => FakeOperation::CheckSelected,
            Self::CheckStatus { .. } => FakeOperation::CheckStatus,
            Self::StopCheck { .. } => FakeOperation::StopCheck,
            Self::CheckBatch { .. } => FakeOperation::CheckBatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Always,
    Times(u32),
}

#[derive(Debug, Default)]
struct FakeState {
    resources: Vec<ResourceSummary>,
    growth: Vec<ResourceSummary>,
    usage: HashMap<ResourceId, UsageConflict>,
    create_responses: VecDeque<BulkCreateResponse>,
    statuses: VecDeque<CheckStatus>,
    failures: HashMap<FakeOperation, Failure>,
    failing_deletes: HashSet<ResourceId>,
    calls: Vec<RecordedCall>,
}

impl FakeState {
    fn record(&mut self, call: RecordedCall) -> ClientResult<()> {
        let operation = call.operation();
        self.calls.push(call);
        match self.failures.get(&operation).copied() {
            None => Ok(()),
            Some(Failure::Always) => Err(injected(operation)),
            Some(Failure::Times(remaining)) => {
                if remaining <= 1 {
                    self.failures.remove(&operation);
                } else {
                    self.failures
                        .insert(operation, Failure::Times(remaining - 1));
                }
                Err(injected(operation))
            }
        }
    }

    fn matching(&self, filter: &ListFilter) -> Vec<ResourceSummary> {
        self.resources
            .iter()
            .filter(|row| {
                filter
                    .status
                    .as_deref()
                    .is_none_or(|status| row.status == status)
                    && filter
                        .search
                        .as_deref()
                        .is_none_or(|needle| row.natural_key.contains(needle))
                    && filter
                        .tag
                        .as_deref()
                        .is_none_or(|tag| row.tags.iter().any(|candidate| candidate == tag))
                    && filter
                        .owner
                        .as_deref()
                        .is_none_or(|owner| row.owner.as_deref() == Some(owner))
            })
            .cloned()
            .collect()
    }
}

fn injected(operation: FakeOperation) -> ClientError {
    ClientError::Remote {
        operation: operation.label(),
        status: 500,
        detail: "injected failure".to_string(),
    }
}

/// In-memory stand-in for the remote resource API.
#[derive(Debug, Default)]
pub struct FakeResourceClient {
    state: Mutex<FakeState>,
}

impl FakeResourceClient {
    /// Empty fake: no rows, no usage, a finished check status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the listed rows.
    #[must_use]
    pub fn with_resources(mut self, rows: Vec<ResourceSummary>) -> Self {
        self.state.get_mut().resources = rows;
        self
    }

    /// Rows appended to the listing after page 1 is served once.
    #[must_use]
    pub fn with_growth_after_first_page(mut self, rows: Vec<ResourceSummary>) -> Self {
        self.state.get_mut().growth = rows;
        self
    }

    /// Report `conflict` from the usage check.
    #[must_use]
    pub fn with_usage(mut self, conflict: UsageConflict) -> Self {
        self.state
            .get_mut()
            .usage
            .insert(conflict.resource_id, conflict);
        self
    }

    /// Queue a bulk-create response; unqueued calls report every line created.
    #[must_use]
    pub fn with_create_response(mut self, response: BulkCreateResponse) -> Self {
        self.state.get_mut().create_responses.push_back(response);
        self
    }

    /// Script check statuses; the last one repeats.
    #[must_use]
    pub fn with_statuses(mut self, statuses: Vec<CheckStatus>) -> Self {
        self.state.get_mut().statuses = statuses.into();
        self
    }

    /// Make deletes of `id` fail.
    #[must_use]
    pub fn with_failing_delete(mut self, id: ResourceId) -> Self {
        self.state.get_mut().failing_deletes.insert(id);
        self
    }

    /// Fail every call to `operation` with a 500.
    #[must_use]
    pub fn failing(mut self, operation: FakeOperation) -> Self {
        self.state
            .get_mut()
            .failures
            .insert(operation, Failure::Always);
        self
    }

    /// Fail the next `times` calls to `operation`.
    pub async fn fail_times(&self, operation: FakeOperation, times: u32) {
        if times > 0 {
            self.state
                .lock()
                .await
                .failures
                .insert(operation, Failure::Times(times));
        }
    }

    /// Replace the scripted check statuses.
    pub async fn set_statuses(&self, statuses: Vec<CheckStatus>) {
        self.state.lock().await.statuses = statuses.into();
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls to `operation`, in order.
    pub async fn calls_of(&self, operation: FakeOperation) -> Vec<RecordedCall> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    /// Number of calls to `operation`.
    pub async fn count(&self, operation: FakeOperation) -> usize {
        self.calls_of(operation).await.len()
    }

    /// Number of calls of any kind.
    pub async fn total_calls(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Current rows, including deletions and ownership changes.
    pub async fn resources(&self) -> Vec<ResourceSummary> {
        self.state.lock().await.resources.clone()
    }
}

#[async_trait]
impl ResourceClient for FakeResourceClient {
    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ListPage<ResourceSummary>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::List {
            kind,
            filter: filter.clone(),
            page,
            page_size,
        })?;

        let rows = state.matching(filter);
        let size = page_size.max(1) as usize;
        let total = rows.len();
        let total_pages = u32::try_from(total.div_ceil(size).max(1)).unwrap_or(u32::MAX);
        let start = (page.max(1) as usize - 1).saturating_mul(size);
        let items: Vec<_> = rows.into_iter().skip(start).take(size).collect();

        if page <= 1 && !state.growth.is_empty() {
            let growth = std::mem::take(&mut state.growth);
            state.resources.extend(growth);
        }

        Ok(ListPage {
            items,
            meta: PageMeta {
                page,
                total_pages,
                total: total as u64,
            },
        })
    }

    async fn lookup(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<Vec<ResourceSummary>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::Lookup {
            kind,
            ids: ids.to_vec(),
        })?;
        Ok(ids
            .iter()
            .filter_map(|id| state.resources.iter().find(|row| row.id == *id).cloned())
            .collect())
    }

    async fn check_usage(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<UsageCheckResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::CheckUsage {
            kind,
            ids: ids.to_vec(),
        })?;
        let already_used: Vec<UsageConflict> = ids
            .iter()
            .filter_map(|id| state.usage.get(id).cloned())
            .collect();
        Ok(UsageCheckResponse {
            never_used_count: (ids.len() - already_used.len()) as u64,
            already_used,
        })
    }

    async fn claim_ownership(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<ClaimResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::Claim {
            kind,
            ids: ids.to_vec(),
        })?;
        let mut new_owner_assigned = 0;
        for row in &mut state.resources {
            if ids.contains(&row.id) && row.owner.as_deref() != Some(FAKE_OWNER) {
                row.owner = Some(FAKE_OWNER.to_string());
                new_owner_assigned += 1;
            }
        }
        Ok(ClaimResponse {
            claimed: ids.len() as u64,
            new_owner_assigned,
        })
    }

    async fn bulk_create(
        &self,
        kind: ResourceKind,
        request: &BulkCreateRequest,
    ) -> ClientResult<BulkCreateResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::BulkCreate {
            kind,
            request: request.clone(),
        })?;
        Ok(state
            .create_responses
            .pop_front()
            .unwrap_or_else(|| BulkCreateResponse {
                created: request
                    .raw
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .count() as u64,
                ..BulkCreateResponse::default()
            }))
    }

    async fn bulk_delete(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<BulkDeleteResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::BulkDelete {
            kind,
            ids: ids.to_vec(),
        })?;
        let mut failed = Vec::new();
        let before = state.resources.len();
        let failing = state.failing_deletes.clone();
        state
            .resources
            .retain(|row| !ids.contains(&row.id) || failing.contains(&row.id));
        for id in ids.iter().filter(|id| failing.contains(id)) {
            failed.push(FailedItem {
                id: *id,
                error: "delete refused".to_string(),
            });
        }
        Ok(BulkDeleteResponse {
            deleted: (before - state.resources.len()) as u64,
            failed,
        })
    }

    async fn delete(&self, kind: ResourceKind, id: ResourceId) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::Delete { kind, id })?;
        if state.failing_deletes.contains(&id) {
            return Err(ClientError::Remote {
                operation: FakeOperation::Delete.label(),
                status: 409,
                detail: "delete refused".to_string(),
            });
        }
        state.resources.retain(|row| row.id != id);
        Ok(())
    }

    async fn check_all(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> ClientResult<CheckStartResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::CheckAll {
            kind,
            filter: filter.clone(),
        })?;
        let total = state.matching(filter).len() as u64;
        Ok(CheckStartResponse {
            total,
            message: format!("checking {total} {}", kind.plural()),
        })
    }

    async fn check_selected(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<CheckStartResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::CheckSelected {
            kind,
            ids: ids.to_vec(),
        })?;
        Ok(CheckStartResponse {
            total: ids.len() as u64,
            message: format!("checking {} {}", ids.len(), kind.plural()),
        })
    }

    async fn check_status(&self, kind: ResourceKind) -> ClientResult<CheckStatus> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::CheckStatus { kind })?;
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };
        Ok(status.unwrap_or_else(|| finished_status(0, 0, 0)))
    }

    async fn stop_check(&self, kind: ResourceKind) -> ClientResult<StopCheckResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::StopCheck { kind })?;
        Ok(StopCheckResponse {
            message: "check job stopped".to_string(),
        })
    }

    async fn check_batch(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<SyncCheckResponse> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::CheckBatch {
            kind,
            ids: ids.to_vec(),
        })?;
        let results = ids
            .iter()
            .map(|id| match state.resources.iter().find(|row| row.id == *id) {
                Some(row) if row.status == "active" => SyncCheckResult {
                    id: *id,
                    alive: true,
                    latency_ms: Some(42),
                    error: None,
                },
                Some(_) => SyncCheckResult {
                    id: *id,
                    alive: false,
                    latency_ms: None,
                    error: Some("connection refused".to_string()),
                },
                None => SyncCheckResult {
                    id: *id,
                    alive: false,
                    latency_ms: None,
                    error: Some("not found".to_string()),
                },
            })
            .collect();
        Ok(SyncCheckResponse { results })
    }
}
