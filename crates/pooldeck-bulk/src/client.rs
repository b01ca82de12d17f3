//! Remote collaborator seams: the resource API and the export sink.

use async_trait::async_trait;
use pooldeck_api_models::{
    BulkCreateRequest, BulkCreateResponse, BulkDeleteResponse, CheckStartResponse, CheckStatus,
    ClaimResponse, ListFilter, ListPage, ResourceId, ResourceKind, ResourceSummary,
    StopCheckResponse, SyncCheckResponse, UsageCheckResponse,
};
use serde::Serialize;

use crate::error::{ClientResult, ExportError};

/// Typed access to the remote resource API.
///
/// Implementations only serialize and transport; every decision lives in the
/// workflows that call them.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch one page of resources matching `filter`.
    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ListPage<ResourceSummary>>;

    /// Fetch the rows for a set of ids.
    async fn lookup(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<Vec<ResourceSummary>>;

    /// Report which ids have prior claims. Must not create ownership records.
    async fn check_usage(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<UsageCheckResponse>;

    /// Record the caller as owner of `ids`. Idempotent per id.
    async fn claim_ownership(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<ClaimResponse>;

    /// Submit a raw bulk-create batch.
    async fn bulk_create(
        &self,
        kind: ResourceKind,
        request: &BulkCreateRequest,
    ) -> ClientResult<BulkCreateResponse>;

    /// Delete many resources through the dedicated batch endpoint.
    async fn bulk_delete(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<BulkDeleteResponse>;

    /// Delete a single resource.
    async fn delete(&self, kind: ResourceKind, id: ResourceId) -> ClientResult<()>;

    /// Start a check job over everything matching `filter`.
    async fn check_all(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> ClientResult<CheckStartResponse>;

    /// Start a check job over `ids`.
    async fn check_selected(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<CheckStartResponse>;

    /// Read the current check job status.
    async fn check_status(&self, kind: ResourceKind) -> ClientResult<CheckStatus>;

    /// Stop the running check job. Idempotent.
    async fn stop_check(&self, kind: ResourceKind) -> ClientResult<StopCheckResponse>;

    /// Check a small batch synchronously.
    async fn check_batch(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<SyncCheckResponse>;
}

/// Where an export artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    /// Sink-specific location (file path, object key).
    pub location: String,
    /// Number of rows written.
    pub rows: usize,
}

/// Encodes exported rows into an artifact.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Persist `rows` as one artifact.
    async fn write(
        &self,
        kind: ResourceKind,
        rows: &[ResourceSummary],
    ) -> Result<ExportArtifact, ExportError>;
}
