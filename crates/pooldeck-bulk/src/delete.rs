//! Bulk delete across kinds with and without a batch endpoint.

use std::sync::Arc;

use futures_util::future::join_all;
use pooldeck_api_models::{FailedItem, ResourceId, ResourceKind};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::ListingCache;
use crate::client::ResourceClient;
use crate::error::{BulkResult, ValidationError};

/// Per-item result of a bulk delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Number of resources deleted.
    pub deleted: u64,
    /// Resources that could not be deleted.
    pub failed: Vec<FailedItem>,
}

impl DeleteReport {
    /// Whether every requested id was deleted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes resources, preferring the batch endpoint.
pub struct BulkDeleter {
    client: Arc<dyn ResourceClient>,
    cache: Arc<ListingCache>,
}

impl BulkDeleter {
    /// Construct a deleter sharing the listing cache.
    #[must_use]
    pub fn new(client: Arc<dyn ResourceClient>, cache: Arc<ListingCache>) -> Self {
        Self { client, cache }
    }

    /// Delete `ids`.
    ///
    /// Kinds without a batch endpoint get one concurrent request per id; every
    /// request settles before the report is built and succeeded deletes are
    /// never rolled back.
    pub async fn delete(&self, kind: ResourceKind, ids: &[ResourceId]) -> BulkResult<DeleteReport> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let report = if kind.capabilities().batch_delete {
            let response = self.client.bulk_delete(kind, ids).await?;
            DeleteReport {
                deleted: response.deleted,
                failed: response.failed,
            }
        } else {
            self.fan_out(kind, ids).await
        };

        if report.deleted > 0 {
            self.cache.invalidate().await;
        }
        if report.is_complete() {
            info!(%kind, deleted = report.deleted, "bulk delete finished");
        } else {
            warn!(
                %kind,
                deleted = report.deleted,
                failed = report.failed.len(),
                "bulk delete partially failed"
            );
        }
        Ok(report)
    }

    async fn fan_out(&self, kind: ResourceKind, ids: &[ResourceId]) -> DeleteReport {
        let client = self.client.as_ref();
        let results = join_all(ids.iter().map(|id| async move {
            (*id, client.delete(kind, *id).await)
        }))
        .await;

        let mut deleted = 0_u64;
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => deleted += 1,
                Err(err) => failed.push(FailedItem {
                    id,
                    error: err.to_string(),
                }),
            }
        }
        DeleteReport { deleted, failed }
    }
}
