//! Row, status and sink builders.

use std::ops::RangeInclusive;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pooldeck_api_models::{
    CheckStatus, ResourceId, ResourceKind, ResourceSummary, UsageConflict, UsageRecord,
};
use pooldeck_bulk::{ExportArtifact, ExportError, ExportSink};
use tokio::sync::Mutex;

/// Owner the fake assigns on claim.
pub const FAKE_OWNER: &str = "fake-user";

fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

/// An active, unowned row with the given natural key.
#[must_use]
pub fn resource(id: u64, natural_key: &str) -> ResourceSummary {
    ResourceSummary {
        id: ResourceId(id),
        natural_key: natural_key.to_string(),
        status: "active".to_string(),
        owner: None,
        usage_count: 0,
        tags: Vec::new(),
        created_at: fixed_time(),
    }
}

/// A proxy row keyed `10.0.<hi>.<lo>:8080`.
#[must_use]
pub fn proxy(id: u64) -> ResourceSummary {
    resource(id, &format!("10.0.{}.{}:8080", id / 256, id % 256))
}

/// Proxy rows for every id in `ids`.
#[must_use]
pub fn proxies(ids: RangeInclusive<u64>) -> Vec<ResourceSummary> {
    ids.map(proxy).collect()
}

/// A prior claim on `id` by `user`.
#[must_use]
pub fn usage_conflict(id: u64, user: &str) -> UsageConflict {
    UsageConflict {
        resource_id: ResourceId(id),
        usage_count: 1,
        users: vec![UsageRecord {
            id: 7,
            name: user.to_string(),
            used_at: fixed_time(),
        }],
    }
}

/// Status of a running job.
#[must_use]
pub fn running_status(total: u64, checked: u64) -> CheckStatus {
    CheckStatus {
        is_running: true,
        total,
        checked,
        active: checked,
        dead: 0,
        started_at: Some(fixed_time()),
    }
}

/// Status of a finished job.
#[must_use]
pub fn finished_status(total: u64, active: u64, dead: u64) -> CheckStatus {
    CheckStatus {
        is_running: false,
        total,
        checked: active + dead,
        active,
        dead,
        started_at: None,
    }
}

/// Export sink that keeps written rows in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<Vec<ResourceId>>>,
    failure: Option<String>,
}

impl RecordingSink {
    /// Sink that accepts every write.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects every write with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            writes: Mutex::default(),
            failure: Some(message.to_string()),
        }
    }

    /// Ids of each accepted write, in order.
    pub async fn writes(&self) -> Vec<Vec<ResourceId>> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl ExportSink for RecordingSink {
    async fn write(
        &self,
        kind: ResourceKind,
        rows: &[ResourceSummary],
    ) -> Result<ExportArtifact, ExportError> {
        if let Some(message) = &self.failure {
            return Err(ExportError::Write {
                location: format!("memory://{kind}"),
                source: std::io::Error::other(message.clone()),
            });
        }
        let mut writes = self.writes.lock().await;
        writes.push(rows.iter().map(|row| row.id).collect());
        Ok(ExportArtifact {
            location: format!("memory://{kind}/{}", writes.len()),
            rows: rows.len(),
        })
    }
}
