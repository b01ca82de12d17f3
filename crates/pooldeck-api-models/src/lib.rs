#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
//! Shared HTTP DTOs for the Pooldeck resource API.
//!
//! These types are re-used by the bulk engine and the CLI for request/response
//! encoding so the wire contract has a single definition. Field names are
//! `snake_case` on the wire.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
}

/// Server-assigned identifier of a pooled resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl Display for ResourceId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<u64>().map(Self)
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Resource pools managed by the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Outbound proxies identified by `host:port`.
    Proxy,
    /// Mailbox credentials identified by address.
    EmailAccount,
    /// Tracked websites.
    Website,
    /// Automation tools.
    Tool,
    /// Inbound service requests.
    ServiceRequest,
}

/// Which bulk endpoints the server exposes for a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct KindCapabilities {
    /// A dedicated batch-delete endpoint with structured partial results exists.
    pub batch_delete: bool,
    /// Liveness checks (job and synchronous) are available.
    pub checkable: bool,
    /// Usage-check and claim-ownership are available.
    pub claimable: bool,
    /// Bulk-create reports soft-deleted natural-key collisions.
    pub trash_detection: bool,
}

impl ResourceKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 5] = [
        Self::Proxy,
        Self::EmailAccount,
        Self::Website,
        Self::Tool,
        Self::ServiceRequest,
    ];

    /// URL path segment under `/v1/`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Proxy => "proxies",
            Self::EmailAccount => "email-accounts",
            Self::Website => "websites",
            Self::Tool => "tools",
            Self::ServiceRequest => "service-requests",
        }
    }

    /// Human-readable plural label.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Proxy => "proxies",
            Self::EmailAccount => "email accounts",
            Self::Website => "websites",
            Self::Tool => "tools",
            Self::ServiceRequest => "service requests",
        }
    }

    /// Endpoint availability for this kind.
    #[must_use]
    pub const fn capabilities(self) -> KindCapabilities {
        match self {
            Self::Proxy => KindCapabilities {
                batch_delete: true,
                checkable: true,
                claimable: true,
                trash_detection: true,
            },
            Self::EmailAccount => KindCapabilities {
                batch_delete: false,
                checkable: true,
                claimable: true,
                trash_detection: true,
            },
            Self::Website | Self::Tool | Self::ServiceRequest => KindCapabilities {
                batch_delete: true,
                checkable: false,
                claimable: false,
                trash_detection: false,
            },
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.path_segment())
    }
}

/// Listing filter shared by page fetches, id enumeration and "check all".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Free-text search over the natural key and notes.
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Status label (for example `active`, `dead`, `unchecked`).
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Tag name.
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Owning user name.
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Protocol (proxies only).
    pub protocol: Option<String>,
}

impl ListFilter {
    /// Non-empty filter fields as URL query pairs.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("search", self.search.as_deref()),
            ("status", self.status.as_deref()),
            ("tag", self.tag.as_deref()),
            ("owner", self.owner.as_deref()),
            ("protocol", self.protocol.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        })
        .collect()
    }

    /// True when no field narrows the listing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }
}

/// Pagination block returned alongside every listing page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PageMeta {
    /// One-based page number that was served.
    pub page: u32,
    /// Number of pages matching the filter at the time of the request.
    pub total_pages: u32,
    /// Number of items matching the filter at the time of the request.
    pub total: u64,
}

/// One page of a resource listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListPage<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    #[serde(rename = "pagination")]
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Row returned by listings and lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Resource identifier.
    pub id: ResourceId,
    /// Natural key (for example `host:port` or a mailbox address).
    pub natural_key: String,
    /// Status label.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Current owner, when claimed.
    pub owner: Option<String>,
    #[serde(default)]
    /// Number of times the resource has been claimed.
    pub usage_count: u32,
    #[serde(default)]
    /// Tags applied to the resource.
    pub tags: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Body carrying a plain id list (usage check, claim, lookup, delete, check).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IdsRequest {
    /// Target resource ids.
    pub ids: Vec<ResourceId>,
}

impl IdsRequest {
    /// Build a request from a borrowed id slice.
    #[must_use]
    pub fn from_slice(ids: &[ResourceId]) -> Self {
        Self { ids: ids.to_vec() }
    }
}

/// A previous claim of a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageRecord {
    /// Claiming user id.
    pub id: u64,
    /// Claiming user display name.
    pub name: String,
    /// When the claim happened.
    pub used_at: DateTime<Utc>,
}

/// Resource reported as already used during a usage check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageConflict {
    /// Resource that has prior claims.
    pub resource_id: ResourceId,
    /// Number of prior claims (at least one).
    pub usage_count: u32,
    #[serde(default)]
    /// Prior claimants, oldest first.
    pub users: Vec<UsageRecord>,
}

/// Response of the read-only usage check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UsageCheckResponse {
    /// Number of submitted ids with no prior claim.
    pub never_used_count: u64,
    #[serde(default)]
    /// Submitted ids with prior claims.
    pub already_used: Vec<UsageConflict>,
}

/// Response of claim-ownership.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ClaimResponse {
    /// Number of ids now owned by the caller.
    pub claimed: u64,
    /// Number of ids whose owner changed as a result of this call.
    pub new_owner_assigned: u64,
}

/// Directive for soft-deleted natural-key collisions on bulk create.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandleTrashed {
    /// Revive the trashed record with the newly supplied attributes.
    Restore,
    /// Permanently destroy the trashed record and create a new one.
    Replace,
}

/// Creation options applied to every line of a bulk-create batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BulkCreateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Resource subtype (for example `residential` or `datacenter`).
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Protocol (for example `http`, `socks5`).
    pub protocol: Option<String>,
    #[serde(default)]
    /// Tags applied to every created resource.
    pub tags: Vec<String>,
}

/// Body of `POST /v1/{kind}/bulk`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkCreateRequest {
    /// Newline-separated raw batch.
    pub raw: String,
    #[serde(flatten)]
    /// Options applied to every line.
    pub options: BulkCreateOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// How to treat soft-deleted collisions; omitted on the first attempt.
    pub handle_trashed: Option<HandleTrashed>,
}

/// Soft-deleted record whose natural key matches a submitted line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrashedEntry {
    /// Natural key of the trashed record.
    pub natural_key: String,
    /// Identifier of the trashed record.
    pub id: ResourceId,
}

/// Response of `POST /v1/{kind}/bulk`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BulkCreateResponse {
    /// Number of records created (or revived).
    pub created: u64,
    /// Number of lines matching an existing active record.
    pub duplicates: u64,
    #[serde(default, alias = "trashed_proxies")]
    /// Lines matching a soft-deleted record.
    pub trashed: Vec<TrashedEntry>,
    #[serde(default)]
    /// Per-line failures (unparseable lines, rejected values).
    pub errors: Vec<String>,
}

/// Item a batch endpoint could not process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedItem {
    /// Resource that failed.
    pub id: ResourceId,
    /// Failure description.
    pub error: String,
}

/// Response of `POST /v1/{kind}/bulk-delete`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BulkDeleteResponse {
    /// Number of records deleted.
    pub deleted: u64,
    #[serde(default)]
    /// Records that could not be deleted.
    pub failed: Vec<FailedItem>,
}

/// Response of the check-job start endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckStartResponse {
    /// Number of resources scheduled for checking.
    pub total: u64,
    /// Server message.
    pub message: String,
}

/// Snapshot of the server-side check job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CheckStatus {
    /// Whether the job is still running.
    pub is_running: bool,
    /// Resources scheduled.
    pub total: u64,
    /// Resources checked so far.
    pub checked: u64,
    /// Checked resources found alive.
    pub active: u64,
    /// Checked resources found dead.
    pub dead: u64,
    #[serde(default)]
    /// Job start time, when a job exists.
    pub started_at: Option<DateTime<Utc>>,
}

impl CheckStatus {
    /// `checked <= total` and `active + dead <= checked`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.checked <= self.total && self.active.saturating_add(self.dead) <= self.checked
    }

    /// Completion percentage in `0.0..=100.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.checked.min(self.total) as f64 / self.total as f64) * 100.0
    }
}

/// Response of the check-job stop endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopCheckResponse {
    /// Server message.
    pub message: String,
}

/// Result of checking one resource synchronously.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncCheckResult {
    /// Checked resource.
    pub id: ResourceId,
    /// Whether the resource responded.
    pub alive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Round-trip latency when alive.
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Failure description when dead.
    pub error: Option<String>,
}

/// Response of `POST /v1/{kind}/check/batch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SyncCheckResponse {
    /// One entry per submitted id.
    pub results: Vec<SyncCheckResult>,
}
