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
#![allow(clippy::module_name_repetitions)]

//! Bulk-action engine for Pooldeck resource pools.
//!
//! Layout:
//! - `selection.rs`: cross-page selection model and id enumeration
//! - `claim_export.rs`: usage-check → conflict → claim → export workflow
//! - `trash.rs`: bulk-create with trashed natural-key collisions
//! - `check_job.rs`: check-job controller, poll task, synchronous checks
//! - `delete.rs`: bulk delete with batch and fan-out paths
//! - `cache.rs`: shared read-through listing cache
//! - `client.rs`: `ResourceClient` and `ExportSink` seams
//! - `error.rs`: client, validation and workflow errors

pub mod cache;
pub mod check_job;
pub mod claim_export;
pub mod client;
pub mod delete;
pub mod error;
pub mod selection;
pub mod trash;

pub use cache::ListingCache;
pub use check_job::{
    CheckJobController, CheckLimits, CheckPhase, CheckSummary, JobMirror, JobUpdate, PollHandle,
    PollOptions, spawn_poller,
};
pub use claim_export::{
    ClaimExportWorkflow, ConflictResolution, ExportOutcome, ExportPhase, ExportReport,
    UsageConflictReport,
};
pub use client::{ExportArtifact, ExportSink, ResourceClient};
pub use delete::{BulkDeleter, DeleteReport};
pub use error::{BulkError, BulkResult, ClientError, ClientResult, ExportError, ValidationError};
pub use selection::{EnumerationOptions, IdPage, IdSource, MatchingIds, SelectionModel, enumerate_ids};
pub use trash::{
    CreateBatch, CreateOutcome, CreatePhase, MailboxKey, NaturalKey, ProxyEndpointKey,
    TrashConflict, TrashConflictResolver, TrashResolution, TrashResolutionReport,
};
