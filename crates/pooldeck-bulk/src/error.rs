//! Error types for bulk operations.
//!
//! # Design
//! - `ClientError` is what a [`crate::ResourceClient`] may fail with.
//! - `ValidationError` is raised before any network call and is never retried.
//! - Conflicts and partial batch failures are outcome values, not errors.

use std::io;

use pooldeck_api_models::ResourceId;
use thiserror::Error;

/// Failures reported by a `ResourceClient` implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The request did not complete (connection, timeout, TLS).
    #[error("{operation} request failed: {message}")]
    Transport {
        /// Remote operation that was attempted.
        operation: &'static str,
        /// Transport-level description.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("{operation} rejected with status {status}: {detail}")]
    Remote {
        /// Remote operation that was attempted.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Problem detail or response body.
        detail: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        /// Remote operation that was attempted.
        operation: &'static str,
        /// Decoder message.
        message: String,
    },
}

impl ClientError {
    /// Whether the server rejected the request as invalid input.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Remote { status: 400 | 409 | 422, .. })
    }
}

/// Input rejected locally before any remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A bulk action was requested with nothing selected.
    #[error("no items selected")]
    EmptySelection,
    /// A bulk-create batch contained no usable lines.
    #[error("batch contains no lines")]
    EmptyBatch,
    /// The synchronous check path only accepts small batches.
    #[error("synchronous check accepts at most {cap} items, got {requested}")]
    CheckBatchTooLarge {
        /// Number of items requested.
        requested: usize,
        /// Admission cap.
        cap: usize,
    },
    /// The resource kind does not support the requested action.
    #[error("{kind} do not support {action}")]
    Unsupported {
        /// Plural label of the resource kind.
        kind: &'static str,
        /// Action label.
        action: &'static str,
    },
    /// The workflow is not in a state that accepts the action.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// Action label.
        action: &'static str,
        /// Current state label.
        state: &'static str,
    },
}

/// Failures surfaced by bulk workflows.
#[derive(Debug, Error)]
pub enum BulkError {
    /// Rejected locally; no request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A remote call failed; the workflow is back in its pre-call state.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The export artifact could not be written.
    #[error("export failed")]
    Export(#[source] ExportError),
}

/// Failures raised by an [`crate::ExportSink`].
#[derive(Debug, Error)]
pub enum ExportError {
    /// A row could not be encoded into the artifact format.
    #[error("failed to encode row {id}: {message}")]
    Encode {
        /// Row that failed.
        id: ResourceId,
        /// Encoder message.
        message: String,
    },
    /// The artifact destination could not be created or written.
    #[error("failed to write '{location}'")]
    Write {
        /// Artifact location.
        location: String,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl BulkError {
    /// Whether this failure was caught before reaching the server.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;

/// Convenience alias for bulk workflow results.
pub type BulkResult<T> = Result<T, BulkError>;
