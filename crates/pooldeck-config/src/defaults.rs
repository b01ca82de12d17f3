//! Default values for client configuration.
//!
//! # Design
//! - The poll interval floor and the sync-check cap come from the server
//!   contract. The enumeration page size is not configurable at all.

/// API base URL used when nothing else is configured.
pub const API_URL: &str = "http://127.0.0.1:8080";
/// HTTP request timeout in seconds.
pub const TIMEOUT_SECS: u64 = 10;
/// Rows per listing page.
pub const PAGE_SIZE: u32 = 20;
/// Delay between check-job status polls, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 2_000;
/// Shortest poll interval accepted, in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
/// Largest batch accepted by the synchronous check path.
pub const SYNC_CHECK_CAP: usize = 10;
