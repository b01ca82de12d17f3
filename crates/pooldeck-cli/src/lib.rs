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
#![allow(clippy::redundant_pub_crate)]

//! Command-line client for bulk operations against a Pooldeck resource API.
//!
//! Layout:
//! - `cli.rs`: argument parsing and command dispatch
//! - `commands/`: command handlers grouped by workflow
//! - `client.rs`: CLI errors, HTTP client construction, shared context
//! - `http.rs`: reqwest-backed `ResourceClient`
//! - `sink.rs`: JSON-lines export sink
//! - `prompt.rs`: interactive conflict decisions
//! - `output.rs`: renderers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod http;
pub(crate) mod output;
pub(crate) mod prompt;
pub(crate) mod sink;

pub use cli::run;
