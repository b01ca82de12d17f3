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

//! Client configuration for Pooldeck tools.
//!
//! Layout: `model.rs` (typed config, file document, overrides), `defaults.rs`
//! (contract defaults), `loader.rs` (file + environment layering),
//! `validate.rs` (range and URL checks), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ENV_API_TOKEN, ENV_API_URL, ENV_CONFIG_PATH, ENV_PAGE_SIZE, ENV_POLL_INTERVAL_MS,
    ENV_TIMEOUT_SECS, load, load_with,
};
pub use model::{ClientConfig, ConfigFile, ConfigOverrides};
pub use validate::validate;
