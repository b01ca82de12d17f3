//! Typed client configuration and its layered inputs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Effective configuration for a Pooldeck client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the resource API.
    pub api_url: String,
    /// Bearer token sent with every request.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Rows per listing page.
    pub page_size: u32,
    /// Delay between check-job status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Largest batch accepted by the synchronous check path; may only lower
    /// the server limit.
    pub sync_check_cap: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::API_URL.to_string(),
            api_token: None,
            timeout_secs: defaults::TIMEOUT_SECS,
            page_size: defaults::PAGE_SIZE,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            sync_check_cap: defaults::SYNC_CHECK_CAP,
        }
    }
}

impl ClientConfig {
    /// HTTP request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between check-job status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overlay every field present in `file`.
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(api_url) = file.api_url {
            self.api_url = api_url;
        }
        if file.api_token.is_some() {
            self.api_token = file.api_token;
        }
        if let Some(timeout_secs) = file.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if let Some(page_size) = file.page_size {
            self.page_size = page_size;
        }
        if let Some(poll_interval_ms) = file.poll_interval_ms {
            self.poll_interval_ms = poll_interval_ms;
        }
        if let Some(cap) = file.sync_check_cap {
            self.sync_check_cap = cap;
        }
    }

    /// Overlay command-line flags.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(api_url) = &overrides.api_url {
            self.api_url.clone_from(api_url);
        }
        if overrides.api_token.is_some() {
            self.api_token.clone_from(&overrides.api_token);
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size = page_size;
        }
    }
}

/// On-disk JSON document; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Base URL of the resource API.
    pub api_url: Option<String>,
    /// Bearer token.
    pub api_token: Option<String>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Rows per listing page.
    pub page_size: Option<u32>,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Synchronous check cap.
    pub sync_check_cap: Option<usize>,
}

/// Values supplied on the command line; they win over every other layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `--api-url`
    pub api_url: Option<String>,
    /// `--api-token`
    pub api_token: Option<String>,
    /// `--timeout`
    pub timeout_secs: Option<u64>,
    /// `--page-size`
    pub page_size: Option<u32>,
}
