//! Validation helpers for client configuration.

use url::Url;

use crate::defaults::{MIN_POLL_INTERVAL_MS, SYNC_CHECK_CAP};
use crate::error::{ConfigError, ConfigResult};
use crate::model::ClientConfig;

/// Check ranges and the API URL scheme.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the first offending field.
pub fn validate(config: &ClientConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.api_url).map_err(|err| {
        ConfigError::invalid("api_url", Some(config.api_url.clone()), err.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "api_url",
            Some(config.api_url.clone()),
            "scheme must be http or https",
        ));
    }
    if config.timeout_secs == 0 {
        return Err(ConfigError::invalid("timeout_secs", Some("0".into()), "must be positive"));
    }
    if config.page_size == 0 {
        return Err(ConfigError::invalid("page_size", Some("0".into()), "must be positive"));
    }
    if config.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::invalid(
            "poll_interval_ms",
            Some(config.poll_interval_ms.to_string()),
            format!("must be at least {MIN_POLL_INTERVAL_MS}"),
        ));
    }
    if !(1..=SYNC_CHECK_CAP).contains(&config.sync_check_cap) {
        return Err(ConfigError::invalid(
            "sync_check_cap",
            Some(config.sync_check_cap.to_string()),
            format!("must be between 1 and {SYNC_CHECK_CAP}"),
        ));
    }
    if config
        .api_token
        .as_deref()
        .is_some_and(|token| token.trim().is_empty())
    {
        return Err(ConfigError::invalid("api_token", None, "must not be blank"));
    }
    Ok(())
}
