//! Layered configuration loading.
//!
//! # Design
//! - Order: defaults, optional JSON file, environment, command-line flags.
//! - Environment access goes through a lookup closure so tests never touch the
//!   process environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ClientConfig, ConfigFile, ConfigOverrides};
use crate::validate::validate;

/// Path of the JSON config file.
pub const ENV_CONFIG_PATH: &str = "POOLDECK_CONFIG";
/// API base URL.
pub const ENV_API_URL: &str = "POOLDECK_API_URL";
/// Bearer token.
pub const ENV_API_TOKEN: &str = "POOLDECK_API_TOKEN";
/// HTTP timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "POOLDECK_HTTP_TIMEOUT_SECS";
/// Listing page size.
pub const ENV_PAGE_SIZE: &str = "POOLDECK_PAGE_SIZE";
/// Poll interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "POOLDECK_POLL_INTERVAL_MS";

/// Load configuration from the process environment.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read or parsed, an
/// environment value is malformed, or the merged result fails validation.
pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> ConfigResult<ClientConfig> {
    load_with(file, |key| std::env::var(key).ok(), overrides)
}

/// Load configuration using `lookup` for environment variables.
///
/// An explicit `file` wins over [`ENV_CONFIG_PATH`].
///
/// # Errors
///
/// See [`load`].
pub fn load_with<F>(
    file: Option<&Path>,
    lookup: F,
    overrides: &ConfigOverrides,
) -> ConfigResult<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    let env_path = lookup(ENV_CONFIG_PATH)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    if let Some(path) = file.map(Path::to_path_buf).or(env_path) {
        config.apply_file(read_file(&path)?);
        debug!(path = %path.display(), "loaded config file");
    }

    apply_env(&mut config, &lookup)?;
    config.apply_overrides(overrides);
    validate(&config)?;
    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<ConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env<F>(config: &mut ClientConfig, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(api_url) = read(ENV_API_URL) {
        config.api_url = api_url.trim().to_string();
    }
    if let Some(token) = read(ENV_API_TOKEN) {
        config.api_token = Some(token.trim().to_string());
    }
    if let Some(value) = read(ENV_TIMEOUT_SECS) {
        config.timeout_secs = parse_env(ENV_TIMEOUT_SECS, &value)?;
    }
    if let Some(value) = read(ENV_PAGE_SIZE) {
        config.page_size = parse_env(ENV_PAGE_SIZE, &value)?;
    }
    if let Some(value) = read(ENV_POLL_INTERVAL_MS) {
        config.poll_interval_ms = parse_env(ENV_POLL_INTERVAL_MS, &value)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, Some(value.to_string()), "must be a non-negative integer"))
}
