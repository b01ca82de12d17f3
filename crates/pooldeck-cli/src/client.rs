//! Shared client utilities, error types, and the per-invocation context.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use anyhow::anyhow;
use pooldeck_bulk::{BulkError, ClientError, ListingCache, ResourceClient};
use pooldeck_config::{ClientConfig, ConfigError};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Url};

use crate::http::HttpResourceClient;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<BulkError> for CliError {
    fn from(err: BulkError) -> Self {
        match err {
            BulkError::Validation(inner) => Self::validation(inner.to_string()),
            BulkError::Client(inner) if inner.is_rejection() => {
                Self::validation(inner.to_string())
            }
            other => Self::failure(other),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        BulkError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { .. } => Self::failure(err),
            other => Self::validation(other.to_string()),
        }
    }
}

/// Dependencies constructed from the effective configuration.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) config: ClientConfig,
}

impl CliDependencies {
    /// Build the HTTP client with the request id and bearer token attached.
    pub(crate) fn from_config(config: ClientConfig, trace_id: &str) -> CliResult<Self> {
        let base_url = parse_url(&config.api_url).map_err(CliError::validation)?;

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);
        if let Some(token) = config.api_token.as_deref() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| CliError::validation("API token contains invalid characters"))?;
            value.set_sensitive(true);
            default_headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub(crate) fn context(&self) -> AppContext {
        AppContext::new(
            self.client.clone(),
            self.base_url.clone(),
            self.config.clone(),
        )
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) resources: Arc<dyn ResourceClient>,
    pub(crate) cache: Arc<ListingCache>,
    pub(crate) config: ClientConfig,
}

impl AppContext {
    pub(crate) fn new(client: Client, base_url: Url, config: ClientConfig) -> Self {
        Self {
            resources: Arc::new(HttpResourceClient::new(client, base_url)),
            cache: Arc::new(ListingCache::new()),
            config,
        }
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}
