//! `ResourceClient` over the resource API's HTTP endpoints.
//!
//! Every endpoint lives under `/v1/{kind}`. Non-success responses are decoded
//! as `ProblemDetails` when possible and surface as [`ClientError::Remote`].

use async_trait::async_trait;
use pooldeck_api_models::{
    BulkCreateRequest, BulkCreateResponse, BulkDeleteResponse, CheckStartResponse, CheckStatus,
    ClaimResponse, IdsRequest, ListFilter, ListPage, ProblemDetails, ResourceId, ResourceKind,
    ResourceSummary, StopCheckResponse, SyncCheckResponse, UsageCheckResponse,
};
use pooldeck_bulk::{ClientError, ClientResult, ResourceClient};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

/// reqwest-backed implementation of [`ResourceClient`].
pub(crate) struct HttpResourceClient {
    client: Client,
    base_url: Url,
}

impl HttpResourceClient {
    pub(crate) const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(
        &self,
        operation: &'static str,
        kind: ResourceKind,
        suffix: &str,
    ) -> ClientResult<Url> {
        let path = format!("/v1/{}{suffix}", kind.path_segment());
        self.base_url
            .join(&path)
            .map_err(|err| ClientError::Transport {
                operation,
                message: format!("invalid base URL: {err}"),
            })
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ClientResult<Response> {
        let response = request.send().await.map_err(|err| ClientError::Transport {
            operation,
            message: err.to_string(),
        })?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), "resource API responded");
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_problem(operation, response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let response = self.send(operation, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Decode {
                operation,
                message: err.to_string(),
            })
    }

    async fn post_ids<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        kind: ResourceKind,
        suffix: &str,
        ids: &[ResourceId],
    ) -> ClientResult<T> {
        let url = self.endpoint(operation, kind, suffix)?;
        let request = self.client.post(url).json(&IdsRequest::from_slice(ids));
        self.send_json(operation, request).await
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ListPage<ResourceSummary>> {
        let operation = "list";
        let url = self.endpoint(operation, kind, "")?;
        let request = self
            .client
            .get(url)
            .query(&filter.query_pairs())
            .query(&[("page", page), ("page_size", page_size)]);
        self.send_json(operation, request).await
    }

    async fn lookup(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<Vec<ResourceSummary>> {
        self.post_ids("lookup", kind, "/lookup", ids).await
    }

    async fn check_usage(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<UsageCheckResponse> {
        self.post_ids("usage check", kind, "/usage-check", ids).await
    }

    async fn claim_ownership(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<ClaimResponse> {
        self.post_ids("claim", kind, "/claim", ids).await
    }

    async fn bulk_create(
        &self,
        kind: ResourceKind,
        request: &BulkCreateRequest,
    ) -> ClientResult<BulkCreateResponse> {
        let operation = "bulk create";
        let url = self.endpoint(operation, kind, "/bulk")?;
        self.send_json(operation, self.client.post(url).json(request))
            .await
    }

    async fn bulk_delete(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<BulkDeleteResponse> {
        self.post_ids("bulk delete", kind, "/bulk-delete", ids).await
    }

    async fn delete(&self, kind: ResourceKind, id: ResourceId) -> ClientResult<()> {
        let operation = "delete";
        let url = self.endpoint(operation, kind, &format!("/{id}"))?;
        self.send(operation, self.client.delete(url)).await?;
        Ok(())
    }

    async fn check_all(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> ClientResult<CheckStartResponse> {
        let operation = "check all";
        let url = self.endpoint(operation, kind, "/check/all")?;
        self.send_json(operation, self.client.post(url).json(filter))
            .await
    }

    async fn check_selected(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<CheckStartResponse> {
        self.post_ids("check selected", kind, "/check/selected", ids)
            .await
    }

    async fn check_status(&self, kind: ResourceKind) -> ClientResult<CheckStatus> {
        let operation = "check status";
        let url = self.endpoint(operation, kind, "/check/status")?;
        self.send_json(operation, self.client.get(url)).await
    }

    async fn stop_check(&self, kind: ResourceKind) -> ClientResult<StopCheckResponse> {
        let operation = "stop check";
        let url = self.endpoint(operation, kind, "/check/stop")?;
        self.send_json(operation, self.client.post(url)).await
    }

    async fn check_batch(
        &self,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> ClientResult<SyncCheckResponse> {
        self.post_ids("synchronous check", kind, "/check/batch", ids)
            .await
    }
}

/// Classify a non-success response into a [`ClientError::Remote`].
pub(crate) async fn classify_problem(operation: &'static str, response: Response) -> ClientError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();

    let detail = match problem {
        Some(ProblemDetails {
            detail: Some(detail),
            ..
        }) => detail,
        Some(problem) => problem.title,
        None if !body_text.is_empty() => body_text,
        None => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
    };

    ClientError::Remote {
        operation,
        status: status.as_u16(),
        detail,
    }
}
