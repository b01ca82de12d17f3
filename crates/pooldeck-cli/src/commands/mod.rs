//! Command handlers grouped by workflow.

use pooldeck_api_models::{ResourceId, ResourceKind};
use pooldeck_bulk::{EnumerationOptions, MatchingIds, SelectionModel};
use tracing::debug;

use crate::cli::SelectionArgs;
use crate::client::{AppContext, CliResult};

pub(crate) mod check;
pub(crate) mod delete;
pub(crate) mod export;
pub(crate) mod import;
pub(crate) mod list;

/// Turn explicit ids or `--all-matching` into the concrete ids to act on.
pub(crate) async fn resolve_selection(
    ctx: &AppContext,
    kind: ResourceKind,
    args: &SelectionArgs,
) -> CliResult<Vec<ResourceId>> {
    let filter = args.filter.to_filter();
    let source = MatchingIds::new(ctx.resources.as_ref(), kind, &filter);
    let mut selection = SelectionModel::new();
    if args.all_matching {
        selection.mark_all_pages();
    } else {
        selection.toggle_page(args.ids.iter().copied(), true);
    }

    let ids = selection
        .resolve_ids(&source, EnumerationOptions::default())
        .await?;
    debug!(%kind, count = ids.len(), all_matching = args.all_matching, "selection resolved");
    Ok(ids)
}


#[cfg(test)]
mod tests {
    use super::test_support::{context_with, row};
    use super::*;
    use anyhow::Result;
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::cli::FilterArgs;

    #[tokio::test]
    async fn explicit_ids_are_used_without_listing() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_with(&server);
        let args = SelectionArgs {
            ids: vec![ResourceId(5), ResourceId(2), ResourceId(5)],
            ..SelectionArgs::default()
        };

        let ids = resolve_selection(&ctx, ResourceKind::Proxy, &args)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(ids, vec![ResourceId(2), ResourceId(5)]);
        Ok(())
    }

    #[tokio::test]
    async fn all_matching_enumerates_with_the_filter() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/proxies")
                .query_param("tag", "eu")
                .query_param("page", "1")
                .query_param("page_size", "100");
            then.status(200).json_body(json!({
                "items": [row(1, "10.0.0.1:8080"), row(2, "10.0.0.2:8080")],
                "pagination": { "page": 1, "total_pages": 1, "total": 2 }
            }));
        });
        let ctx = context_with(&server);
        let args = SelectionArgs {
            all_matching: true,
            filter: FilterArgs {
                tag: Some("eu".into()),
                ..FilterArgs::default()
            },
            ..SelectionArgs::default()
        };

        let ids = resolve_selection(&ctx, ResourceKind::Proxy, &args)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        mock.assert();
        assert_eq!(ids, vec![ResourceId(1), ResourceId(2)]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_selection_is_a_validation_error() {
        let server = MockServer::start_async().await;
        let ctx = context_with(&server);

        let err = resolve_selection(&ctx, ResourceKind::Proxy, &SelectionArgs::default())
            .await
            .expect_err("nothing selected");

        assert_eq!(err.exit_code(), 2);
    }
}
