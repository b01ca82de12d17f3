use std::sync::Arc;

use pooldeck_api_models::ResourceKind;
use pooldeck_bulk::{ClaimExportWorkflow, ConflictResolution, ExportOutcome};

use crate::cli::{ExportArgs, OnConflict, OutputFormat};
use crate::client::{AppContext, CliResult};
use crate::commands::resolve_selection;
use crate::output::{describe_usage_conflicts, render_export};
use crate::prompt::{Choice, decide};
use crate::sink::JsonLinesSink;

const CONFLICT_CHOICES: [Choice<ConflictResolution>; 3] = [
    Choice {
        key: "1",
        label: "cancel",
        value: ConflictResolution::Cancel,
    },
    Choice {
        key: "2",
        label: "available",
        value: ConflictResolution::ExportAvailable,
    },
    Choice {
        key: "3",
        label: "all",
        value: ConflictResolution::ExportAll,
    },
];

impl From<OnConflict> for ConflictResolution {
    fn from(flag: OnConflict) -> Self {
        match flag {
            OnConflict::Cancel => Self::Cancel,
            OnConflict::Available => Self::ExportAvailable,
            OnConflict::All => Self::ExportAll,
        }
    }
}

pub(crate) async fn handle_export(
    ctx: &AppContext,
    args: ExportArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let sink = Arc::new(JsonLinesSink::new(args.out.clone()));
    let mut workflow =
        ClaimExportWorkflow::new(ctx.resources.clone(), sink, ctx.cache.clone(), kind)?;

    let ids = resolve_selection(ctx, kind, &args.selection).await?;
    match workflow.begin(ids).await? {
        ExportOutcome::Exported(report) => render_export(kind, None, Some(&report), format),
        ExportOutcome::ConflictPending(conflicts) => {
            describe_usage_conflicts(kind, &conflicts);
            let resolution = decide(
                args.on_conflict.map(ConflictResolution::from),
                "--on-conflict",
                "Some items were used before. Export which items?",
                &CONFLICT_CHOICES,
            )?;
            let report = workflow.resolve(resolution).await?;
            render_export(kind, Some(&conflicts), report.as_ref(), format)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use anyhow::Result;
    use httpmock::prelude::*;
    use pooldeck_api_models::{ResourceId, ResourceSummary};
    use serde_json::json;

    use crate::cli::{KindArg, SelectionArgs};
    use crate::commands::test_support::{context_with, row};

    fn args(ids: &[u64], on_conflict: Option<OnConflict>, out: &Path) -> ExportArgs {
        ExportArgs {
            kind: KindArg::Proxies,
            selection: SelectionArgs {
                ids: ids.iter().copied().map(ResourceId).collect(),
                ..SelectionArgs::default()
            },
            on_conflict,
            out: out.to_path_buf(),
        }
    }

    fn exported_ids(path: &Path) -> Result<Vec<ResourceId>> {
        std::fs::read_to_string(path)?
            .lines()
            .map(|line| -> Result<ResourceId> {
                Ok(serde_json::from_str::<ResourceSummary>(line)?.id)
            })
            .collect()
    }

    #[tokio::test]
    async fn unused_batch_is_claimed_and_written() -> Result<()> {
        let server = MockServer::start_async().await;
        let usage = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/proxies/usage-check")
                .json_body(json!({ "ids": [1, 2] }));
            then.status(200)
                .json_body(json!({ "never_used_count": 2, "already_used": [] }));
        });
        let claim = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/proxies/claim")
                .json_body(json!({ "ids": [1, 2] }));
            then.status(200)
                .json_body(json!({ "claimed": 2, "new_owner_assigned": 2 }));
        });
        let lookup = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/proxies/lookup")
                .json_body(json!({ "ids": [1, 2] }));
            then.status(200)
                .json_body(json!([row(1, "10.0.0.1:8080"), row(2, "10.0.0.2:8080")]));
        });
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("proxies.jsonl");

        handle_export(&context_with(&server), args(&[1, 2], None, &out), OutputFormat::Table)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        usage.assert();
        claim.assert();
        lookup.assert();
        assert_eq!(exported_ids(&out)?, vec![ResourceId(1), ResourceId(2)]);
        Ok(())
    }

    #[tokio::test]
    async fn conflict_flag_exports_only_available_items() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/proxies/usage-check");
            then.status(200).json_body(json!({
                "never_used_count": 2,
                "already_used": [{
                    "resource_id": 2,
                    "usage_count": 1,
                    "users": [{ "id": 9, "name": "alice", "used_at": "2026-01-02T00:00:00Z" }]
                }]
            }));
        });
        let claim = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/proxies/claim")
                .json_body(json!({ "ids": [1, 3] }));
            then.status(200)
                .json_body(json!({ "claimed": 2, "new_owner_assigned": 2 }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/proxies/lookup")
                .json_body(json!({ "ids": [1, 3] }));
            then.status(200)
                .json_body(json!([row(1, "10.0.0.1:8080"), row(3, "10.0.0.3:8080")]));
        });
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("available.jsonl");

        handle_export(
            &context_with(&server),
            args(&[1, 2, 3], Some(OnConflict::Available), &out),
            OutputFormat::Json,
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        claim.assert();
        assert_eq!(exported_ids(&out)?, vec![ResourceId(1), ResourceId(3)]);
        Ok(())
    }

    #[tokio::test]
    async fn cancelling_a_conflict_writes_nothing() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/proxies/usage-check");
            then.status(200).json_body(json!({
                "never_used_count": 0,
                "already_used": [{ "resource_id": 4, "usage_count": 3 }]
            }));
        });
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("never.jsonl");

        handle_export(
            &context_with(&server),
            args(&[4], Some(OnConflict::Cancel), &out),
            OutputFormat::Table,
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert!(!out.exists());
        Ok(())
    }

    #[tokio::test]
    async fn kinds_without_claims_are_rejected_before_any_request() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;
        let mut export = args(&[1], None, &dir.path().join("x.jsonl"));
        export.kind = KindArg::Websites;

        let err = handle_export(&context_with(&server), export, OutputFormat::Table)
            .await
            .expect_err("unsupported kind");

        assert_eq!(err.exit_code(), 2);
        Ok(())
    }
}
