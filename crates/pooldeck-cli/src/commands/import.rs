use anyhow::anyhow;
use pooldeck_api_models::{BulkCreateOptions, BulkCreateRequest, ResourceKind};
use pooldeck_bulk::{
    BulkError, CreateBatch, CreateOutcome, TrashConflictResolver, TrashResolution,
    ValidationError,
};
use tracing::info;

use crate::cli::{ImportArgs, OnTrashed, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{describe_trash_conflict, render_create, render_trash_resolution};
use crate::prompt::{Choice, decide};

const TRASH_CHOICES: [Choice<TrashResolution>; 3] = [
    Choice {
        key: "c",
        label: "cancel",
        value: TrashResolution::Cancel,
    },
    Choice {
        key: "r",
        label: "restore",
        value: TrashResolution::Restore,
    },
    Choice {
        key: "n",
        label: "replace",
        value: TrashResolution::Replace,
    },
];

impl From<OnTrashed> for TrashResolution {
    fn from(flag: OnTrashed) -> Self {
        match flag {
            OnTrashed::Cancel => Self::Cancel,
            OnTrashed::Restore => Self::Restore,
            OnTrashed::Replace => Self::Replace,
        }
    }
}

pub(crate) async fn handle_import(
    ctx: &AppContext,
    args: ImportArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let raw = tokio::fs::read_to_string(&args.file).await.map_err(|err| {
        CliError::failure(anyhow!(
            "failed to read '{}': {err}",
            args.file.display()
        ))
    })?;
    let batch = CreateBatch {
        raw,
        options: BulkCreateOptions {
            resource_type: args.resource_type,
            protocol: args.protocol,
            tags: args.tags,
        },
    };

    if !kind.capabilities().trash_detection {
        return import_plain(ctx, kind, batch, format).await;
    }

    let mut resolver = TrashConflictResolver::new(ctx.resources.clone(), ctx.cache.clone(), kind)?;
    match resolver.submit(batch).await? {
        CreateOutcome::Completed(response) => render_create(&response, format),
        CreateOutcome::TrashConflict(conflict) => {
            describe_trash_conflict(kind, &conflict);
            let resolution = decide(
                args.on_trashed.map(TrashResolution::from),
                "--on-trashed",
                "Some lines match trashed records. Restore or replace them?",
                &TRASH_CHOICES,
            )?;
            let report = resolver.resolve(resolution).await?;
            render_trash_resolution(&conflict, report.as_ref(), format)
        }
    }
}

/// Kinds whose bulk endpoint does not report trashed collisions.
async fn import_plain(
    ctx: &AppContext,
    kind: ResourceKind,
    batch: CreateBatch,
    format: OutputFormat,
) -> CliResult<()> {
    if batch.usable_lines() == 0 {
        return Err(BulkError::from(ValidationError::EmptyBatch).into());
    }
    let request = BulkCreateRequest {
        raw: batch.raw,
        options: batch.options,
        handle_trashed: None,
    };
    let response = ctx.resources.bulk_create(kind, &request).await?;
    info!(%kind, created = response.created, "bulk create submitted");
    if response.created > 0 {
        ctx.cache.invalidate().await;
    }
    render_create(&response, format)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use anyhow::Result;
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::cli::KindArg;
    use crate::commands::test_support::context_with;

    const RAW: &str = "10.0.0.1:8080\n10.0.0.2:8080:user:pass\n";

    fn args(kind: KindArg, file: &Path, on_trashed: Option<OnTrashed>) -> ImportArgs {
        ImportArgs {
            kind,
            file: file.to_path_buf(),
            resource_type: None,
            protocol: Some("http".into()),
            tags: Vec::new(),
            on_trashed,
        }
    }

    fn batch_file(dir: &Path, contents: &str) -> Result<std::path::PathBuf> {
        let path = dir.join("batch.txt");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    #[tokio::test]
    async fn restore_resubmits_only_trashed_lines() -> Result<()> {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(POST).path("/v1/proxies/bulk").json_body(json!({
                "raw": RAW,
                "protocol": "http",
                "tags": []
            }));
            then.status(200).json_body(json!({
                "created": 1,
                "duplicates": 0,
                "trashed": [{ "natural_key": "10.0.0.2:8080", "id": 77 }]
            }));
        });
        let resubmit = server.mock(|when, then| {
            when.method(POST).path("/v1/proxies/bulk").json_body(json!({
                "raw": "10.0.0.2:8080:user:pass",
                "protocol": "http",
                "tags": [],
                "handle_trashed": "restore"
            }));
            then.status(200)
                .json_body(json!({ "created": 1, "duplicates": 0 }));
        });
        let dir = tempfile::tempdir()?;
        let file = batch_file(dir.path(), RAW)?;

        handle_import(
            &context_with(&server),
            args(KindArg::Proxies, &file, Some(OnTrashed::Restore)),
            OutputFormat::Table,
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        first.assert();
        resubmit.assert();
        Ok(())
    }

    #[tokio::test]
    async fn kinds_without_trash_detection_submit_once() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/websites/bulk");
            then.status(200)
                .json_body(json!({ "created": 2, "duplicates": 0 }));
        });
        let dir = tempfile::tempdir()?;
        let file = batch_file(dir.path(), "https://a.example\nhttps://b.example\n")?;
        let ctx = context_with(&server);

        handle_import(
            &ctx,
            args(KindArg::Websites, &file, None),
            OutputFormat::Json,
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        mock.assert();
        assert_eq!(ctx.cache.generation(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn blank_files_are_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;
        let file = batch_file(dir.path(), "\n  \n")?;

        let err = handle_import(
            &context_with(&server),
            args(KindArg::Tools, &file, None),
            OutputFormat::Table,
        )
        .await
        .expect_err("empty batch");

        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn missing_files_are_failures() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;

        let err = handle_import(
            &context_with(&server),
            args(KindArg::Proxies, &dir.path().join("absent.txt"), None),
            OutputFormat::Table,
        )
        .await
        .expect_err("missing file");

        assert_eq!(err.exit_code(), 3);
        Ok(())
    }
}
