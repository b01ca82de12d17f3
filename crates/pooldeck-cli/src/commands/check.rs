use pooldeck_api_models::{CheckStatus, ResourceKind};
use pooldeck_bulk::{
    BulkError, CheckJobController, CheckLimits, JobUpdate, PollOptions, SelectionModel,
    ValidationError,
};

use crate::cli::{CheckNowArgs, CheckStartArgs, KindArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{
    render_check_started, render_check_status, render_check_stopped, render_check_summary,
    render_progress, render_sync_check,
};

fn controller(ctx: &AppContext, kind: ResourceKind) -> CliResult<CheckJobController> {
    let options = PollOptions {
        interval: ctx.config.poll_interval(),
    };
    let limits = CheckLimits {
        sync_cap: ctx.config.sync_check_cap,
    };
    Ok(CheckJobController::new(
        ctx.resources.clone(),
        ctx.cache.clone(),
        kind,
        options,
        limits,
    )?)
}

fn ensure_checkable(kind: ResourceKind) -> CliResult<()> {
    if kind.capabilities().checkable {
        Ok(())
    } else {
        Err(BulkError::from(ValidationError::Unsupported {
            kind: kind.plural(),
            action: "checks",
        })
        .into())
    }
}

pub(crate) async fn handle_check_start(
    ctx: &AppContext,
    args: CheckStartArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let mut controller = controller(ctx, kind)?;
    let mut selection = SelectionModel::new();

    let response = if args.selection.all_matching {
        let filter = args.selection.filter.to_filter();
        controller.start_all(&filter, &mut selection).await?
    } else if args.selection.ids.is_empty() {
        return Err(CliError::validation(
            "pass resource ids or --all-matching to start a check job",
        ));
    } else {
        selection.toggle_page(args.selection.ids.iter().copied(), true);
        let ids: Vec<_> = selection.selected_ids().iter().copied().collect();
        controller.start_selected(&ids, &mut selection).await?
    };
    render_check_started(&response, format)?;

    if args.watch {
        follow(&mut controller, format).await
    } else {
        controller.teardown();
        Ok(())
    }
}

pub(crate) async fn handle_check_status(
    ctx: &AppContext,
    args: KindArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    ensure_checkable(kind)?;
    let status = ctx.resources.check_status(kind).await?;
    render_check_status(&status, format)
}

pub(crate) async fn handle_check_stop(
    ctx: &AppContext,
    args: KindArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let mut controller = controller(ctx, kind)?;
    controller.resume_if_running().await?;
    let response = controller.stop().await?;
    render_check_stopped(&response, format)
}

pub(crate) async fn handle_check_watch(
    ctx: &AppContext,
    args: KindArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let mut controller = controller(ctx, kind)?;
    match controller.resume_if_running().await? {
        Some(status) => {
            render_progress(&status, format)?;
            follow(&mut controller, format).await
        }
        None => render_check_status(&CheckStatus::default(), format),
    }
}

pub(crate) async fn handle_check_now(
    ctx: &AppContext,
    args: CheckNowArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let controller = controller(ctx, kind)?;
    let response = controller.check_now(&args.ids).await?;
    render_sync_check(&response, format)
}

/// Print progress until the job finishes or the user interrupts.
///
/// Interrupting only detaches; the server-side job keeps running.
async fn follow(controller: &mut CheckJobController, format: OutputFormat) -> CliResult<()> {
    loop {
        tokio::select! {
            update = controller.next_update() => match update {
                Some(JobUpdate::Progress(status)) => render_progress(&status, format)?,
                Some(JobUpdate::Finished(summary)) => {
                    return render_check_summary(&summary, format);
                }
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                controller.teardown();
                eprintln!("stopped following; the check job keeps running");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::prelude::*;
    use pooldeck_api_models::ResourceId;
    use pooldeck_config::ClientConfig;
    use reqwest::Client;
    use serde_json::json;

    use crate::cli::{KindArg, SelectionArgs};

    fn fast_context(server: &MockServer) -> Result<AppContext> {
        let config = ClientConfig {
            poll_interval_ms: 250,
            ..ClientConfig::default()
        };
        Ok(AppContext::new(
            Client::new(),
            server.base_url().parse()?,
            config,
        ))
    }

    fn finished_status() -> serde_json::Value {
        json!({
            "is_running": false,
            "total": 2,
            "checked": 2,
            "active": 1,
            "dead": 1
        })
    }

    #[tokio::test]
    async fn check_now_over_the_cap_is_refused() -> Result<()> {
        let server = MockServer::start_async().await;
        let args = CheckNowArgs {
            kind: KindArg::Proxies,
            ids: (1..=11).map(ResourceId).collect(),
        };

        let err = handle_check_now(&fast_context(&server)?, args, OutputFormat::Table)
            .await
            .expect_err("too many ids");

        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("at most 10"));
        Ok(())
    }

    #[tokio::test]
    async fn check_now_posts_a_small_batch() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/proxies/check/batch")
                .json_body(json!({ "ids": [1, 2] }));
            then.status(200).json_body(json!({
                "results": [
                    { "id": 1, "alive": true, "latency_ms": 120 },
                    { "id": 2, "alive": false, "error": "timeout" }
                ]
            }));
        });
        let args = CheckNowArgs {
            kind: KindArg::Proxies,
            ids: vec![ResourceId(1), ResourceId(2)],
        };

        handle_check_now(&fast_context(&server)?, args, OutputFormat::Table)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn start_selected_then_watch_until_finished() -> Result<()> {
        let server = MockServer::start_async().await;
        let start = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/email-accounts/check/selected")
                .json_body(json!({ "ids": [3, 4] }));
            then.status(202)
                .json_body(json!({ "total": 2, "message": "queued" }));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/v1/email-accounts/check/status");
            then.status(200).json_body(finished_status());
        });
        let args = CheckStartArgs {
            kind: KindArg::EmailAccounts,
            selection: SelectionArgs {
                ids: vec![ResourceId(4), ResourceId(3)],
                ..SelectionArgs::default()
            },
            watch: true,
        };

        handle_check_start(&fast_context(&server)?, args, OutputFormat::Json)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        start.assert();
        status.assert();
        Ok(())
    }

    #[tokio::test]
    async fn start_without_ids_or_all_matching_is_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        let args = CheckStartArgs {
            kind: KindArg::Proxies,
            selection: SelectionArgs::default(),
            watch: false,
        };

        let err = handle_check_start(&fast_context(&server)?, args, OutputFormat::Table)
            .await
            .expect_err("nothing to check");

        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn stop_without_a_running_job_is_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        let status = server.mock(|when, then| {
            when.method(GET).path("/v1/proxies/check/status");
            then.status(200).json_body(finished_status());
        });

        let err = handle_check_stop(
            &fast_context(&server)?,
            KindArgs {
                kind: KindArg::Proxies,
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("nothing running");

        status.assert();
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn status_is_refused_for_kinds_without_checks() -> Result<()> {
        let server = MockServer::start_async().await;

        let err = handle_check_status(
            &fast_context(&server)?,
            KindArgs {
                kind: KindArg::Tools,
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("tools are not checkable");

        assert_eq!(err.exit_code(), 2);
        Ok(())
    }
}
