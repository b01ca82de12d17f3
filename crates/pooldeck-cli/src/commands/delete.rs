use anyhow::anyhow;
use pooldeck_api_models::ResourceKind;
use pooldeck_bulk::BulkDeleter;

use crate::cli::{DeleteArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::resolve_selection;
use crate::output::render_delete;
use crate::prompt::{Choice, decide};

const CONFIRM_CHOICES: [Choice<bool>; 2] = [
    Choice {
        key: "y",
        label: "yes",
        value: true,
    },
    Choice {
        key: "n",
        label: "no",
        value: false,
    },
];

pub(crate) async fn handle_delete(
    ctx: &AppContext,
    args: DeleteArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let ids = resolve_selection(ctx, kind, &args.selection).await?;

    let question = format!("Delete {} {}?", ids.len(), kind.plural());
    if !decide(args.yes.then_some(true), "--yes", &question, &CONFIRM_CHOICES)? {
        println!("delete cancelled");
        return Ok(());
    }

    let report = BulkDeleter::new(ctx.resources.clone(), ctx.cache.clone())
        .delete(kind, &ids)
        .await?;
    render_delete(kind, &report, format)?;

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(
            "{} of {} deletes failed",
            report.failed.len(),
            ids.len()
        )))
    }
}
