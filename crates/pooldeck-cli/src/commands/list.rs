use pooldeck_api_models::ResourceKind;

use crate::cli::{ListArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_list;

pub(crate) async fn handle_list(
    ctx: &AppContext,
    args: ListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kind = ResourceKind::from(args.kind);
    let page_size = args.page_size.unwrap_or(ctx.config.page_size);
    if args.page == 0 {
        return Err(CliError::validation("page numbers start at 1"));
    }
    if page_size == 0 {
        return Err(CliError::validation("page size must be at least 1"));
    }

    let filter = args.filter.to_filter();
    let page = ctx
        .cache
        .get_or_fetch(ctx.resources.as_ref(), kind, &filter, args.page, page_size)
        .await?;
    render_list(&page, format)
}
