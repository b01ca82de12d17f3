//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pooldeck_api_models::{ListFilter, ResourceId, ResourceKind};
use pooldeck_config::{ClientConfig, ConfigOverrides};
use pooldeck_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use uuid::Uuid;

use crate::client::{CliDependencies, CliResult};
use crate::commands::{check, delete, export, import, list};

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    install_logging(&cli);
    let trace_id = Uuid::new_v4().to_string();

    let deps = match load_config(&cli)
        .and_then(|config| CliDependencies::from_config(config, &trace_id))
    {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    match dispatch(cli, &deps).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn install_logging(cli: &Cli) {
    let format = cli
        .log_format
        .map_or_else(LogFormat::infer, LogFormatArg::into_format);
    let config = LoggingConfig {
        level: &cli.log_level,
        format,
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: {err}");
    }
}

fn load_config(cli: &Cli) -> CliResult<ClientConfig> {
    let overrides = ConfigOverrides {
        api_url: cli.api_url.clone(),
        api_token: cli.api_token.clone(),
        timeout_secs: cli.timeout,
        page_size: None,
    };
    Ok(pooldeck_config::load(cli.config.as_deref(), &overrides)?)
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let ctx = deps.context();

    match cli.command {
        Command::Ls(args) => list::handle_list(&ctx, args, cli.output).await,
        Command::Export(args) => export::handle_export(&ctx, args, cli.output).await,
        Command::Import(args) => import::handle_import(&ctx, args, cli.output).await,
        Command::Delete(args) => delete::handle_delete(&ctx, args, cli.output).await,
        Command::Check(command) => match command {
            CheckCommand::Start(args) => check::handle_check_start(&ctx, args, cli.output).await,
            CheckCommand::Status(args) => {
                check::handle_check_status(&ctx, args, cli.output).await
            }
            CheckCommand::Stop(args) => check::handle_check_stop(&ctx, args, cli.output).await,
            CheckCommand::Watch(args) => check::handle_check_watch(&ctx, args, cli.output).await,
            CheckCommand::Now(args) => check::handle_check_now(&ctx, args, cli.output).await,
        },
    }
}

#[derive(Parser)]
#[command(
    name = "pooldeck",
    about = "Bulk operations for Pooldeck resource pools"
)]
struct Cli {
    #[arg(long, global = true, help = "Base URL of the resource API")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "Bearer token sent with every request")]
    api_token: Option<String>,
    #[arg(long, global = true, help = "HTTP timeout in seconds")]
    timeout: Option<u64>,
    #[arg(
        long,
        global = true,
        help = "JSON configuration file (falls back to POOLDECK_CONFIG)"
    )]
    config: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level when RUST_LOG is unset"
    )]
    log_level: String,
    #[arg(long, global = true, value_enum, help = "Log output format")]
    log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List one page of resources.
    Ls(ListArgs),
    /// Check prior usage, claim ownership, and export resources.
    Export(ExportArgs),
    /// Bulk-create resources from a newline-separated file.
    Import(ImportArgs),
    /// Delete resources.
    Delete(DeleteArgs),
    /// Background check jobs and synchronous checks.
    #[command(subcommand)]
    Check(CheckCommand),
}

#[derive(Subcommand)]
pub(crate) enum CheckCommand {
    /// Start a background check job.
    Start(CheckStartArgs),
    /// Show the current check job.
    Status(KindArgs),
    /// Stop the running check job.
    Stop(KindArgs),
    /// Follow the running check job until it finishes.
    Watch(KindArgs),
    /// Check a few resources and wait for the results.
    Now(CheckNowArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum KindArg {
    Proxies,
    EmailAccounts,
    Websites,
    Tools,
    ServiceRequests,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Proxies => Self::Proxy,
            KindArg::EmailAccounts => Self::EmailAccount,
            KindArg::Websites => Self::Website,
            KindArg::Tools => Self::Tool,
            KindArg::ServiceRequests => Self::ServiceRequest,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub(crate) struct FilterArgs {
    #[arg(long, help = "Free-text search")]
    pub(crate) search: Option<String>,
    #[arg(long, help = "Status label, for example active or dead")]
    pub(crate) status: Option<String>,
    #[arg(long, help = "Tag name")]
    pub(crate) tag: Option<String>,
    #[arg(long, help = "Owning user")]
    pub(crate) owner: Option<String>,
    #[arg(long, help = "Protocol (proxies only)")]
    pub(crate) protocol: Option<String>,
}

impl FilterArgs {
    pub(crate) fn to_filter(&self) -> ListFilter {
        ListFilter {
            search: self.search.clone(),
            status: self.status.clone(),
            tag: self.tag.clone(),
            owner: self.owner.clone(),
            protocol: self.protocol.clone(),
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub(crate) struct SelectionArgs {
    #[arg(value_delimiter = ',', help = "Resource ids")]
    pub(crate) ids: Vec<ResourceId>,
    #[arg(
        long,
        conflicts_with = "ids",
        help = "Act on every resource matching the filter"
    )]
    pub(crate) all_matching: bool,
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct KindArgs {
    #[arg(value_enum)]
    pub(crate) kind: KindArg,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct ListArgs {
    #[arg(value_enum)]
    pub(crate) kind: KindArg,
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
    #[arg(long, help = "Rows per page (defaults to the configured page size)")]
    pub(crate) page_size: Option<u32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OnConflict {
    Cancel,
    Available,
    All,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct ExportArgs {
    #[arg(value_enum)]
    pub(crate) kind: KindArg,
    #[command(flatten)]
    pub(crate) selection: SelectionArgs,
    #[arg(long, value_enum, help = "Decision when some resources were used before")]
    pub(crate) on_conflict: Option<OnConflict>,
    #[arg(long, help = "Destination .jsonl file")]
    pub(crate) out: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OnTrashed {
    Cancel,
    Restore,
    Replace,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct ImportArgs {
    #[arg(value_enum)]
    pub(crate) kind: KindArg,
    #[arg(help = "File with one resource per line")]
    pub(crate) file: PathBuf,
    #[arg(long = "type", help = "Resource subtype applied to every line")]
    pub(crate) resource_type: Option<String>,
    #[arg(long, help = "Protocol applied to every line")]
    pub(crate) protocol: Option<String>,
    #[arg(long, value_delimiter = ',', help = "Tags applied to every line")]
    pub(crate) tags: Vec<String>,
    #[arg(long, value_enum, help = "Decision when lines match trashed records")]
    pub(crate) on_trashed: Option<OnTrashed>,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct DeleteArgs {
    #[arg(value_enum)]
    pub(crate) kind: KindArg,
    #[command(flatten)]
    pub(crate) selection: SelectionArgs,
    #[arg(long, help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct CheckStartArgs {
    #[arg(value_enum)]
    pub(crate) kind: KindArg,
    #[command(flatten)]
    pub(crate) selection: SelectionArgs,
    #[arg(long, help = "Follow progress until the job finishes")]
    pub(crate) watch: bool,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct CheckNowArgs {
    #[arg(value_enum)]
    pub(crate) kind: KindArg,
    #[arg(required = true, value_delimiter = ',', help = "Resource ids")]
    pub(crate) ids: Vec<ResourceId>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormatArg {
    Pretty,
    Json,
}

impl LogFormatArg {
    const fn into_format(self) -> LogFormat {
        match self {
            Self::Pretty => LogFormat::Pretty,
            Self::Json => LogFormat::Json,
        }
    }
}
