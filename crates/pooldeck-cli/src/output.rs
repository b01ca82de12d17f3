//! Output renderers and formatting helpers for CLI commands.
//!
//! Structured results go to stdout. Conflict disclosures that precede a
//! decision go to stderr so `--output json` stays parseable.

use anyhow::anyhow;
use pooldeck_api_models::{
    BulkCreateResponse, CheckStartResponse, CheckStatus, ListPage, ResourceKind, ResourceSummary,
    StopCheckResponse, SyncCheckResponse, UsageConflict,
};
use pooldeck_bulk::{
    CheckSummary, DeleteReport, ExportReport, TrashConflict, TrashResolutionReport,
    UsageConflictReport,
};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_list(page: &ListPage<ResourceSummary>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(page)?,
        OutputFormat::Table => {
            println!(
                "{:<10} {:<40} {:<10} {:<16} {:>5} TAGS",
                "ID", "KEY", "STATUS", "OWNER", "USES"
            );
            for item in &page.items {
                println!(
                    "{:<10} {:<40} {:<10} {:<16} {:>5} {}",
                    item.id,
                    item.natural_key,
                    item.status,
                    item.owner.as_deref().unwrap_or("-"),
                    item.usage_count,
                    item.tags.join(",")
                );
            }
            println!(
                "page {}/{} ({} matching)",
                page.meta.page,
                page.meta.total_pages.max(1),
                page.meta.total
            );
        }
    }
    Ok(())
}

/// Describe prior claims ahead of the export decision.
pub(crate) fn describe_usage_conflicts(kind: ResourceKind, report: &UsageConflictReport) {
    eprintln!(
        "{} of {} {} were claimed before; {} available",
        report.requested.saturating_sub(report.available()),
        report.requested,
        kind.plural(),
        report.available()
    );
    for conflict in &report.conflicts {
        eprintln!(
            "  {:<10} used {}x by {}",
            conflict.resource_id,
            conflict.usage_count,
            format_claimants(conflict)
        );
    }
}

pub(crate) fn render_export(
    kind: ResourceKind,
    conflicts: Option<&UsageConflictReport>,
    report: Option<&ExportReport>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "conflicts": conflicts,
            "report": report,
        }))?,
        OutputFormat::Table => match report {
            None => println!("export cancelled; nothing was claimed"),
            Some(report) if report.exported_ids.is_empty() => {
                println!("nothing left to export; nothing was claimed");
            }
            Some(report) => {
                let location = report
                    .artifact
                    .as_ref()
                    .map_or("-", |artifact| artifact.location.as_str());
                println!(
                    "exported {} {} to {location}",
                    report.exported_ids.len(),
                    kind.plural()
                );
                println!(
                    "claimed: {} (new owner assigned: {})",
                    report.claimed, report.new_owner_assigned
                );
            }
        },
    }
    Ok(())
}

/// Describe trashed collisions ahead of the restore/replace decision.
pub(crate) fn describe_trash_conflict(kind: ResourceKind, conflict: &TrashConflict) {
    eprintln!(
        "{} submitted lines match trashed {}:",
        conflict.resubmission_lines,
        kind.plural()
    );
    for entry in &conflict.entries {
        eprintln!("  {:<10} {}", entry.id, entry.natural_key);
    }
}

pub(crate) fn render_create(response: &BulkCreateResponse, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(response)?,
        OutputFormat::Table => print_create_counts(response),
    }
    Ok(())
}

pub(crate) fn render_trash_resolution(
    conflict: &TrashConflict,
    report: Option<&TrashResolutionReport>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "conflict": conflict,
            "resolution": report,
        }))?,
        OutputFormat::Table => {
            print_create_counts(&conflict.first_attempt);
            match report {
                None => println!("trashed lines left untouched"),
                Some(report) => {
                    println!(
                        "resubmitted {} lines; created {} in total",
                        report.resubmitted.len(),
                        report.total_created()
                    );
                    for error in &report.outcome.errors {
                        println!("  error: {error}");
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_create_counts(response: &BulkCreateResponse) {
    println!(
        "created: {}  duplicates: {}  trashed: {}  errors: {}",
        response.created,
        response.duplicates,
        response.trashed.len(),
        response.errors.len()
    );
    for error in &response.errors {
        println!("  error: {error}");
    }
}

pub(crate) fn render_delete(
    kind: ResourceKind,
    report: &DeleteReport,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("deleted {} {}", report.deleted, kind.plural());
            for failed in &report.failed {
                println!("  failed {:<10} {}", failed.id, failed.error);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_check_started(
    response: &CheckStartResponse,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(response)?,
        OutputFormat::Table => {
            println!("check job started for {} items: {}", response.total, response.message);
        }
    }
    Ok(())
}

pub(crate) fn render_check_status(status: &CheckStatus, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(status)?,
        OutputFormat::Table => {
            if status.is_running {
                println!("running: {}", format_progress(status));
                if let Some(started_at) = status.started_at {
                    println!("started: {started_at}");
                }
            } else {
                println!("no check job is running");
            }
        }
    }
    Ok(())
}

/// One line per poll while following a job.
pub(crate) fn render_progress(status: &CheckStatus, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let line = serde_json::to_string(status)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{line}");
        }
        OutputFormat::Table => println!("{}", format_progress(status)),
    }
    Ok(())
}

pub(crate) fn render_check_summary(summary: &CheckSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(summary)?,
        OutputFormat::Table => println!(
            "check job finished: {}/{} checked, {} active, {} dead",
            summary.checked, summary.total, summary.active, summary.dead
        ),
    }
    Ok(())
}

pub(crate) fn render_check_stopped(
    response: &StopCheckResponse,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(response)?,
        OutputFormat::Table => println!("check job stopped: {}", response.message),
    }
    Ok(())
}

pub(crate) fn render_sync_check(
    response: &SyncCheckResponse,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(response)?,
        OutputFormat::Table => {
            println!("{:<10} {:<6} {:>9} ERROR", "ID", "ALIVE", "LATENCY");
            for result in &response.results {
                let latency = result
                    .latency_ms
                    .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));
                println!(
                    "{:<10} {:<6} {:>9} {}",
                    result.id,
                    if result.alive { "yes" } else { "no" },
                    latency,
                    result.error.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

#[must_use]
pub(crate) fn format_progress(status: &CheckStatus) -> String {
    format!(
        "{:.1}% ({}/{}) active {} dead {}",
        status.percent_complete(),
        status.checked,
        status.total,
        status.active,
        status.dead
    )
}

#[must_use]
pub(crate) fn format_claimants(conflict: &UsageConflict) -> String {
    if conflict.users.is_empty() {
        return "unknown users".to_string();
    }
    conflict
        .users
        .iter()
        .map(|user| format!("{} ({})", user.name, user.used_at.format("%Y-%m-%d")))
        .collect::<Vec<_>>()
        .join(", ")
}
