//! Report rendering for the CLI.
//!
//! Text output goes through `tabled` and `owo-colors`; JSON output is the
//! serialized report on stdout so it can be piped.

use std::path::Path;

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use crate::cli::args::OutputFormat;
use vendor_isolator::api::results::{CacheReport, DiscoveryReport, FileFailure};
use vendor_isolator::IsolationReport;

/// Row type for the summary table.
#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Row type for per-package discovery.
#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Files")]
    files: usize,
    #[tabled(rename = "Namespaces")]
    namespaces: String,
}

/// Row type for failures.
#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Error")]
    message: String,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn stat(metric: &'static str, value: impl ToString) -> StatRow {
    StatRow {
        metric,
        value: value.to_string(),
    }
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn print_failures(failures: &[FileFailure], root: &Path) {
    if failures.is_empty() {
        return;
    }

    println!();
    println!(
        "{} {}",
        "Skipped after errors:".bright_yellow().bold(),
        failures.len()
    );
    let rows: Vec<FailureRow> = failures
        .iter()
        .map(|failure| FailureRow {
            stage: format!("{:?}", failure.stage),
            path: relative(&failure.path, root),
            message: failure.message.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
}

/// Print the outcome of `isolate`.
pub fn print_isolation_report(
    report: &IsolationReport,
    root: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    println!("{}", "Isolation complete".bright_green().bold());
    println!();

    let rows = vec![
        stat("Prefix", &report.prefix),
        stat("Eligible packages", report.eligible_packages.len()),
        stat("Namespaces (with ancestors)", report.namespace_count),
        stat("Files scanned", report.files_scanned),
        stat("Autoload keys prefixed", report.autoload_keys_rewritten),
        stat("Files rewritten", report.files_rewritten.len()),
        stat("PSR-0 directories moved", report.directories_moved.len()),
        stat("Autoloaded files restored", report.files_restored.len()),
        stat("Cache artifacts rewritten", report.artifacts_rewritten.len()),
        stat("Cache keys rewritten", report.cache_keys_rewritten),
        stat("Duration", format!("{:.2?}", report.duration)),
    ];
    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");

    for moved in &report.directories_moved {
        println!(
            "   {} {} -> {}",
            "moved".cyan(),
            relative(&moved.from, root),
            relative(&moved.to, root)
        );
    }

    print_failures(&report.failures, root);
    Ok(())
}

/// Print the outcome of `discover`.
pub fn print_discovery_report(
    report: &DiscoveryReport,
    root: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    let rows: Vec<PackageRow> = report
        .packages
        .iter()
        .map(|package| PackageRow {
            package: package.package.clone(),
            files: package.files_scanned,
            namespaces: package.namespaces.join("\n"),
        })
        .collect();

    if rows.is_empty() {
        println!("{}", "No eligible packages found".bright_yellow());
    } else {
        let mut table = Table::new(rows);
        table.with(TableStyle::rounded());
        println!("{table}");
    }

    println!();
    println!(
        "{} {}",
        "Whitelist (with ancestors):".bright_blue().bold(),
        report.namespaces.len()
    );
    for namespace in report.namespaces.iter() {
        println!("   {namespace}");
    }

    print_failures(&report.failures, root);
    Ok(())
}

/// Print the outcome of `rewrite-cache`.
pub fn print_cache_report(report: &CacheReport, root: &Path) {
    if report.artifacts_rewritten.is_empty() {
        println!("{}", "Autoload cache already isolated".dimmed());
    } else {
        println!(
            "{} {} keys in {}",
            "Rewrote".bright_green().bold(),
            report.keys_rewritten,
            report
                .artifacts_rewritten
                .iter()
                .map(|path| relative(path, root))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    print_failures(&report.failures, root);
}
