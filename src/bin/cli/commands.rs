//! Command execution.

use anyhow::Context;
use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};
use tracing::{info, warn};

use crate::cli::args::{DiscoverArgs, IsolateArgs, ProjectArgs, ValidateConfigArgs};
use crate::cli::config_layer::{resolve_config, CliOverrides};
use crate::cli::output::{print_cache_report, print_discovery_report, print_isolation_report};
use vendor_isolator::{ComposerProject, IsolationEngine, IsolatorConfig};

/// Open the project and build an engine from the layered configuration.
fn load_engine(
    args: &ProjectArgs,
    overrides: CliOverrides,
) -> anyhow::Result<IsolationEngine> {
    let project = ComposerProject::open(&args.project)
        .with_context(|| format!("Failed to open Composer project {}", args.project.display()))?;
    let config = resolve_config(args, &project, overrides)?;
    IsolationEngine::new(config, project).context("Invalid configuration")
}

/// Run the full isolation.
pub fn isolate_command(args: IsolateArgs) -> anyhow::Result<()> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the worker pool")?;
        info!("Using {threads} worker threads");
    }

    let overrides = CliOverrides::from_args(&args.project, Some(&args.selection));
    let mut engine = load_engine(&args.project, overrides)?;

    let report = if args.skip_autoload_cache {
        engine.mutate_namespaces()?
    } else {
        engine.run()?
    };

    if report.has_failures() {
        warn!(
            "{} files or packages were skipped; see the log for details",
            report.failures.len()
        );
    }
    print_isolation_report(&report, engine.project().root(), args.format)
}

/// Re-key the autoload cache only.
pub fn rewrite_cache_command(args: ProjectArgs) -> anyhow::Result<()> {
    let overrides = CliOverrides::from_args(&args, None);
    let engine = load_engine(&args, overrides)?;
    let report = engine.mutate_autoload_cache()?;
    print_cache_report(&report, engine.project().root());
    Ok(())
}

/// List the namespaces discovery would whitelist.
pub fn discover_command(args: DiscoverArgs) -> anyhow::Result<()> {
    let overrides = CliOverrides::from_args(&args.project, Some(&args.selection));
    let engine = load_engine(&args.project, overrides)?;
    let report = engine.discover()?;
    print_discovery_report(&report, engine.project().root(), args.format)
}

/// Print default configuration in YAML format
pub fn print_default_config() -> anyhow::Result<()> {
    println!("{}", "# Default vendor-isolator configuration".dimmed());
    println!("{}", "# Set `prefix`, then save this to a file".dimmed());
    println!(
        "{}",
        "# Usage: vendor-isolator isolate --config your-config.yml".dimmed()
    );
    println!(
        "{}",
        "# The same keys are read from config.vendor-isolator in composer.json".dimmed()
    );
    println!();

    let config = IsolatorConfig::default();
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

/// Validate a configuration file
pub fn validate_config(args: ValidateConfigArgs) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "Validating configuration:".bright_blue().bold(),
        args.config.display().to_string().cyan()
    );

    let result = IsolatorConfig::from_yaml_file(&args.config).and_then(|mut config| {
        config.validate()?;
        Ok(config)
    });

    let config = match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Configuration validation failed:".red(), e);
            eprintln!(
                "{}",
                "Tip: use 'vendor-isolator print-default-config' to see the valid format".dimmed()
            );
            return Err(e.into());
        }
    };

    println!("{}", "Configuration file is valid".bright_green().bold());
    println!();

    /// Row type for the configuration summary table.
    #[derive(Tabled)]
    struct SettingRow {
        setting: &'static str,
        value: String,
    }

    let rows = vec![
        SettingRow {
            setting: "prefix",
            value: config.prefix.clone(),
        },
        SettingRow {
            setting: "excludelist",
            value: config.excludelist.join(", "),
        },
        SettingRow {
            setting: "replacements",
            value: format!("{} files", config.replacements.len()),
        },
        SettingRow {
            setting: "require-dev",
            value: config.require_dev.to_string(),
        },
        SettingRow {
            setting: "extensions",
            value: config.extensions.join(", "),
        },
    ];
    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");

    Ok(())
}

