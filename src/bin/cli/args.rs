//! CLI Argument Structures
//!
//! Argument definitions, command structures and value enums used by the
//! vendor-isolator binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix the namespaces of installed PHP dependencies
#[derive(Parser)]
#[command(name = "vendor-isolator")]
#[command(version = VERSION)]
#[command(about = "Vendor Isolator - move Composer dependencies under a private namespace prefix")]
#[command(long_about = "
Rewrite the installed packages of a Composer project so every namespace they
declare lives under a private prefix. Two plugins that ship different versions
of the same library can then be loaded side by side.

Common Usage:

  # Isolate the current project using config.vendor-isolator from composer.json
  vendor-isolator isolate

  # Isolate with an explicit prefix and leave one package alone
  vendor-isolator isolate ./my-plugin --prefix 'Acme\\Isolated' --exclude psr/log

  # Re-key the autoload cache after `composer dump-autoload`
  vendor-isolator rewrite-cache ./my-plugin

  # Show which namespaces would be prefixed
  vendor-isolator discover --format json
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prefix namespaces, relocate PSR-0 trees and re-key the autoload cache
    Isolate(Box<IsolateArgs>),

    /// Re-key the generated autoload cache only
    #[command(name = "rewrite-cache")]
    RewriteCache(ProjectArgs),

    /// List the namespaces that would be prefixed
    Discover(DiscoverArgs),

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Validate a vendor-isolator configuration file
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),
}

/// Project location and configuration source shared by every project command
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Composer project root (the directory holding composer.json)
    #[arg(default_value = ".")]
    pub project: PathBuf,

    /// YAML configuration file (defaults to config.vendor-isolator in composer.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Namespace prefix, overriding the configured one
    #[arg(short, long, env = "VENDOR_ISOLATOR_PREFIX")]
    pub prefix: Option<String>,
}

/// Package selection overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Also isolate packages only required for development
    #[arg(long)]
    pub require_dev: bool,

    /// Package to leave untouched (repeatable)
    #[arg(short, long = "exclude", value_name = "PACKAGE")]
    pub exclude: Vec<String>,
}

/// Arguments for `isolate`
#[derive(Args, Debug, Clone)]
pub struct IsolateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Do not touch autoload_files.php / autoload_static.php
    #[arg(long)]
    pub skip_autoload_cache: bool,

    /// Worker threads for parsing and rewriting (defaults to the CPU count)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for `discover`
#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for `validate-config`
#[derive(Args, Debug, Clone)]
pub struct ValidateConfigArgs {
    /// Configuration file to validate
    pub config: PathBuf,
}

/// Report output formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    Text,
    /// Machine-readable JSON on stdout
    Json,
}
