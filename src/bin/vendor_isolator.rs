//! Vendor Isolator CLI
//!
//! Prefixes the namespaces of a Composer project's installed dependencies.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Isolate(args) => cli::isolate_command(*args)?,
        Commands::RewriteCache(args) => cli::rewrite_cache_command(args)?,
        Commands::Discover(args) => cli::discover_command(args)?,
        Commands::PrintDefaultConfig => cli::print_default_config()?,
        Commands::ValidateConfig(args) => cli::validate_config(args)?,
    }

    Ok(())
}
