//! CLI Module Organization
//!
//! - args: CLI argument structures and value enums
//! - commands: command execution
//! - config_layer: configuration layer resolution and merging
//! - output: report rendering

pub mod args;
pub mod commands;
pub mod config_layer;
pub mod output;

// Re-export commonly used items for convenience
pub use args::*;
pub use commands::*;
