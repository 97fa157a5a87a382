//! # Vendor Isolator: Namespace Isolation for PHP Dependencies
//!
//! Rewrites the installed third-party PHP packages of a Composer project so
//! that every namespace they declare is moved under a private prefix. Two
//! plugins that bundle different versions of the same library can then be
//! loaded into one PHP process without their classes colliding.
//!
//! - **Discovery**: tree-sitter parses every package file and collects the
//!   declared namespaces into one whitelist (closed over ancestors)
//! - **Checking**: a pure [`NamespaceChecker`] decides which strings qualify
//! - **Rewriting**: declarations, imports, qualified names and string literals
//!   are rewritten as byte-span edits, so untouched bytes stay identical
//! - **Relocation**: PSR-0 directory trees are moved under the prefix path
//! - **Autoload cache**: Composer's generated `files` tables get unique keys
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 API Layer (IsolationEngine)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Core          │  Language     │  Isolation     │  I/O      │
//! │                │               │                │           │
//! │ • Namespace    │ • Registry    │ • Discovery    │ • Composer│
//! │ • Checker      │ • Syntax      │ • Visitor      │   project │
//! │ • Config       │ • Edits       │ • Relocator    │           │
//! │ • Errors       │               │ • Autoload     │           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vendor_isolator::{ComposerProject, IsolationEngine, IsolatorConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let project = ComposerProject::open("./my-plugin")?;
//!     let config = IsolatorConfig::with_prefix("Acme\\Isolated");
//!
//!     let mut engine = IsolationEngine::new(config, project)?;
//!     let report = engine.run()?;
//!
//!     println!("Rewrote {} files", report.files_rewritten.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Core data model, configuration and error handling
pub mod core {
    //! Namespace model, checker, configuration and shared utilities.

    pub mod checker;
    pub mod config;
    pub mod errors;
    pub mod file_utils;
    pub mod namespace;
}

// Tree-sitter PHP parsing
pub mod lang;

// The isolation rewrite passes
pub mod isolation {
    //! Discovery, rewriting, relocation and autoload-cache passes.

    pub mod autoload_cache;
    pub mod discovery;
    pub mod relocator;
    pub mod visitor;
}

// Host project persistence
pub mod io {
    //! Reading and persisting Composer project metadata.

    pub mod composer;
}

// Public API and engine interface
pub mod api {
    //! High-level orchestration API.

    pub mod engine;
    pub mod results;
}

pub use api::engine::IsolationEngine;
pub use api::results::IsolationReport;
pub use core::checker::NamespaceChecker;
pub use core::config::IsolatorConfig;
pub use core::errors::{IsolatorError, Result, ResultExt};
pub use core::namespace::{Namespace, NamespaceSet, Scope};
pub use io::composer::ComposerProject;
