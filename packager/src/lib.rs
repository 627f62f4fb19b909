//! Contao packager library.
//!
//! This crate repackages a Composer-managed Contao component as a legacy
//! `system/modules/<name>` package: legacy module dependencies are folded
//! into `replace`, Composer installs the remaining libraries, and the module
//! tree is assembled together with a class map, autoload overlays and a
//! `RELEASE` descriptor. It is used by the `contao-packager` CLI binary and
//! can be consumed programmatically through [`pipeline::run`].
//!
//! # Modules
//!
//! - [`assemble`] - Module tree assembly and runonce aggregation
//! - [`autoload`] - Class map merging and legacy autoload overlays
//! - [`classify`] - Dependency classification and lock rewriting
//! - [`classmap`] - PHP class declaration scanning
//! - [`cli`] - Command-line argument definitions
//! - [`composer`] - Composer `show` and `install` invocations
//! - [`config`] - Validated run configuration
//! - [`error`] - Semantic error types
//! - [`host`] - Contao host conventions
//! - [`manifest`] - `composer.json` and `composer.lock` documents
//! - [`module_path`] - Module path resolution
//! - [`output`] - Status output formatting
//! - [`pipeline`] - Packaging pipeline orchestration
//! - [`process`] - External command execution with timeouts
//! - [`release`] - Build provenance
//! - [`template`] - Host bootstrap templates

pub mod assemble;
pub mod autoload;
pub mod classify;
pub mod classmap;
pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod host;
pub mod manifest;
pub mod module_path;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod release;
pub mod template;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
