#![deny(unsafe_code)]

//! pyver rule engine.
//!
//! Determines which Python version a project targets by running prioritized
//! extraction rules against its files. Each [`Rule`] binds a filename glob, an
//! optional path regex and content pre-filter to an [`Extractor`]. Rules live
//! in a [`RuleRegistry`], and an [`Engine`] runs the matching ones against a
//! file and reconciles their results into an [`ExecutionResult`].
//!
//! The crate never touches the filesystem itself; callers supply content.

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// The built-in Python version rule table.
pub mod builtin;
/// Execution engine, options, results, and cancellation.
pub mod engine;
/// Extraction results and the extractor trait.
pub mod extract;
/// Built-in extractor functions and the kind factory.
pub mod extractors;
/// Building a registry from configuration.
pub mod loader;
/// Filename globs, path regexes, and content pre-filters.
pub mod matcher;
/// Thread-safe rule registry.
pub mod registry;
/// Rules, the rule builder, and rule errors.
pub mod rule;

pub use builtin::{builtin_registry, builtin_rules};
pub use engine::{CancelToken, Engine, ExecutionOptions, ExecutionResult, RuleFailure, execute_rules};
pub use extract::{ExtractError, ExtractionResult, Extractor};
pub use extractors::{ExtractorConfigError, ExtractorKind};
pub use loader::{LoadError, registry_from_config};
pub use matcher::MatchCondition;
pub use registry::{RegistryStats, RuleRegistry};
pub use rule::{Rule, RuleBuilder, RuleError};
