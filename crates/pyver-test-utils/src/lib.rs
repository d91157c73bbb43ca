#![deny(unsafe_code)]

//! Shared test utilities for the pyver workspace.
//!
//! Provides canned extractors, config builders, and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! pyver-test-utils = { workspace = true }
//! ```
//!
//! `pyver-core` may only use it from its `tests/` directory, since this crate
//! depends on `pyver-core` itself.

pub mod config;
pub mod fixtures;
pub mod tracing_setup;
