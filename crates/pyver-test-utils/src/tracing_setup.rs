//! Tracing initialisation for tests that do not use `#[test_log::test]`.
//!
//! Rule execution logs skips, failures and cancellation at debug, warn and
//! info; this makes them visible under `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Only the first call in a process installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
