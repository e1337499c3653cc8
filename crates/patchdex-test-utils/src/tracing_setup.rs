//! Tracing initialisation helpers for tests.
//!
//! Call [`init_test_tracing`] at the top of any test that wants scan
//! warnings and rebuild events captured by the test harness. The subscriber
//! is installed at most once per process.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn,patchdex_core=debug";

/// Initialise a tracing subscriber that writes to the test-harness writer.
///
/// Respects `RUST_LOG`; otherwise shows engine debug output and warnings
/// from everything else. Later calls are ignored.
///
/// ```ignore
/// #[test]
/// fn my_test() {
///     patchdex_test_utils::tracing_setup::init_test_tracing();
///     tracing::debug!("visible in captured output");
/// }
/// ```
pub fn init_test_tracing() {
    init_test_tracing_with(DEFAULT_FILTER);
}

/// Like [`init_test_tracing`] with an explicit fallback filter directive.
pub fn init_test_tracing_with(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(true)
        .with_test_writer()
        .try_init();
}
