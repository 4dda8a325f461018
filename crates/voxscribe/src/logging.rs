//! Tracing subscriber setup for binaries and tests.
//!
//! Bridges `log` macros into `tracing` so both the `log::info!` call sites
//! and the `tracing` spans end up in the same subscriber.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Filter defaults to `info` and can be overridden via `RUST_LOG`.
/// Safe to call more than once — subsequent calls are no-ops.
pub fn init() {
    // LogTracer forwards log records to tracing. Ignore the error if a
    // logger is already installed (e.g. repeated init in tests).
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
