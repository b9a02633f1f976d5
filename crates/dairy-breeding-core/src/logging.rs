//! Logging setup.
//!
//! The library only emits `tracing` events. Hosts that want them on stderr
//! call [`init`] once at startup; tests call [`init_test`].

use tracing_subscriber::{fmt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
///
/// ```no_run
/// use dairy_breeding_core::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// Debug-level subscriber writing through the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
