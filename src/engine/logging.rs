//! Logging bootstrap for binaries, demos and tests.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a `tracing` subscriber filtered by `RUST_LOG`
/// (default `info,offscreen_surface=debug`). Calling it again is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,offscreen_surface=debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
