//! Tracing subscriber bootstrap.

use tracing_subscriber::EnvFilter;

/// Install a global subscriber with structured JSON output, honoring
/// `RUST_LOG` (default `info`). Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .try_init();
}
