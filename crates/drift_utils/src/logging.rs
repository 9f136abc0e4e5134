//! Tracing setup for the Drift binaries.

use tracing_subscriber::EnvFilter;

/// Initialize tracing output for the process.
///
/// `RUST_LOG` wins when set. Otherwise `default_directives` seeds the
/// filter; it takes any filter expression, not just a level. Per-message
/// delivery events (queue-full drops, stream-loop exits) are logged at
/// debug under `drift_broker`, so "info,drift_broker=debug" surfaces
/// them without turning the whole process noisy.
pub fn init(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    // try_init so tests and embedding binaries can call this repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
