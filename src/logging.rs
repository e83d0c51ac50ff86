//! Log subscriber setup for binaries embedding the facade.
//!
//! The facade itself only emits `tracing` events (one line on init success
//! or failure); installing a subscriber is the host's choice.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the fmt subscriber with the given default level.
///
/// The `RUST_LOG` environment variable takes precedence when set.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    tracing::info!(log_level, "Logging initialized");
}

/// Initialize logging for tests (only logs errors).
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
