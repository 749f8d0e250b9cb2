mod metrics;

pub use metrics::{TurnMetrics, TurnMetricsSnapshot};

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. Call once at startup.
/// RUST_LOG overrides the default "info" filter.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}
