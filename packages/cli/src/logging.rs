use tracing_subscriber::EnvFilter;
use trialguard_config::DEFAULT_LOG_FILTER;

/// Install the global subscriber. `RUST_LOG` wins over the default filter.
/// Logs go to stderr so they never mix with dashboard output.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Ignore the error when a subscriber is already installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
