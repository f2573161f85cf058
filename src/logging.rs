//! Subscriber setup for the command-line entry point.

use tracing_subscriber::EnvFilter;

/// Default directive when neither `--log-level` nor `PLOTRUNNER_LOG` is set.
pub const DEFAULT_LEVEL: &str = "warn";

/// Install a stderr fmt subscriber filtered by `level` (an `EnvFilter`
/// directive such as `info` or `plotrunner=debug`).
///
/// Calling this more than once keeps the first subscriber.
pub fn init(level: Option<&str>) {
    let filter = EnvFilter::try_new(level.unwrap_or(DEFAULT_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
