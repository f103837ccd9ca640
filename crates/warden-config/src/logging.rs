//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format (for development).
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
}

/// Initialize tracing with an env-filter, falling back to the given level.
///
/// Safe to call more than once: later calls are no-ops if a subscriber is
/// already installed.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},warden=debug")));

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true);

    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing already initialized, skipping");
    }
}
