//! Global `tracing` subscriber setup.

use podium_settings::LogFormat;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init_subscriber(level: &str, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.compact().try_init(),
    };
}
