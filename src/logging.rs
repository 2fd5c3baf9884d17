//! Operational logging setup (distinct from the capture log).

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Initializes the global tracing subscriber. The level argument accepts
/// anything `EnvFilter` does, so per-target directives work from the CLI.
pub fn setup_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| {
        eprintln!("Invalid log level '{level}', falling back to 'info'");
        EnvFilter::new("info")
    });

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
