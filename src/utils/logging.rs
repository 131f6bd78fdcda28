//! Logging configuration for the decision pipeline.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured level.
pub const LOG_ENV: &str = "HEDGEFUND_LOG";

/// Build the filter used by [`init_logging`]. `HEDGEFUND_LOG` wins over `level`.
pub fn build_filter(level: &str) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        | Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        | _ => EnvFilter::new(level),
    }
}

/// Initialize the logging system.
///
/// `log` records from the library are bridged into the same subscriber. Calling
/// this more than once is harmless.
pub fn init_logging(level: &str) {
    let initialised = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact()
        .with_env_filter(build_filter(level))
        .try_init()
        .is_ok();

    if initialised {
        log::info!("Logging initialized at level: {}", level);
    }
}

/// Initialize test logging (for use in tests)
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
