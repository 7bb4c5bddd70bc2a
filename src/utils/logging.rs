//! Logging initialization for hosts embedding the loader
//!
//! - Respects the RUST_LOG environment variable
//! - Falls back to the configured filter, then to "info"
//! - Optional JSON output behind the `json-logging` feature
//!
//! # Usage
//! ```rust
//! use module_isolation::utils::init_logging;
//!
//! init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter used when neither RUST_LOG nor a configured filter is set
pub const DEFAULT_FILTER: &str = "info";

/// Pick the effective filter directive
///
/// RUST_LOG always takes precedence over the configured filter.
pub fn effective_filter(rust_log: Option<&str>, configured: Option<&str>) -> String {
    rust_log
        .or(configured)
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

fn env_filter(filter: Option<&str>) -> EnvFilter {
    let rust_log = std::env::var("RUST_LOG").ok();
    EnvFilter::new(effective_filter(rust_log.as_deref(), filter))
}

/// Initialize human-readable logging on stderr
///
/// A second initialization in the same process is ignored.
pub fn init_logging(filter: Option<&str>) {
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

/// Initialize logging with JSON output (for log aggregation)
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(env_filter(filter))
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

/// Initialize logging from LoaderConfig
///
/// ```rust
/// use module_isolation::config::LoaderConfig;
/// use module_isolation::utils::init_logging_from_config;
///
/// let config = LoaderConfig::default();
/// init_logging_from_config(Some(&config.logging));
/// ```
pub fn init_logging_from_config(config: Option<&LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            // Fall back to regular logging if json-logging feature not enabled
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
