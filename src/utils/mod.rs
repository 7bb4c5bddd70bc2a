//! Utility modules

pub mod logging;

pub use logging::{effective_filter, init_logging, init_logging_from_config};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
