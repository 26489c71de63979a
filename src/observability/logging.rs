//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem
//! - Configure the filter from config or the `RUST_LOG` environment variable
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - JSON format for production, pretty format for development

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

/// Initialize the global logging subscriber. Call once at process startup.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
