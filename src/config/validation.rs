//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (every limit > 0)
//! - Catch a heartbeat too coarse to enforce the configured limits
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: StallguardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use super::schema::{StallguardConfig, TICKS_PER_SECOND};

/// A single semantic problem with a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Timeout limits of zero would reject every connection instantly.
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    /// A beat slower than the shortest limit detects stalls late by more
    /// than the limit itself.
    #[error(
        "heartbeat_interval_millis ({interval_millis} ms) exceeds the shortest \
         timeout ({shortest_millis} ms); stalls would be detected late"
    )]
    HeartbeatTooCoarse {
        interval_millis: u64,
        shortest_millis: u64,
    },
}

/// Check a configuration for semantic problems, collecting every error.
pub fn validate_config(config: &StallguardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let timeouts = &config.timeouts;

    let limits = [
        ("request_headers_timeout_secs", timeouts.request_headers_timeout_secs),
        ("request_body_timeout_secs", timeouts.request_body_timeout_secs),
        ("keep_alive_timeout_secs", timeouts.keep_alive_timeout_secs),
        ("write_flush_timeout_secs", timeouts.write_flush_timeout_secs),
    ];

    for &(field, value) in &limits {
        if value == 0 {
            errors.push(ValidationError::ZeroLimit { field });
        }
    }

    if timeouts.heartbeat_interval_millis == 0 {
        errors.push(ValidationError::ZeroLimit {
            field: "heartbeat_interval_millis",
        });
    } else if let Some(shortest) = limits
        .iter()
        .map(|(_, secs)| secs * TICKS_PER_SECOND)
        .filter(|millis| *millis > 0)
        .min()
    {
        if timeouts.heartbeat_interval_millis > shortest {
            errors.push(ValidationError::HeartbeatTooCoarse {
                interval_millis: timeouts.heartbeat_interval_millis,
                shortest_millis: shortest,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(validate_config(&StallguardConfig::default()), Ok(()));
    }

    #[test]
    fn zero_limits_are_all_reported() {
        let mut config = StallguardConfig::default();
        config.timeouts.request_headers_timeout_secs = 0;
        config.timeouts.keep_alive_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::ZeroLimit {
            field: "request_headers_timeout_secs"
        }));
        assert!(errors.contains(&ValidationError::ZeroLimit {
            field: "keep_alive_timeout_secs"
        }));
    }

    #[test]
    fn coarse_heartbeat_is_rejected() {
        let mut config = StallguardConfig::default();
        config.timeouts.write_flush_timeout_secs = 2;
        config.timeouts.heartbeat_interval_millis = 5_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::HeartbeatTooCoarse {
                interval_millis: 5_000,
                shortest_millis: 2_000,
            }]
        );
    }
}
