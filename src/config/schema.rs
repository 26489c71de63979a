//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timeout::TimeoutReason;

/// Ticks per second of wall time (ticks are milliseconds).
pub const TICKS_PER_SECOND: u64 = 1_000;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StallguardConfig {
    /// Timeout policy per protocol phase.
    pub timeouts: TimeoutConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Timeout policy: how long each protocol phase may stall.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a connection may wait for a complete request header block.
    pub request_headers_timeout_secs: u64,

    /// How long a request body transfer may stall.
    pub request_body_timeout_secs: u64,

    /// How long a connection may sit idle with no open streams.
    pub keep_alive_timeout_secs: u64,

    /// How long the peer may take to drain buffered response data.
    pub write_flush_timeout_secs: u64,

    /// Interval between heartbeat beats, in milliseconds.
    pub heartbeat_interval_millis: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_headers_timeout_secs: 30,
            request_body_timeout_secs: 120,
            keep_alive_timeout_secs: 130,
            write_flush_timeout_secs: 15,
            heartbeat_interval_millis: 1_000,
        }
    }
}

impl TimeoutConfig {
    /// The configured limit for `reason`, in ticks. The single policy lookup
    /// used when arming a tracker.
    pub fn ticks_for(&self, reason: TimeoutReason) -> u64 {
        let secs = match reason {
            TimeoutReason::RequestHeaders => self.request_headers_timeout_secs,
            TimeoutReason::RequestBody => self.request_body_timeout_secs,
            TimeoutReason::KeepAlive => self.keep_alive_timeout_secs,
            TimeoutReason::WriteFlush => self.write_flush_timeout_secs,
        };
        secs * TICKS_PER_SECOND
    }

    /// Heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_millis)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON-formatted logs instead of the human-readable format.
    pub log_json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_reason() {
        let config = TimeoutConfig::default();
        assert_eq!(config.ticks_for(TimeoutReason::RequestHeaders), 30_000);
        assert_eq!(config.ticks_for(TimeoutReason::RequestBody), 120_000);
        assert_eq!(config.ticks_for(TimeoutReason::KeepAlive), 130_000);
        assert_eq!(config.ticks_for(TimeoutReason::WriteFlush), 15_000);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
    }

    #[test]
    fn minimal_toml_round_trips() {
        let config: StallguardConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeouts.request_headers_timeout_secs, 30);
        assert_eq!(config.observability.log_level, "info");

        let config: StallguardConfig = toml::from_str(
            "[timeouts]\nrequest_headers_timeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(config.timeouts.request_headers_timeout_secs, 5);
        // untouched fields keep their defaults
        assert_eq!(config.timeouts.keep_alive_timeout_secs, 130);
    }
}
