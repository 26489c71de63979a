//! Metrics collection.
//!
//! # Responsibilities
//! - Record timeout fires, aborts, and farewell outcomes
//! - Track the heartbeat's registered-tracker population
//!
//! # Metrics
//! - `stallguard_timeouts_fired_total` (counter): fires by reason
//! - `stallguard_aborts_total` (counter): abort sequences by reason and code
//! - `stallguard_farewell_frames_total` (counter): farewell sends by outcome
//! - `stallguard_registered_trackers` (gauge): current heartbeat population
//!
//! # Design Decisions
//! - Recorder-agnostic: the facade is a no-op until the host installs one
//! - Labels are static strings; no per-connection cardinality

use metrics::{counter, gauge};

use crate::timeout::TimeoutReason;
use crate::wire::ErrorCode;

/// Record a tracker deadline crossing and firing its handler.
pub fn record_timeout_fired(reason: TimeoutReason) {
    counter!("stallguard_timeouts_fired_total", "reason" => reason.as_str()).increment(1);
}

/// Record one executed abort sequence.
pub fn record_abort(reason: TimeoutReason, code: ErrorCode) {
    counter!(
        "stallguard_aborts_total",
        "reason" => reason.as_str(),
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record the outcome of a farewell-frame send attempt.
pub fn record_farewell(sent: bool) {
    let outcome = if sent { "sent" } else { "failed" };
    counter!("stallguard_farewell_frames_total", "outcome" => outcome).increment(1);
}

/// Update the registered-tracker gauge.
pub fn record_registered_trackers(count: usize) {
    gauge!("stallguard_registered_trackers").set(count as f64);
}
