//! Abort events and the failure type surfaced to the application boundary.

use thiserror::Error;

use crate::timeout::TimeoutReason;
use crate::wire::{ErrorCode, StreamId};

/// A fired timeout translated into protocol terms.
///
/// Produced once per fire, consumed exactly once by the supervisor's abort
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortEvent {
    /// Which phase timed out.
    pub reason: TimeoutReason,
    /// The stream whose phase armed the timeout, when narrower than the
    /// connection.
    pub stream: Option<StreamId>,
    /// Error code applied to the farewell and stream resets.
    pub code: ErrorCode,
    /// Human-readable description for logs and the surfaced failure.
    pub message: &'static str,
}

impl AbortEvent {
    /// Build the event for a fired reason via the fixed code mapping.
    pub fn for_reason(reason: TimeoutReason, stream: Option<StreamId>) -> Self {
        Self {
            reason,
            stream,
            code: ErrorCode::for_reason(reason),
            message: reason_message(reason),
        }
    }
}

fn reason_message(reason: TimeoutReason) -> &'static str {
    match reason {
        TimeoutReason::RequestHeaders => {
            "request headers were not received within the configured limit"
        }
        TimeoutReason::RequestBody => "request body stalled beyond the configured limit",
        TimeoutReason::KeepAlive => "connection was idle past the keep-alive limit",
        TimeoutReason::WriteFlush => {
            "peer failed to drain the response write buffer in time"
        }
    }
}

/// Typed failure observed at the application boundary when a timeout tears a
/// connection down.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("connection timed out ({reason}): {message}")]
pub struct ConnectionTimedOut {
    /// Which phase timed out.
    pub reason: TimeoutReason,
    /// Stream scope, when narrower than the connection.
    pub stream: Option<StreamId>,
    /// Error code the peer was given.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

impl From<&AbortEvent> for ConnectionTimedOut {
    fn from(event: &AbortEvent) -> Self {
        Self {
            reason: event.reason,
            stream: event.stream,
            code: event.code,
            message: event.message.to_string(),
        }
    }
}
