//! The frame-layer capability the abort path sends through.

use thiserror::Error;

use super::codes::{ErrorCode, StreamId};

/// Errors from the frame layer when queueing an outbound frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The transport is already gone; the frame was never queued.
    #[error("transport already closed")]
    TransportClosed,

    /// The frame layer refused the frame.
    #[error("frame rejected by transport: {0}")]
    Rejected(String),
}

/// Outbound frame primitives implemented by the (external) frame layer.
///
/// Both operations are non-blocking enqueues. From the orchestrator's view
/// they are best-effort and fire-and-forget: a failure means the peer will
/// not see the notice, and local teardown proceeds regardless.
pub trait FrameSink: Send + Sync {
    /// Queue a farewell frame advertising the last fully processed stream.
    fn send_go_away(&self, last_processed: StreamId) -> Result<(), SinkError>;

    /// Queue a reset for one stream with the given error code.
    fn reset_stream(&self, id: StreamId, code: ErrorCode) -> Result<(), SinkError>;
}
