//! Stream identity and the protocol error-code taxonomy.

use std::fmt;

use crate::timeout::TimeoutReason;

/// Identifier of one stream within a multiplexed connection.
///
/// `StreamId(0)` doubles as "no stream fully processed yet" in farewell
/// frames, matching the protocol's convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamId(pub u64);

impl StreamId {
    /// Get the raw stream number.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for StreamId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Protocol-level error codes carried on farewell and reset frames.
///
/// Numeric values are fixed by the protocol specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Voluntary termination, nothing went wrong.
    NoError,
    /// The server encountered an internal fault on this connection.
    InternalError,
    /// The request was abandoned before the server accepted it.
    RequestRejected,
}

impl ErrorCode {
    /// The on-wire numeric value.
    pub const fn code(self) -> u64 {
        match self {
            ErrorCode::NoError => 0x0100,
            ErrorCode::InternalError => 0x0102,
            ErrorCode::RequestRejected => 0x010b,
        }
    }

    /// The fixed mapping from fired timeout reason to error code.
    ///
    /// Premature client abandonment (headers, body) uniformly maps to
    /// `RequestRejected`; idle expiry is a voluntary close; a peer that will
    /// not drain writes is treated as an internal connection fault.
    pub const fn for_reason(reason: TimeoutReason) -> ErrorCode {
        match reason {
            TimeoutReason::RequestHeaders => ErrorCode::RequestRejected,
            TimeoutReason::RequestBody => ErrorCode::RequestRejected,
            TimeoutReason::KeepAlive => ErrorCode::NoError,
            TimeoutReason::WriteFlush => ErrorCode::InternalError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.code())
    }
}
