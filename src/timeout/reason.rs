//! Timeout categories.

use std::fmt;

/// Which protocol phase a timeout guards.
///
/// Exactly one reason may be armed on a tracker at a time; the fired reason
/// selects the protocol error code and the message surfaced to the
/// application boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutReason {
    /// A request's header block has started but not completed.
    RequestHeaders,
    /// A request body transfer has stalled.
    RequestBody,
    /// The connection is idle with no open streams.
    KeepAlive,
    /// The peer is not draining buffered response data.
    WriteFlush,
}

impl TimeoutReason {
    /// Short tag used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutReason::RequestHeaders => "request_headers",
            TimeoutReason::RequestBody => "request_body",
            TimeoutReason::KeepAlive => "keep_alive",
            TimeoutReason::WriteFlush => "write_flush",
        }
    }
}

impl fmt::Display for TimeoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable() {
        assert_eq!(TimeoutReason::RequestHeaders.as_str(), "request_headers");
        assert_eq!(TimeoutReason::KeepAlive.as_str(), "keep_alive");
    }
}
