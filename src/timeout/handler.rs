//! The capability fired when a deadline is crossed.

use super::reason::TimeoutReason;

/// Receives fired timeouts from a [`TimeoutTracker`](super::TimeoutTracker).
///
/// Implemented by the connection layer and injected at tracker construction.
/// `on_timeout` is invoked from the heartbeat task and must not block or do
/// long-running work; implementors hand off to the connection's own task.
pub trait TimeoutHandler: Send + Sync {
    /// Called exactly once per armed deadline that expires.
    fn on_timeout(&self, reason: TimeoutReason);
}
