//! Connection state and abort orchestration.
//!
//! # Data Flow
//! ```text
//! protocol phase events ──▶ ConnectionSupervisor ──arm/cancel──▶ TimeoutTracker
//!                                   ▲                                │
//!                                   │ (mpsc hand-off)                │ fire
//!                                   └────── AbortSignal ◀────────────┘
//!                                   │
//!                                   ▼
//!                     farewell frame ▸ stream resets ▸ typed failure
//! ```
//!
//! # Design Decisions
//! - One supervisor and one tracker per connection; stream-scoped timeouts
//!   reuse the connection's tracker with a scope tag
//! - The abort sequence runs on the connection's own task, never on the
//!   heartbeat task
//! - Aborting/closed connections ignore further fires (idempotent terminal
//!   state)

use std::sync::atomic::{AtomicU64, Ordering};

pub mod abort;
pub mod supervisor;

pub use abort::{AbortEvent, ConnectionTimedOut};
pub use supervisor::ConnectionSupervisor;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection lifecycle state.
///
/// `Open → AwaitingHeaders → Active → (GracefullyClosing | Aborting) → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport established, no protocol activity yet.
    Open,
    /// Waiting for the first request's complete header block.
    AwaitingHeaders,
    /// Processing requests.
    Active,
    /// Voluntary close under way (idle expiry or local drain).
    GracefullyClosing,
    /// Abort sequence under way.
    Aborting,
    /// Torn down.
    Closed,
}

impl ConnectionState {
    /// True once the connection is on its way out; further timeout fires and
    /// phase events are ignored from here.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionState::GracefullyClosing
                | ConnectionState::Aborting
                | ConnectionState::Closed
        )
    }
}

/// Header progress for a stream inside an `Active` connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamHeaderPhase {
    /// A header frame was observed but the block is incomplete.
    Partial,
    /// The header block finished.
    Complete,
}
