//! Per-connection timeout tracking.
//!
//! # Responsibilities
//! - Classify which protocol phase a timeout guards (reason)
//! - Hold at most one armed deadline per connection and fire it exactly once
//! - Expose the handler capability the connection layer implements
//!
//! # Data Flow
//! ```text
//! connection I/O context:  set_timeout / cancel_timeout
//!                                    │
//!                                    ▼        (one mutex per tracker)
//! heartbeat task:  tick(now) ──▶ TimeoutTracker ──▶ TimeoutHandler.on_timeout
//! ```
//!
//! # Design Decisions
//! - A single tracker per connection; the reason tag distinguishes which
//!   phase (and which stream) armed it
//! - Last writer wins on re-arm; arming never stacks or queues deadlines
//! - The handler is injected at construction, not subscribed dynamically

pub mod handler;
pub mod reason;
pub mod tracker;

pub use handler::TimeoutHandler;
pub use reason::TimeoutReason;
pub use tracker::{TimeoutTracker, TrackerError, TrackerId};
