//! Stall detection and coordinated abort for multiplexed connections.
//!
//! # Architecture Overview
//!
//! ```text
//!  Clock ──▶ Heartbeat ──tick──▶ TimeoutTracker ──on_timeout──▶ ConnectionSupervisor
//!              │ (one task)        (one per conn)    (channel       │
//!              │                                      hand-off)     ▼
//!              └── registration set              farewell frame + stream resets
//!                                                + typed failure at the app boundary
//! ```
//!
//! One cooperative heartbeat task drives every connection's timeout tracker;
//! no per-connection OS timers. A fired timeout is handed off to the owning
//! connection's task, which executes the protocol abort sequence exactly once.

// Core subsystems
pub mod config;
pub mod connection;
pub mod heartbeat;
pub mod observability;
pub mod time;
pub mod timeout;
pub mod wire;

pub use config::StallguardConfig;
pub use connection::ConnectionSupervisor;
pub use heartbeat::Heartbeat;
pub use time::{Clock, Tick};
pub use timeout::{TimeoutHandler, TimeoutReason, TimeoutTracker};
