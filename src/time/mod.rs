//! Monotonic time primitives.
//!
//! # Data Flow
//! ```text
//! OS monotonic clock → SystemClock.now() → Tick
//!                                            → Heartbeat (read once per beat)
//!                                            → TimeoutTracker (deadline arithmetic)
//! ```
//!
//! # Design Decisions
//! - Ticks are opaque millisecond counts from an arbitrary epoch; only
//!   differences are meaningful
//! - The clock is read-only to this crate; it advances externally
//! - ManualClock is public so embedders can drive deterministic tests

pub mod clock;
pub mod tick;

pub use clock::{Clock, ManualClock, SystemClock};
pub use tick::Tick;
