//! Protocol boundary: stream identity, error codes, and the farewell sink.
//!
//! # Responsibilities
//! - Name the protocol-level error codes a timeout abort carries
//! - Map each timeout reason to its fixed error code
//! - Define the frame-layer capability the orchestrator sends through
//!
//! Frame encoding itself lives outside this crate; the sink trait is the
//! whole of the wire surface the abort path touches.

pub mod codes;
pub mod sink;

pub use codes::{ErrorCode, StreamId};
pub use sink::{FrameSink, SinkError};
