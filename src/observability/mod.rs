//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracker / heartbeat / supervisor produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Whatever metrics recorder the host process installs
//! ```
//!
//! # Design Decisions
//! - Structured logging; the connection ID flows through every event
//! - Metric updates are cheap (facade macros over atomic recorders)
//! - No exporter lives here; recording is the host process's concern

pub mod logging;
pub mod metrics;
