//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → StallguardConfig (validated, immutable)
//!     → shared via Arc / by value to the heartbeat and supervisors
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ObservabilityConfig;
pub use schema::StallguardConfig;
pub use schema::TimeoutConfig;
