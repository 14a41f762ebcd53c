//! # fleet-id
//!
//! Typed identifiers used across the fleet scheduler.
//!
//! ## Two kinds of IDs
//!
//! - **Minted IDs** are generated by the scheduler itself. They use a
//!   prefixed ULID format, `{prefix}_{ulid}`, e.g.
//!   `task_01HV4Z4NYPLTRS0JTUA8XDME5F`.
//! - **Issued IDs** are handed to us by the resource manager (offers, agents,
//!   executors, the framework registration). We never generate them and
//!   never interpret their contents; they are opaque non-empty strings.
//!
//! Group keys are a third, user-controlled label: the upstream endpoint a
//! group of workers serves.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
