//! # fleet-events
//!
//! Data delivered to the scheduler by the resource manager.
//!
//! ## Design Principles
//!
//! - Offers and statuses are immutable once delivered
//! - Every callback the resource manager can make is one variant of
//!   [`SchedulerEvent`], carrying its own payload type
//! - Events serialize as internally tagged JSON (`{"type": "status_update", ...}`)
//!   so a driver sidecar can speak to the scheduler without sharing code
//!
//! ## Event Kinds
//!
//! - Lifecycle: `registered`, `reregistered`, `disconnected`, `error`
//! - Offers: `offers_received`, `offer_rescinded`
//! - Tasks: `status_update`, `framework_message`
//! - Failures: `slave_lost`, `executor_lost`

mod error;
mod event;
mod types;

pub use error::EventError;
pub use event::*;
pub use types::*;
