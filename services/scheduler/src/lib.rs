//! fleet scheduler library.
//!
//! This crate primarily ships a `fleet-scheduler` binary, but we expose a
//! small library surface to enable integration testing and reuse.

pub mod api;
pub mod config;
pub mod factory;
pub mod gateway;
pub mod scheduler;
pub mod state;
pub mod store;
