// File: crates/slotwise_common/src/lib.rs
//! Shared building blocks for the Slotwise crates: the calendar provider
//! abstraction, the shared error conventions and tracing setup.

pub mod error;
pub mod logging;
pub mod services;

pub use error::HttpStatusCode;
