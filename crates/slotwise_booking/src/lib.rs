// File: crates/slotwise_booking/src/lib.rs
// Declare modules within this crate
pub mod policy;
#[cfg(test)]
mod slots_proptest;
pub mod validate;

pub use policy::{DayHours, PolicyError, WorkingHoursPolicy};
pub use validate::{validate, RejectionReason};
