// File: crates/slotwise_gcal/src/lib.rs
//! Google Calendar integration: authorization lifecycle, REST client, and
//! the booking orchestration plus its HTTP surface.

pub mod auth;
pub mod handlers;
pub mod logic;
pub mod routes;
pub mod service;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod handlers_test;
