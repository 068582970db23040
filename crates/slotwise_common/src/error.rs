// File: crates/slotwise_common/src/error.rs
//! Cross-crate error conventions.
//!
//! Feature crates keep their own thiserror enums; this trait is the shared
//! contract for mapping them onto HTTP status codes at the handler boundary.

/// Maps a domain error onto the HTTP status it should surface as.
///
/// User-recoverable rejections are 4xx, provider trouble is 502, and a
/// missing credential or integration is 503.
pub trait HttpStatusCode {
    fn status_code(&self) -> u16;
}
