// File: crates/slotwise_common/src/services.rs
//! Service abstractions for the external calendar provider.
//!
//! The booking core never talks to Google directly; it goes through the
//! `CalendarProvider` trait so tests can swap in an in-memory double and a
//! future provider only needs a new implementation of this trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// How an event reminder should fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderOverride {
    /// "email" or "popup".
    pub method: String,
    pub minutes: i64,
}

/// Provider-neutral description of an event to insert.
///
/// The privacy split lives here: `description` is what invited attendees see,
/// `private_notes` lands in an operator-only field on the provider side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    pub description: Option<String>,
    /// Operator-only intake details; never visible to attendees.
    pub private_notes: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// IANA timezone the event is rendered in.
    pub time_zone: String,
    /// Attendee email addresses to invite.
    pub attendees: Vec<String>,
    /// When set, ask the provider to auto-provision a video conference
    /// under this request id.
    pub conference_request_id: Option<String>,
    pub reminders: Vec<ReminderOverride>,
}

/// A calendar event as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

/// The provider's answer to an insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub event_id: String,
    /// Browsable link to the event.
    pub html_link: Option<String>,
    /// Video-conference join link, when one was provisioned.
    pub meet_link: Option<String>,
    pub status: String,
}

/// One calendar visible to the acting credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSummary {
    pub id: String,
    pub summary: Option<String>,
    pub primary: bool,
}

/// A trait for calendar provider operations.
///
/// The bearer token is passed per call: token ownership stays with the
/// authorization lifecycle manager, and the same client serves both the
/// delegated and the service-credential paths.
pub trait CalendarProvider: Send + Sync {
    /// Error type returned by provider operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// List events overlapping `[time_min, time_max)` in a calendar.
    fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<ProviderEvent>, Self::Error>;

    /// Insert an event. `notify_attendees` asks the provider to send invites.
    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: EventPayload,
        notify_attendees: bool,
    ) -> BoxFuture<'_, CreatedEvent, Self::Error>;

    /// List calendars visible to the acting credential.
    fn list_calendars(&self, access_token: &str)
        -> BoxFuture<'_, Vec<CalendarSummary>, Self::Error>;
}
