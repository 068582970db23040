// File: crates/slotwise_gcal/src/logic.rs
//! Booking orchestration: availability computation, conflict checking, and
//! meeting creation over whichever credential path is currently usable.
//!
//! The two failure disciplines live here and are deliberate. Conflict checks
//! fail OPEN (a provider outage must not block the booking form), meeting
//! creation fails CLOSED (never claim success for an event that was not
//! written to the calendar).

use crate::auth::{AuthManager, ServiceTokenSource};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use slotwise_booking::{validate, RejectionReason, WorkingHoursPolicy};
use slotwise_common::services::{CalendarProvider, EventPayload, ProviderEvent, ReminderOverride};
use slotwise_common::HttpStatusCode;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Intake form submitted with every booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
    pub role: String,
    pub industry: String,
    #[serde(default)]
    pub website: Option<String>,
    pub goals: String,
    #[serde(default)]
    pub how_did_you_hear: Option<String>,
    /// YYYY-MM-DD in the requester's timezone.
    pub meeting_date: String,
    /// HH:MM in the requester's timezone.
    pub meeting_time: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Error, Debug)]
pub enum CreationError {
    #[error("{0}")]
    PolicyRejection(#[from] RejectionReason),
    #[error("This time slot is already booked. Please choose another time.")]
    SlotTaken,
    #[error("Calendar integration is not configured")]
    NotConfigured,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Calendar provider error: {0}")]
    Provider(String),
}

impl HttpStatusCode for CreationError {
    fn status_code(&self) -> u16 {
        match self {
            CreationError::PolicyRejection(_) | CreationError::InvalidRequest(_) => 400,
            CreationError::SlotTaken => 409,
            CreationError::NotConfigured => 503,
            CreationError::Provider(_) => 502,
        }
    }
}

/// What the booker gets back after a successful creation.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingConfirmation {
    pub event_id: String,
    pub event_link: Option<String>,
    pub meet_link: Option<String>,
    pub attendee_email: String,
    pub message: String,
}

/// The two ways a booking materializes as a calendar event, tagged by the
/// credential that writes it. Both variants flow through one payload builder
/// so the field-by-field differences stay visible in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPlan {
    /// Full-featured: attendee invites, auto-provisioned video conference,
    /// email and popup reminders, intake details kept operator-only.
    Delegated { conference_request_id: String },
    /// Degraded: no invites and no conference (the service account acts as
    /// itself), so intake details are inlined into the description the
    /// operator reads.
    ServiceAccount,
}

impl EventPlan {
    pub fn delegated() -> Self {
        EventPlan::Delegated {
            conference_request_id: format!("slotwise-{}", Uuid::new_v4()),
        }
    }

    pub fn notify_attendees(&self) -> bool {
        matches!(self, EventPlan::Delegated { .. })
    }

    /// Renders the booking into a provider payload for this plan.
    pub fn build_payload(
        &self,
        request: &BookingRequest,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        time_zone: &str,
    ) -> EventPayload {
        let summary = format!("Strategy Call - {}", request.company_name);
        let details = intake_details(request);

        match self {
            EventPlan::Delegated {
                conference_request_id,
            } => EventPayload {
                summary,
                description: Some(format!(
                    "Meeting booked via Slotwise.\n\nGoals: {}",
                    request.goals
                )),
                private_notes: Some(details),
                start_time,
                end_time,
                time_zone: time_zone.to_string(),
                attendees: vec![request.email.clone()],
                conference_request_id: Some(conference_request_id.clone()),
                reminders: vec![
                    ReminderOverride {
                        method: "email".to_string(),
                        minutes: 24 * 60,
                    },
                    ReminderOverride {
                        method: "email".to_string(),
                        minutes: 60,
                    },
                    ReminderOverride {
                        method: "popup".to_string(),
                        minutes: 10,
                    },
                ],
            },
            EventPlan::ServiceAccount => EventPayload {
                summary,
                description: Some(details),
                private_notes: None,
                start_time,
                end_time,
                time_zone: time_zone.to_string(),
                attendees: Vec::new(),
                conference_request_id: None,
                reminders: vec![ReminderOverride {
                    method: "popup".to_string(),
                    minutes: 10,
                }],
            },
        }
    }
}

fn intake_details(request: &BookingRequest) -> String {
    let mut lines = vec![
        format!("Name: {}", request.full_name),
        format!("Email: {}", request.email),
        format!("Phone: {}", request.phone),
        format!("Company: {}", request.company_name),
        format!("Role: {}", request.role),
        format!("Industry: {}", request.industry),
    ];
    if let Some(website) = &request.website {
        lines.push(format!("Website: {website}"));
    }
    lines.push(format!("Goals: {}", request.goals));
    if let Some(source) = &request.how_did_you_hear {
        lines.push(format!("How they heard of us: {source}"));
    }
    lines.join("\n")
}

fn parse_timezone(raw: Option<&str>, default_tz: &str) -> Result<Tz, CreationError> {
    let name = raw.unwrap_or(default_tz);
    Tz::from_str(name)
        .map_err(|_| CreationError::InvalidRequest(format!("Unknown timezone '{name}'")))
}

fn parse_local_instant(request: &BookingRequest) -> Result<NaiveDateTime, CreationError> {
    let date = NaiveDate::parse_from_str(&request.meeting_date, "%Y-%m-%d").map_err(|_| {
        CreationError::InvalidRequest("Invalid meetingDate format, expected YYYY-MM-DD".to_string())
    })?;
    let time = NaiveTime::parse_from_str(&request.meeting_time, "%H:%M").map_err(|_| {
        CreationError::InvalidRequest("Invalid meetingTime format, expected HH:MM".to_string())
    })?;
    Ok(date.and_time(time))
}

fn to_utc(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, CreationError> {
    // DST gaps have no valid local instant; ambiguous times take the earlier.
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            CreationError::InvalidRequest(
                "Selected time does not exist in the requested timezone".to_string(),
            )
        })
}

fn overlaps(event: &ProviderEvent, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    if event.status.as_deref() == Some("cancelled") {
        return false;
    }
    match (event.start, event.end) {
        (Some(event_start), Some(event_end)) => event_start < end && event_end > start,
        // All-day or malformed events: treat as busy to be safe.
        _ => true,
    }
}

/// Fail-open conflict probe for the creation path.
///
/// Returns `false` (no conflict) when the provider cannot be reached; the
/// booking form must not go dark because the calendar API flaked. The insert
/// that follows is the fail-closed backstop.
pub async fn has_conflict<P: CalendarProvider>(
    provider: &P,
    access_token: &str,
    calendar_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    match provider.list_events(access_token, calendar_id, start, end).await {
        Ok(events) => events.iter().any(|event| overlaps(event, start, end)),
        Err(e) => {
            warn!("Conflict check failed, treating slot as free: {e}");
            false
        }
    }
}

/// Creates the calendar event for a booking.
///
/// Credential strategy is strict: the delegated credential is used whenever
/// it is authorized, the service account only when it is not, and with
/// neither usable the request is refused rather than silently queued.
///
/// Known race: between the conflict probe and the insert another booking can
/// land in the same slot. The provider accepts both; operators resolve the
/// double booking manually. Closing it would need provider-side transactional
/// booking, which the events API does not offer.
#[allow(clippy::too_many_arguments)]
pub async fn create_meeting<P: CalendarProvider>(
    provider: &P,
    auth: &AuthManager,
    service_credential: Option<&dyn ServiceTokenSource>,
    policy: &WorkingHoursPolicy,
    calendar_id: &str,
    default_tz: &str,
    request: &BookingRequest,
) -> Result<MeetingConfirmation, CreationError> {
    let tz = parse_timezone(request.timezone.as_deref(), default_tz)?;
    let local = parse_local_instant(request)?;

    let now_local = Utc::now().with_timezone(&tz).naive_local();
    validate(policy, local, now_local)?;

    let start = to_utc(local, tz)?;
    let end = start + policy.slot_duration();
    let tz_name = tz.name();

    if let Ok(token) = auth.access_token().await {
        if has_conflict(provider, &token, calendar_id, start, end).await {
            return Err(CreationError::SlotTaken);
        }

        let plan = EventPlan::delegated();
        let payload = plan.build_payload(request, start, end, tz_name);
        let created = provider
            .insert_event(&token, calendar_id, payload, plan.notify_attendees())
            .await
            .map_err(|e| CreationError::Provider(e.to_string()))?;

        info!(event_id = %created.event_id, "Created delegated calendar event");
        return Ok(MeetingConfirmation {
            event_id: created.event_id,
            event_link: created.html_link,
            meet_link: created.meet_link,
            attendee_email: request.email.clone(),
            message: format!(
                "Meeting booked! A calendar invite has been sent to {}",
                request.email
            ),
        });
    }

    let Some(credential) = service_credential else {
        return Err(CreationError::NotConfigured);
    };
    let token = credential
        .access_token()
        .await
        .map_err(|e| CreationError::Provider(e.to_string()))?;

    let plan = EventPlan::ServiceAccount;
    let payload = plan.build_payload(request, start, end, tz_name);
    let created = provider
        .insert_event(&token, calendar_id, payload, plan.notify_attendees())
        .await
        .map_err(|e| CreationError::Provider(e.to_string()))?;

    info!(event_id = %created.event_id, "Created degraded calendar event");
    Ok(MeetingConfirmation {
        event_id: created.event_id,
        event_link: created.html_link,
        meet_link: None,
        attendee_email: request.email.clone(),
        message: format!(
            "Event created! Manually add Google Meet and invite {}",
            request.email
        ),
    })
}

/// Computes bookable slots per day over a date range.
///
/// Policy pruning is exact; busy-time pruning is fail-open with a single
/// provider fetch for the whole range (or none at all when no credential is
/// usable, in which case every policy-valid slot is shown).
pub async fn compute_availability<P: CalendarProvider>(
    provider: &P,
    access_token: Option<&str>,
    policy: &WorkingHoursPolicy,
    calendar_id: &str,
    tz: Tz,
    start_date: NaiveDate,
    days: u32,
) -> BTreeMap<NaiveDate, Vec<String>> {
    let now_local = Utc::now().with_timezone(&tz).naive_local();

    let busy: Vec<ProviderEvent> = match access_token {
        Some(token) => {
            let range_start = start_date.and_time(NaiveTime::MIN);
            let range_end = range_start + Duration::days(i64::from(days));
            match (
                tz.from_local_datetime(&range_start).earliest(),
                tz.from_local_datetime(&range_end).earliest(),
            ) {
                (Some(min), Some(max)) => {
                    match provider
                        .list_events(
                            token,
                            calendar_id,
                            min.with_timezone(&Utc),
                            max.with_timezone(&Utc),
                        )
                        .await
                    {
                        Ok(events) => events,
                        Err(e) => {
                            warn!("Availability busy-fetch failed, showing policy slots: {e}");
                            Vec::new()
                        }
                    }
                }
                _ => Vec::new(),
            }
        }
        None => Vec::new(),
    };

    let mut out = BTreeMap::new();
    for offset in 0..days {
        let date = start_date + Duration::days(i64::from(offset));
        let slots: Vec<String> = policy
            .slots_for_day(date)
            .into_iter()
            .filter(|time| validate(policy, date.and_time(*time), now_local).is_ok())
            .filter(|time| {
                let local = date.and_time(*time);
                match to_utc(local, tz) {
                    Ok(start) => {
                        let end = start + policy.slot_duration();
                        !busy.iter().any(|event| overlaps(event, start, end))
                    }
                    // Slot swallowed by a DST gap.
                    Err(_) => false,
                }
            })
            .map(|time| time.format("%H:%M").to_string())
            .collect();
        out.insert(date, slots);
    }
    out
}
