// File: crates/slotwise_gcal/src/service.rs
//! Google Calendar REST client.
//!
//! Implements the provider-neutral `CalendarProvider` trait over the
//! Calendar v3 REST API. The bearer token comes in per call so the same
//! client serves the delegated and the service-account credential paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotwise_common::services::{
    BoxFuture, CalendarProvider, CalendarSummary, CreatedEvent, EventPayload, ProviderEvent,
};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
/// Provider error bodies are truncated to this many characters before they
/// can reach a log line or an error value.
const ERROR_SUMMARY_LIMIT: usize = 200;

/// Errors that can occur when talking to the Calendar API.
#[derive(Error, Debug)]
pub enum GcalApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Calendar API returned {code}: {summary}")]
    Status { code: u16, summary: String },
    #[error("Failed to decode Calendar API response: {0}")]
    Decode(String),
}

// --- Wire types (Calendar v3 JSON) ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireEventDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Serialize, Debug)]
struct WireAttendee {
    email: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireConferenceKey {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireConferenceCreateRequest {
    request_id: String,
    conference_solution_key: WireConferenceKey,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireConferenceData {
    create_request: WireConferenceCreateRequest,
}

#[derive(Serialize, Debug)]
struct WireReminderOverride {
    method: String,
    minutes: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireReminders {
    use_default: bool,
    overrides: Vec<WireReminderOverride>,
}

#[derive(Serialize, Debug, Default)]
struct WirePrivateProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Serialize, Debug)]
struct WireExtendedProperties {
    private: WirePrivateProperties,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireInsertEvent {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extended_properties: Option<WireExtendedProperties>,
    start: WireEventDateTime,
    end: WireEventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<WireAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conference_data: Option<WireConferenceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reminders: Option<WireReminders>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireEventTime {
    date_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireEntryPoint {
    entry_point_type: Option<String>,
    uri: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireConferenceInfo {
    #[serde(default)]
    entry_points: Vec<WireEntryPoint>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    html_link: Option<String>,
    hangout_link: Option<String>,
    start: Option<WireEventTime>,
    end: Option<WireEventTime>,
    conference_data: Option<WireConferenceInfo>,
}

#[derive(Deserialize, Debug)]
struct WireEventList {
    #[serde(default)]
    items: Vec<WireEvent>,
}

#[derive(Deserialize, Debug)]
struct WireCalendarEntry {
    id: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    primary: bool,
}

#[derive(Deserialize, Debug)]
struct WireCalendarList {
    #[serde(default)]
    items: Vec<WireCalendarEntry>,
}

fn meet_link_of(event: &WireEvent) -> Option<String> {
    if let Some(conference) = &event.conference_data {
        for entry in &conference.entry_points {
            if entry.entry_point_type.as_deref() == Some("video") {
                if let Some(uri) = &entry.uri {
                    return Some(uri.clone());
                }
            }
        }
    }
    event.hangout_link.clone()
}

fn bounded_summary(body: &str) -> String {
    body.chars().take(ERROR_SUMMARY_LIMIT).collect()
}

/// Google Calendar REST client with a bounded timeout on every call.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(timeout: std::time::Duration) -> Result<Self, GcalApiError> {
        Self::with_base_url(timeout, DEFAULT_BASE_URL)
    }

    /// Non-default base URL, for tests and API proxies.
    pub fn with_base_url(
        timeout: std::time::Duration,
        base_url: impl Into<String>,
    ) -> Result<Self, GcalApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GoogleCalendarClient {
            http,
            base_url: base_url.into(),
        })
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, GcalApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GcalApiError::Status {
            code: status.as_u16(),
            summary: bounded_summary(&body),
        })
    }
}

impl CalendarProvider for GoogleCalendarClient {
    type Error = GcalApiError;

    fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<ProviderEvent>, Self::Error> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);
        let access_token = access_token.to_string();

        Box::pin(async move {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&access_token)
                .query(&[
                    ("timeMin", time_min.to_rfc3339()),
                    ("timeMax", time_max.to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                ])
                .send()
                .await?;
            let response = Self::checked(response).await?;
            let list: WireEventList = response
                .json()
                .await
                .map_err(|e| GcalApiError::Decode(e.to_string()))?;

            Ok(list
                .items
                .into_iter()
                .map(|event| ProviderEvent {
                    id: event.id.clone().unwrap_or_default(),
                    summary: event.summary.clone(),
                    start: event.start.as_ref().and_then(|t| t.date_time),
                    end: event.end.as_ref().and_then(|t| t.date_time),
                    status: event.status.clone(),
                })
                .collect())
        })
    }

    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: EventPayload,
        notify_attendees: bool,
    ) -> BoxFuture<'_, CreatedEvent, Self::Error> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);
        let access_token = access_token.to_string();

        Box::pin(async move {
            let body = WireInsertEvent {
                summary: payload.summary,
                description: payload.description,
                extended_properties: payload.private_notes.map(|details| {
                    WireExtendedProperties {
                        private: WirePrivateProperties {
                            details: Some(details),
                        },
                    }
                }),
                start: WireEventDateTime {
                    date_time: payload.start_time.to_rfc3339(),
                    time_zone: payload.time_zone.clone(),
                },
                end: WireEventDateTime {
                    date_time: payload.end_time.to_rfc3339(),
                    time_zone: payload.time_zone.clone(),
                },
                attendees: payload
                    .attendees
                    .into_iter()
                    .map(|email| WireAttendee { email })
                    .collect(),
                conference_data: payload.conference_request_id.map(|request_id| {
                    WireConferenceData {
                        create_request: WireConferenceCreateRequest {
                            request_id,
                            conference_solution_key: WireConferenceKey {
                                kind: "hangoutsMeet".to_string(),
                            },
                        },
                    }
                }),
                reminders: if payload.reminders.is_empty() {
                    None
                } else {
                    Some(WireReminders {
                        use_default: false,
                        overrides: payload
                            .reminders
                            .into_iter()
                            .map(|r| WireReminderOverride {
                                method: r.method,
                                minutes: r.minutes,
                            })
                            .collect(),
                    })
                },
            };

            let response = self
                .http
                .post(&url)
                .bearer_auth(&access_token)
                .query(&[
                    ("conferenceDataVersion", "1"),
                    ("sendUpdates", if notify_attendees { "all" } else { "none" }),
                ])
                .json(&body)
                .send()
                .await?;
            let response = Self::checked(response).await?;
            let created: WireEvent = response
                .json()
                .await
                .map_err(|e| GcalApiError::Decode(e.to_string()))?;

            let meet_link = meet_link_of(&created);
            Ok(CreatedEvent {
                event_id: created.id.unwrap_or_default(),
                html_link: created.html_link,
                meet_link,
                status: created.status.unwrap_or_else(|| "confirmed".to_string()),
            })
        })
    }

    fn list_calendars(
        &self,
        access_token: &str,
    ) -> BoxFuture<'_, Vec<CalendarSummary>, Self::Error> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let access_token = access_token.to_string();

        Box::pin(async move {
            let response = self.http.get(&url).bearer_auth(&access_token).send().await?;
            let response = Self::checked(response).await?;
            let list: WireCalendarList = response
                .json()
                .await
                .map_err(|e| GcalApiError::Decode(e.to_string()))?;

            Ok(list
                .items
                .into_iter()
                .map(|entry| CalendarSummary {
                    id: entry.id.unwrap_or_default(),
                    summary: entry.summary,
                    primary: entry.primary,
                })
                .collect())
        })
    }
}
