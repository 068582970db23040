// File: crates/slotwise_gcal/src/handlers.rs
//! Axum handlers for the booking and authorization endpoints.

use crate::auth::{AuthError, AuthManager, ServiceTokenSource};
use crate::logic::{compute_availability, create_meeting, BookingRequest, MeetingConfirmation};
use crate::service::GoogleCalendarClient;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use slotwise_booking::WorkingHoursPolicy;
use slotwise_common::services::{CalendarProvider, CalendarSummary};
use slotwise_common::HttpStatusCode;
use slotwise_config::{AppConfig, GcalConfig};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_TIME_ZONE: &str = "UTC";
const DEFAULT_AVAILABILITY_DAYS: u32 = 14;

/// Resolves the configured calendar timezone. Called once at startup so a
/// typo in `gcal.time_zone` fails the boot instead of degrading every
/// request to UTC.
pub fn resolve_time_zone(config: &GcalConfig) -> Result<Tz, String> {
    let name = config.time_zone.as_deref().unwrap_or(DEFAULT_TIME_ZONE);
    Tz::from_str(name).map_err(|_| format!("Unknown gcal.time_zone '{name}'"))
}

/// Everything the booking endpoints need, injected from the composition
/// root. No globals; tests build one of these around doubles.
pub struct GcalState {
    pub config: Arc<AppConfig>,
    pub policy: Arc<WorkingHoursPolicy>,
    pub auth: Arc<AuthManager>,
    pub service_credential: Option<Arc<dyn ServiceTokenSource>>,
    pub provider: Arc<GoogleCalendarClient>,
    /// Validated at startup by [`resolve_time_zone`].
    pub time_zone: Tz,
}

impl GcalState {
    fn calendar_id(&self) -> &str {
        self.config
            .gcal
            .calendar_id
            .as_deref()
            .unwrap_or(DEFAULT_CALENDAR_ID)
    }

    fn redirect_uri(&self) -> Result<&str, (StatusCode, String)> {
        self.config.gcal.redirect_uri.as_deref().ok_or((
            StatusCode::SERVICE_UNAVAILABLE,
            "OAuth redirect URI is not configured".to_string(),
        ))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct AvailabilityQuery {
    /// First date to report, YYYY-MM-DD in the configured timezone.
    /// Defaults to today.
    pub start_date: Option<String>,
    /// Number of days to report. Defaults to 14, capped at the booking
    /// horizon.
    pub days: Option<u32>,
}

#[derive(Serialize, Debug)]
pub struct AvailabilityResponse {
    pub available_slots: std::collections::BTreeMap<NaiveDate, Vec<String>>,
    pub slot_duration_minutes: i64,
    pub timezone: String,
}

pub async fn availability_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, String)> {
    let tz = state.time_zone;

    let start_date = match query.start_date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                "Invalid start_date format, expected YYYY-MM-DD".to_string(),
            )
        })?,
        None => Utc::now().with_timezone(&tz).date_naive(),
    };

    let horizon = state.policy.max_advance().num_days().max(1) as u32;
    let days = query.days.unwrap_or(DEFAULT_AVAILABILITY_DAYS).min(horizon);

    // Busy pruning rides on the delegated credential when present; without
    // it availability is policy-only.
    let token = state.auth.access_token().await.ok();

    let available_slots = compute_availability(
        state.provider.as_ref(),
        token.as_deref(),
        state.policy.as_ref(),
        state.calendar_id(),
        tz,
        start_date,
        days,
    )
    .await;

    Ok(Json(AvailabilityResponse {
        available_slots,
        slot_duration_minutes: state.policy.slot_duration().num_minutes(),
        timezone: tz.name().to_string(),
    }))
}

pub async fn create_booking_handler(
    State(state): State<Arc<GcalState>>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<MeetingConfirmation>), (StatusCode, String)> {
    let confirmation = create_meeting(
        state.provider.as_ref(),
        state.auth.as_ref(),
        state.service_credential.as_deref(),
        state.policy.as_ref(),
        state.calendar_id(),
        state.time_zone.name(),
        &request,
    )
    .await
    .map_err(|e| {
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Booking creation failed: {e}");
        } else {
            info!("Booking rejected: {e}");
        }
        (status, e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(confirmation)))
}

#[derive(Serialize, Debug)]
pub struct AuthStatusResponse {
    pub authorized: bool,
    /// True when bookings would fall back to the service-account path.
    pub degraded_mode: bool,
}

pub async fn auth_status_handler(State(state): State<Arc<GcalState>>) -> Json<AuthStatusResponse> {
    let authorized = state.auth.is_authorized().await;
    Json(AuthStatusResponse {
        authorized,
        degraded_mode: !authorized && state.service_credential.is_some(),
    })
}

/// Starts the interactive grant flow by redirecting the operator's browser
/// to the provider consent screen.
pub async fn auth_start_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Redirect, (StatusCode, String)> {
    let redirect_uri = state.redirect_uri()?;
    let url = state.auth.begin_grant(redirect_uri).await.map_err(|e| match e {
        AuthError::NotConfigured => (
            StatusCode::SERVICE_UNAVAILABLE,
            "OAuth client credentials are not configured".to_string(),
        ),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;
    Ok(Redirect::temporary(url.as_str()))
}

/// Operator debug view: calendars visible to the delegated credential.
pub async fn list_calendars_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<Vec<CalendarSummary>>, (StatusCode, String)> {
    let token = state.auth.access_token().await.map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Delegated calendar authorization required".to_string(),
        )
    })?;
    let calendars = state
        .provider
        .list_calendars(&token)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(calendars))
}

#[derive(Deserialize, Debug)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Provider redirect target for the grant flow.
pub async fn auth_callback_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<AuthCallbackQuery>,
) -> impl IntoResponse {
    if let Some(denied) = query.error {
        return (
            StatusCode::BAD_REQUEST,
            format!("Authorization was not granted: {denied}"),
        );
    }
    let Some(code) = query.code else {
        return (
            StatusCode::BAD_REQUEST,
            "Missing authorization code".to_string(),
        );
    };

    let redirect_uri = match state.redirect_uri() {
        Ok(uri) => uri,
        Err((status, message)) => return (status, message),
    };
    match state.auth.complete_grant(&code, redirect_uri).await {
        Ok(()) => (
            StatusCode::OK,
            "Calendar authorization complete. You can close this window.".to_string(),
        ),
        Err(e) => {
            error!("Grant completion failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                "Authorization failed, please try again".to_string(),
            )
        }
    }
}
