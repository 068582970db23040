// File: crates/slotwise_config/src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Wall-clock open/close pair for one weekday, "HH:MM" strings.
/// Parsed into `NaiveTime` by the policy layer so config stays plain text.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DayHoursConfig {
    pub start: String,
    pub end: String,
}

fn default_slot_duration() -> i64 {
    30
}
fn default_min_advance_hours() -> i64 {
    24
}
fn default_max_advance_days() -> i64 {
    30
}
fn default_max_bookings_per_day() -> u32 {
    8
}

// --- Booking Policy Config ---
// Weekday keys are lowercase English names ("monday".."sunday");
// a missing key means the day is closed.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingConfig {
    #[serde(default)]
    pub work_hours: HashMap<String, DayHoursConfig>,
    #[serde(default = "default_slot_duration")]
    pub slot_duration_minutes: i64,
    /// Minutes of padding added between consecutive slots. Default zero.
    #[serde(default)]
    pub buffer_minutes: i64,
    #[serde(default = "default_min_advance_hours")]
    pub min_advance_hours: i64,
    #[serde(default = "default_max_advance_days")]
    pub max_advance_days: i64,
    /// Advisory cap only; no counting mechanism enforces it.
    #[serde(default = "default_max_bookings_per_day")]
    pub max_bookings_per_day: u32,
    /// Holidays and vacations, "YYYY-MM-DD".
    #[serde(default)]
    pub blackout_dates: Vec<String>,
    #[serde(default)]
    pub lunch_break: Option<DayHoursConfig>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        BookingConfig {
            work_hours: HashMap::new(),
            slot_duration_minutes: default_slot_duration(),
            buffer_minutes: 0,
            min_advance_hours: default_min_advance_hours(),
            max_advance_days: default_max_advance_days(),
            max_bookings_per_day: default_max_bookings_per_day(),
            blackout_dates: Vec::new(),
            lunch_break: None,
        }
    }
}

// --- Google Calendar Config ---
// Holds non-secret GCal config. The OAuth client secret is loaded
// directly from the GCAL_OAUTH_CLIENT_SECRET env var.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GcalConfig {
    /// Delegated calendar to book into; `primary` if unset.
    pub calendar_id: Option<String>,
    /// IANA timezone the working hours are expressed in.
    pub time_zone: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Where the delegated token blob is persisted between restarts.
    pub token_file: Option<String>,
    /// Service account key for the degraded creation path.
    pub service_account_key_path: Option<String>,
    /// Upper bound on every outbound provider call, seconds.
    pub request_timeout_secs: Option<u64>,
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    #[serde(default)]
    pub use_gcal: bool,

    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub gcal: GcalConfig,
}
