// File: crates/slotwise_booking/src/policy.rs
//! The working-hours policy: which days are open, when, and how candidate
//! slots are cut from the open window.
//!
//! Everything in here is pure and deterministic. No clock reads; "now" only
//! enters the picture in [`crate::validate`].

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use slotwise_config::{BookingConfig, DayHoursConfig};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Invalid time '{0}' in booking config (expected HH:MM)")]
    InvalidTime(String),
    #[error("Invalid blackout date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("Unknown weekday '{0}' in work_hours")]
    UnknownWeekday(String),
    #[error("Working hours on {0} must start before they end")]
    EmptyWindow(Weekday),
    #[error("slot_duration_minutes must be positive")]
    NonPositiveSlotDuration,
}

/// Open/close wall-clock pair for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Immutable booking policy, validated once at startup.
#[derive(Debug, Clone)]
pub struct WorkingHoursPolicy {
    /// Indexed by `Weekday::num_days_from_monday()`. `None` = closed.
    hours: [Option<DayHours>; 7],
    slot_duration: Duration,
    /// Inter-meeting buffer added to the step size. Default zero.
    buffer: Duration,
    lunch: Option<DayHours>,
    blackout_dates: BTreeSet<NaiveDate>,
    min_advance: Duration,
    max_advance: Duration,
    /// Advisory cap carried from config; nothing counts against it.
    max_bookings_per_day: u32,
}

fn parse_time(raw: &str) -> Result<NaiveTime, PolicyError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| PolicyError::InvalidTime(raw.to_string()))
}

fn parse_window(raw: &DayHoursConfig, day: Weekday) -> Result<DayHours, PolicyError> {
    let start = parse_time(&raw.start)?;
    let end = parse_time(&raw.end)?;
    if start >= end {
        return Err(PolicyError::EmptyWindow(day));
    }
    Ok(DayHours { start, end })
}

fn weekday_from_key(key: &str) -> Option<Weekday> {
    match key {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

impl WorkingHoursPolicy {
    pub fn from_config(config: &BookingConfig) -> Result<Self, PolicyError> {
        if config.slot_duration_minutes <= 0 {
            return Err(PolicyError::NonPositiveSlotDuration);
        }

        let mut hours: [Option<DayHours>; 7] = [None; 7];
        for (key, window) in &config.work_hours {
            let day = weekday_from_key(key)
                .ok_or_else(|| PolicyError::UnknownWeekday(key.clone()))?;
            hours[day.num_days_from_monday() as usize] = Some(parse_window(window, day)?);
        }

        let lunch = config
            .lunch_break
            .as_ref()
            .map(|window| {
                let start = parse_time(&window.start)?;
                let end = parse_time(&window.end)?;
                Ok(DayHours { start, end })
            })
            .transpose()?;

        let mut blackout_dates = BTreeSet::new();
        for raw in &config.blackout_dates {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| PolicyError::InvalidDate(raw.clone()))?;
            blackout_dates.insert(date);
        }

        Ok(WorkingHoursPolicy {
            hours,
            slot_duration: Duration::minutes(config.slot_duration_minutes),
            buffer: Duration::minutes(config.buffer_minutes.max(0)),
            lunch,
            blackout_dates,
            min_advance: Duration::hours(config.min_advance_hours),
            max_advance: Duration::days(config.max_advance_days),
            max_bookings_per_day: config.max_bookings_per_day,
        })
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.hours[date.weekday().num_days_from_monday() as usize].is_some()
    }

    pub fn working_hours(&self, date: NaiveDate) -> Option<DayHours> {
        self.hours[date.weekday().num_days_from_monday() as usize]
    }

    pub fn is_blackout(&self, date: NaiveDate) -> bool {
        self.blackout_dates.contains(&date)
    }

    pub fn is_lunch(&self, time: NaiveTime) -> bool {
        match self.lunch {
            Some(lunch) => lunch.start <= time && time < lunch.end,
            None => false,
        }
    }

    pub fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    pub fn min_advance(&self) -> Duration {
        self.min_advance
    }

    pub fn max_advance(&self) -> Duration {
        self.max_advance
    }

    pub fn max_bookings_per_day(&self) -> u32 {
        self.max_bookings_per_day
    }

    /// Generates all candidate start-times for one date, in order.
    ///
    /// Empty on closed or blackout days. Walks the open window in steps of
    /// slot duration plus buffer; a slot whose end would pass the closing
    /// time is not emitted, and lunch times are skipped.
    pub fn slots_for_day(&self, date: NaiveDate) -> Vec<NaiveTime> {
        if !self.is_working_day(date) || self.is_blackout(date) {
            return Vec::new();
        }
        let Some(window) = self.working_hours(date) else {
            return Vec::new();
        };

        // Walk in minutes from midnight; NaiveTime arithmetic wraps at
        // midnight, which would corrupt the closing-time comparison.
        let start_min = window
            .start
            .signed_duration_since(NaiveTime::MIN)
            .num_minutes();
        let end_min = window.end.signed_duration_since(NaiveTime::MIN).num_minutes();
        let slot_min = self.slot_duration.num_minutes();
        let step_min = slot_min + self.buffer.num_minutes();

        let mut slots = Vec::new();
        let mut cursor = start_min;
        while cursor + slot_min <= end_min {
            let time = NaiveTime::MIN + Duration::minutes(cursor);
            if !self.is_lunch(time) {
                slots.push(time);
            }
            cursor += step_min;
        }
        slots
    }
}
