// File: crates/slotwise_booking/src/validate.rs
//! Booking validation against the working-hours policy.
//!
//! Rejections are computed values, not exceptions: the orchestrator inspects
//! them and the HTTP layer surfaces the message verbatim to the end user.

use crate::policy::WorkingHoursPolicy;
use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Why a requested booking instant was rejected.
///
/// Precedence is fixed: the first failing check wins, so an instant that is
/// both too soon and outside hours always reports "too soon".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Bookings must be made at least {0} hours in advance")]
    TooSoon(i64),
    #[error("Bookings cannot be made more than {0} days in advance")]
    TooFarOut(i64),
    #[error("Selected day is not available for bookings")]
    NonWorkingDay,
    #[error("Selected date is not available")]
    BlackoutDate,
    #[error("Selected time is outside working hours ({} - {})",
        .start.format("%H:%M"), .end.format("%H:%M"))]
    OutsideHours { start: NaiveTime, end: NaiveTime },
    #[error("Selected time falls during lunch break")]
    LunchBreak,
}

/// Validates a candidate booking instant against every policy rule.
///
/// `now` is passed in rather than read from the clock so the function stays
/// pure. Callers must re-invoke this at creation time even when the same
/// instant already passed availability filtering: the min-advance check is
/// relative to a wall clock that keeps moving.
pub fn validate(
    policy: &WorkingHoursPolicy,
    candidate: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<(), RejectionReason> {
    if candidate < now + policy.min_advance() {
        return Err(RejectionReason::TooSoon(policy.min_advance().num_hours()));
    }
    if candidate > now + policy.max_advance() {
        return Err(RejectionReason::TooFarOut(policy.max_advance().num_days()));
    }

    let date = candidate.date();
    if !policy.is_working_day(date) {
        return Err(RejectionReason::NonWorkingDay);
    }
    if policy.is_blackout(date) {
        return Err(RejectionReason::BlackoutDate);
    }

    let time = candidate.time();
    // is_working_day passed, so the window exists.
    let Some(window) = policy.working_hours(date) else {
        return Err(RejectionReason::NonWorkingDay);
    };
    if time < window.start || time >= window.end {
        return Err(RejectionReason::OutsideHours {
            start: window.start,
            end: window.end,
        });
    }
    if policy.is_lunch(time) {
        return Err(RejectionReason::LunchBreak);
    }

    Ok(())
}
