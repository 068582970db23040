#[cfg(test)]
mod tests {
    use crate::policy::WorkingHoursPolicy;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;
    use slotwise_config::{BookingConfig, DayHoursConfig};
    use std::collections::HashMap;

    fn policy_with(slot_minutes: i64, buffer_minutes: i64) -> WorkingHoursPolicy {
        let mut work_hours = HashMap::new();
        for day in ["monday", "tuesday", "wednesday", "thursday", "friday"] {
            work_hours.insert(
                day.to_string(),
                DayHoursConfig {
                    start: "09:00".to_string(),
                    end: "17:00".to_string(),
                },
            );
        }
        let config = BookingConfig {
            work_hours,
            slot_duration_minutes: slot_minutes,
            buffer_minutes,
            min_advance_hours: 24,
            max_advance_days: 30,
            max_bookings_per_day: 8,
            blackout_dates: vec!["2026-05-01".to_string()],
            lunch_break: Some(DayHoursConfig {
                start: "12:00".to_string(),
                end: "13:00".to_string(),
            }),
        };
        WorkingHoursPolicy::from_config(&config).expect("valid config")
    }

    proptest! {
        #[test]
        fn every_slot_fits_the_open_window_and_avoids_lunch(
            day_offset in 0i64..366,
            slot_minutes in 5i64..120,
            buffer_minutes in 0i64..30,
        ) {
            let policy = policy_with(slot_minutes, buffer_minutes);
            let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + Duration::days(day_offset);
            let slots = policy.slots_for_day(date);

            if !policy.is_working_day(date) || policy.is_blackout(date) {
                prop_assert!(slots.is_empty());
            } else {
                let window = policy.working_hours(date).unwrap();
                for slot in &slots {
                    prop_assert!(window.start <= *slot && *slot < window.end);
                    prop_assert!(!policy.is_lunch(*slot));
                    // No partial slots: the full duration fits before close.
                    let end_min = slot.signed_duration_since(window.start).num_minutes()
                        + slot_minutes;
                    let window_min = window.end.signed_duration_since(window.start).num_minutes();
                    prop_assert!(end_min <= window_min);
                }
                // Slots are strictly increasing and restartable.
                let again = policy.slots_for_day(date);
                prop_assert_eq!(&slots, &again);
                for pair in slots.windows(2) {
                    prop_assert!(pair[0] < pair[1]);
                }
            }
        }
    }
}
