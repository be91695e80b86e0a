//! Date arithmetic for recurrence intervals.
//!
//! Month and year steps are calendar-aware: the day of month is clamped
//! to the target month's length, so Jan 31 + 1 month is Feb 29 in a leap
//! year and Feb 28 otherwise.

use chrono::{Datelike, Duration, NaiveDate};
use gearbox_store::types::FrequencyUnit;

/// Move `base` forward by `quantity` units.
pub fn advance(base: NaiveDate, quantity: i64, unit: FrequencyUnit) -> NaiveDate {
    match unit {
        FrequencyUnit::Days => base + Duration::days(quantity),
        FrequencyUnit::Weeks => base + Duration::weeks(quantity),
        FrequencyUnit::Months => add_months(base, quantity),
        FrequencyUnit::Years => add_months(base, quantity * 12),
    }
}

fn add_months(base: NaiveDate, months: i64) -> NaiveDate {
    let total = base.year() as i64 * 12 + base.month0() as i64 + months;
    let year = total.div_euclid(12) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = base.day().min(days_in_month(year, month));
    // the day is clamped to the month length above
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(base)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn days_and_weeks_are_plain_offsets() {
        assert_eq!(advance(d(2024, 3, 30), 5, FrequencyUnit::Days), d(2024, 4, 4));
        assert_eq!(advance(d(2024, 12, 30), 1, FrequencyUnit::Weeks), d(2025, 1, 6));
    }

    #[test]
    fn month_end_clamps_to_target_month() {
        assert_eq!(advance(d(2024, 1, 31), 1, FrequencyUnit::Months), d(2024, 2, 29));
        assert_eq!(advance(d(2023, 1, 31), 1, FrequencyUnit::Months), d(2023, 2, 28));
        assert_eq!(advance(d(2024, 3, 31), 1, FrequencyUnit::Months), d(2024, 4, 30));
    }

    #[test]
    fn month_steps_cross_year_boundaries() {
        assert_eq!(advance(d(2023, 11, 30), 3, FrequencyUnit::Months), d(2024, 2, 29));
        assert_eq!(advance(d(2023, 10, 15), 14, FrequencyUnit::Months), d(2024, 12, 15));
    }

    #[test]
    fn leap_day_clamps_on_year_step() {
        assert_eq!(advance(d(2024, 2, 29), 1, FrequencyUnit::Years), d(2025, 2, 28));
        assert_eq!(advance(d(2024, 2, 29), 4, FrequencyUnit::Years), d(2028, 2, 29));
    }

    #[test]
    fn century_leap_rule() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert_eq!(days_in_month(2100, 2), 28);
    }
}
