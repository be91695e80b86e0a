//! Due-ness evaluation for maintenance schedules.
//!
//! Every trigger kind is a composition of three named checks, gated by
//! the seasonal window and excluded-day rules. Combinator kinds evaluate
//! both sides independently, so `TIME_OR_METER` fires on the meter even
//! when the time side is not yet in its lead window.

use chrono::{Datelike, NaiveDate};
use gearbox_store::types::{MaintenanceSchedule, TriggerKind};

/// True when `today` falls inside the schedule's seasonal months.
///
/// A window whose start month is after its end month wraps the year end
/// (e.g. 11..=3 covers November through March). Schedules without both
/// months set are year-round.
pub fn in_seasonal_window(schedule: &MaintenanceSchedule, today: NaiveDate) -> bool {
    let (start, end) = match (schedule.seasonal_start_month, schedule.seasonal_end_month) {
        (Some(s), Some(e)) => (s, e),
        _ => return true,
    };
    let month = today.month();
    if start <= end {
        (start..=end).contains(&month)
    } else {
        month >= start || month <= end
    }
}

/// True when generation is suppressed on `today` by the schedule's
/// excluded weekdays (ISO 1 = Monday) or explicit excluded dates.
pub fn is_excluded_day(schedule: &MaintenanceSchedule, today: NaiveDate) -> bool {
    let Some(excluded) = &schedule.excluded_days else {
        return false;
    };
    if excluded.weekdays.contains(&today.weekday().number_from_monday()) {
        return true;
    }
    excluded.dates.iter().any(|d| d == &today.to_string())
}

/// Time check: the due date exists and `today` has entered its lead
/// window (`next_due_date - lead_time_days`).
pub fn time_met(schedule: &MaintenanceSchedule, today: NaiveDate) -> bool {
    let Some(next_due) = schedule.next_due_date else {
        return false;
    };
    today >= next_due - chrono::Duration::days(schedule.lead_time_days)
}

/// Meter check: the latest reading has reached the explicit target.
/// A schedule whose target has not been initialized yet never fires;
/// the target is set when the schedule is created and reset after each
/// generation.
pub fn meter_met(schedule: &MaintenanceSchedule, reading: Option<f64>) -> bool {
    if schedule.meter_id.is_none() || schedule.meter_interval.is_none() {
        return false;
    }
    match (schedule.next_meter_target, reading) {
        (Some(target), Some(reading)) => reading >= target,
        _ => false,
    }
}

/// Condition check: the live attribute value satisfies the configured
/// comparison. Missing readings and unknown operators evaluate false.
pub fn condition_met(schedule: &MaintenanceSchedule, value: Option<f64>) -> bool {
    let (Some(operator), Some(threshold)) = (
        schedule.condition_operator.as_deref(),
        schedule.condition_value,
    ) else {
        return false;
    };
    let Some(value) = value else {
        return false;
    };
    match operator {
        ">" => value > threshold,
        ">=" => value >= threshold,
        "<" => value < threshold,
        "<=" => value <= threshold,
        "==" | "=" => value == threshold,
        "!=" => value != threshold,
        _ => false,
    }
}

/// Full due-ness decision for one schedule on one day.
pub fn is_due(
    schedule: &MaintenanceSchedule,
    today: NaiveDate,
    meter_reading: Option<f64>,
    condition_value: Option<f64>,
) -> bool {
    if !in_seasonal_window(schedule, today) || is_excluded_day(schedule, today) {
        return false;
    }
    match schedule.trigger_kind {
        TriggerKind::Time => time_met(schedule, today),
        TriggerKind::Meter => meter_met(schedule, meter_reading),
        TriggerKind::Condition => condition_met(schedule, condition_value),
        TriggerKind::TimeOrMeter => {
            time_met(schedule, today) || meter_met(schedule, meter_reading)
        }
        TriggerKind::TimeAndMeter => {
            time_met(schedule, today) && meter_met(schedule, meter_reading)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearbox_store::types::{ExcludedDays, ScheduleMode};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn schedule() -> MaintenanceSchedule {
        MaintenanceSchedule {
            id: 1,
            tenant_id: 1,
            code: "PM-001".into(),
            name: "quarterly service".into(),
            description: None,
            asset_id: None,
            location_id: None,
            job_plan_id: None,
            trigger_kind: TriggerKind::Time,
            schedule_mode: ScheduleMode::Fixed,
            frequency: Some(3),
            frequency_unit: Some(gearbox_store::types::FrequencyUnit::Months),
            meter_id: None,
            meter_interval: None,
            condition_attribute: None,
            condition_operator: None,
            condition_value: None,
            last_generated_date: None,
            last_work_order_id: None,
            next_due_date: Some(d(2024, 3, 15)),
            last_meter_reading: None,
            next_meter_target: None,
            lead_time_days: 7,
            assigned_to: None,
            assigned_team: None,
            priority: "MEDIUM".into(),
            estimated_hours: None,
            seasonal_start_month: None,
            seasonal_end_month: None,
            excluded_days: None,
            is_active: true,
        }
    }

    #[test]
    fn time_trigger_respects_lead_window() {
        let s = schedule();
        assert!(!time_met(&s, d(2024, 3, 7)));
        assert!(time_met(&s, d(2024, 3, 8)));
        assert!(time_met(&s, d(2024, 3, 15)));
        // overdue stays due
        assert!(time_met(&s, d(2024, 4, 1)));
    }

    #[test]
    fn time_trigger_without_due_date_never_fires() {
        let mut s = schedule();
        s.next_due_date = None;
        assert!(!is_due(&s, d(2024, 3, 15), None, None));
    }

    #[test]
    fn seasonal_window_wraps_across_year_end() {
        let mut s = schedule();
        s.seasonal_start_month = Some(11);
        s.seasonal_end_month = Some(3);
        assert!(in_seasonal_window(&s, d(2024, 12, 10)));
        assert!(in_seasonal_window(&s, d(2024, 2, 10)));
        assert!(!in_seasonal_window(&s, d(2024, 7, 10)));
        // in-order window
        s.seasonal_start_month = Some(4);
        s.seasonal_end_month = Some(9);
        assert!(in_seasonal_window(&s, d(2024, 7, 10)));
        assert!(!in_seasonal_window(&s, d(2024, 2, 10)));
    }

    #[test]
    fn excluded_weekdays_and_dates_suppress_generation() {
        let mut s = schedule();
        s.excluded_days = Some(ExcludedDays {
            weekdays: vec![6, 7],
            dates: vec!["2024-03-11".into()],
        });
        // 2024-03-16 is a Saturday, 2024-03-11 a Monday
        assert!(is_excluded_day(&s, d(2024, 3, 16)));
        assert!(is_excluded_day(&s, d(2024, 3, 11)));
        assert!(!is_excluded_day(&s, d(2024, 3, 12)));
        assert!(!is_due(&s, d(2024, 3, 16), None, None));
    }

    #[test]
    fn meter_trigger_requires_an_explicit_target() {
        let mut s = schedule();
        s.trigger_kind = TriggerKind::Meter;
        s.meter_id = Some(5);
        s.meter_interval = Some(250.0);
        s.next_meter_target = Some(1250.0);
        assert!(!meter_met(&s, Some(1249.9)));
        assert!(meter_met(&s, Some(1250.0)));
        assert!(!meter_met(&s, None));
        // uninitialized target never fires, however high the reading
        s.next_meter_target = None;
        s.last_meter_reading = Some(1000.0);
        assert!(!meter_met(&s, Some(1250.0)));
        assert!(!meter_met(&s, Some(1e9)));
        // an interval is required as well
        s.next_meter_target = Some(1250.0);
        s.meter_interval = None;
        assert!(!meter_met(&s, Some(1250.0)));
    }

    #[test]
    fn or_combinator_checks_meter_even_when_time_is_not_met() {
        let mut s = schedule();
        s.trigger_kind = TriggerKind::TimeOrMeter;
        s.meter_id = Some(5);
        s.meter_interval = Some(250.0);
        s.next_meter_target = Some(500.0);
        s.next_due_date = Some(d(2024, 6, 1));
        // far outside the lead window, but the meter has hit its target
        assert!(is_due(&s, d(2024, 3, 1), Some(510.0), None));
        assert!(!is_due(&s, d(2024, 3, 1), Some(100.0), None));
        // time side alone is also sufficient
        assert!(is_due(&s, d(2024, 5, 28), Some(100.0), None));
    }

    #[test]
    fn and_combinator_requires_both_sides() {
        let mut s = schedule();
        s.trigger_kind = TriggerKind::TimeAndMeter;
        s.meter_id = Some(5);
        s.meter_interval = Some(250.0);
        s.next_meter_target = Some(500.0);
        assert!(!is_due(&s, d(2024, 3, 15), Some(100.0), None));
        assert!(!is_due(&s, d(2024, 1, 1), Some(510.0), None));
        assert!(is_due(&s, d(2024, 3, 15), Some(510.0), None));
    }

    #[test]
    fn condition_trigger_comparison_policy() {
        let mut s = schedule();
        s.trigger_kind = TriggerKind::Condition;
        s.condition_attribute = Some("vibration".into());
        s.condition_operator = Some(">=".into());
        s.condition_value = Some(8.5);
        assert!(is_due(&s, d(2024, 3, 15), None, Some(9.0)));
        assert!(!is_due(&s, d(2024, 3, 15), None, Some(8.0)));
        // no live reading means not due
        assert!(!is_due(&s, d(2024, 3, 15), None, None));
        // unknown operator evaluates false rather than erroring
        s.condition_operator = Some("~=".into());
        assert!(!is_due(&s, d(2024, 3, 15), None, Some(9.0)));
    }
}
