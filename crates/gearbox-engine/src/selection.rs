//! Count-session generation from a due count plan.

use chrono::{DateTime, NaiveDate, Utc};
use gearbox_store::types::{ArtifactKind, CountPlan, CountStatus, NewCountSession};
use gearbox_store::StoreTx;
use tracing::info;

use crate::calendar;
use crate::error::Result;

/// Next run date after a run on `today`.
///
/// Advanced from the scheduled date, not the actual run date, so a plan
/// that slipped keeps its cadence anchor.
pub fn compute_next_run(plan: &CountPlan, today: NaiveDate) -> NaiveDate {
    let base = plan.next_run_date.unwrap_or(today);
    calendar::advance(base, plan.frequency_value, plan.frequency_unit)
}

/// Run one count plan inside the caller's transaction.
///
/// Selects the matching stock rows, snapshots them as session lines and
/// advances the plan's run state. Returns `Ok(None)` when no stock
/// matched; the run state still advances so an empty filter cannot make
/// the plan fire every cycle.
pub fn generate_count_session(
    tx: &StoreTx<'_>,
    plan: &CountPlan,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Option<i64>> {
    let candidates = tx.query_stock_candidates(plan, now)?;
    let next_run = compute_next_run(plan, today);

    if candidates.is_empty() {
        tx.update_count_plan_state(plan.id, next_run, now)?;
        return Ok(None);
    }

    let number = tx.next_artifact_number(plan.tenant_id, ArtifactKind::CountSession)?;
    // a plan without an explicit storeroom takes the one the stock is in
    let storeroom_id = plan.storeroom_id.or(Some(candidates[0].storeroom_id));
    let session = NewCountSession {
        tenant_id: plan.tenant_id,
        number: number.clone(),
        name: format!("{} - {}", plan.name, today),
        description: plan.description.clone(),
        status: CountStatus::Planned,
        storeroom_id,
        scheduled_date: today,
        plan_id: Some(plan.id),
        total_lines: candidates.len() as i64,
    };
    let session_id = tx.create_count_session(&session)?;
    tx.insert_count_lines(session_id, plan.tenant_id, &candidates)?;
    tx.update_count_plan_state(plan.id, next_run, now)?;

    info!(
        plan_id = plan.id,
        session_id,
        number = %number,
        lines = candidates.len(),
        "count session generated"
    );
    Ok(Some(session_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearbox_store::types::FrequencyUnit;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn plan(next_run: Option<NaiveDate>) -> CountPlan {
        CountPlan {
            id: 1,
            tenant_id: 1,
            name: "weekly".into(),
            description: None,
            storeroom_id: None,
            bin_prefix: None,
            category_ids: None,
            part_type_filter: None,
            used_in_last_days: None,
            usage_start_date: None,
            usage_end_date: None,
            transacted_only: false,
            include_zero_movement: false,
            line_limit: None,
            frequency_value: 7,
            frequency_unit: FrequencyUnit::Days,
            next_run_date: next_run,
            last_run_at: None,
            template_type: None,
            is_paused: false,
            is_active: true,
        }
    }

    #[test]
    fn next_run_is_anchored_to_the_scheduled_date() {
        // run three days late: the cadence anchor does not slip
        let p = plan(Some(d(2024, 3, 4)));
        assert_eq!(compute_next_run(&p, d(2024, 3, 7)), d(2024, 3, 11));
    }

    #[test]
    fn next_run_falls_back_to_today_without_an_anchor() {
        let p = plan(None);
        assert_eq!(compute_next_run(&p, d(2024, 3, 7)), d(2024, 3, 14));
    }
}
