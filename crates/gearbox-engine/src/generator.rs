//! Work-order generation from a due maintenance schedule.

use chrono::NaiveDate;
use gearbox_store::types::{
    ArtifactKind, MaintenanceSchedule, NewWorkOrder, ScheduleMode, ScheduleStateUpdate,
    TriggerKind, WorkOrderStatus,
};
use gearbox_store::StoreTx;
use tracing::info;

use crate::calendar;
use crate::error::Result;

/// Next due date after a generation on `today`, or `None` when the
/// schedule has no calendar recurrence configured.
///
/// Fixed schedules chain off the previous due date, so a schedule that
/// fell behind catches up one interval per generation. Floating
/// schedules rebase on the generation date and let missed cycles slip.
pub fn compute_next_due(schedule: &MaintenanceSchedule, today: NaiveDate) -> Option<NaiveDate> {
    let frequency = schedule.frequency?;
    let unit = schedule.frequency_unit?;
    let base = match schedule.schedule_mode {
        ScheduleMode::Fixed => schedule.next_due_date.unwrap_or(today),
        ScheduleMode::Floating => today,
    };
    Some(calendar::advance(base, frequency, unit))
}

fn uses_meter(schedule: &MaintenanceSchedule) -> bool {
    matches!(
        schedule.trigger_kind,
        TriggerKind::Meter | TriggerKind::TimeOrMeter | TriggerKind::TimeAndMeter
    )
}

/// Snapshot the schedule into a new work-order payload.
fn work_order_from_schedule(
    schedule: &MaintenanceSchedule,
    number: String,
    today: NaiveDate,
) -> NewWorkOrder {
    NewWorkOrder {
        tenant_id: schedule.tenant_id,
        number,
        title: format!("PM: {}", schedule.name),
        description: schedule.description.clone(),
        work_type: "PREVENTIVE".into(),
        status: WorkOrderStatus::Ready,
        priority: schedule.priority.clone(),
        asset_id: schedule.asset_id,
        location_id: schedule.location_id,
        assigned_to: schedule.assigned_to.clone(),
        assigned_team: schedule.assigned_team.clone(),
        estimated_hours: schedule.estimated_hours,
        schedule_id: Some(schedule.id),
        due_date: Some(schedule.next_due_date.unwrap_or(today)),
    }
}

/// Create one work order from `schedule` and advance its state, all
/// inside the caller's transaction.
///
/// Tasks are copied from the job plan as they exist right now; later
/// plan edits do not touch already-generated orders. `meter_reading` is
/// the reading that satisfied (or accompanied) the trigger; for meter
/// kinds it becomes the new baseline and the next target is one
/// interval above it.
pub fn generate_work_order(
    tx: &StoreTx<'_>,
    schedule: &MaintenanceSchedule,
    today: NaiveDate,
    meter_reading: Option<f64>,
) -> Result<i64> {
    let number = tx.next_artifact_number(schedule.tenant_id, ArtifactKind::WorkOrder)?;
    let tasks = match schedule.job_plan_id {
        Some(plan_id) => tx.job_plan_tasks(plan_id)?,
        None => Vec::new(),
    };

    let work_order = work_order_from_schedule(schedule, number.clone(), today);
    let work_order_id = tx.create_work_order(&work_order)?;
    if !tasks.is_empty() {
        tx.insert_work_order_tasks(work_order_id, &tasks)?;
    }

    let (last_meter_reading, next_meter_target) = match (uses_meter(schedule), meter_reading) {
        (true, Some(reading)) => {
            let target = schedule.meter_interval.map(|interval| reading + interval);
            (Some(reading), target)
        }
        _ => (None, None),
    };
    tx.update_schedule_state(
        schedule.id,
        &ScheduleStateUpdate {
            last_generated_date: today,
            last_work_order_id: work_order_id,
            next_due_date: compute_next_due(schedule, today),
            last_meter_reading,
            next_meter_target,
        },
    )?;

    info!(
        schedule_id = schedule.id,
        work_order_id,
        number = %number,
        "work order generated"
    );
    Ok(work_order_id)
}
