//! Long-lived polling workers.
//!
//! Each worker owns its own [`Store`] connection and runs one cycle per
//! poll interval until the shutdown channel flips. Failures are isolated
//! per definition: one bad schedule or plan is logged and skipped, and
//! the rest of the cycle proceeds.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use gearbox_store::types::{MaintenanceSchedule, SchedulerControl};
use gearbox_store::Store;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::condition::ConditionSource;
use crate::error::Result;
use crate::{generator, selection, trigger};

/// Polls maintenance schedules and generates preventive work orders.
pub struct MaintenanceWorker {
    store: Store,
    conditions: Box<dyn ConditionSource>,
    poll: Duration,
}

impl MaintenanceWorker {
    pub fn new(store: Store, conditions: Box<dyn ConditionSource>, poll: Duration) -> Self {
        Self {
            store,
            conditions,
            poll,
        }
    }

    /// Run cycles until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_secs = self.poll.as_secs(), "maintenance worker started");
        let mut interval = tokio::time::interval(self.poll);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let today = Utc::now().date_naive();
                    match self.cycle(today) {
                        Ok(n) if n > 0 => info!(generated = n, "maintenance cycle complete"),
                        Ok(_) => {}
                        Err(e) => error!("maintenance cycle failed: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("maintenance worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One evaluation pass over every candidate schedule. Returns the
    /// number of work orders generated.
    pub fn cycle(&self, today: NaiveDate) -> Result<usize> {
        let controls = self.store.scheduler_controls()?;
        let schedules = self.store.list_generation_candidates()?;
        let mut generated = 0;
        for schedule in &schedules {
            if is_paused(&controls, schedule.tenant_id, |c| c.pause_maintenance) {
                debug!(schedule_id = schedule.id, "tenant paused, skipping");
                continue;
            }
            match self.process(schedule, today) {
                Ok(Some(_)) => generated += 1,
                Ok(None) => {}
                Err(e) => {
                    error!(schedule_id = schedule.id, "work order generation failed: {e}")
                }
            }
        }
        Ok(generated)
    }

    fn process(&self, schedule: &MaintenanceSchedule, today: NaiveDate) -> Result<Option<i64>> {
        let meter_reading = match schedule.meter_id {
            Some(meter_id) => self
                .store
                .latest_meter_reading(meter_id)?
                .map(|snapshot| snapshot.value),
            None => None,
        };
        let condition_value = schedule
            .condition_attribute
            .as_deref()
            .and_then(|attr| self.conditions.latest(schedule.tenant_id, schedule.asset_id, attr));

        if !trigger::is_due(schedule, today, meter_reading, condition_value) {
            return Ok(None);
        }
        let work_order_id = self
            .store
            .with_tx(|tx| generator::generate_work_order(tx, schedule, today, meter_reading))?;
        Ok(Some(work_order_id))
    }
}

/// Polls count plans and generates inventory count sessions.
pub struct CountWorker {
    store: Store,
    seed_default_plans: bool,
    poll: Duration,
}

impl CountWorker {
    pub fn new(store: Store, seed_default_plans: bool, poll: Duration) -> Self {
        Self {
            store,
            seed_default_plans,
            poll,
        }
    }

    /// Run cycles until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_secs = self.poll.as_secs(), "count worker started");
        let mut interval = tokio::time::interval(self.poll);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let today = Utc::now().date_naive();
                    match self.cycle(today, Utc::now()) {
                        Ok(n) if n > 0 => info!(generated = n, "count cycle complete"),
                        Ok(_) => {}
                        Err(e) => error!("count cycle failed: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("count worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One pass over every due count plan. Returns the number of
    /// sessions generated.
    pub fn cycle(&self, today: NaiveDate, now: chrono::DateTime<Utc>) -> Result<usize> {
        if self.seed_default_plans {
            match self.store.with_tx(|tx| tx.ensure_default_count_plans(today)) {
                Ok(n) if n > 0 => info!(plans = n, "default count plans seeded"),
                Ok(_) => {}
                // seeding trouble should not block the plans that exist
                Err(e) => error!("default plan seeding failed: {e}"),
            }
        }

        let controls = self.store.scheduler_controls()?;
        let plans = self.store.list_due_count_plans(today)?;
        let mut generated = 0;
        for plan in &plans {
            if plan.is_paused || is_paused(&controls, plan.tenant_id, |c| c.pause_counts) {
                debug!(plan_id = plan.id, "plan or tenant paused, skipping");
                continue;
            }
            match self
                .store
                .with_tx(|tx| selection::generate_count_session(tx, plan, today, now))
            {
                Ok(Some(_)) => generated += 1,
                Ok(None) => info!(plan_id = plan.id, "no stock matched, run advanced"),
                Err(e) => error!(plan_id = plan.id, "count session generation failed: {e}"),
            }
        }
        Ok(generated)
    }
}

fn is_paused(
    controls: &HashMap<i64, SchedulerControl>,
    tenant_id: i64,
    flag: impl Fn(&SchedulerControl) -> bool,
) -> bool {
    controls.get(&tenant_id).is_some_and(flag)
}
