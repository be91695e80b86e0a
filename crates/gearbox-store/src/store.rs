use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::warn;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::types::*;

/// Transactional data-access handle for one scheduler loop.
///
/// Wraps its own `Connection` in a `Mutex` so a worker and any
/// out-of-band caller can share it; the polling loops are single-threaded
/// by design, so the lock is never contended in practice.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All per-tenant pause switches, keyed by tenant id.
    ///
    /// Loaded once at the start of every cycle and threaded through
    /// evaluation as a plain value; toggles take effect on the next poll.
    pub fn scheduler_controls(&self) -> Result<HashMap<i64, SchedulerControl>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT tenant_id, pause_maintenance, pause_counts FROM scheduler_controls",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SchedulerControl {
                tenant_id: row.get(0)?,
                pause_maintenance: row.get(1)?,
                pause_counts: row.get(2)?,
            })
        })?;
        let mut map = HashMap::new();
        for row in rows {
            let control = row?;
            map.insert(control.tenant_id, control);
        }
        Ok(map)
    }

    /// Pause switches for one tenant, created (all-off) on first access.
    pub fn scheduler_control(&self, tenant_id: i64) -> Result<SchedulerControl> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO scheduler_controls (tenant_id) VALUES (?1)",
            [tenant_id],
        )?;
        let control = conn.query_row(
            "SELECT tenant_id, pause_maintenance, pause_counts
             FROM scheduler_controls WHERE tenant_id = ?1",
            [tenant_id],
            |row| {
                Ok(SchedulerControl {
                    tenant_id: row.get(0)?,
                    pause_maintenance: row.get(1)?,
                    pause_counts: row.get(2)?,
                })
            },
        )?;
        Ok(control)
    }

    /// Active maintenance schedules that could plausibly be due: rows
    /// with a due date, plus meter/condition kinds (which may have none).
    ///
    /// Rows with malformed enum or date columns are skipped with a
    /// warning so one bad definition cannot take down a cycle.
    pub fn list_generation_candidates(&self) -> Result<Vec<MaintenanceSchedule>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM maintenance_schedules
             WHERE is_active = 1
               AND (next_due_date IS NOT NULL
                    OR trigger_kind IN ('METER', 'CONDITION'))
             ORDER BY id"
        ))?;
        let rows = stmt.query_map([], map_schedule)?;
        let mut out = Vec::new();
        for row in rows {
            match row {
                Ok(schedule) => out.push(schedule),
                Err(e) => warn!("skipping malformed maintenance schedule: {e}"),
            }
        }
        Ok(out)
    }

    /// Active count plans whose next run date has arrived. Paused plans
    /// are included; the worker skips them (they remain listed as active).
    pub fn list_due_count_plans(&self, today: NaiveDate) -> Result<Vec<CountPlan>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PLAN_COLUMNS} FROM count_plans
             WHERE is_active = 1
               AND next_run_date IS NOT NULL
               AND next_run_date <= ?1
             ORDER BY id"
        ))?;
        let rows = stmt.query_map([today.to_string()], map_plan)?;
        let mut out = Vec::new();
        for row in rows {
            match row {
                Ok(plan) => out.push(plan),
                Err(e) => warn!("skipping malformed count plan: {e}"),
            }
        }
        Ok(out)
    }

    /// Latest reading for a meter, if the meter exists and has one.
    pub fn latest_meter_reading(&self, meter_id: i64) -> Result<Option<MeterSnapshot>> {
        let conn = self.conn.lock().unwrap();
        latest_meter_reading(&conn, meter_id)
    }

    /// Run `f` inside one database transaction: committed when it returns
    /// `Ok`, rolled back when it returns `Err`. One generation per call,
    /// so a failure never disturbs earlier generations in the same cycle.
    pub fn with_tx<T, E>(
        &self,
        f: impl FnOnce(&StoreTx<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(StoreError::from)
            .map_err(E::from)?;
        let out = f(&StoreTx { conn: &tx })?;
        tx.commit().map_err(StoreError::from).map_err(E::from)?;
        Ok(out)
    }
}

/// The data-access surface available inside one generation transaction.
pub struct StoreTx<'a> {
    conn: &'a Connection,
}

impl StoreTx<'_> {
    /// Allocate the next sequential artifact number for a tenant,
    /// e.g. "WO-000042". Monotonic per tenant and kind.
    pub fn next_artifact_number(&self, tenant_id: i64, kind: ArtifactKind) -> Result<String> {
        self.conn.execute(
            "INSERT INTO artifact_counters (tenant_id, kind, next_value) VALUES (?1, ?2, 1)
             ON CONFLICT (tenant_id, kind) DO UPDATE SET next_value = next_value + 1",
            params![tenant_id, kind.prefix()],
        )?;
        let n: i64 = self.conn.query_row(
            "SELECT next_value FROM artifact_counters WHERE tenant_id = ?1 AND kind = ?2",
            params![tenant_id, kind.prefix()],
            |row| row.get(0),
        )?;
        Ok(format!("{}-{:06}", kind.prefix(), n))
    }

    /// Tasks of a job plan in sequence order. Errors if the plan row is
    /// gone, so the caller's transaction rolls back and retries next poll.
    pub fn job_plan_tasks(&self, job_plan_id: i64) -> Result<Vec<JobPlanTask>> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM job_plans WHERE id = ?1",
                [job_plan_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound {
                entity: "job plan",
                id: job_plan_id,
            });
        }
        let mut stmt = self.conn.prepare(
            "SELECT sequence, description, instructions, expected_value, estimated_hours
             FROM job_plan_tasks WHERE job_plan_id = ?1 ORDER BY sequence",
        )?;
        let rows = stmt.query_map([job_plan_id], |row| {
            Ok(JobPlanTask {
                sequence: row.get(0)?,
                description: row.get(1)?,
                instructions: row.get(2)?,
                expected_value: row.get(3)?,
                estimated_hours: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn latest_meter_reading(&self, meter_id: i64) -> Result<Option<MeterSnapshot>> {
        latest_meter_reading(self.conn, meter_id)
    }

    /// Insert a generated work order; returns its id.
    pub fn create_work_order(&self, wo: &NewWorkOrder) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO work_orders
             (tenant_id, wo_number, title, description, work_type, status, priority,
              asset_id, location_id, assigned_to, assigned_team, estimated_hours,
              schedule_id, due_date, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
            params![
                wo.tenant_id,
                wo.number,
                wo.title,
                wo.description,
                wo.work_type,
                wo.status.to_string(),
                wo.priority,
                wo.asset_id,
                wo.location_id,
                wo.assigned_to,
                wo.assigned_team,
                wo.estimated_hours,
                wo.schedule_id,
                wo.due_date.map(|d| d.to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Snapshot job-plan tasks onto a work order. The copies are owned
    /// values; later template edits do not reach already-generated orders.
    pub fn insert_work_order_tasks(&self, work_order_id: i64, tasks: &[JobPlanTask]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO work_order_tasks
             (work_order_id, sequence, description, instructions, expected_value, estimated_hours)
             VALUES (?1,?2,?3,?4,?5,?6)",
        )?;
        for task in tasks {
            stmt.execute(params![
                work_order_id,
                task.sequence,
                task.description,
                task.instructions,
                task.expected_value,
                task.estimated_hours,
            ])?;
        }
        Ok(())
    }

    /// Advance a maintenance schedule's generation state. Meter fields
    /// are only overwritten when the update carries new values.
    pub fn update_schedule_state(&self, schedule_id: i64, update: &ScheduleStateUpdate) -> Result<()> {
        self.conn.execute(
            "UPDATE maintenance_schedules SET
                last_generated_date = ?2,
                last_work_order_id  = ?3,
                next_due_date       = ?4,
                last_meter_reading  = COALESCE(?5, last_meter_reading),
                next_meter_target   = COALESCE(?6, next_meter_target)
             WHERE id = ?1",
            params![
                schedule_id,
                update.last_generated_date.to_string(),
                update.last_work_order_id,
                update.next_due_date.map(|d| d.to_string()),
                update.last_meter_reading,
                update.next_meter_target,
            ],
        )?;
        Ok(())
    }

    /// Stock rows matching a count plan's filters, joined with their
    /// parts. Stable ordering by stock id; `line_limit` truncates.
    pub fn query_stock_candidates(
        &self,
        plan: &CountPlan,
        now: DateTime<Utc>,
    ) -> Result<Vec<StockCandidate>> {
        let mut sql = String::from(
            "SELECT s.id, s.part_id, s.storeroom_id, s.current_balance, s.bin_location,
                    s.last_receipt_at, s.last_issue_at,
                    p.part_number, p.name, p.part_type, p.category_id
             FROM stock_levels s
             JOIN parts p ON p.id = s.part_id
             WHERE p.tenant_id = ?",
        );
        let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(plan.tenant_id)];

        if let Some(storeroom_id) = plan.storeroom_id {
            sql.push_str(" AND s.storeroom_id = ?");
            args.push(Box::new(storeroom_id));
        }
        if let Some(ref prefix) = plan.bin_prefix {
            sql.push_str(" AND s.bin_location LIKE ?");
            args.push(Box::new(format!("{prefix}%")));
        }
        if let Some(ref categories) = plan.category_ids {
            if !categories.is_empty() {
                let marks = vec!["?"; categories.len()].join(",");
                sql.push_str(&format!(" AND p.category_id IN ({marks})"));
                for id in categories {
                    args.push(Box::new(*id));
                }
            }
        }
        if let Some(ref part_type) = plan.part_type_filter {
            sql.push_str(" AND p.part_type = ?");
            args.push(Box::new(part_type.clone()));
        }

        let has_usage_filter = plan.used_in_last_days.is_some()
            || plan.usage_start_date.is_some()
            || plan.usage_end_date.is_some()
            || plan.transacted_only;
        if has_usage_filter {
            let mut sub =
                String::from("SELECT u.part_id FROM usage_transactions u WHERE u.tenant_id = ?");
            args.push(Box::new(plan.tenant_id));
            if let Some(storeroom_id) = plan.storeroom_id {
                sub.push_str(" AND u.storeroom_id = ?");
                args.push(Box::new(storeroom_id));
            }
            if let Some(days) = plan.used_in_last_days {
                sub.push_str(" AND u.created_at >= ?");
                args.push(Box::new((now - Duration::days(days)).to_rfc3339()));
            }
            if let Some(start) = plan.usage_start_date {
                sub.push_str(" AND date(u.created_at) >= ?");
                args.push(Box::new(start.to_string()));
            }
            if let Some(end) = plan.usage_end_date {
                sub.push_str(" AND date(u.created_at) <= ?");
                args.push(Box::new(end.to_string()));
            }
            if plan.transacted_only {
                sub.push_str(" AND u.transaction_type = 'ISSUE'");
            }
            sql.push_str(&format!(" AND s.part_id IN ({sub})"));
        } else if !plan.include_zero_movement {
            // No usage window configured: default to rows with some history.
            sql.push_str(" AND (s.last_issue_at IS NOT NULL OR s.last_receipt_at IS NOT NULL)");
        }

        sql.push_str(" ORDER BY s.id");
        if let Some(limit) = plan.line_limit {
            sql.push_str(" LIMIT ?");
            args.push(Box::new(limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let rows = stmt.query_map(&refs[..], |row| {
            Ok(StockCandidate {
                stock_id: row.get(0)?,
                part_id: row.get(1)?,
                storeroom_id: row.get(2)?,
                current_balance: row.get(3)?,
                bin_location: row.get(4)?,
                last_receipt_at: row.get(5)?,
                last_issue_at: row.get(6)?,
                part_number: row.get(7)?,
                part_name: row.get(8)?,
                part_type: row.get(9)?,
                part_category_id: row.get(10)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Insert a generated count session header; returns its id.
    pub fn create_count_session(&self, session: &NewCountSession) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO count_sessions
             (tenant_id, cc_number, name, description, status, storeroom_id,
              scheduled_date, plan_id, total_lines, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                session.tenant_id,
                session.number,
                session.name,
                session.description,
                session.status.to_string(),
                session.storeroom_id,
                session.scheduled_date.to_string(),
                session.plan_id,
                session.total_lines,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Snapshot the selected stock rows as count lines: expected quantity
    /// is the balance at generation time and part identity is copied by
    /// value, so later part edits never rewrite session history.
    pub fn insert_count_lines(
        &self,
        session_id: i64,
        tenant_id: i64,
        candidates: &[StockCandidate],
    ) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO count_lines
             (tenant_id, session_id, part_id, stock_id, expected_quantity, bin_location,
              part_number, part_name, part_type, part_category_id,
              last_issue_at, last_receipt_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        )?;
        for c in candidates {
            stmt.execute(params![
                tenant_id,
                session_id,
                c.part_id,
                c.stock_id,
                c.current_balance,
                c.bin_location,
                c.part_number,
                c.part_name,
                c.part_type,
                c.part_category_id,
                c.last_issue_at,
                c.last_receipt_at,
            ])?;
        }
        Ok(())
    }

    /// Advance a count plan past the run that just happened (or was
    /// skipped for an empty selection — state advances either way).
    pub fn update_count_plan_state(
        &self,
        plan_id: i64,
        next_run_date: NaiveDate,
        last_run_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE count_plans SET next_run_date = ?2, last_run_at = ?3 WHERE id = ?1",
            params![plan_id, next_run_date.to_string(), last_run_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Seed the two stock recurring plans (weekly/monthly transacted) for
    /// every tenant that has a default storeroom. Idempotent via the
    /// template_type tag. Returns how many plans were created.
    pub fn ensure_default_count_plans(&self, today: NaiveDate) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, s.id FROM tenants t
             JOIN storerooms s ON s.tenant_id = t.id
             WHERE s.is_default = 1 AND s.is_active = 1",
        )?;
        let pairs: Vec<(i64, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        // (template tag, name, description, frequency, unit, lookback days)
        let templates = [
            (
                "WEEKLY_TRANSACTED",
                "Weekly Transacted Inventory",
                "Auto-generated: items issued in last 7 days",
                7i64,
                FrequencyUnit::Days,
                7i64,
            ),
            (
                "MONTHLY_TRANSACTED",
                "Monthly Transacted Inventory",
                "Auto-generated: items issued in last 30 days",
                1i64,
                FrequencyUnit::Months,
                30i64,
            ),
        ];

        let mut created = 0;
        for (tenant_id, storeroom_id) in pairs {
            for (tag, name, description, frequency, unit, lookback) in templates {
                let exists: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM count_plans
                     WHERE tenant_id = ?1 AND template_type = ?2",
                    params![tenant_id, tag],
                    |row| row.get(0),
                )?;
                if exists > 0 {
                    continue;
                }
                self.conn.execute(
                    "INSERT INTO count_plans
                     (tenant_id, name, description, storeroom_id, used_in_last_days,
                      transacted_only, include_zero_movement, frequency_value,
                      frequency_unit, next_run_date, template_type, is_paused, is_active)
                     VALUES (?1,?2,?3,?4,?5,1,0,?6,?7,?8,?9,0,1)",
                    params![
                        tenant_id,
                        name,
                        description,
                        storeroom_id,
                        lookback,
                        frequency,
                        unit.to_string(),
                        today.to_string(),
                        tag,
                    ],
                )?;
                created += 1;
            }
        }
        Ok(created)
    }
}

// --- row mapping -----------------------------------------------------------

const SCHEDULE_COLUMNS: &str = "id, tenant_id, code, name, description, asset_id, location_id, \
     job_plan_id, trigger_kind, schedule_mode, frequency, frequency_unit, meter_id, \
     meter_interval, condition_attribute, condition_operator, condition_value, \
     last_generated_date, last_work_order_id, next_due_date, last_meter_reading, \
     next_meter_target, lead_time_days, assigned_to, assigned_team, priority, \
     estimated_hours, seasonal_start_month, seasonal_end_month, excluded_days, is_active";

const PLAN_COLUMNS: &str = "id, tenant_id, name, description, storeroom_id, bin_prefix, \
     category_ids, part_type_filter, used_in_last_days, usage_start_date, usage_end_date, \
     transacted_only, include_zero_movement, line_limit, frequency_value, frequency_unit, \
     next_run_date, last_run_at, template_type, is_paused, is_active";

fn latest_meter_reading(conn: &Connection, meter_id: i64) -> Result<Option<MeterSnapshot>> {
    let row: Option<(Option<f64>, Option<String>)> = conn
        .query_row(
            "SELECT last_reading, last_reading_at FROM meters WHERE id = ?1",
            [meter_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(row.and_then(|(value, as_of)| value.map(|value| MeterSnapshot { value, as_of })))
}

/// Wrap a parse failure so it surfaces as a row-level conversion error.
fn bad_column(idx: usize, msg: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        msg.into().into(),
    )
}

fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        None => Ok(None),
        Some(s) => s
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|e| bad_column(idx, format!("bad date {s:?}: {e}"))),
    }
}

fn map_schedule(row: &Row<'_>) -> rusqlite::Result<MaintenanceSchedule> {
    let trigger: String = row.get(8)?;
    let mode: String = row.get(9)?;
    let unit: Option<String> = row.get(11)?;
    let excluded: Option<String> = row.get(29)?;

    Ok(MaintenanceSchedule {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        asset_id: row.get(5)?,
        location_id: row.get(6)?,
        job_plan_id: row.get(7)?,
        trigger_kind: trigger.parse().map_err(|e| bad_column(8, e))?,
        schedule_mode: mode.parse().map_err(|e| bad_column(9, e))?,
        frequency: row.get(10)?,
        frequency_unit: match unit {
            None => None,
            Some(u) => Some(u.parse().map_err(|e| bad_column(11, e))?),
        },
        meter_id: row.get(12)?,
        meter_interval: row.get(13)?,
        condition_attribute: row.get(14)?,
        condition_operator: row.get(15)?,
        condition_value: row.get(16)?,
        last_generated_date: get_date(row, 17)?,
        last_work_order_id: row.get(18)?,
        next_due_date: get_date(row, 19)?,
        last_meter_reading: row.get(20)?,
        next_meter_target: row.get(21)?,
        lead_time_days: row.get(22)?,
        assigned_to: row.get(23)?,
        assigned_team: row.get(24)?,
        priority: row.get(25)?,
        estimated_hours: row.get(26)?,
        seasonal_start_month: row.get(27)?,
        seasonal_end_month: row.get(28)?,
        excluded_days: match excluded {
            None => None,
            Some(json) => Some(
                serde_json::from_str(&json)
                    .map_err(|e| bad_column(29, format!("bad excluded_days JSON: {e}")))?,
            ),
        },
        is_active: row.get(30)?,
    })
}

fn map_plan(row: &Row<'_>) -> rusqlite::Result<CountPlan> {
    let unit: String = row.get(15)?;
    let categories: Option<String> = row.get(6)?;

    Ok(CountPlan {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        storeroom_id: row.get(4)?,
        bin_prefix: row.get(5)?,
        category_ids: match categories {
            None => None,
            Some(json) => Some(
                serde_json::from_str(&json)
                    .map_err(|e| bad_column(6, format!("bad category_ids JSON: {e}")))?,
            ),
        },
        part_type_filter: row.get(7)?,
        used_in_last_days: row.get(8)?,
        usage_start_date: get_date(row, 9)?,
        usage_end_date: get_date(row, 10)?,
        transacted_only: row.get(11)?,
        include_zero_movement: row.get(12)?,
        line_limit: row.get(13)?,
        frequency_value: row.get(14)?,
        frequency_unit: unit.parse().map_err(|e| bad_column(15, e))?,
        next_run_date: get_date(row, 16)?,
        last_run_at: row.get(17)?,
        template_type: row.get(18)?,
        is_paused: row.get(19)?,
        is_active: row.get(20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> Store {
        let conn = Connection::open_in_memory().unwrap();
        Store::new(conn).unwrap()
    }

    fn exec(store: &Store, sql: &str) {
        let conn = store.conn.lock().unwrap();
        conn.execute_batch(sql).unwrap();
    }

    fn base_plan(tenant_id: i64) -> CountPlan {
        CountPlan {
            id: 1,
            tenant_id,
            name: "test plan".into(),
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
            next_run_date: None,
            last_run_at: None,
            template_type: None,
            is_paused: false,
            is_active: true,
        }
    }

    fn seed_stock(store: &Store) {
        exec(
            store,
            "INSERT INTO parts (id, tenant_id, part_number, name, part_type, category_id)
             VALUES (1, 1, 'P-001', 'Bearing', 'STOCK', 10),
                    (2, 1, 'P-002', 'Gasket',  'STOCK', 20),
                    (3, 1, 'P-003', 'Filter',  'NON_STOCK', 10);
             INSERT INTO stock_levels
                (id, part_id, storeroom_id, current_balance, bin_location, last_issue_at)
             VALUES (1, 1, 5, 12.0, 'A-01', '2024-01-10T08:00:00+00:00'),
                    (2, 2, 5, 3.0,  'B-02', NULL),
                    (3, 3, 5, 7.0,  'A-03', '2024-01-12T08:00:00+00:00');",
        );
    }

    #[test]
    fn scheduler_control_created_lazily() {
        let store = open_store();
        let control = store.scheduler_control(42).unwrap();
        assert_eq!(control.tenant_id, 42);
        assert!(!control.pause_maintenance);
        assert!(!control.pause_counts);
        // second access reuses the same row
        store.scheduler_control(42).unwrap();
        assert_eq!(store.scheduler_controls().unwrap().len(), 1);
    }

    #[test]
    fn artifact_numbers_are_sequential_per_tenant_and_kind() {
        let store = open_store();
        let numbers: Vec<String> = store
            .with_tx(|tx| {
                Ok::<_, StoreError>(vec![
                    tx.next_artifact_number(1, ArtifactKind::WorkOrder)?,
                    tx.next_artifact_number(1, ArtifactKind::WorkOrder)?,
                    tx.next_artifact_number(1, ArtifactKind::CountSession)?,
                    tx.next_artifact_number(2, ArtifactKind::WorkOrder)?,
                ])
            })
            .unwrap();
        assert_eq!(numbers, vec!["WO-000001", "WO-000002", "CC-000001", "WO-000001"]);
    }

    #[test]
    fn candidates_default_to_rows_with_movement() {
        let store = open_store();
        seed_stock(&store);
        let plan = base_plan(1);
        let rows = store
            .with_tx(|tx| tx.query_stock_candidates(&plan, Utc::now()))
            .unwrap();
        // gasket has neither issue nor receipt history
        let parts: Vec<&str> = rows.iter().map(|c| c.part_number.as_str()).collect();
        assert_eq!(parts, vec!["P-001", "P-003"]);
    }

    #[test]
    fn include_zero_movement_lifts_the_default_filter() {
        let store = open_store();
        seed_stock(&store);
        let plan = CountPlan {
            include_zero_movement: true,
            ..base_plan(1)
        };
        let rows = store
            .with_tx(|tx| tx.query_stock_candidates(&plan, Utc::now()))
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn bin_prefix_and_part_type_filters() {
        let store = open_store();
        seed_stock(&store);
        let plan = CountPlan {
            include_zero_movement: true,
            bin_prefix: Some("A-".into()),
            part_type_filter: Some("STOCK".into()),
            ..base_plan(1)
        };
        let rows = store
            .with_tx(|tx| tx.query_stock_candidates(&plan, Utc::now()))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].part_number, "P-001");
    }

    #[test]
    fn usage_window_restricts_to_transacted_parts() {
        let store = open_store();
        seed_stock(&store);
        let now = Utc::now();
        let recent = (now - Duration::days(2)).to_rfc3339();
        let stale = (now - Duration::days(90)).to_rfc3339();
        exec(
            &store,
            &format!(
                "INSERT INTO usage_transactions
                    (tenant_id, part_id, storeroom_id, transaction_type, quantity, created_at)
                 VALUES (1, 1, 5, 'ISSUE',   2.0, '{recent}'),
                        (1, 3, 5, 'RECEIPT', 5.0, '{recent}'),
                        (1, 2, 5, 'ISSUE',   1.0, '{stale}');"
            ),
        );
        let plan = CountPlan {
            used_in_last_days: Some(7),
            transacted_only: true,
            ..base_plan(1)
        };
        let rows = store
            .with_tx(|tx| tx.query_stock_candidates(&plan, now))
            .unwrap();
        // only part 1 has an ISSUE inside the window
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].part_id, 1);
    }

    #[test]
    fn line_limit_truncates_deterministically() {
        let store = open_store();
        seed_stock(&store);
        let plan = CountPlan {
            include_zero_movement: true,
            line_limit: Some(2),
            ..base_plan(1)
        };
        let rows = store
            .with_tx(|tx| tx.query_stock_candidates(&plan, Utc::now()))
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|c| c.stock_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn generation_candidate_listing_honours_trigger_kind() {
        let store = open_store();
        exec(
            &store,
            "INSERT INTO maintenance_schedules
                (id, tenant_id, code, name, trigger_kind, schedule_mode, next_due_date, is_active)
             VALUES (1, 1, 'PM-1', 'time with due',    'TIME',  'FIXED', '2024-03-01', 1),
                    (2, 1, 'PM-2', 'time without due', 'TIME',  'FIXED', NULL,         1),
                    (3, 1, 'PM-3', 'meter no due',     'METER', 'FIXED', NULL,         1),
                    (4, 1, 'PM-4', 'inactive',         'TIME',  'FIXED', '2024-03-01', 0);",
        );
        let ids: Vec<i64> = store
            .list_generation_candidates()
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn malformed_schedule_rows_are_skipped() {
        let store = open_store();
        exec(
            &store,
            "INSERT INTO maintenance_schedules
                (id, tenant_id, code, name, trigger_kind, schedule_mode, next_due_date, is_active)
             VALUES (1, 1, 'PM-1', 'good', 'TIME',    'FIXED', '2024-03-01', 1),
                    (2, 1, 'PM-2', 'bad',  'GARBAGE', 'FIXED', '2024-03-01', 1);",
        );
        let schedules = store.list_generation_candidates().unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].id, 1);
    }

    #[test]
    fn due_count_plan_listing_is_date_bounded() {
        let store = open_store();
        exec(
            &store,
            "INSERT INTO count_plans
                (id, tenant_id, name, frequency_value, frequency_unit, next_run_date, is_active)
             VALUES (1, 1, 'due',     7, 'DAYS', '2024-03-01', 1),
                    (2, 1, 'not yet', 7, 'DAYS', '2024-03-09', 1),
                    (3, 1, 'no date', 7, 'DAYS', NULL,         1);",
        );
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let plans = store.list_due_count_plans(today).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, 1);
    }

    #[test]
    fn default_plans_seeded_once_per_tenant() {
        let store = open_store();
        exec(
            &store,
            "INSERT INTO tenants (id, name, created_at) VALUES (1, 'acme', '2024-01-01T00:00:00+00:00');
             INSERT INTO storerooms (id, tenant_id, code, name, is_default) VALUES (1, 1, 'MAIN', 'Main', 1);",
        );
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let created = store
            .with_tx(|tx| tx.ensure_default_count_plans(today))
            .unwrap();
        assert_eq!(created, 2);
        // idempotent
        let again = store
            .with_tx(|tx| tx.ensure_default_count_plans(today))
            .unwrap();
        assert_eq!(again, 0);
        let plans = store.list_due_count_plans(today).unwrap();
        assert_eq!(plans.len(), 2);
        assert!(plans.iter().all(|p| p.transacted_only));
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let store = open_store();
        let result: std::result::Result<(), StoreError> = store.with_tx(|tx| {
            tx.next_artifact_number(1, ArtifactKind::WorkOrder)?;
            Err(StoreError::NotFound {
                entity: "job plan",
                id: 9,
            })
        });
        assert!(result.is_err());
        // the counter bump was rolled back with the transaction
        let number = store
            .with_tx(|tx| tx.next_artifact_number(1, ArtifactKind::WorkOrder))
            .unwrap();
        assert_eq!(number, "WO-000001");
    }
}
