use rusqlite::Connection;

use crate::error::Result;

/// Initialise the gearbox schema in `conn`.
///
/// Idempotent: every statement is CREATE IF NOT EXISTS, so it is safe to
/// run on every process start. Dates are ISO-8601 TEXT; booleans are
/// INTEGER 0/1; JSON columns are noted inline.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tenants (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT    NOT NULL,
            created_at  TEXT    NOT NULL
        ) STRICT;

        -- Per-tenant pause switches, created lazily on first access.
        CREATE TABLE IF NOT EXISTS scheduler_controls (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id          INTEGER NOT NULL UNIQUE,
            pause_maintenance  INTEGER NOT NULL DEFAULT 0,
            pause_counts       INTEGER NOT NULL DEFAULT 0
        ) STRICT;

        -- Monotonic per-tenant, per-kind artifact number allocation.
        CREATE TABLE IF NOT EXISTS artifact_counters (
            tenant_id   INTEGER NOT NULL,
            kind        TEXT    NOT NULL,
            next_value  INTEGER NOT NULL,
            PRIMARY KEY (tenant_id, kind)
        ) STRICT;

        CREATE TABLE IF NOT EXISTS job_plans (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id        INTEGER NOT NULL,
            code             TEXT    NOT NULL,
            name             TEXT    NOT NULL,
            description      TEXT,
            estimated_hours  REAL,
            is_active        INTEGER NOT NULL DEFAULT 1
        ) STRICT;

        CREATE TABLE IF NOT EXISTS job_plan_tasks (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            job_plan_id      INTEGER NOT NULL,
            sequence         INTEGER NOT NULL,
            description      TEXT    NOT NULL,
            instructions     TEXT,
            expected_value   TEXT,
            estimated_hours  REAL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_job_plan_tasks_plan
            ON job_plan_tasks (job_plan_id, sequence);

        CREATE TABLE IF NOT EXISTS meters (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id        INTEGER NOT NULL,
            asset_id         INTEGER,
            name             TEXT    NOT NULL,
            unit             TEXT    NOT NULL DEFAULT 'hours',
            last_reading     REAL,
            last_reading_at  TEXT
        ) STRICT;

        CREATE TABLE IF NOT EXISTS maintenance_schedules (
            id                    INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id             INTEGER NOT NULL,
            code                  TEXT    NOT NULL,
            name                  TEXT    NOT NULL,
            description           TEXT,
            asset_id              INTEGER,
            location_id           INTEGER,
            job_plan_id           INTEGER,
            trigger_kind          TEXT    NOT NULL DEFAULT 'TIME',
            schedule_mode         TEXT    NOT NULL DEFAULT 'FIXED',
            frequency             INTEGER,
            frequency_unit        TEXT,
            meter_id              INTEGER,
            meter_interval        REAL,
            condition_attribute   TEXT,
            condition_operator    TEXT,
            condition_value       REAL,
            last_generated_date   TEXT,
            last_work_order_id    INTEGER,
            next_due_date         TEXT,
            last_meter_reading    REAL,
            next_meter_target     REAL,
            lead_time_days        INTEGER NOT NULL DEFAULT 7,
            assigned_to           TEXT,
            assigned_team         TEXT,
            priority              TEXT    NOT NULL DEFAULT 'MEDIUM',
            estimated_hours       REAL,
            seasonal_start_month  INTEGER,
            seasonal_end_month    INTEGER,
            excluded_days         TEXT,               -- JSON ExcludedDays
            is_active             INTEGER NOT NULL DEFAULT 1
        ) STRICT;
        -- Polling predicate: active rows with a due date (or meter/condition kinds).
        CREATE INDEX IF NOT EXISTS idx_maintenance_schedules_next_due
            ON maintenance_schedules (next_due_date);

        CREATE TABLE IF NOT EXISTS work_orders (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id        INTEGER NOT NULL,
            wo_number        TEXT    NOT NULL UNIQUE,
            title            TEXT    NOT NULL,
            description      TEXT,
            work_type        TEXT    NOT NULL,
            status           TEXT    NOT NULL,
            priority         TEXT    NOT NULL,
            asset_id         INTEGER,
            location_id      INTEGER,
            assigned_to      TEXT,
            assigned_team    TEXT,
            estimated_hours  REAL,
            schedule_id      INTEGER,            -- NULL for manually created orders
            due_date         TEXT,
            created_at       TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_work_orders_tenant
            ON work_orders (tenant_id);

        CREATE TABLE IF NOT EXISTS work_order_tasks (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            work_order_id    INTEGER NOT NULL,
            sequence         INTEGER NOT NULL,
            description      TEXT    NOT NULL,
            instructions     TEXT,
            expected_value   TEXT,
            estimated_hours  REAL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_work_order_tasks_wo
            ON work_order_tasks (work_order_id, sequence);

        CREATE TABLE IF NOT EXISTS storerooms (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id   INTEGER NOT NULL,
            code        TEXT    NOT NULL,
            name        TEXT    NOT NULL,
            is_default  INTEGER NOT NULL DEFAULT 0,
            is_active   INTEGER NOT NULL DEFAULT 1
        ) STRICT;

        CREATE TABLE IF NOT EXISTS parts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id    INTEGER NOT NULL,
            part_number  TEXT    NOT NULL,
            name         TEXT    NOT NULL,
            part_type    TEXT    NOT NULL DEFAULT 'STOCK',
            category_id  INTEGER,
            is_active    INTEGER NOT NULL DEFAULT 1
        ) STRICT;

        CREATE TABLE IF NOT EXISTS stock_levels (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            part_id          INTEGER NOT NULL,
            storeroom_id     INTEGER NOT NULL,
            current_balance  REAL    NOT NULL DEFAULT 0,
            bin_location     TEXT,
            last_receipt_at  TEXT,
            last_issue_at    TEXT,
            last_count_at    TEXT
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_stock_levels_storeroom
            ON stock_levels (storeroom_id);

        -- Issue/receipt history; drives the usage-window plan filters.
        CREATE TABLE IF NOT EXISTS usage_transactions (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id         INTEGER NOT NULL,
            part_id           INTEGER NOT NULL,
            storeroom_id      INTEGER,
            transaction_type  TEXT    NOT NULL,   -- ISSUE, RECEIPT, RETURN
            quantity          REAL    NOT NULL,
            created_at        TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_usage_transactions_part
            ON usage_transactions (part_id, created_at);

        CREATE TABLE IF NOT EXISTS count_plans (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id              INTEGER NOT NULL,
            name                   TEXT    NOT NULL,
            description            TEXT,
            storeroom_id           INTEGER,
            bin_prefix             TEXT,
            category_ids           TEXT,             -- JSON array of ids
            part_type_filter       TEXT,
            used_in_last_days      INTEGER,
            usage_start_date       TEXT,
            usage_end_date         TEXT,
            transacted_only        INTEGER NOT NULL DEFAULT 0,
            include_zero_movement  INTEGER NOT NULL DEFAULT 0,
            line_limit             INTEGER,
            frequency_value        INTEGER NOT NULL,
            frequency_unit         TEXT    NOT NULL,
            next_run_date          TEXT,
            last_run_at            TEXT,
            template_type          TEXT,
            is_paused              INTEGER NOT NULL DEFAULT 0,
            is_active              INTEGER NOT NULL DEFAULT 1
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_count_plans_next_run
            ON count_plans (next_run_date);

        CREATE TABLE IF NOT EXISTS count_sessions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id       INTEGER NOT NULL,
            cc_number       TEXT    NOT NULL UNIQUE,
            name            TEXT    NOT NULL,
            description     TEXT,
            status          TEXT    NOT NULL,
            storeroom_id    INTEGER,
            scheduled_date  TEXT    NOT NULL,
            plan_id         INTEGER,            -- NULL for manually created sessions
            total_lines     INTEGER NOT NULL,
            created_at      TEXT    NOT NULL
        ) STRICT;

        -- Line snapshots are immutable once created; part identity is
        -- denormalized so the session stays a faithful historical record.
        CREATE TABLE IF NOT EXISTS count_lines (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id          INTEGER NOT NULL,
            session_id         INTEGER NOT NULL,
            part_id            INTEGER NOT NULL,
            stock_id           INTEGER NOT NULL,
            expected_quantity  REAL    NOT NULL,
            bin_location       TEXT,
            part_number        TEXT    NOT NULL,
            part_name          TEXT    NOT NULL,
            part_type          TEXT    NOT NULL,
            part_category_id   INTEGER,
            last_issue_at      TEXT,
            last_receipt_at    TEXT
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_count_lines_session
            ON count_lines (session_id);
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }
}
