use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What triggers work-order generation for a maintenance schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Calendar-based.
    Time,
    /// Usage-based (meter readings).
    Meter,
    /// Threshold against a live condition attribute.
    Condition,
    /// First of time / meter wins.
    TimeOrMeter,
    /// Both time and meter must be met.
    TimeAndMeter,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TriggerKind::Time => "TIME",
            TriggerKind::Meter => "METER",
            TriggerKind::Condition => "CONDITION",
            TriggerKind::TimeOrMeter => "TIME_OR_METER",
            TriggerKind::TimeAndMeter => "TIME_AND_METER",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "TIME" => Ok(TriggerKind::Time),
            "METER" => Ok(TriggerKind::Meter),
            "CONDITION" => Ok(TriggerKind::Condition),
            "TIME_OR_METER" => Ok(TriggerKind::TimeOrMeter),
            "TIME_AND_METER" => Ok(TriggerKind::TimeAndMeter),
            other => Err(format!("unknown trigger kind: {other}")),
        }
    }
}

/// How the next due date is derived after a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleMode {
    /// Chains off the previous scheduled date; missed cycles accumulate
    /// and are caught up one per poll.
    Fixed,
    /// Rebases on the actual generation date; missed cycles slip forward.
    Floating,
}

impl std::fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScheduleMode::Fixed => "FIXED",
            ScheduleMode::Floating => "FLOATING",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ScheduleMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "FIXED" => Ok(ScheduleMode::Fixed),
            "FLOATING" => Ok(ScheduleMode::Floating),
            other => Err(format!("unknown schedule mode: {other}")),
        }
    }
}

/// Units for frequency intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl std::fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FrequencyUnit::Days => "DAYS",
            FrequencyUnit::Weeks => "WEEKS",
            FrequencyUnit::Months => "MONTHS",
            FrequencyUnit::Years => "YEARS",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for FrequencyUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DAYS" => Ok(FrequencyUnit::Days),
            "WEEKS" => Ok(FrequencyUnit::Weeks),
            "MONTHS" => Ok(FrequencyUnit::Months),
            "YEARS" => Ok(FrequencyUnit::Years),
            other => Err(format!("unknown frequency unit: {other}")),
        }
    }
}

/// Lifecycle state of a generated work order. The engine only ever
/// writes `Ready`; the rest belong to the surrounding CRUD system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    Ready,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkOrderStatus::Ready => "READY",
            WorkOrderStatus::InProgress => "IN_PROGRESS",
            WorkOrderStatus::Completed => "COMPLETED",
            WorkOrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of a count session. Generation always starts at
/// `Planned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for CountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CountStatus::Planned => "PLANNED",
            CountStatus::InProgress => "IN_PROGRESS",
            CountStatus::Completed => "COMPLETED",
            CountStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// Kind discriminator for sequential artifact numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    WorkOrder,
    CountSession,
}

impl ArtifactKind {
    /// Counter key and human-readable number prefix ("WO-000042").
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::WorkOrder => "WO",
            ArtifactKind::CountSession => "CC",
        }
    }
}

/// Per-tenant pause switches, read once per polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerControl {
    pub tenant_id: i64,
    pub pause_maintenance: bool,
    pub pause_counts: bool,
}

/// Days on which generation is suppressed: ISO weekday numbers
/// (1 = Monday … 7 = Sunday) and/or explicit ISO dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludedDays {
    #[serde(default)]
    pub weekdays: Vec<u32>,
    #[serde(default)]
    pub dates: Vec<String>,
}

/// A recurring maintenance schedule definition.
#[derive(Debug, Clone)]
pub struct MaintenanceSchedule {
    pub id: i64,
    pub tenant_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,

    pub asset_id: Option<i64>,
    pub location_id: Option<i64>,
    pub job_plan_id: Option<i64>,

    pub trigger_kind: TriggerKind,
    pub schedule_mode: ScheduleMode,
    pub frequency: Option<i64>,
    pub frequency_unit: Option<FrequencyUnit>,

    pub meter_id: Option<i64>,
    pub meter_interval: Option<f64>,

    pub condition_attribute: Option<String>,
    pub condition_operator: Option<String>,
    pub condition_value: Option<f64>,

    pub last_generated_date: Option<NaiveDate>,
    pub last_work_order_id: Option<i64>,
    pub next_due_date: Option<NaiveDate>,
    pub last_meter_reading: Option<f64>,
    pub next_meter_target: Option<f64>,

    /// Days before the due date during which generation is permitted.
    pub lead_time_days: i64,

    pub assigned_to: Option<String>,
    pub assigned_team: Option<String>,
    pub priority: String,
    pub estimated_hours: Option<f64>,

    pub seasonal_start_month: Option<u32>,
    pub seasonal_end_month: Option<u32>,
    pub excluded_days: Option<ExcludedDays>,

    pub is_active: bool,
}

/// One step of a job plan, and the exact field set snapshotted onto a
/// generated work order.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlanTask {
    pub sequence: i64,
    pub description: String,
    pub instructions: Option<String>,
    pub expected_value: Option<String>,
    pub estimated_hours: Option<f64>,
}

/// Latest reading of an equipment usage meter.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSnapshot {
    pub value: f64,
    /// RFC 3339 timestamp of the reading, if recorded.
    pub as_of: Option<String>,
}

/// Insert payload for a generated work order.
#[derive(Debug, Clone)]
pub struct NewWorkOrder {
    pub tenant_id: i64,
    pub number: String,
    pub title: String,
    pub description: Option<String>,
    pub work_type: String,
    pub status: WorkOrderStatus,
    pub priority: String,
    pub asset_id: Option<i64>,
    pub location_id: Option<i64>,
    pub assigned_to: Option<String>,
    pub assigned_team: Option<String>,
    pub estimated_hours: Option<f64>,
    pub schedule_id: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

/// Fields the generator writes back onto a maintenance schedule after a
/// successful generation.
#[derive(Debug, Clone)]
pub struct ScheduleStateUpdate {
    pub last_generated_date: NaiveDate,
    pub last_work_order_id: i64,
    pub next_due_date: Option<NaiveDate>,
    /// Meter baseline/target; left untouched when `None`.
    pub last_meter_reading: Option<f64>,
    pub next_meter_target: Option<f64>,
}

/// A recurring inventory cycle-count plan.
#[derive(Debug, Clone)]
pub struct CountPlan {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub description: Option<String>,

    pub storeroom_id: Option<i64>,
    pub bin_prefix: Option<String>,
    pub category_ids: Option<Vec<i64>>,
    pub part_type_filter: Option<String>,

    pub used_in_last_days: Option<i64>,
    pub usage_start_date: Option<NaiveDate>,
    pub usage_end_date: Option<NaiveDate>,
    pub transacted_only: bool,
    pub include_zero_movement: bool,
    pub line_limit: Option<i64>,

    pub frequency_value: i64,
    pub frequency_unit: FrequencyUnit,
    pub next_run_date: Option<NaiveDate>,
    /// RFC 3339 timestamp of the last run, if any.
    pub last_run_at: Option<String>,

    pub template_type: Option<String>,
    pub is_paused: bool,
    pub is_active: bool,
}

/// A stock row joined with its part, as selected for a count session.
#[derive(Debug, Clone)]
pub struct StockCandidate {
    pub stock_id: i64,
    pub part_id: i64,
    pub storeroom_id: i64,
    pub current_balance: f64,
    pub bin_location: Option<String>,
    pub last_receipt_at: Option<String>,
    pub last_issue_at: Option<String>,
    pub part_number: String,
    pub part_name: String,
    pub part_type: String,
    pub part_category_id: Option<i64>,
}

/// Insert payload for a generated count session header.
#[derive(Debug, Clone)]
pub struct NewCountSession {
    pub tenant_id: i64,
    pub number: String,
    pub name: String,
    pub description: Option<String>,
    pub status: CountStatus,
    pub storeroom_id: Option<i64>,
    pub scheduled_date: NaiveDate,
    pub plan_id: Option<i64>,
    pub total_lines: i64,
}
