/// Source of live condition readings for condition-triggered schedules.
///
/// The engine only needs the most recent value of a named attribute on
/// an asset; where readings come from (sensor feed, manual entries) is
/// the caller's concern.
pub trait ConditionSource: Send + Sync {
    fn latest(&self, tenant_id: i64, asset_id: Option<i64>, attribute: &str) -> Option<f64>;
}

/// Source with no readings. Condition-triggered schedules never fire,
/// which is the safe behavior when no monitoring feed is wired up.
pub struct NoConditionSource;

impl ConditionSource for NoConditionSource {
    fn latest(&self, _tenant_id: i64, _asset_id: Option<i64>, _attribute: &str) -> Option<f64> {
        None
    }
}
