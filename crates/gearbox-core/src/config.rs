use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default poll cadence for both generation loops.
pub const DEFAULT_POLL_SECS: u64 = 3600;

/// Top-level config (gearbox.toml + GEARBOX_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearboxConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for GearboxConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Generation-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between maintenance-schedule polls.
    #[serde(default = "default_poll_secs")]
    pub maintenance_poll_secs: u64,
    /// Seconds between count-plan polls.
    #[serde(default = "default_poll_secs")]
    pub count_poll_secs: u64,
    /// Seed the weekly/monthly transacted count plans for tenants that
    /// have a default storeroom.
    #[serde(default = "bool_true")]
    pub seed_default_plans: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            maintenance_poll_secs: DEFAULT_POLL_SECS,
            count_poll_secs: DEFAULT_POLL_SECS,
            seed_default_plans: true,
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_poll_secs() -> u64 {
    DEFAULT_POLL_SECS
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.gearbox/gearbox.db", home)
}

impl GearboxConfig {
    /// Load config from a TOML file with GEARBOX_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.gearbox/gearbox.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: GearboxConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("GEARBOX_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.gearbox/gearbox.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_hourly() {
        let cfg = GearboxConfig::default();
        assert_eq!(cfg.scheduler.maintenance_poll_secs, 3600);
        assert_eq!(cfg.scheduler.count_poll_secs, 3600);
        assert!(cfg.scheduler.seed_default_plans);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = GearboxConfig::load(Some("/nonexistent/gearbox.toml")).unwrap();
        assert_eq!(cfg.database.path, GearboxConfig::default().database.path);
    }
}
