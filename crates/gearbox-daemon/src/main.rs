use std::time::Duration;

use gearbox_engine::{CountWorker, MaintenanceWorker, NoConditionSource};
use gearbox_store::Store;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gearbox=info".into()),
        )
        .init();

    // load config: explicit path via GEARBOX_CONFIG > ~/.gearbox/gearbox.toml
    let config_path = std::env::var("GEARBOX_CONFIG").ok();
    let config = gearbox_core::GearboxConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        gearbox_core::GearboxConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    gearbox_store::db::init_db(&db)?;
    info!("database migrations complete");

    // each worker gets its own connection for thread safety
    let maintenance = MaintenanceWorker::new(
        Store::new(rusqlite::Connection::open(db_path)?)?,
        Box::new(NoConditionSource),
        Duration::from_secs(config.scheduler.maintenance_poll_secs),
    );
    let counts = CountWorker::new(
        Store::new(rusqlite::Connection::open(db_path)?)?,
        config.scheduler.seed_default_plans,
        Duration::from_secs(config.scheduler.count_poll_secs),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let maintenance_task = tokio::spawn(maintenance.run(shutdown_rx.clone()));
    let counts_task = tokio::spawn(counts.run(shutdown_rx));
    info!("gearbox daemon running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = maintenance_task.await;
    let _ = counts_task.await;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
