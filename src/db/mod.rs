pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The single connection shared by every service.
pub type SharedDb = Arc<Mutex<Connection>>;

/// Open (or create) the koibito database at the given path with the schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database for testing.
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Run synchronous database work on the blocking pool while holding the lock.
pub async fn with_conn<T, F>(db: &SharedDb, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        f(&mut conn)
    })
    .await
    .context("db task failed")?
}

/// Result of [`check_database_health`], printed by `koibito doctor`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub embedding_model: Option<String>,
    pub user_count: i64,
    pub partner_count: i64,
    pub message_count: i64,
    pub memory_count: i64,
    pub image_count: i64,
    pub log_count: i64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let count = |table: &str| -> Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .with_context(|| format!("failed to count {table}"))
    };

    let integrity_details: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .context("integrity check failed to run")?;

    Ok(HealthReport {
        schema_version: migrations::get_schema_version(conn)?,
        embedding_model: migrations::get_embedding_model(conn)?,
        user_count: count("users")?,
        partner_count: count("partners")?,
        message_count: count("messages")?,
        memory_count: count("memories")?,
        image_count: count("generated_images")?,
        log_count: count("memory_log")?,
        integrity_ok: integrity_details == "ok",
        integrity_details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_report_on_fresh_database() {
        let conn = open_memory_database().unwrap();
        let report = check_database_health(&conn).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.schema_version, migrations::CURRENT_SCHEMA_VERSION);
        assert_eq!(report.partner_count, 0);
        assert_eq!(report.embedding_model.as_deref(), Some("text-embedding-ada-002"));
    }

    #[test]
    fn open_database_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("koibito.db");
        let conn = open_database(&path).unwrap();
        assert!(path.exists());
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn with_conn_runs_on_shared_connection() {
        let db: SharedDb = Arc::new(Mutex::new(open_memory_database().unwrap()));
        let version = with_conn(&db, |conn| Ok(migrations::get_schema_version(conn)?))
            .await
            .unwrap();
        assert_eq!(version, migrations::CURRENT_SCHEMA_VERSION);
    }
}
