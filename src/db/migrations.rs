//! Forward-only schema upgrades.
//!
//! `schema_meta.schema_version` records the last applied step. Each step runs
//! in its own transaction together with the version bump, so a failed step
//! leaves the database at the previous version.

use rusqlite::{Connection, OptionalExtension, Transaction};

struct Migration {
    version: u32,
    description: &'static str,
    apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 2,
        description: "record the embedding model of stored vectors",
        apply: record_embedding_model,
    },
    Migration {
        version: 3,
        description: "index messages by sender",
        apply: index_messages_by_sender,
    },
    Migration {
        version: 4,
        description: "notification settings and schedules",
        apply: create_notification_tables,
    },
];

/// Version a fully migrated database reports.
pub const CURRENT_SCHEMA_VERSION: u32 = 4;

/// Vectors written before the model was tracked came from this model.
const LEGACY_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

fn meta_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM schema_meta WHERE key = ?1", [key], |row| row.get(0))
        .optional()
}

fn set_meta_value(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// Applied schema version; 0 when the row is missing or unreadable.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(meta_value(conn, "schema_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    meta_value(conn, "embedding_model")
}

pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    set_meta_value(conn, "embedding_model", model)
}

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current = get_schema_version(conn)?;
    let pending = MIGRATIONS.iter().filter(|m| m.version > current);

    for migration in pending {
        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        let tx = conn.unchecked_transaction()?;
        (migration.apply)(&tx)?;
        set_meta_value(&tx, "schema_version", &migration.version.to_string())?;
        tx.commit()?;
    }

    tracing::debug!(schema_version = get_schema_version(conn)?, "schema up to date");
    Ok(())
}

fn record_embedding_model(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [LEGACY_EMBEDDING_MODEL],
    )?;
    Ok(())
}

fn index_messages_by_sender(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_messages_partner_sender \
         ON messages(partner_id, sender, created_at);",
    )
}

fn create_notification_tables(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS notification_settings (
            user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            morning_greeting INTEGER NOT NULL DEFAULT 1,
            morning_time TEXT NOT NULL DEFAULT '07:00',
            reminder_messages INTEGER NOT NULL DEFAULT 0,
            special_days INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notification_schedules (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            partner_id TEXT REFERENCES partners(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK(kind IN ('morning_greeting','reminder','special_day','custom')),
            scheduled_time TEXT NOT NULL,
            message TEXT,
            recurring INTEGER NOT NULL DEFAULT 0,
            recurring_pattern TEXT CHECK(recurring_pattern IN ('daily','weekly','monthly')),
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK(status IN ('pending','sent','failed','cancelled')),
            next_run_at TEXT,
            last_sent_at TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_schedules_status_time
            ON notification_schedules(status, scheduled_time);",
    )
}
