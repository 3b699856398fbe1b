//! SQL DDL for all koibito tables.
//!
//! One row per user, at most one partner per user, and everything else hangs
//! off the partner with `ON DELETE CASCADE`. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    surname TEXT,
    first_name TEXT,
    nickname TEXT,
    birthday TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_settings (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    theme TEXT NOT NULL DEFAULT 'light',
    background_image TEXT NOT NULL DEFAULT 'default',
    sound_enabled INTEGER NOT NULL DEFAULT 1,
    auto_save INTEGER NOT NULL DEFAULT 1,
    data_retention_days INTEGER NOT NULL DEFAULT 365,
    ai_provider TEXT NOT NULL DEFAULT 'openai' CHECK(ai_provider IN ('openai','anthropic')),
    ai_model TEXT NOT NULL DEFAULT 'gpt-4o-mini',
    ai_temperature REAL NOT NULL DEFAULT 0.8,
    ai_max_tokens INTEGER NOT NULL DEFAULT 2000,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS partners (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    gender TEXT NOT NULL CHECK(gender IN ('boyfriend','girlfriend')),
    personality_type TEXT NOT NULL,
    speech_style TEXT NOT NULL,
    system_prompt TEXT NOT NULL,
    avatar_description TEXT NOT NULL DEFAULT '',
    appearance TEXT NOT NULL DEFAULT '{}',
    hobbies TEXT NOT NULL DEFAULT '[]',
    intimacy_level INTEGER NOT NULL DEFAULT 0 CHECK(intimacy_level >= 0 AND intimacy_level <= 100),
    base_image_url TEXT,
    current_location_id TEXT NOT NULL DEFAULT 'school_classroom',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    partner_id TEXT NOT NULL REFERENCES partners(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    sender TEXT NOT NULL CHECK(sender IN ('user','partner')),
    emotion TEXT,
    context TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_partner_time ON messages(partner_id, created_at);

CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    partner_id TEXT NOT NULL REFERENCES partners(id) ON DELETE CASCADE,
    type TEXT NOT NULL CHECK(type IN ('conversation','episode','relationship','emotion','preference','fact','event')),
    content TEXT NOT NULL,
    embedding BLOB,
    importance INTEGER NOT NULL CHECK(importance >= 1 AND importance <= 10),
    emotional_weight REAL NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    related_people TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_partner ON memories(partner_id);
CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance);

CREATE TABLE IF NOT EXISTS episode_memories (
    id TEXT PRIMARY KEY,
    partner_id TEXT NOT NULL REFERENCES partners(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    emotional_weight REAL NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    participants TEXT NOT NULL DEFAULT '[]',
    date TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_episodes_partner_date ON episode_memories(partner_id, date);

CREATE TABLE IF NOT EXISTS personality_memories (
    partner_id TEXT PRIMARY KEY REFERENCES partners(id) ON DELETE CASCADE,
    strengths TEXT NOT NULL DEFAULT '[]',
    shadows TEXT NOT NULL DEFAULT '[]',
    core_values TEXT NOT NULL DEFAULT '[]',
    last_updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationship_metrics (
    partner_id TEXT PRIMARY KEY REFERENCES partners(id) ON DELETE CASCADE,
    trust_level INTEGER NOT NULL DEFAULT 50,
    emotional_connection INTEGER NOT NULL DEFAULT 0,
    conversation_frequency INTEGER NOT NULL DEFAULT 0,
    shared_memories INTEGER NOT NULL DEFAULT 0,
    last_interaction TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS generated_images (
    id TEXT PRIMARY KEY,
    partner_id TEXT NOT NULL REFERENCES partners(id) ON DELETE CASCADE,
    image_url TEXT NOT NULL,
    thumbnail_url TEXT,
    prompt TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    consistency_score REAL NOT NULL DEFAULT 0,
    generation_id TEXT NOT NULL,
    model_used TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_images_partner_time ON generated_images(partner_id, created_at);

-- Audit log for memory writes and retention deletes
CREATE TABLE IF NOT EXISTS memory_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK(operation IN ('create','update','delete','cleanup')),
    memory_id TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "users",
            "user_settings",
            "partners",
            "messages",
            "memories",
            "episode_memories",
            "personality_memories",
            "relationship_metrics",
            "generated_images",
            "memory_log",
            "schema_meta",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table {expected}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }
}
