//! Write and read paths for the `memories` table, with audit logging.

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::types::{Memory, MemoryType, NewMemory};
use super::{bytes_to_embedding, embedding_to_bytes};
use crate::error::CompanionError;

const SELECT_COLUMNS: &str = "id, partner_id, type, content, embedding, importance, emotional_weight, \
     tags, related_people, created_at, updated_at";

/// Insert a memory and its embedding (may be empty) and record a `create`
/// entry in the audit log. Importance is clamped to 1..=10.
pub fn store_memory(
    conn: &mut Connection,
    partner_id: &str,
    new: &NewMemory,
    embedding: &[f32],
) -> Result<Memory> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let importance = new.importance.clamp(1, 10);
    let embedding_blob = (!embedding.is_empty()).then(|| embedding_to_bytes(embedding));

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO memories (id, partner_id, type, content, embedding, importance, emotional_weight, \
             tags, related_people, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            partner_id,
            new.memory_type.as_str(),
            new.content,
            embedding_blob,
            importance,
            new.emotional_weight,
            serde_json::to_string(&new.tags)?,
            serde_json::to_string(&new.related_people)?,
            now,
        ],
    )?;
    write_audit_log(
        &tx,
        "create",
        &id,
        Some(&serde_json::json!({"type": new.memory_type.as_str(), "importance": importance})),
    )?;
    tx.commit()?;

    tracing::debug!(memory_id = %id, partner_id, memory_type = %new.memory_type, "memory stored");
    get_memory(conn, &id)?.ok_or_else(|| anyhow::anyhow!("memory vanished after insert: {id}"))
}

pub fn get_memory(conn: &Connection, memory_id: &str) -> Result<Option<Memory>> {
    let memory = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1"),
            params![memory_id],
            row_to_memory,
        )
        .optional()?;
    Ok(memory)
}

/// Newest first, ties broken by importance.
pub fn list_memories(conn: &Connection, partner_id: &str, limit: usize) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM memories WHERE partner_id = ?1 \
         ORDER BY created_at DESC, importance DESC LIMIT ?2"
    ))?;
    let memories = stmt
        .query_map(params![partner_id, limit as i64], row_to_memory)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(memories)
}

/// Memories at or above `min_importance`, optionally restricted to `types`,
/// most important first. Capped at 100 rows.
pub fn find_by_importance_and_type(
    conn: &Connection,
    partner_id: &str,
    min_importance: u8,
    types: &[MemoryType],
) -> Result<Vec<Memory>> {
    let mut sql = format!(
        "SELECT {SELECT_COLUMNS} FROM memories WHERE partner_id = ?1 AND importance >= ?2"
    );
    if !types.is_empty() {
        let placeholders: Vec<String> = (0..types.len()).map(|i| format!("?{}", i + 3)).collect();
        sql.push_str(&format!(" AND type IN ({})", placeholders.join(", ")));
    }
    sql.push_str(" ORDER BY importance DESC, created_at DESC LIMIT 100");

    let mut values = vec![
        Value::Text(partner_id.to_string()),
        Value::Integer(i64::from(min_importance)),
    ];
    values.extend(types.iter().map(|t| Value::Text(t.as_str().to_string())));

    let mut stmt = conn.prepare(&sql)?;
    let memories = stmt
        .query_map(params_from_iter(values.iter()), row_to_memory)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(memories)
}

/// Memories for the chat system prompt: fact / preference / emotion / event
/// at or above `min_importance`, at most `max`.
pub fn prompt_memories(
    conn: &Connection,
    partner_id: &str,
    min_importance: u8,
    max: usize,
) -> Result<Vec<Memory>> {
    let mut memories =
        find_by_importance_and_type(conn, partner_id, min_importance, &MemoryType::PROMPT_TYPES)?;
    memories.truncate(max);
    Ok(memories)
}

/// Delete one of the partner's memories.
pub fn delete_memory(conn: &mut Connection, partner_id: &str, memory_id: &str) -> Result<()> {
    let tx = conn.transaction()?;
    let rows = tx.execute(
        "DELETE FROM memories WHERE id = ?1 AND partner_id = ?2",
        params![memory_id, partner_id],
    )?;
    if rows == 0 {
        return Err(CompanionError::NotFound("記憶が見つかりません".into()).into());
    }
    write_audit_log(&tx, "delete", memory_id, None)?;
    tx.commit()?;
    tracing::info!(memory_id, partner_id, "memory deleted");
    Ok(())
}

/// Replace a memory's embedding, used by `koibito re-embed`.
pub fn update_embedding(conn: &Connection, memory_id: &str, embedding: &[f32]) -> Result<()> {
    let blob = (!embedding.is_empty()).then(|| embedding_to_bytes(embedding));
    conn.execute(
        "UPDATE memories SET embedding = ?1, updated_at = ?2 WHERE id = ?3",
        params![blob, chrono::Utc::now().to_rfc3339(), memory_id],
    )?;
    Ok(())
}

/// Write an entry to the memory_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    memory_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO memory_log (operation, memory_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, memory_id, details_json, now],
    )?;
    Ok(())
}

pub(crate) fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let memory_type: String = row.get(2)?;
    let embedding: Option<Vec<u8>> = row.get(4)?;
    let tags: String = row.get(7)?;
    let related: String = row.get(8)?;
    Ok(Memory {
        id: row.get(0)?,
        partner_id: row.get(1)?,
        memory_type: memory_type
            .parse()
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        content: row.get(3)?,
        embedding: embedding.map(|b| bytes_to_embedding(&b)).unwrap_or_default(),
        importance: row.get(5)?,
        emotional_weight: row.get(6)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        related_people: serde_json::from_str(&related).unwrap_or_default(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
