use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::types::MemoryType;

/// Memory counts for one partner, or the whole database.
#[derive(Debug, Serialize)]
pub struct MemoryStats {
    pub total_memories: u64,
    pub by_type: BTreeMap<String, u64>,
    pub average_importance: f64,
    pub episodes: u64,
    pub audit_entries: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

/// Compute memory statistics.
///
/// `db_path` is used for the file size; pass None for in-memory databases.
pub fn memory_stats(
    conn: &Connection,
    partner_id: Option<&str>,
    db_path: Option<&Path>,
) -> Result<MemoryStats> {
    let (where_clause, values) = partner_filter(partner_id);

    let mut by_type: BTreeMap<String, u64> = MemoryType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    let mut stmt = conn.prepare(&format!(
        "SELECT type, COUNT(*) FROM memories {where_clause} GROUP BY type"
    ))?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (t, count) in rows {
        by_type.insert(t, count as u64);
    }
    let total_memories = by_type.values().sum();

    let (average_importance, oldest_memory, newest_memory): (Option<f64>, Option<String>, Option<String>) =
        conn.query_row(
            &format!(
                "SELECT AVG(importance), MIN(created_at), MAX(created_at) FROM memories {where_clause}"
            ),
            params_from_iter(values.iter()),
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

    let episodes: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM episode_memories {where_clause}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;
    let audit_entries: i64 = conn.query_row("SELECT COUNT(*) FROM memory_log", [], |row| row.get(0))?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(MemoryStats {
        total_memories,
        by_type,
        average_importance: average_importance.unwrap_or(0.0),
        episodes: episodes as u64,
        audit_entries: audit_entries as u64,
        db_size_bytes,
        oldest_memory,
        newest_memory,
    })
}

fn partner_filter(partner_id: Option<&str>) -> (&'static str, Vec<Value>) {
    match partner_id {
        Some(p) => ("WHERE partner_id = ?1", vec![Value::Text(p.to_string())]),
        None => ("", Vec::new()),
    }
}
