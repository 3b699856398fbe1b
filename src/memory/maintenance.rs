//! Retention: expire old memories (important ones live longer) and purge
//! messages past each user's data-retention period.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use super::store::write_audit_log;
use super::truncate;
use crate::user::KEEP_FOREVER_DAYS;

#[derive(Debug, Serialize)]
pub struct CleanupResult {
    pub candidates: Vec<CleanupCandidate>,
    pub deleted: usize,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct CleanupCandidate {
    pub id: String,
    pub partner_id: String,
    #[serde(rename = "type")]
    pub memory_type: String,
    pub importance: u8,
    pub content_preview: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct MessagePurgeResult {
    pub users_checked: usize,
    pub messages_deleted: usize,
    pub dry_run: bool,
}

/// How many times the base retention period a memory is kept.
pub fn retention_multiplier(importance: u8) -> f64 {
    match importance {
        10..=u8::MAX => 5.0,
        9 => 4.0,
        8 => 3.0,
        7 => 2.0,
        6 => 1.5,
        _ => 1.0,
    }
}

/// The instant after which a memory created at `created_at` expires.
pub fn expires_at(created_at: DateTime<Utc>, importance: u8, delete_after_days: u32) -> DateTime<Utc> {
    let days = f64::from(delete_after_days) * retention_multiplier(importance);
    created_at + Duration::seconds((days * 86_400.0) as i64)
}

/// Delete memories past their importance-scaled retention period.
///
/// With `dry_run` the candidates are reported but nothing is deleted.
pub fn cleanup_expired_memories(
    conn: &mut Connection,
    delete_after_days: u32,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<CleanupResult> {
    let candidates: Vec<CleanupCandidate> = {
        let mut stmt = conn.prepare(
            "SELECT id, partner_id, type, importance, content, created_at FROM memories \
             ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u8>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .filter(|(_, _, _, importance, _, created_at)| {
                DateTime::parse_from_rfc3339(created_at).is_ok_and(|created| {
                    expires_at(created.with_timezone(&Utc), *importance, delete_after_days) < now
                })
            })
            .map(|(id, partner_id, memory_type, importance, content, created_at)| CleanupCandidate {
                id,
                partner_id,
                memory_type,
                importance,
                content_preview: truncate(&content, 80),
                created_at,
            })
            .collect()
    };

    let mut deleted = 0;
    if !dry_run && !candidates.is_empty() {
        let tx = conn.transaction()?;
        for candidate in &candidates {
            deleted += tx.execute("DELETE FROM memories WHERE id = ?1", params![candidate.id])?;
            write_audit_log(
                &tx,
                "cleanup",
                &candidate.id,
                Some(&serde_json::json!({
                    "reason": "retention",
                    "importance": candidate.importance,
                })),
            )?;
        }
        tx.commit()?;
    }

    tracing::info!(
        candidates = candidates.len(),
        deleted,
        dry_run,
        "memory retention pass complete"
    );
    Ok(CleanupResult {
        candidates,
        deleted,
        dry_run,
    })
}

/// Delete messages older than each user's `data_retention_days`. Users with
/// the keep-forever setting are skipped.
pub fn purge_expired_messages(
    conn: &mut Connection,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<MessagePurgeResult> {
    let users: Vec<(String, u32)> = {
        let mut stmt = conn.prepare(
            "SELECT user_id, data_retention_days FROM user_settings WHERE data_retention_days < ?1",
        )?;
        let rows = stmt
            .query_map(params![KEEP_FOREVER_DAYS], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let tx = conn.transaction()?;
    let mut messages_deleted = 0;
    for (user_id, days) in &users {
        let cutoff = (now - Duration::days(i64::from(*days))).to_rfc3339();
        let sql_filter = "FROM messages WHERE created_at < ?1 \
             AND partner_id IN (SELECT id FROM partners WHERE user_id = ?2)";
        messages_deleted += if dry_run {
            tx.query_row(
                &format!("SELECT COUNT(*) {sql_filter}"),
                params![cutoff, user_id],
                |row| row.get::<_, i64>(0),
            )? as usize
        } else {
            tx.execute(&format!("DELETE {sql_filter}"), params![cutoff, user_id])?
        };
    }
    tx.commit()?;

    tracing::info!(
        users = users.len(),
        messages_deleted,
        dry_run,
        "message retention pass complete"
    );
    Ok(MessagePurgeResult {
        users_checked: users.len(),
        messages_deleted,
        dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_table() {
        assert_eq!(retention_multiplier(10), 5.0);
        assert_eq!(retention_multiplier(9), 4.0);
        assert_eq!(retention_multiplier(8), 3.0);
        assert_eq!(retention_multiplier(7), 2.0);
        assert_eq!(retention_multiplier(6), 1.5);
        assert_eq!(retention_multiplier(5), 1.0);
        assert_eq!(retention_multiplier(1), 1.0);
    }

    #[test]
    fn important_memories_expire_later() {
        let created = Utc::now();
        assert_eq!(expires_at(created, 3, 90), created + Duration::days(90));
        assert_eq!(expires_at(created, 6, 90), created + Duration::days(135));
        assert_eq!(expires_at(created, 10, 90), created + Duration::days(450));
    }
}
