//! Chat message storage.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    User,
    Partner,
}

impl MessageSender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Partner => "partner",
        }
    }
}

impl std::str::FromStr for MessageSender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "partner" => Ok(Self::Partner),
            _ => Err(format!("unknown message sender: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub partner_id: String,
    pub content: String,
    pub sender: MessageSender,
    pub emotion: Option<String>,
    /// Free-form JSON object; `{}` when nothing was attached.
    pub context: Value,
    pub created_at: String,
}

const SELECT_COLUMNS: &str = "id, partner_id, content, sender, emotion, context, created_at";

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let sender: String = row.get(3)?;
    let context: Option<String> = row.get(5)?;
    Ok(Message {
        id: row.get(0)?,
        partner_id: row.get(1)?,
        content: row.get(2)?,
        sender: sender.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
        emotion: row.get(4)?,
        context: context
            .and_then(|c| serde_json::from_str(&c).ok())
            .unwrap_or_else(|| Value::Object(Default::default())),
        created_at: row.get(6)?,
    })
}

/// Insert a message. Timestamps carry microseconds so a user message and the
/// reply written right after it keep their order.
pub fn insert_message(
    conn: &Connection,
    partner_id: &str,
    content: &str,
    sender: MessageSender,
    emotion: Option<&str>,
    context: &Value,
) -> Result<Message> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    conn.execute(
        "INSERT INTO messages (id, partner_id, content, sender, emotion, context, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            partner_id,
            content,
            sender.as_str(),
            emotion,
            serde_json::to_string(context)?,
            now,
        ],
    )?;
    Ok(Message {
        id,
        partner_id: partner_id.to_string(),
        content: content.to_string(),
        sender,
        emotion: emotion.map(str::to_string),
        context: context.clone(),
        created_at: now,
    })
}

/// Page of history counted back from the newest message, returned
/// oldest-first.
pub fn message_history(
    conn: &Connection,
    partner_id: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM messages WHERE partner_id = ?1 \
         ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let mut messages = stmt
        .query_map(params![partner_id, limit as i64, offset as i64], row_to_message)?
        .collect::<Result<Vec<_>, _>>()?;
    messages.reverse();
    Ok(messages)
}

/// The latest `count` messages, oldest-first.
pub fn recent_messages(conn: &Connection, partner_id: &str, count: usize) -> Result<Vec<Message>> {
    message_history(conn, partner_id, count, 0)
}

/// Messages with `start <= created_at <= end`, oldest-first.
pub fn messages_between(
    conn: &Connection,
    partner_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Message>> {
    // Stored timestamps are UTC with microseconds; bounds must match to compare as text.
    let start = start.to_rfc3339_opts(SecondsFormat::Micros, true);
    let end = end.to_rfc3339_opts(SecondsFormat::Micros, true);
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM messages \
         WHERE partner_id = ?1 AND created_at >= ?2 AND created_at <= ?3 \
         ORDER BY created_at ASC, rowid ASC"
    ))?;
    let messages = stmt
        .query_map(params![partner_id, start, end], row_to_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

/// Messages with the given ids, oldest-first. Unknown ids are skipped.
pub fn messages_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<Message>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM messages WHERE id IN ({placeholders}) \
         ORDER BY created_at ASC, rowid ASC"
    ))?;
    let values: Vec<SqlValue> = ids.iter().map(|id| SqlValue::Text(id.clone())).collect();
    let messages = stmt
        .query_map(params_from_iter(values), row_to_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

pub fn message_count(conn: &Connection, partner_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE partner_id = ?1",
        params![partner_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Emotion of the newest partner message that has one.
pub fn last_emotion(conn: &Connection, partner_id: &str) -> Result<Option<String>> {
    let emotion = conn
        .query_row(
            "SELECT emotion FROM messages \
             WHERE partner_id = ?1 AND sender = 'partner' AND emotion IS NOT NULL \
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            params![partner_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(emotion)
}

/// Timestamp of the newest message from either side.
pub fn last_message_at(conn: &Connection, partner_id: &str) -> Result<Option<String>> {
    let at = conn
        .query_row(
            "SELECT MAX(created_at) FROM messages WHERE partner_id = ?1",
            params![partner_id],
            |row| row.get::<_, Option<String>>(0),
        )?;
    Ok(at)
}

/// Engagement types recorded on the newest proactive messages, newest first.
pub fn recent_engagement_types(conn: &Connection, partner_id: &str, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT json_extract(context, '$.engagementType') FROM messages \
         WHERE partner_id = ?1 AND sender = 'partner' \
           AND json_extract(context, '$.engagementType') IS NOT NULL \
         ORDER BY created_at DESC, rowid DESC LIMIT ?2",
    )?;
    let types = stmt
        .query_map(params![partner_id, limit as i64], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(types)
}
