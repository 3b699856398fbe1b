//! Episode memories: titled experiences the user and partner shared.

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use super::types::{Episode, NewEpisode};

const SELECT_COLUMNS: &str =
    "id, partner_id, title, description, emotional_weight, tags, participants, date, created_at";

/// How to pick episodes. Checked in order: date range, tags, minimum
/// emotional weight, then simply the latest.
#[derive(Debug, Clone, Default)]
pub struct EpisodeFilter {
    pub limit: Option<usize>,
    pub min_emotional_weight: Option<f64>,
    pub tags: Vec<String>,
    /// Inclusive RFC 3339 bounds; both must be present to apply.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub fn create_episode(conn: &Connection, partner_id: &str, new: &NewEpisode) -> Result<Episode> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO episode_memories (id, partner_id, title, description, emotional_weight, tags, \
             participants, date, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            partner_id,
            new.title,
            new.description,
            new.emotional_weight,
            serde_json::to_string(&new.tags)?,
            serde_json::to_string(&new.participants)?,
            now,
        ],
    )?;
    tracing::debug!(episode_id = %id, partner_id, title = %new.title, "episode stored");
    Ok(Episode {
        id,
        partner_id: partner_id.to_string(),
        title: new.title.clone(),
        description: new.description.clone(),
        emotional_weight: new.emotional_weight,
        tags: new.tags.clone(),
        participants: new.participants.clone(),
        date: now.clone(),
        created_at: now,
    })
}

pub fn get_episodes(conn: &Connection, partner_id: &str, filter: &EpisodeFilter) -> Result<Vec<Episode>> {
    let limit = filter.limit.unwrap_or(20) as i64;

    if let (Some(start), Some(end)) = (&filter.start_date, &filter.end_date) {
        return query(
            conn,
            "WHERE partner_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date DESC",
            vec![
                Value::Text(partner_id.into()),
                Value::Text(start.clone()),
                Value::Text(end.clone()),
            ],
        );
    }

    if !filter.tags.is_empty() {
        let mut episodes = query(
            conn,
            "WHERE partner_id = ?1 ORDER BY emotional_weight DESC, date DESC",
            vec![Value::Text(partner_id.into())],
        )?;
        episodes.retain(|e| e.tags.iter().any(|t| filter.tags.contains(t)));
        episodes.truncate(20);
        return Ok(episodes);
    }

    if let Some(min_weight) = filter.min_emotional_weight {
        return query(
            conn,
            "WHERE partner_id = ?1 AND emotional_weight >= ?2 \
             ORDER BY emotional_weight DESC, date DESC LIMIT ?3",
            vec![
                Value::Text(partner_id.into()),
                Value::Real(min_weight),
                Value::Integer(limit),
            ],
        );
    }

    query(
        conn,
        "WHERE partner_id = ?1 ORDER BY date DESC, emotional_weight DESC LIMIT ?2",
        vec![Value::Text(partner_id.into()), Value::Integer(limit)],
    )
}

fn query(conn: &Connection, clause: &str, values: Vec<Value>) -> Result<Vec<Episode>> {
    let mut stmt = conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM episode_memories {clause}"))?;
    let episodes = stmt
        .query_map(params_from_iter(values.iter()), row_to_episode)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(episodes)
}

fn row_to_episode(row: &Row<'_>) -> rusqlite::Result<Episode> {
    let tags: String = row.get(5)?;
    let participants: String = row.get(6)?;
    Ok(Episode {
        id: row.get(0)?,
        partner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        emotional_weight: row.get(4)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        participants: serde_json::from_str(&participants).unwrap_or_default(),
        date: row.get(7)?,
        created_at: row.get(8)?,
    })
}
