//! Generated image records.

use anyhow::Result;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use serde_json::Value;

use crate::error::CompanionError;

/// Images at or above this score are used as references for new ones.
pub const HIGH_CONSISTENCY_THRESHOLD: f64 = 0.8;
pub const HIGH_CONSISTENCY_LIMIT: usize = 5;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

const SELECT_COLUMNS: &str = "id, partner_id, image_url, thumbnail_url, prompt, context, \
     consistency_score, generation_id, model_used, metadata, created_at";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub id: String,
    pub partner_id: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub prompt: String,
    pub context: String,
    pub consistency_score: f64,
    pub generation_id: String,
    pub model_used: String,
    pub metadata: Option<Value>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub prompt: String,
    pub context: String,
    pub consistency_score: f64,
    pub generation_id: String,
    pub model_used: String,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageStats {
    pub total: i64,
    pub average_consistency: f64,
    pub recent_7_days: i64,
}

pub fn insert_image(conn: &Connection, partner_id: &str, new: NewImage) -> Result<GeneratedImage> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let metadata = new.metadata.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        &format!("INSERT INTO generated_images ({SELECT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            id,
            partner_id,
            new.image_url,
            new.thumbnail_url,
            new.prompt,
            new.context,
            new.consistency_score,
            new.generation_id,
            new.model_used,
            metadata,
            now,
        ],
    )?;
    tracing::debug!(image_id = %id, partner_id, score = new.consistency_score, "image stored");
    Ok(GeneratedImage {
        id,
        partner_id: partner_id.to_string(),
        image_url: new.image_url,
        thumbnail_url: new.thumbnail_url,
        prompt: new.prompt,
        context: new.context,
        consistency_score: new.consistency_score,
        generation_id: new.generation_id,
        model_used: new.model_used,
        metadata: new.metadata,
        created_at: now,
    })
}

/// Latest images first.
pub fn image_history(conn: &Connection, partner_id: &str, limit: usize) -> Result<Vec<GeneratedImage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM generated_images WHERE partner_id = ?1 \
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let images = stmt
        .query_map(params![partner_id, limit as i64], row_to_image)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

/// Best-scoring images at or above `min_score`, capped at
/// [`HIGH_CONSISTENCY_LIMIT`].
pub fn high_consistency_images(conn: &Connection, partner_id: &str, min_score: f64) -> Result<Vec<GeneratedImage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM generated_images \
         WHERE partner_id = ?1 AND consistency_score >= ?2 \
         ORDER BY consistency_score DESC, created_at DESC LIMIT ?3"
    ))?;
    let images = stmt
        .query_map(
            params![partner_id, min_score, HIGH_CONSISTENCY_LIMIT as i64],
            row_to_image,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

pub fn image_stats(conn: &Connection, partner_id: &str) -> Result<ImageStats> {
    let week_ago = (chrono::Utc::now() - chrono::Duration::days(7)).to_rfc3339();
    let (total, average): (i64, Option<f64>) = conn.query_row(
        "SELECT COUNT(*), AVG(consistency_score) FROM generated_images WHERE partner_id = ?1",
        params![partner_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let recent: i64 = conn.query_row(
        "SELECT COUNT(*) FROM generated_images WHERE partner_id = ?1 AND created_at >= ?2",
        params![partner_id, week_ago],
        |row| row.get(0),
    )?;
    Ok(ImageStats {
        total,
        average_consistency: average.unwrap_or(0.0),
        recent_7_days: recent,
    })
}

/// Delete an image belonging to `partner_id`.
pub fn delete_image(conn: &Connection, partner_id: &str, image_id: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM generated_images WHERE id = ?1 AND partner_id = ?2",
        params![image_id, partner_id],
    )?;
    if deleted == 0 {
        return Err(CompanionError::NotFound("画像が見つかりません".into()).into());
    }
    tracing::info!(image_id, partner_id, "image deleted");
    Ok(())
}

fn row_to_image(row: &Row<'_>) -> rusqlite::Result<GeneratedImage> {
    let metadata: Option<String> = row.get(9)?;
    Ok(GeneratedImage {
        id: row.get(0)?,
        partner_id: row.get(1)?,
        image_url: row.get(2)?,
        thumbnail_url: row.get(3)?,
        prompt: row.get(4)?,
        context: row.get(5)?,
        consistency_score: row.get(6)?,
        generation_id: row.get(7)?,
        model_used: row.get(8)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn setup() -> (Connection, String) {
        let conn = open_memory_database().unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, email, created_at, updated_at) VALUES ('u1', 'a@b.c', 'now', 'now');
             INSERT INTO partners (id, user_id, name, gender, personality_type, speech_style, system_prompt, created_at, updated_at)
             VALUES ('p1', 'u1', 'ミオ', 'girlfriend', 'gentle', 'polite', 'prompt', 'now', 'now');",
        )
        .unwrap();
        (conn, "p1".to_string())
    }

    fn image(score: f64) -> NewImage {
        NewImage {
            image_url: format!("https://img/{score}.png"),
            thumbnail_url: None,
            prompt: "anime style".into(),
            context: "avatar".into(),
            consistency_score: score,
            generation_id: "gen".into(),
            model_used: "model".into(),
            metadata: None,
        }
    }

    #[test]
    fn high_consistency_orders_by_score() {
        let (conn, pid) = setup();
        for score in [0.5, 0.9, 0.8, 1.0] {
            insert_image(&conn, &pid, image(score)).unwrap();
        }
        let scores: Vec<f64> = high_consistency_images(&conn, &pid, HIGH_CONSISTENCY_THRESHOLD)
            .unwrap()
            .iter()
            .map(|i| i.consistency_score)
            .collect();
        assert_eq!(scores, vec![1.0, 0.9, 0.8]);
    }

    #[test]
    fn stats_and_delete() {
        let (conn, pid) = setup();
        let first = insert_image(&conn, &pid, image(0.6)).unwrap();
        insert_image(&conn, &pid, image(1.0)).unwrap();

        let stats = image_stats(&conn, &pid).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.recent_7_days, 2);
        assert!((stats.average_consistency - 0.8).abs() < 1e-9);

        delete_image(&conn, &pid, &first.id).unwrap();
        assert_eq!(image_history(&conn, &pid, 10).unwrap().len(), 1);
        let err = delete_image(&conn, &pid, &first.id).unwrap_err();
        assert!(matches!(err.downcast_ref::<CompanionError>(), Some(CompanionError::NotFound(_))));
    }
}
