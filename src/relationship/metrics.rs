//! Per-partner relationship counters and the derived report.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::RelationshipStage;

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipMetrics {
    pub partner_id: String,
    /// Read from the partner row; the metrics table does not duplicate it.
    pub intimacy_level: u8,
    pub trust_level: u8,
    pub emotional_connection: u8,
    pub conversation_frequency: u32,
    pub shared_memories: u32,
    pub last_interaction: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipReport {
    pub metrics: RelationshipMetrics,
    pub stage: RelationshipStage,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

fn ensure_row(conn: &Connection, partner_id: &str) -> Result<bool> {
    let now = chrono::Utc::now().to_rfc3339();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO relationship_metrics (partner_id, last_interaction, created_at, updated_at) \
         VALUES (?1, ?2, ?2, ?2)",
        params![partner_id, now],
    )?;
    Ok(inserted > 0)
}

pub fn get_metrics(conn: &Connection, partner_id: &str) -> Result<Option<RelationshipMetrics>> {
    let metrics = conn
        .query_row(
            "SELECT m.partner_id, p.intimacy_level, m.trust_level, m.emotional_connection, \
                    m.conversation_frequency, m.shared_memories, m.last_interaction \
             FROM relationship_metrics m JOIN partners p ON p.id = m.partner_id \
             WHERE m.partner_id = ?1",
            params![partner_id],
            |row| {
                Ok(RelationshipMetrics {
                    partner_id: row.get(0)?,
                    intimacy_level: row.get(1)?,
                    trust_level: row.get(2)?,
                    emotional_connection: row.get(3)?,
                    conversation_frequency: row.get(4)?,
                    shared_memories: row.get(5)?,
                    last_interaction: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(metrics)
}

/// Metrics for a partner, created with defaults on first access.
pub fn get_or_create_metrics(conn: &Connection, partner_id: &str) -> Result<RelationshipMetrics> {
    ensure_row(conn, partner_id)?;
    get_metrics(conn, partner_id)?
        .ok_or_else(|| anyhow::anyhow!("relationship metrics missing for partner {partner_id}"))
}

pub fn increment_conversation_frequency(conn: &Connection, partner_id: &str) -> Result<()> {
    ensure_row(conn, partner_id)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE relationship_metrics SET conversation_frequency = conversation_frequency + 1, \
             last_interaction = ?1, updated_at = ?1 WHERE partner_id = ?2",
        params![now, partner_id],
    )?;
    Ok(())
}

pub fn increment_shared_memories(conn: &Connection, partner_id: &str) -> Result<()> {
    ensure_row(conn, partner_id)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE relationship_metrics SET shared_memories = shared_memories + 1, updated_at = ?1 \
         WHERE partner_id = ?2",
        params![now, partner_id],
    )?;
    Ok(())
}

/// Set trust and emotional connection, each clamped to 0..=100.
pub fn update_levels(
    conn: &Connection,
    partner_id: &str,
    trust: Option<i32>,
    connection: Option<i32>,
) -> Result<RelationshipMetrics> {
    let current = get_or_create_metrics(conn, partner_id)?;
    let trust = trust.map_or(current.trust_level, super::clamp_intimacy);
    let connection = connection.map_or(current.emotional_connection, super::clamp_intimacy);
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE relationship_metrics SET trust_level = ?1, emotional_connection = ?2, updated_at = ?3 \
         WHERE partner_id = ?4",
        params![trust, connection, now, partner_id],
    )?;
    get_or_create_metrics(conn, partner_id)
}

/// Metrics plus stage, insights and recommendations. A partner seen for the
/// first time gets the "new relationship" report.
pub fn relationship_report(conn: &Connection, partner_id: &str) -> Result<RelationshipReport> {
    let created = ensure_row(conn, partner_id)?;
    let metrics = get_or_create_metrics(conn, partner_id)?;
    let stage = RelationshipStage::from_intimacy(metrics.intimacy_level);

    if created {
        return Ok(RelationshipReport {
            metrics,
            stage,
            insights: vec!["新しい関係が始まりました".into()],
            recommendations: vec!["定期的にコミュニケーションを取りましょう".into()],
        });
    }

    let (insights, recommendations) = analyze(&metrics);
    Ok(RelationshipReport {
        metrics,
        stage,
        insights,
        recommendations,
    })
}

fn analyze(m: &RelationshipMetrics) -> (Vec<String>, Vec<String>) {
    let mut insights = Vec::new();
    let mut recommendations = Vec::new();

    if m.intimacy_level > 70 {
        insights.push("非常に親密な関係に発展しています".to_string());
    } else if m.intimacy_level > 50 {
        insights.push("信頼関係が構築されています".to_string());
    } else if m.intimacy_level < 20 {
        insights.push("関係の構築に時間が必要です".to_string());
    }
    if m.conversation_frequency > 100 {
        insights.push("活発なコミュニケーションが続いています".to_string());
    }
    if m.shared_memories > 50 {
        insights.push("多くの共有体験があります".to_string());
    }
    if m.intimacy_level < 50 {
        recommendations.push("もっと個人的な話題について話してみましょう".to_string());
    }

    (insights, recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(intimacy: u8, freq: u32, shared: u32) -> RelationshipMetrics {
        RelationshipMetrics {
            partner_id: "p".into(),
            intimacy_level: intimacy,
            trust_level: 50,
            emotional_connection: 0,
            conversation_frequency: freq,
            shared_memories: shared,
            last_interaction: String::new(),
        }
    }

    #[test]
    fn analysis_for_close_active_relationship() {
        let (insights, recs) = analyze(&metrics(75, 120, 60));
        assert_eq!(
            insights,
            vec![
                "非常に親密な関係に発展しています",
                "活発なコミュニケーションが続いています",
                "多くの共有体験があります"
            ]
        );
        assert!(recs.is_empty());
    }

    #[test]
    fn analysis_for_new_relationship() {
        let (insights, recs) = analyze(&metrics(10, 3, 0));
        assert_eq!(insights, vec!["関係の構築に時間が必要です"]);
        assert_eq!(recs, vec!["もっと個人的な話題について話してみましょう"]);
    }

    #[test]
    fn middle_band_has_no_intimacy_insight() {
        let (insights, recs) = analyze(&metrics(40, 0, 0));
        assert!(insights.is_empty());
        assert_eq!(recs.len(), 1);
    }
}
