//! Ongoing topics: tags that keep coming back across memories.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use super::store::find_by_importance_and_type;
use super::types::{Memory, MemoryType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Active,
    Dormant,
    Resolved,
}

impl TopicStatus {
    /// Under 7 days active, under 30 dormant, otherwise resolved.
    pub fn from_age(days_since: f64) -> Self {
        if days_since < 7.0 {
            Self::Active
        } else if days_since < 30.0 {
            Self::Dormant
        } else {
            Self::Resolved
        }
    }
}

impl std::str::FromStr for TopicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "dormant" => Ok(Self::Dormant),
            "resolved" => Ok(Self::Resolved),
            _ => Err(format!("unknown topic status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OngoingTopic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TopicStatus,
    pub importance: f64,
    pub last_mentioned: String,
    pub related_memories: Vec<Memory>,
}

#[derive(Debug, Clone)]
pub struct TopicFilter {
    pub limit: usize,
    /// `None` returns every status.
    pub status: Option<TopicStatus>,
    pub min_importance: u8,
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self {
            limit: 10,
            status: Some(TopicStatus::Active),
            min_importance: 3,
        }
    }
}

/// Group memories by tag, keeping tags shared by at least two memories.
/// Topics appear in the order their tag was first seen.
pub fn extract_topics(memories: &[Memory], now: DateTime<Utc>) -> Vec<OngoingTopic> {
    let mut groups: Vec<(&str, Vec<&Memory>)> = Vec::new();
    for memory in memories {
        for tag in &memory.tags {
            match groups.iter_mut().find(|(t, _)| *t == tag.as_str()) {
                Some((_, members)) => members.push(memory),
                None => groups.push((tag.as_str(), vec![memory])),
            }
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .enumerate()
        .map(|(i, (tag, members))| {
            let importance = members.iter().map(|m| f64::from(m.importance)).sum::<f64>()
                / members.len() as f64;
            let last = members
                .iter()
                .filter_map(|m| DateTime::parse_from_rfc3339(&m.created_at).ok())
                .map(|d| d.with_timezone(&Utc))
                .max()
                .unwrap_or(now);
            let days_since = (now - last).num_seconds() as f64 / 86_400.0;
            OngoingTopic {
                id: format!("topic-{}", i + 1),
                title: tag.to_string(),
                description: format!("{tag}に関する継続的な話題"),
                status: TopicStatus::from_age(days_since),
                importance,
                last_mentioned: last.to_rfc3339(),
                related_memories: members.into_iter().cloned().collect(),
            }
        })
        .collect()
}

pub fn ongoing_topics(
    conn: &Connection,
    partner_id: &str,
    filter: &TopicFilter,
) -> Result<Vec<OngoingTopic>> {
    let memories =
        find_by_importance_and_type(conn, partner_id, filter.min_importance, &MemoryType::TOPIC_TYPES)?;
    let mut topics = extract_topics(&memories, Utc::now());
    if let Some(status) = filter.status {
        topics.retain(|t| t.status == status);
    }
    topics.truncate(filter.limit);
    Ok(topics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn memory(tags: &[&str], importance: u8, created: DateTime<Utc>) -> Memory {
        Memory {
            id: uuid::Uuid::now_v7().to_string(),
            partner_id: "p".into(),
            memory_type: MemoryType::Conversation,
            content: "c".into(),
            embedding: vec![],
            importance,
            emotional_weight: 0.0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            related_people: vec![],
            created_at: created.to_rfc3339(),
            updated_at: created.to_rfc3339(),
        }
    }

    #[test]
    fn groups_need_two_members() {
        let now = Utc::now();
        let memories = vec![
            memory(&["仕事", "旅行"], 4, now - Duration::days(1)),
            memory(&["仕事"], 6, now - Duration::days(2)),
        ];
        let topics = extract_topics(&memories, now);
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].title, "仕事");
        assert_eq!(topics[0].description, "仕事に関する継続的な話題");
        assert_eq!(topics[0].importance, 5.0);
        assert_eq!(topics[0].status, TopicStatus::Active);
        assert_eq!(topics[0].id, "topic-1");
    }

    #[test]
    fn status_follows_latest_mention() {
        let now = Utc::now();
        let memories = vec![
            memory(&["ゲーム"], 5, now - Duration::days(40)),
            memory(&["ゲーム"], 5, now - Duration::days(10)),
            memory(&["映画"], 5, now - Duration::days(45)),
            memory(&["映画"], 5, now - Duration::days(31)),
        ];
        let topics = extract_topics(&memories, now);
        assert_eq!(topics[0].status, TopicStatus::Dormant);
        assert_eq!(topics[1].status, TopicStatus::Resolved);
    }
}
