//! Memory record types.
//!
//! [`Memory`] is a single remembered fact about the user, [`Episode`] a titled
//! shared experience, and [`PersonalityMemory`] the partner's running picture
//! of the user's strengths, shadows and values.

use serde::{Deserialize, Serialize};

/// The seven memory categories stored in the `memories` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Conversation,
    Episode,
    Relationship,
    Emotion,
    Preference,
    Fact,
    Event,
}

impl MemoryType {
    pub const ALL: [MemoryType; 7] = [
        Self::Conversation,
        Self::Episode,
        Self::Relationship,
        Self::Emotion,
        Self::Preference,
        Self::Fact,
        Self::Event,
    ];

    /// Types injected into the chat system prompt.
    pub const PROMPT_TYPES: [MemoryType; 4] =
        [Self::Fact, Self::Preference, Self::Emotion, Self::Event];

    /// Types that ongoing topics are built from.
    pub const TOPIC_TYPES: [MemoryType; 3] =
        [Self::Conversation, Self::Preference, Self::Relationship];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Episode => "episode",
            Self::Relationship => "relationship",
            Self::Emotion => "emotion",
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    /// Case-insensitive, so model output such as `FACT` parses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown memory type: {s}"))
    }
}

/// A memory record, matching the `memories` table.
#[derive(Debug, Clone, Serialize)]
pub struct Memory {
    pub id: String,
    pub partner_id: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub content: String,
    /// Empty when the embedding call failed or no provider is configured.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// 1..=10.
    pub importance: u8,
    pub emotional_weight: f64,
    pub tags: Vec<String>,
    pub related_people: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input to [`crate::memory::store::store_memory`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewMemory {
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: u8,
    #[serde(default)]
    pub emotional_weight: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_people: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Episode {
    pub id: String,
    pub partner_id: String,
    pub title: String,
    pub description: String,
    pub emotional_weight: f64,
    pub tags: Vec<String>,
    pub participants: Vec<String>,
    pub date: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub title: String,
    pub description: String,
    pub emotional_weight: f64,
    pub tags: Vec<String>,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitKind {
    Strength,
    Shadow,
}

impl std::str::FromStr for TraitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strength" => Ok(Self::Strength),
            "shadow" => Ok(Self::Shadow),
            _ => Err(format!("unknown trait kind: {s}")),
        }
    }
}

/// One observed trait, e.g. "優しい" seen when someone was in trouble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTrait {
    #[serde(rename = "trait")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub importance: u8,
    pub last_seen: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PersonalityMemory {
    pub partner_id: String,
    pub strengths: Vec<PersonalityTrait>,
    pub shadows: Vec<PersonalityTrait>,
    pub core_values: Vec<String>,
    pub last_updated: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_parses_any_case() {
        assert_eq!("FACT".parse::<MemoryType>().unwrap(), MemoryType::Fact);
        assert_eq!("preference".parse::<MemoryType>().unwrap(), MemoryType::Preference);
        assert!("semantic".parse::<MemoryType>().is_err());
    }

    #[test]
    fn new_memory_deserializes_with_defaults() {
        let m: NewMemory =
            serde_json::from_str(r#"{"type":"fact","content":"猫が好き","importance":6}"#).unwrap();
        assert_eq!(m.memory_type, MemoryType::Fact);
        assert!(m.tags.is_empty());
        assert_eq!(m.emotional_weight, 0.0);
    }
}
