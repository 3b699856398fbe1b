//! Conversation summaries: the model reads a slice of chat history and
//! extracts memories and episodes, which are stored with embeddings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::episodes::create_episode;
use super::store::store_memory;
use super::types::{Episode, Memory, MemoryType, NewEpisode, NewMemory};
use crate::chat::messages::{messages_by_ids, Message, MessageSender};
use crate::db::with_conn;
use crate::embedding::embed_or_empty;
use crate::error::CompanionError;
use crate::llm::{ChatMessage, ToolRequest, ToolSpec};
use crate::partner::store::get_partner_by_id;
use crate::relationship::metrics::increment_shared_memories;
use crate::state::AppState;
use crate::user::get_or_create_settings;

/// Memories at or above this importance count as shared experiences.
const SHARED_MEMORY_IMPORTANCE: u8 = 7;
const MANUAL_EPISODE_WEIGHT: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    #[default]
    Daily,
    Weekly,
    Important,
    Episode,
}

impl SummaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Important => "important",
            Self::Episode => "episode",
        }
    }
}

impl std::str::FromStr for SummaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "important" => Ok(Self::Important),
            "episode" => Ok(Self::Episode),
            _ => Err(format!("unknown summary type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    pub message_ids: Vec<String>,
    pub summary_type: SummaryType,
    /// With [`SummaryType::Episode`], store one episode under this title
    /// instead of the ones the model proposes.
    pub episode_title: Option<String>,
    pub episode_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryOutcome {
    pub summary_text: String,
    pub memories_created: Vec<Memory>,
    pub episodes_created: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Extraction {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    memories: Vec<ExtractedMemory>,
    #[serde(default)]
    episodes: Vec<ExtractedEpisode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedMemory {
    #[serde(rename = "type")]
    memory_type: String,
    content: String,
    importance: f64,
    #[serde(default)]
    emotional_weight: f64,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    related_people: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedEpisode {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    emotional_weight: f64,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    participants: Vec<String>,
}

impl ExtractedMemory {
    fn into_new_memory(self) -> NewMemory {
        let memory_type = self.memory_type.parse().unwrap_or_else(|_| {
            tracing::warn!(memory_type = %self.memory_type, "unknown extracted memory type, storing as conversation");
            MemoryType::Conversation
        });
        NewMemory {
            memory_type,
            content: self.content,
            importance: self.importance.round().clamp(1.0, 10.0) as u8,
            emotional_weight: self.emotional_weight,
            tags: self.tags,
            related_people: self.related_people,
        }
    }
}

/// Chat transcript, one `speaker: content` line per message.
pub fn conversation_text(messages: &[Message], partner_name: &str) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.sender {
                MessageSender::User => "ユーザー",
                MessageSender::Partner => partner_name,
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn analysis_prompt(summary_type: SummaryType, partner_name: &str) -> String {
    format!(
        "あなたは高度なメモリ管理AIです。会話から重要な記憶情報を抽出してください。

パートナー名: {partner_name}
要約タイプ: {summary_type}

以下の観点で会話を分析してください：
1. 重要な事実や出来事
2. 感情的な瞬間や親密度の変化
3. 個人的な好み・趣味・価値観
4. 人間関係や社会的つながり
5. 継続的な話題や未解決の問題

メモリタイプ:
- CONVERSATION: 一般的な会話内容
- EPISODE: 特別な出来事や体験
- RELATIONSHIP: 人間関係の情報
- EMOTION: 感情に関する情報
- PREFERENCE: 好みや選択

重要度（0-10）:
- 0-3: 日常的な情報
- 4-6: 意味のある情報
- 7-8: 重要な情報
- 9-10: 極めて重要な情報

感情重み（-10〜+10）:
- 負の値: ネガティブな感情
- 正の値: ポジティブな感情
- 0: 中立的",
        summary_type = summary_type.as_str(),
    )
}

pub fn extract_memories_tool() -> ToolSpec {
    ToolSpec {
        name: "extract_memories".into(),
        description: "会話から重要な記憶情報を抽出する".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string", "description": "会話全体の要約"},
                "memories": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": {"type": "string", "enum": ["conversation", "fact", "emotion", "event", "relationship"]},
                            "content": {"type": "string"},
                            "importance": {"type": "number", "minimum": 1, "maximum": 10},
                            "emotionalWeight": {"type": "number", "minimum": 1, "maximum": 10},
                            "tags": {"type": "array", "items": {"type": "string"}},
                            "relatedPeople": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["type", "content", "importance", "emotionalWeight"]
                    }
                },
                "episodes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "summary": {"type": "string"},
                            "emotionalWeight": {"type": "number", "minimum": 0, "maximum": 10},
                            "tags": {"type": "array", "items": {"type": "string"}},
                            "participants": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["title", "summary", "emotionalWeight"]
                    }
                }
            },
            "required": ["summary", "memories"]
        }),
    }
}

fn parse_extraction(arguments: Value) -> Result<Extraction> {
    serde_json::from_value(arguments).context("メモリ抽出データの解析に失敗しました")
}

/// Summarize the given messages of `partner_id` into memories and episodes.
///
/// Message ids belonging to another partner are ignored. The model is picked
/// from the owning user's AI settings.
pub async fn create_summary(
    state: &AppState,
    partner_id: &str,
    request: SummaryRequest,
) -> Result<SummaryOutcome> {
    tracing::info!(
        partner_id,
        messages = request.message_ids.len(),
        summary_type = request.summary_type.as_str(),
        "creating conversation summary"
    );

    let pid = partner_id.to_string();
    let ids = request.message_ids.clone();
    let (partner, messages, settings) = with_conn(&state.db, move |conn| {
        let partner = get_partner_by_id(conn, &pid)?
            .ok_or_else(|| CompanionError::NotFound("パートナーが見つかりません".into()))?;
        let messages: Vec<Message> = messages_by_ids(conn, &ids)?
            .into_iter()
            .filter(|m| m.partner_id == pid)
            .collect();
        let settings = get_or_create_settings(conn, &partner.user_id)?;
        Ok((partner, messages, settings))
    })
    .await?;

    if messages.is_empty() {
        return Err(CompanionError::NotFound("対象メッセージが見つかりません".into()).into());
    }

    let transcript = conversation_text(&messages, &partner.name);
    let tool_request = ToolRequest {
        model: settings.ai_model.model.clone(),
        messages: vec![
            ChatMessage::system(analysis_prompt(request.summary_type, &partner.name)),
            ChatMessage::user(transcript),
        ],
        tool: extract_memories_tool(),
        temperature: settings.ai_model.temperature,
        max_tokens: settings.ai_model.max_tokens,
        frequency_penalty: None,
        presence_penalty: None,
    };
    let model = state.models.for_provider(settings.ai_model.provider)?;
    let arguments = model
        .call_tool(&tool_request)
        .await
        .context("メモリ抽出に失敗しました")?;
    let extraction = parse_extraction(arguments)?;

    let first_tags = extraction
        .memories
        .first()
        .map(|m| m.tags.clone())
        .unwrap_or_default();

    let mut memories_created = Vec::with_capacity(extraction.memories.len());
    for extracted in extraction.memories {
        let new = extracted.into_new_memory();
        let embedding = embed_or_empty(state.embedder.as_ref(), &new.content).await;
        let pid = partner_id.to_string();
        let memory = with_conn(&state.db, move |conn| {
            let memory = store_memory(conn, &pid, &new, &embedding)?;
            if memory.importance >= SHARED_MEMORY_IMPORTANCE {
                increment_shared_memories(conn, &pid)?;
            }
            Ok(memory)
        })
        .await?;
        memories_created.push(memory);
    }

    let episodes: Vec<NewEpisode> = match (&request.summary_type, &request.episode_title) {
        (SummaryType::Episode, Some(title)) => vec![NewEpisode {
            title: title.clone(),
            description: request
                .episode_description
                .clone()
                .unwrap_or_else(|| extraction.summary.clone()),
            emotional_weight: MANUAL_EPISODE_WEIGHT,
            tags: first_tags,
            participants: vec![partner.name.clone(), "ユーザー".into()],
        }],
        _ => extraction
            .episodes
            .into_iter()
            .map(|e| NewEpisode {
                title: e.title,
                description: e.summary,
                emotional_weight: e.emotional_weight,
                tags: e.tags,
                participants: if e.participants.is_empty() {
                    vec![partner.name.clone()]
                } else {
                    e.participants
                },
            })
            .collect(),
    };
    let manual = request.summary_type == SummaryType::Episode && request.episode_title.is_some();

    let pid = partner_id.to_string();
    let episodes_created = with_conn(&state.db, move |conn| {
        let mut created = Vec::with_capacity(episodes.len());
        for episode in &episodes {
            created.push(create_episode(conn, &pid, episode)?);
        }
        if manual {
            increment_shared_memories(conn, &pid)?;
        }
        Ok(created)
    })
    .await?;

    tracing::info!(
        partner_id,
        memories = memories_created.len(),
        episodes = episodes_created.len(),
        "conversation summary stored"
    );

    Ok(SummaryOutcome {
        summary_text: extraction.summary,
        memories_created,
        episodes_created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transcript_names_speakers() {
        let msg = |content: &str, sender| Message {
            id: "m".into(),
            partner_id: "p".into(),
            content: content.into(),
            sender,
            emotion: None,
            context: json!({}),
            created_at: String::new(),
        };
        let text = conversation_text(
            &[msg("おはよう", MessageSender::User), msg("おはよう！", MessageSender::Partner)],
            "ミオ",
        );
        assert_eq!(text, "ユーザー: おはよう\nミオ: おはよう！");
    }

    #[test]
    fn extraction_tolerates_missing_optional_fields() {
        let parsed = parse_extraction(json!({
            "summary": "映画の話",
            "memories": [{"type": "fact", "content": "猫が好き", "importance": 7.6, "emotionalWeight": 3}]
        }))
        .unwrap();
        assert!(parsed.episodes.is_empty());
        let memory = parsed.memories.into_iter().next().unwrap().into_new_memory();
        assert_eq!(memory.memory_type, MemoryType::Fact);
        assert_eq!(memory.importance, 8);
        assert!(memory.tags.is_empty());
    }

    #[test]
    fn unknown_type_falls_back_to_conversation() {
        let memory = ExtractedMemory {
            memory_type: "gossip".into(),
            content: "x".into(),
            importance: 42.0,
            emotional_weight: 0.0,
            tags: vec![],
            related_people: vec![],
        }
        .into_new_memory();
        assert_eq!(memory.memory_type, MemoryType::Conversation);
        assert_eq!(memory.importance, 10);
    }

    #[test]
    fn prompt_names_partner_and_type() {
        let prompt = analysis_prompt(SummaryType::Weekly, "ミオ");
        assert!(prompt.contains("パートナー名: ミオ"));
        assert!(prompt.contains("要約タイプ: weekly"));
    }
}
