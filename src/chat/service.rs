//! Sending a message and getting the partner's reply.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::messages::{
    insert_message, last_emotion, message_count, message_history, messages_between,
    recent_messages, Message, MessageSender, MAX_MESSAGE_CHARS,
};
use super::prompt::{build_conversation, build_system_prompt, SystemPromptContext};
use crate::db::with_conn;
use crate::error::CompanionError;
use crate::image::clothing::Season;
use crate::llm::{ChatMessage, ToolRequest, ToolSpec};
use crate::location::{check_new_unlocks, Location};
use crate::memory::store::prompt_memories;
use crate::memory::types::Memory;
use crate::partner::store::{get_partner, update_intimacy};
use crate::partner::Partner;
use crate::relationship::metrics::increment_conversation_frequency;
use crate::relationship::{calling_style, UserNames};
use crate::state::AppState;
use crate::user::{get_or_create_settings, get_user, AiModelSettings, AiProvider};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;
const MAX_TYPING_PREVIEW_CHARS: usize = 500;
const MAX_INTIMACY_CHANGE: i64 = 10;

const FALLBACK_REPLIES: &[&str] = &[
    "すみません、今少し調子が悪いみたいです。もう一度話しかけてもらえますか？",
    "ちょっと考えがまとまらないですね...もう一度お話しいただけますか？",
    "申し訳ないです、うまく言葉にできません。別の話題はいかがですか？",
    "ごめんなさい、今はちょっと思考が整理できていないです。",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessageRequest {
    pub partner_id: String,
    pub message: String,
    /// Overrides the partner's saved location for this reply.
    pub location_id: Option<String>,
    pub local_date_time: Option<String>,
    /// Extra fields stored on both messages.
    pub context: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub emotion: String,
    pub intimacy_level: u8,
    pub new_messages: Vec<Message>,
    /// Places that opened up because intimacy rose with this reply.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unlocked_locations: Vec<&'static Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub response: String,
    pub emotion: String,
    pub intimacy_change: i32,
    pub emotion_analysis: String,
}

impl Reply {
    pub fn fallback(rng: &mut impl Rng) -> Self {
        let response = FALLBACK_REPLIES
            .choose(rng)
            .copied()
            .unwrap_or(FALLBACK_REPLIES[0]);
        Self {
            response: response.to_string(),
            emotion: "confused".into(),
            intimacy_change: 0,
            emotion_analysis: "システムエラーによる感情分析不可".into(),
        }
    }

    /// Read the `analyze_response` arguments, defaulting missing fields.
    pub fn from_arguments(args: &Value) -> Self {
        let text = |key: &str, default: &str| {
            args.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let change = args
            .get("intimacyChange")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
            .unwrap_or(0)
            .clamp(-MAX_INTIMACY_CHANGE, MAX_INTIMACY_CHANGE);
        Self {
            response: text("response", "すみません、うまく応答できませんでした。"),
            emotion: text("emotion", "neutral"),
            intimacy_change: change as i32,
            emotion_analysis: text("emotionAnalysis", "感情分析なし"),
        }
    }
}

pub fn validate_message(message: &str) -> Result<(), CompanionError> {
    if message.trim().is_empty() {
        return Err(CompanionError::validation("メッセージは必須です"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(CompanionError::validation(format!(
            "メッセージは{MAX_MESSAGE_CHARS}文字以内で入力してください"
        )));
    }
    Ok(())
}

fn reply_tool(provider: AiProvider) -> ToolSpec {
    let description = match provider {
        AiProvider::OpenAi => "Generate AIパートナーの応答 and provide emotion analysis. You must create a NEW response message as the AIパートナー, NOT repeat or analyze user input.",
        AiProvider::Anthropic => "AIパートナーの応答と感情分析を提供",
    };
    ToolSpec {
        name: "analyze_response".into(),
        description: description.into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "response": {
                    "type": "string",
                    "description": "あなた（AIパートナー）が生成する新しい応答メッセージ。ユーザーの発言を繰り返してはいけません。必ずAIパートナーとして独自の応答を生成してください。"
                },
                "emotion": {
                    "type": "string",
                    "description": "あなた（AIパートナー）の現在の感情状態 (happy, sad, excited, calm, confused, etc.)"
                },
                "intimacyChange": {
                    "type": "integer",
                    "description": "この会話による親密度の変化 (-10から+10の範囲)"
                },
                "emotionAnalysis": {
                    "type": "string",
                    "description": "この会話の感情分析の詳細"
                }
            },
            "required": ["response", "emotion", "intimacyChange", "emotionAnalysis"]
        }),
    }
}

async fn call_reply_model(
    state: &AppState,
    settings: &AiModelSettings,
    messages: Vec<ChatMessage>,
) -> Result<Reply> {
    let model = state.models.for_provider(settings.provider)?;
    let (frequency_penalty, presence_penalty) = match settings.provider {
        AiProvider::OpenAi => (Some(0.7), Some(0.5)),
        AiProvider::Anthropic => (None, None),
    };
    let request = ToolRequest {
        model: settings.model.clone(),
        messages,
        tool: reply_tool(settings.provider),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        frequency_penalty,
        presence_penalty,
    };
    let args = model
        .call_tool(&request)
        .await
        .context("AI応答の生成に失敗しました")?;
    Ok(Reply::from_arguments(&args))
}

/// Everything read from the database before the model is called.
struct ReplyContext {
    partner: Partner,
    calling: String,
    settings: AiModelSettings,
    history: Vec<Message>,
    memories: Vec<Memory>,
}

async fn load_reply_context(state: &AppState, user_id: &str, partner_id: &str) -> Result<ReplyContext> {
    let (uid, pid) = (user_id.to_string(), partner_id.to_string());
    let config = state.config.clone();
    with_conn(&state.db, move |conn| {
        let partner = get_partner(conn, &pid, &uid)?;
        let user = get_user(conn, &uid)?;
        let calling = match &user {
            Some(user) => calling_style(
                &UserNames::from_user(user),
                partner.personality_type,
                partner.intimacy_level,
            ),
            None => "あなた".to_string(),
        };
        let settings = match get_or_create_settings(conn, &uid) {
            Ok(settings) => settings.ai_model,
            Err(e) => {
                tracing::warn!(error = %e, "could not load ai settings, using defaults");
                AiModelSettings {
                    provider: AiProvider::OpenAi,
                    model: config.chat.model.clone(),
                    temperature: config.chat.temperature,
                    max_tokens: config.chat.max_tokens,
                }
            }
        };
        let history = recent_messages(conn, &pid, config.chat.context_messages)?;
        let memories = match prompt_memories(
            conn,
            &pid,
            config.memory.min_importance,
            config.memory.max_in_prompt,
        ) {
            Ok(memories) => memories,
            Err(e) => {
                tracing::warn!(error = %e, "could not load prompt memories");
                Vec::new()
            }
        };
        Ok(ReplyContext {
            partner,
            calling,
            settings,
            history,
            memories,
        })
    })
    .await
}

/// Store the user's message, generate and store the partner's reply and
/// apply the reply's intimacy change.
///
/// Model failures never fail the call: the reply falls back to a canned
/// apology with no intimacy change.
pub async fn send_message(state: &AppState, user_id: &str, request: SendMessageRequest) -> Result<ChatResponse> {
    validate_message(&request.message)?;
    let ctx = load_reply_context(state, user_id, &request.partner_id).await?;
    let partner_id = ctx.partner.id.clone();
    tracing::info!(partner_id = %partner_id, chars = request.message.chars().count(), "chat message received");

    let user_context = Value::Object(request.context.clone());
    let (pid, content, context) = (partner_id.clone(), request.message.clone(), user_context);
    let user_message = with_conn(&state.db, move |conn| {
        insert_message(conn, &pid, &content, MessageSender::User, None, &context)
    })
    .await?;

    let location_id = request
        .location_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ctx.partner.current_location_id.clone());
    let system_prompt = build_system_prompt(&SystemPromptContext {
        partner: &ctx.partner,
        calling: &ctx.calling,
        location_id: Some(&location_id),
        season: Season::current(),
        local_date_time: request.local_date_time.as_deref(),
        memories: &ctx.memories,
    });
    let messages = build_conversation(
        &system_prompt,
        &ctx.history,
        &request.message,
        state.config.chat.history_in_prompt,
    );

    let reply = match call_reply_model(state, &ctx.settings, messages).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(partner_id = %partner_id, error = %format!("{e:#}"), "reply generation failed, using fallback");
            let mut rng = rand::thread_rng();
            Reply::fallback(&mut rng)
        }
    };

    let mut reply_context = Map::new();
    reply_context.insert("intimacyChange".into(), json!(reply.intimacy_change));
    reply_context.insert("emotionAnalysis".into(), json!(reply.emotion_analysis));
    reply_context.extend(request.context);

    let (pid, uid) = (partner_id.clone(), user_id.to_string());
    let (content, emotion, change) = (reply.response.clone(), reply.emotion.clone(), reply.intimacy_change);
    let previous_intimacy = ctx.partner.intimacy_level;
    let (ai_message, intimacy_level) = with_conn(&state.db, move |conn| {
        let message = insert_message(
            conn,
            &pid,
            &content,
            MessageSender::Partner,
            Some(&emotion),
            &Value::Object(reply_context),
        )?;
        if change == 0 {
            return Ok((message, previous_intimacy));
        }
        let partner = update_intimacy(conn, &pid, &uid, change)?;
        if let Err(e) = increment_conversation_frequency(conn, &pid) {
            tracing::warn!(partner_id = %pid, error = %e, "relationship metrics update failed");
        }
        Ok((message, partner.intimacy_level))
    })
    .await?;

    tracing::info!(
        partner_id = %partner_id,
        emotion = %reply.emotion,
        intimacy_change = reply.intimacy_change,
        intimacy = intimacy_level,
        "partner replied"
    );

    let unlocked_locations = check_new_unlocks(previous_intimacy, intimacy_level);
    for location in &unlocked_locations {
        tracing::info!(partner_id = %partner_id, location_id = location.id, "location unlocked");
    }

    Ok(ChatResponse {
        response: reply.response,
        emotion: reply.emotion,
        intimacy_level,
        new_messages: vec![user_message, ai_message],
        unlocked_locations,
    })
}

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub offset: usize,
    /// RFC 3339 bounds; the range is used only when both are set.
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: u64,
}

pub async fn get_messages(
    state: &AppState,
    user_id: &str,
    partner_id: &str,
    query: HistoryQuery,
) -> Result<MessagePage> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(CompanionError::validation("リミットは1-100の間で指定してください").into());
    }
    let range = match (&query.start, &query.end) {
        (Some(start), Some(end)) => Some((parse_bound(start)?, parse_bound(end)?)),
        _ => None,
    };
    let (uid, pid) = (user_id.to_string(), partner_id.to_string());
    with_conn(&state.db, move |conn| {
        get_partner(conn, &pid, &uid)?;
        let total = message_count(conn, &pid)?;
        let messages = match range {
            Some((start, end)) => messages_between(conn, &pid, start, end)?,
            None => message_history(conn, &pid, limit, query.offset)?,
        };
        Ok(MessagePage { messages, total })
    })
    .await
}

fn parse_bound(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| CompanionError::validation(format!("日時の形式が正しくありません: {value}")).into())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionState {
    pub emotion: Option<String>,
    pub intimacy_level: u8,
}

/// The partner's latest emotion and current intimacy.
pub async fn get_emotion(state: &AppState, user_id: &str, partner_id: &str) -> Result<EmotionState> {
    let (uid, pid) = (user_id.to_string(), partner_id.to_string());
    with_conn(&state.db, move |conn| {
        let partner = get_partner(conn, &pid, &uid)?;
        Ok(EmotionState {
            emotion: last_emotion(conn, &pid)?,
            intimacy_level: partner.intimacy_level,
        })
    })
    .await
}

/// Record that the user is typing. Nothing is persisted.
pub async fn handle_typing(
    state: &AppState,
    user_id: &str,
    partner_id: &str,
    is_typing: bool,
    preview: Option<&str>,
) -> Result<()> {
    if preview.is_some_and(|p| p.chars().count() > MAX_TYPING_PREVIEW_CHARS) {
        return Err(CompanionError::validation("プレビューメッセージは500文字以内で指定してください").into());
    }
    let (uid, pid) = (user_id.to_string(), partner_id.to_string());
    with_conn(&state.db, move |conn| get_partner(conn, &pid, &uid).map(|_| ())).await?;
    tracing::debug!(partner_id, is_typing, preview_chars = preview.map(|p| p.chars().count()), "typing");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn message_length_bounds() {
        assert!(validate_message("こんにちは").is_ok());
        assert!(validate_message("   ").is_err());
        assert!(validate_message(&"あ".repeat(MAX_MESSAGE_CHARS)).is_ok());
        let err = validate_message(&"あ".repeat(MAX_MESSAGE_CHARS + 1)).unwrap_err();
        assert_eq!(err.to_string(), "メッセージは1000文字以内で入力してください");
    }

    #[test]
    fn reply_defaults_and_clamps() {
        let reply = Reply::from_arguments(&json!({ "intimacyChange": 25 }));
        assert_eq!(reply.response, "すみません、うまく応答できませんでした。");
        assert_eq!(reply.emotion, "neutral");
        assert_eq!(reply.intimacy_change, 10);
        assert_eq!(reply.emotion_analysis, "感情分析なし");

        let reply = Reply::from_arguments(&json!({
            "response": "会えて嬉しい！",
            "emotion": "happy",
            "intimacyChange": -12.0,
            "emotionAnalysis": "喜び"
        }));
        assert_eq!(reply.response, "会えて嬉しい！");
        assert_eq!(reply.intimacy_change, -10);
    }

    #[test]
    fn fallback_is_confused_and_neutral() {
        let mut rng = StdRng::seed_from_u64(4);
        let reply = Reply::fallback(&mut rng);
        assert!(FALLBACK_REPLIES.contains(&reply.response.as_str()));
        assert_eq!(reply.emotion, "confused");
        assert_eq!(reply.intimacy_change, 0);
    }

    #[test]
    fn tool_description_depends_on_provider() {
        assert!(reply_tool(AiProvider::OpenAi).description.starts_with("Generate"));
        assert_eq!(reply_tool(AiProvider::Anthropic).description, "AIパートナーの応答と感情分析を提供");
    }
}
