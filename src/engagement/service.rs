//! Proactive messages: the partner speaks first, either with an affectionate
//! remark or with a question meant to learn about the user.

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::patterns::{engagement_priority, select_engagement_type};
use super::prompt::{build_engagement_prompt, build_question_prompt, QuestionPromptInput, TimeContext};
use super::question::{determine_question_type, required_intimacy_for_info, select_target_info};
use super::timing::{question_priority, should_ask_question, ShouldAskDecision, ShouldAskRequest};
use super::{EngagementType, Priority, QuestionType};
use crate::chat::messages::{insert_message, recent_engagement_types, Message, MessageSender};
use crate::db::with_conn;
use crate::error::CompanionError;
use crate::llm::{ChatMessage, ToolRequest, ToolSpec};
use crate::memory::store::list_memories;
use crate::memory::types::Memory;
use crate::partner::store::get_partner;
use crate::partner::Partner;
use crate::relationship::{calling_style, UserNames};
use crate::state::AppState;
use crate::user::{get_or_create_settings, require_user, AiModelSettings, User};

/// Engagement types looked at when damping repeats.
const RECENT_ENGAGEMENTS: usize = 10;
/// Memories consulted when choosing what to ask.
const QUESTION_MEMORY_LIMIT: usize = 50;

const ENGAGEMENT_TEMPERATURE: f64 = 0.9;
const ENGAGEMENT_MAX_TOKENS: u32 = 200;
const QUESTION_TEMPERATURE: f64 = 0.8;
const QUESTION_MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProactiveRequest {
    pub partner_id: String,
    /// Defaults to the partner's stored intimacy.
    pub intimacy: Option<u8>,
    pub hour: Option<u32>,
    pub day_of_week: Option<String>,
    pub last_message: Option<String>,
    pub silence_minutes: u32,
}

impl ProactiveRequest {
    fn time_context(&self) -> Option<TimeContext> {
        self.hour.map(|hour| TimeContext {
            hour,
            day_of_week: self.day_of_week.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementOutcome {
    pub message: Message,
    pub engagement_type: EngagementType,
    pub priority: Priority,
    pub emotional_tone: String,
    pub follow_up_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub message: Message,
    pub question_type: QuestionType,
    pub target_info: String,
    pub priority: Priority,
    pub tone: String,
    pub context: String,
    pub intimacy_required: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedEngagement {
    message: String,
    #[serde(default)]
    emotional_tone: String,
    #[serde(default)]
    follow_up_suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    context: String,
}

fn engagement_tool() -> ToolSpec {
    ToolSpec {
        name: "generate_engagement".into(),
        description: "AI主導の親密な発言を生成する".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "生成された発言" },
                "emotionalTone": { "type": "string", "description": "感情のトーン（happy, playful, caring, etc.）" },
                "followUpSuggestions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "ユーザーが返答しやすい話題の提案"
                }
            },
            "required": ["message", "emotionalTone"]
        }),
    }
}

fn question_tool() -> ToolSpec {
    ToolSpec {
        name: "generate_question".into(),
        description: "AI主導の戦略的質問を生成する".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "生成された質問メッセージ" },
                "tone": { "type": "string", "description": "質問のトーン・雰囲気" },
                "context": { "type": "string", "description": "質問の背景・意図" }
            },
            "required": ["question", "tone", "context"]
        }),
    }
}

struct Loaded {
    partner: Partner,
    user: User,
    settings: AiModelSettings,
}

async fn load(state: &AppState, user_id: &str, partner_id: &str) -> Result<Loaded> {
    let (uid, pid) = (user_id.to_string(), partner_id.to_string());
    with_conn(&state.db, move |conn| {
        let partner = get_partner(conn, &pid, &uid)?;
        let user = require_user(conn, &uid)?;
        let settings = get_or_create_settings(conn, &uid)?.ai_model;
        Ok(Loaded {
            partner,
            user,
            settings,
        })
    })
    .await
}

async fn call_model(
    state: &AppState,
    settings: &AiModelSettings,
    system_prompt: String,
    instruction: &str,
    tool: ToolSpec,
    temperature: f64,
    max_tokens: u32,
) -> Result<Value> {
    let model = state.models.for_provider(settings.provider)?;
    let request = ToolRequest {
        model: settings.model.clone(),
        messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(instruction)],
        tool,
        temperature,
        max_tokens,
        frequency_penalty: None,
        presence_penalty: None,
    };
    model.call_tool(&request).await
}

/// Ownership-checked [`should_ask_question`].
pub async fn should_ask(
    state: &AppState,
    user_id: &str,
    partner_id: &str,
    request: &ShouldAskRequest,
    rng: &mut (impl Rng + Send),
) -> Result<ShouldAskDecision> {
    if request.hour > 23 {
        return Err(CompanionError::validation(format!("hour must be 0-23, got {}", request.hour)).into());
    }
    if request.intimacy > 100 {
        return Err(
            CompanionError::validation(format!("intimacy must be 0-100, got {}", request.intimacy)).into(),
        );
    }
    let (uid, pid) = (user_id.to_string(), partner_id.to_string());
    with_conn(&state.db, move |conn| get_partner(conn, &pid, &uid).map(|_| ())).await?;
    let decision = should_ask_question(request, rng);
    tracing::debug!(partner_id, should_ask = decision.should_ask, delay = decision.delay_minutes, "question timing checked");
    Ok(decision)
}

/// Generate and store an affectionate remark. The chosen type is recorded
/// in the message context so later picks avoid repeating it.
pub async fn generate_proactive_engagement(
    state: &AppState,
    user_id: &str,
    request: ProactiveRequest,
    rng: &mut (impl Rng + Send),
) -> Result<EngagementOutcome> {
    let Loaded {
        partner,
        user,
        settings,
    } = load(state, user_id, &request.partner_id).await?;
    let intimacy = request.intimacy.unwrap_or(partner.intimacy_level);

    let pid = partner.id.clone();
    let recent: Vec<EngagementType> = with_conn(&state.db, move |conn| {
        recent_engagement_types(conn, &pid, RECENT_ENGAGEMENTS)
    })
    .await?
    .iter()
    .filter_map(|t| t.parse().ok())
    .collect();

    let kind = select_engagement_type(partner.personality_type, intimacy, &recent, rng);
    let prompt = build_engagement_prompt(
        &partner,
        user.display_name(),
        kind,
        intimacy,
        request.last_message.as_deref(),
    );
    tracing::info!(partner_id = %partner.id, engagement = %kind, intimacy, "generating proactive engagement");

    let arguments = call_model(
        state,
        &settings,
        prompt,
        "恋人として自然で愛情深い発言をしてください。",
        engagement_tool(),
        ENGAGEMENT_TEMPERATURE,
        ENGAGEMENT_MAX_TOKENS,
    )
    .await
    .context("発言生成に失敗しました")?;
    let generated: GeneratedEngagement =
        serde_json::from_value(arguments).context("発言生成に失敗しました")?;

    let priority = engagement_priority(intimacy, kind);
    let tone = if generated.emotional_tone.is_empty() {
        "friendly".to_string()
    } else {
        generated.emotional_tone
    };
    let context = json!({
        "isProactiveEngagement": true,
        "engagementType": kind.as_str(),
        "priority": priority.as_str(),
        "emotionalTone": tone,
    });
    let pid = partner.id.clone();
    let content = generated.message;
    let emotion = tone.clone();
    let message = with_conn(&state.db, move |conn| {
        insert_message(conn, &pid, &content, MessageSender::Partner, Some(&emotion), &context)
    })
    .await?;

    Ok(EngagementOutcome {
        message,
        engagement_type: kind,
        priority,
        emotional_tone: tone,
        follow_up_suggestions: generated.follow_up_suggestions,
    })
}

/// Generate and store a question about something memory does not cover yet.
pub async fn generate_proactive_question(
    state: &AppState,
    user_id: &str,
    request: ProactiveRequest,
    rng: &mut (impl Rng + Send),
) -> Result<QuestionOutcome> {
    let Loaded {
        partner,
        user,
        settings,
    } = load(state, user_id, &request.partner_id).await?;
    let intimacy = request.intimacy.unwrap_or(partner.intimacy_level);

    let pid = partner.id.clone();
    let known: Vec<Memory> = match with_conn(&state.db, move |conn| {
        list_memories(conn, &pid, QUESTION_MEMORY_LIMIT)
    })
    .await
    {
        Ok(memories) => memories,
        Err(e) => {
            tracing::warn!(error = %e, "could not load memories for question, asking blind");
            Vec::new()
        }
    };

    let kind = determine_question_type(intimacy, &known, rng);
    let target_info = select_target_info(kind, &known, rng);
    let calling = calling_style(&UserNames::from_user(&user), partner.personality_type, intimacy);
    let time = request.time_context();
    let prompt = build_question_prompt(&QuestionPromptInput {
        partner: &partner,
        calling: &calling,
        kind,
        target_info: &target_info,
        intimacy,
        time: time.as_ref(),
        last_message: request.last_message.as_deref(),
        known: &known,
    });
    tracing::info!(partner_id = %partner.id, question_type = %kind, target = %target_info, "generating proactive question");

    let arguments = call_model(
        state,
        &settings,
        prompt,
        "上記の条件に基づいて、自然で愛情あふれる質問を生成してください。",
        question_tool(),
        QUESTION_TEMPERATURE,
        QUESTION_MAX_TOKENS,
    )
    .await
    .context("質問生成に失敗しました")?;
    let generated: GeneratedQuestion =
        serde_json::from_value(arguments).context("質問生成に失敗しました")?;

    let priority = question_priority(intimacy, request.silence_minutes, None);
    let context = json!({
        "isProactiveQuestion": true,
        "questionType": kind.as_str(),
        "targetInfo": target_info,
        "priority": priority.as_str(),
        "expectedDepth": generated.context,
    });
    let pid = partner.id.clone();
    let content = generated.question;
    let emotion = if generated.tone.is_empty() {
        "happy".to_string()
    } else {
        generated.tone.clone()
    };
    let message = with_conn(&state.db, move |conn| {
        insert_message(conn, &pid, &content, MessageSender::Partner, Some(&emotion), &context)
    })
    .await?;
    tracing::info!(message_id = %message.id, question_type = %kind, "proactive question stored");

    Ok(QuestionOutcome {
        message,
        question_type: kind,
        intimacy_required: required_intimacy_for_info(&target_info),
        target_info,
        priority,
        tone: generated.tone,
        context: generated.context,
    })
}
