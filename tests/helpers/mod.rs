#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use koibito::config::KoibitoConfig;
use koibito::db;
use koibito::embedding::DisabledEmbeddings;
use koibito::image::leonardo::{GenerationParams, GenerationResult, ImageGenerator};
use koibito::llm::{ChatModel, ModelRouter, ToolRequest};
use koibito::partner::store::create_partner;
use koibito::partner::{Appearance, Gender, NewPartner, Partner, PersonalityType, SpeechStyle};
use koibito::state::AppState;
use koibito::user::{create_user, ProfileUpdate, User};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Chat model that answers from a queue of canned tool arguments and records
/// every request. An empty queue answers with an error.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Value, String>>>,
    pub requests: Mutex<Vec<ToolRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err("model unavailable".to_string())])),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> ToolRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}

/// Image generator that returns a fixed URL and records prompts.
#[derive(Default)]
pub struct FakeImages {
    pub prompts: Mutex<Vec<GenerationParams>>,
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate(&self, params: &GenerationParams) -> Result<GenerationResult> {
        params.validate()?;
        self.prompts.lock().unwrap().push(params.clone());
        Ok(GenerationResult {
            image_url: "https://cdn.example.com/image.png".into(),
            thumbnail_url: Some("https://cdn.example.com/image.png".into()),
            generation_id: "gen-1".into(),
            params: params.clone(),
        })
    }
}

/// State over `conn` with embeddings disabled and no image generator.
pub fn state_with(conn: Connection, model: Arc<ScriptedModel>) -> AppState {
    AppState::new(
        conn,
        KoibitoConfig::default(),
        ModelRouter::single(model),
        Arc::new(DisabledEmbeddings),
        None,
    )
}

pub fn state_with_images(conn: Connection, model: Arc<ScriptedModel>, images: Arc<FakeImages>) -> AppState {
    AppState::new(
        conn,
        KoibitoConfig::default(),
        ModelRouter::single(model),
        Arc::new(DisabledEmbeddings),
        Some(images as Arc<dyn ImageGenerator>),
    )
}

pub fn new_user(conn: &Connection, email: &str) -> User {
    let profile = ProfileUpdate {
        surname: Some("佐藤".into()),
        first_name: Some("花子".into()),
        nickname: Some("はなちゃん".into()),
        birthday: None,
    };
    create_user(conn, email, &profile).unwrap()
}

pub fn new_partner_input(intimacy: u8) -> NewPartner {
    NewPartner {
        name: "蓮".into(),
        gender: Gender::Boyfriend,
        personality_type: PersonalityType::Gentle,
        speech_style: SpeechStyle::Polite,
        system_prompt: String::new(),
        avatar_description: String::new(),
        appearance: Appearance {
            hair_style: Some("short".into()),
            hair_color: Some("black".into()),
            eye_color: Some("brown".into()),
            body_type: Some("slim".into()),
            clothing_style: Some("casual".into()),
        },
        hobbies: vec!["料理".into(), "読書".into()],
        intimacy_level: intimacy,
    }
}

/// A user with a gentle boyfriend at the given intimacy.
pub fn user_with_partner(conn: &mut Connection, intimacy: u8) -> (User, Partner) {
    let user = new_user(conn, "hanako@example.com");
    let partner = create_partner(conn, &user.id, new_partner_input(intimacy)).unwrap();
    (user, partner)
}

/// Canned `analyze_response` arguments.
pub fn reply_args(response: &str, emotion: &str, change: i64) -> Value {
    serde_json::json!({
        "response": response,
        "emotion": emotion,
        "intimacyChange": change,
        "emotionAnalysis": "楽しそう",
    })
}
