//! AI companion chat engine.
//!
//! koibito keeps a partner persona per user, grows an intimacy level from 0 to
//! 100 as they talk, remembers what the user shares and lets the partner
//! reach out first with remarks and questions.
//!
//! # Architecture
//!
//! - **Storage**: one SQLite database (rusqlite) shared behind a mutex; all
//!   queries run on the blocking pool through [`db::with_conn`]
//! - **Models**: every model call is a forced tool call through
//!   [`llm::ChatModel`], routed to OpenAI or Anthropic by the user's settings
//! - **Memory**: embeddings stored as BLOBs, scored with cosine similarity
//!   plus text, tag and importance signals
//! - **Images**: Leonardo generation with prompts built from the partner's
//!   appearance and current location
//!
//! # Modules
//!
//! - [`partner`]: personas, presets and prompt validation
//! - [`relationship`]: intimacy stages, calling style and metrics
//! - [`chat`]: messages, prompt assembly and replies
//! - [`engagement`]: proactive remarks, questions and their timing
//! - [`memory`]: storage, search, traits, episodes, topics and retention
//! - [`location`]: the place catalog and unlocks
//! - [`image`]: clothing, prompts, Leonardo client and image history
//! - [`notification`]: notification preferences, schedules and morning greetings

pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engagement;
pub mod error;
pub(crate) mod http;
pub mod image;
pub mod llm;
pub mod location;
pub mod memory;
pub mod notification;
pub mod partner;
pub mod relationship;
pub mod state;
pub mod user;
