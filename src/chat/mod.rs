//! Conversation with the partner: stored messages, prompt assembly and the
//! reply service.

pub mod messages;
pub mod prompt;
pub mod service;

pub use service::{get_emotion, get_messages, handle_typing, send_message, SendMessageRequest};
