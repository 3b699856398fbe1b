//! CLI `chat` commands.

use anyhow::Result;
use clap::Subcommand;

use super::{print_json, Target};
use koibito::chat::service::HistoryQuery;
use koibito::chat::{get_emotion, get_messages, send_message, SendMessageRequest};
use koibito::state::AppState;

#[derive(Subcommand, Debug)]
pub enum ChatAction {
    /// Send a message and print the partner's reply
    Send {
        #[command(flatten)]
        target: Target,
        message: String,
        /// Location id the conversation takes place at
        #[arg(long)]
        location: Option<String>,
        /// Client local time, e.g. "2025/12/24 19:30"; defaults to now
        #[arg(long)]
        date_time: Option<String>,
    },
    /// Print stored messages, oldest first
    History {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// RFC 3339; used together with --end
        #[arg(long, requires = "end")]
        start: Option<String>,
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Show the partner's latest emotion and intimacy
    Emotion {
        #[command(flatten)]
        target: Target,
    },
}

pub async fn run(state: &AppState, action: ChatAction) -> Result<()> {
    match action {
        ChatAction::Send {
            target,
            message,
            location,
            date_time,
        } => {
            let local_date_time =
                date_time.or_else(|| Some(chrono::Local::now().format("%Y/%m/%d %H:%M").to_string()));
            let request = SendMessageRequest {
                partner_id: target.partner,
                message,
                location_id: location,
                local_date_time,
                context: Default::default(),
            };
            let reply = send_message(state, &target.user, request).await?;
            print_json(&reply)
        }
        ChatAction::History {
            target,
            limit,
            offset,
            start,
            end,
        } => {
            let query = HistoryQuery {
                limit,
                offset,
                start,
                end,
            };
            let page = get_messages(state, &target.user, &target.partner, query).await?;
            print_json(&page)
        }
        ChatAction::Emotion { target } => {
            print_json(&get_emotion(state, &target.user, &target.partner).await?)
        }
    }
}
