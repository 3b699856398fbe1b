//! CLI `engage` commands: let the partner speak first.

use anyhow::Result;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use clap::Subcommand;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{print_json, with_partner, Target};
use koibito::chat::messages::last_message_at;
use koibito::engagement::service::{
    generate_proactive_engagement, generate_proactive_question, should_ask, ProactiveRequest,
};
use koibito::engagement::ShouldAskRequest;
use koibito::state::AppState;

#[derive(Subcommand, Debug)]
pub enum EngageAction {
    /// Decide whether the partner should ask something now
    ShouldAsk {
        #[command(flatten)]
        target: Target,
        /// Minutes since the last message; defaults to the stored history
        #[arg(long)]
        silence: Option<u32>,
        /// e.g. sad, tired, happy
        #[arg(long)]
        emotional_state: Option<String>,
        /// Defaults to the partner's intimacy
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        intimacy: Option<u8>,
        /// Defaults to the current local hour
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
        /// Defaults to whether today is Saturday or Sunday
        #[arg(long)]
        weekend: Option<bool>,
    },
    /// Generate an affectionate remark from the partner
    Engagement {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        intimacy: Option<u8>,
        #[arg(long)]
        last_message: Option<String>,
    },
    /// Generate a question to learn more about the user
    Question {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        intimacy: Option<u8>,
        #[arg(long, default_value_t = 0)]
        silence: u32,
        #[arg(long)]
        last_message: Option<String>,
    },
}

fn weekday_ja(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "月曜日",
        Weekday::Tue => "火曜日",
        Weekday::Wed => "水曜日",
        Weekday::Thu => "木曜日",
        Weekday::Fri => "金曜日",
        Weekday::Sat => "土曜日",
        Weekday::Sun => "日曜日",
    }
}

/// Whole minutes between the last message and `now`; 0 without history.
fn minutes_since(last_at: Option<&str>, now: DateTime<Utc>) -> u32 {
    last_at
        .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
        .map(|at| (now - at.with_timezone(&Utc)).num_minutes().clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

fn proactive_request(
    partner_id: String,
    intimacy: Option<u8>,
    silence_minutes: u32,
    last_message: Option<String>,
) -> ProactiveRequest {
    let now = chrono::Local::now();
    ProactiveRequest {
        partner_id,
        intimacy,
        hour: Some(now.hour()),
        day_of_week: Some(weekday_ja(now.weekday()).to_string()),
        last_message,
        silence_minutes,
    }
}

pub async fn run(state: &AppState, action: EngageAction) -> Result<()> {
    let mut rng = StdRng::from_entropy();
    match action {
        EngageAction::ShouldAsk {
            target,
            silence,
            emotional_state,
            intimacy,
            hour,
            weekend,
        } => {
            let (stored_intimacy, last_at) = with_partner(state, &target, |conn, p| {
                Ok((p.intimacy_level, last_message_at(conn, &p.id)?))
            })
            .await?;
            let now = chrono::Local::now();
            let silence = silence.unwrap_or_else(|| minutes_since(last_at.as_deref(), now.with_timezone(&Utc)));
            let request = ShouldAskRequest {
                silence_minutes: silence,
                user_emotional_state: emotional_state,
                intimacy: intimacy.unwrap_or(stored_intimacy),
                hour: hour.unwrap_or_else(|| now.hour()),
                is_weekend: weekend
                    .unwrap_or_else(|| matches!(now.weekday(), Weekday::Sat | Weekday::Sun)),
            };
            let decision = should_ask(state, &target.user, &target.partner, &request, &mut rng).await?;
            print_json(&decision)
        }
        EngageAction::Engagement {
            target,
            intimacy,
            last_message,
        } => {
            let request = proactive_request(target.partner, intimacy, 0, last_message);
            let outcome = generate_proactive_engagement(state, &target.user, request, &mut rng).await?;
            print_json(&outcome)
        }
        EngageAction::Question {
            target,
            intimacy,
            silence,
            last_message,
        } => {
            let request = proactive_request(target.partner, intimacy, silence, last_message);
            let outcome = generate_proactive_question(state, &target.user, request, &mut rng).await?;
            print_json(&outcome)
        }
    }
}
