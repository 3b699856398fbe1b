//! CLI `notify` commands.

use anyhow::Result;
use chrono::{Local, Utc};
use clap::Subcommand;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use super::{print_json, Target};
use koibito::db::with_conn;
use koibito::notification::store::{
    cancel_schedule, create_schedule, deliver_due, get_or_create_notification_settings, list_schedules,
    morning_greeting_message, morning_greeting_targets, notification_stats, reset_notification_settings,
    update_notification_settings, NewSchedule,
};
use koibito::notification::{check_settings, NotificationKind, NotificationUpdate, RecurringPattern};
use koibito::state::AppState;

#[derive(Subcommand, Debug)]
pub enum NotifyAction {
    /// Show a user's notification settings with advice
    Show {
        #[arg(long)]
        user: String,
    },
    /// Change notification settings
    Set {
        #[arg(long)]
        user: String,
        #[arg(long)]
        morning_greeting: Option<bool>,
        /// HH:MM between 4:00 and 12:00
        #[arg(long)]
        morning_time: Option<String>,
        #[arg(long)]
        reminders: Option<bool>,
        #[arg(long)]
        special_days: Option<bool>,
    },
    /// Restore the default settings
    Reset {
        #[arg(long)]
        user: String,
    },
    /// Schedule a notification
    Schedule {
        #[arg(long)]
        user: String,
        #[arg(long)]
        partner: Option<String>,
        /// morning_greeting, reminder, special_day or custom
        #[arg(long)]
        kind: NotificationKind,
        /// HH:MM (next occurrence) or an RFC 3339 time
        #[arg(long)]
        at: String,
        #[arg(long)]
        message: Option<String>,
        /// daily, weekly or monthly
        #[arg(long)]
        repeat: Option<RecurringPattern>,
    },
    /// List a user's scheduled notifications
    Schedules {
        #[arg(long)]
        user: String,
        /// Include sent and cancelled ones
        #[arg(long)]
        all: bool,
    },
    /// Cancel a scheduled notification
    Cancel {
        #[arg(long)]
        user: String,
        #[arg(long)]
        schedule: String,
    },
    /// Send every notification that is due now
    Deliver {
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Pick a morning greeting from the partner
    Greeting {
        #[command(flatten)]
        target: Target,
    },
    /// List users to greet at a time
    Targets {
        /// HH:MM
        #[arg(long)]
        time: String,
    },
    /// Counts of enabled notifications and popular greeting times
    Stats,
}

pub async fn run(state: &AppState, action: NotifyAction) -> Result<()> {
    match action {
        NotifyAction::Show { user } => {
            let settings = with_conn(&state.db, move |conn| get_or_create_notification_settings(conn, &user)).await?;
            print_json(&json!({
                "settings": settings,
                "summary": settings.summary(),
                "check": check_settings(&settings),
            }))
        }
        NotifyAction::Set {
            user,
            morning_greeting,
            morning_time,
            reminders,
            special_days,
        } => {
            let update = NotificationUpdate {
                morning_greeting,
                morning_time,
                reminder_messages: reminders,
                special_days,
            };
            let settings = with_conn(&state.db, move |conn| {
                update_notification_settings(conn, &user, &update, &Local::now())
            })
            .await?;
            print_json(&settings)
        }
        NotifyAction::Reset { user } => {
            let settings =
                with_conn(&state.db, move |conn| reset_notification_settings(conn, &user, &Local::now())).await?;
            print_json(&settings)
        }
        NotifyAction::Schedule {
            user,
            partner,
            kind,
            at,
            message,
            repeat,
        } => {
            let new = NewSchedule {
                partner_id: partner,
                kind,
                scheduled_time: at,
                message,
                recurring: repeat.is_some(),
                recurring_pattern: repeat,
            };
            let schedule =
                with_conn(&state.db, move |conn| create_schedule(conn, &user, &new, &Local::now())).await?;
            print_json(&schedule)
        }
        NotifyAction::Schedules { user, all } => {
            let schedules = with_conn(&state.db, move |conn| list_schedules(conn, &user, all)).await?;
            print_json(&schedules)
        }
        NotifyAction::Cancel { user, schedule } => {
            let id = schedule.clone();
            with_conn(&state.db, move |conn| cancel_schedule(conn, &user, &id)).await?;
            println!("Schedule {schedule} cancelled.");
            Ok(())
        }
        NotifyAction::Deliver { limit } => {
            let delivered = with_conn(&state.db, move |conn| {
                deliver_due(conn, Utc::now(), limit, &mut StdRng::from_entropy())
            })
            .await?;
            print_json(&delivered)
        }
        NotifyAction::Greeting { target } => {
            let message = with_conn(&state.db, move |conn| {
                morning_greeting_message(conn, &target.user, &target.partner, &mut StdRng::from_entropy())
            })
            .await?;
            print_json(&json!({ "message": message }))
        }
        NotifyAction::Targets { time } => {
            let targets = with_conn(&state.db, move |conn| morning_greeting_targets(conn, &time)).await?;
            print_json(&targets)
        }
        NotifyAction::Stats => print_json(&with_conn(&state.db, |conn| notification_stats(conn)).await?),
    }
}
