//! CLI `user` commands: registration, profile and settings.

use anyhow::{bail, Result};
use clap::Subcommand;
use serde_json::json;

use super::print_json;
use koibito::db::with_conn;
use koibito::error::CompanionError;
use koibito::partner::store::get_partner_for_user;
use koibito::state::AppState;
use koibito::user::{
    create_user, find_user_by_email, get_or_create_settings, require_user, update_profile, update_settings, AiProvider,
    ProfileUpdate, SettingsUpdate,
};

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Register a new user
    Create {
        #[arg(long)]
        email: String,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Show a user with settings and partner
    Show {
        #[arg(long, required_unless_present = "email", conflicts_with = "email")]
        user: Option<String>,
        /// Look the user up by email instead
        #[arg(long)]
        email: Option<String>,
    },
    /// Update name fields or birthday
    Profile {
        #[arg(long)]
        user: String,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Update settings, including which chat model replies
    Settings {
        #[arg(long)]
        user: String,
        #[arg(long)]
        provider: Option<AiProvider>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Days to keep messages; 9999 keeps them forever
        #[arg(long)]
        retention_days: Option<u32>,
        #[arg(long)]
        theme: Option<String>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub surname: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub nickname: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub birthday: Option<String>,
}

impl From<ProfileArgs> for ProfileUpdate {
    fn from(args: ProfileArgs) -> Self {
        Self {
            surname: args.surname,
            first_name: args.first_name,
            nickname: args.nickname,
            birthday: args.birthday,
        }
    }
}

pub async fn run(state: &AppState, action: UserAction) -> Result<()> {
    match action {
        UserAction::Create { email, profile } => {
            let profile = ProfileUpdate::from(profile);
            let user = with_conn(&state.db, move |conn| create_user(conn, &email, &profile)).await?;
            print_json(&user)
        }
        UserAction::Show { user, email } => {
            let shown = with_conn(&state.db, move |conn| {
                let record = match (user, email) {
                    (Some(id), _) => require_user(conn, &id)?,
                    (None, Some(email)) => find_user_by_email(conn, &email)?
                        .ok_or_else(|| CompanionError::NotFound(format!("no user with email {email}")))?,
                    (None, None) => bail!("pass --user or --email"),
                };
                let settings = get_or_create_settings(conn, &record.id)?;
                let partner = get_partner_for_user(conn, &record.id)?;
                Ok(json!({ "user": record, "settings": settings, "partner": partner }))
            })
            .await?;
            print_json(&shown)
        }
        UserAction::Profile { user, profile } => {
            let profile = ProfileUpdate::from(profile);
            let updated = with_conn(&state.db, move |conn| update_profile(conn, &user, &profile)).await?;
            print_json(&updated)
        }
        UserAction::Settings {
            user,
            provider,
            model,
            temperature,
            max_tokens,
            retention_days,
            theme,
        } => {
            let settings = with_conn(&state.db, move |conn| {
                let current = get_or_create_settings(conn, &user)?;
                let mut ai_model = current.ai_model.clone();
                if let Some(provider) = provider {
                    ai_model.provider = provider;
                }
                if let Some(model) = model {
                    ai_model.model = model;
                }
                if let Some(temperature) = temperature {
                    ai_model.temperature = temperature;
                }
                if let Some(max_tokens) = max_tokens {
                    ai_model.max_tokens = max_tokens;
                }
                let update = SettingsUpdate {
                    theme,
                    data_retention_days: retention_days,
                    ai_model: (ai_model != current.ai_model).then_some(ai_model),
                    ..Default::default()
                };
                update_settings(conn, &user, &update)
            })
            .await?;
            print_json(&settings)
        }
    }
}
