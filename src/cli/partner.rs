//! CLI `partner` commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::json;

use super::user::ProfileArgs;
use super::{print_json, with_partner, Target};
use koibito::db::with_conn;
use koibito::partner::presets::all_presets;
use koibito::partner::store::{apply_preset, create_partner, create_with_onboarding, delete_partner, get_partner_for_user};
use koibito::partner::validate::validate_prompt_content;
use koibito::partner::{Appearance, Gender, NewPartner, PersonalityType, SpeechStyle};
use koibito::relationship::{intimacy_stage, RelationshipStage};
use koibito::state::AppState;
use koibito::user::ProfileUpdate;

#[derive(Subcommand, Debug)]
pub enum PartnerAction {
    /// Create the user's partner
    Create {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        /// boyfriend or girlfriend
        #[arg(long)]
        gender: Gender,
        #[arg(long)]
        personality: PersonalityType,
        #[arg(long)]
        speech: SpeechStyle,
        /// Generated from personality and speech style when omitted
        #[arg(long)]
        system_prompt: Option<String>,
        #[arg(long, value_delimiter = ',')]
        hobbies: Vec<String>,
        #[arg(long)]
        hair_style: Option<String>,
        #[arg(long)]
        hair_color: Option<String>,
        #[arg(long)]
        eye_color: Option<String>,
        #[arg(long)]
        body_type: Option<String>,
        #[arg(long)]
        clothing_style: Option<String>,
        /// Also store the user's names and start from intimacy 0
        #[arg(long)]
        onboarding: bool,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Show the user's partner
    Show {
        #[arg(long)]
        user: String,
    },
    /// List presets, or apply one to a partner
    Preset {
        #[arg(long, requires = "partner")]
        user: Option<String>,
        #[arg(long, requires = "user")]
        partner: Option<String>,
        #[arg(long, requires = "partner")]
        personality: Option<PersonalityType>,
    },
    /// Check a system prompt for problems
    Validate { prompt: String },
    /// Delete a partner
    Delete {
        #[command(flatten)]
        target: Target,
    },
}

pub async fn run(state: &AppState, action: PartnerAction) -> Result<()> {
    match action {
        PartnerAction::Create {
            user,
            name,
            gender,
            personality,
            speech,
            system_prompt,
            hobbies,
            hair_style,
            hair_color,
            eye_color,
            body_type,
            clothing_style,
            onboarding,
            profile,
        } => {
            let new = NewPartner {
                name,
                gender,
                personality_type: personality,
                speech_style: speech,
                system_prompt: system_prompt.unwrap_or_default(),
                avatar_description: String::new(),
                appearance: Appearance {
                    hair_style,
                    hair_color,
                    eye_color,
                    body_type,
                    clothing_style,
                },
                hobbies,
                intimacy_level: 0,
            };
            let profile = ProfileUpdate::from(profile);
            let partner = with_conn(&state.db, move |conn| {
                if onboarding {
                    create_with_onboarding(conn, &user, profile, new)
                } else {
                    create_partner(conn, &user, new)
                }
            })
            .await?;
            print_json(&partner)
        }
        PartnerAction::Show { user } => {
            let partner = with_conn(&state.db, move |conn| get_partner_for_user(conn, &user))
                .await?
                .context("パートナーが見つかりません")?;
            let level = partner.intimacy_level;
            print_json(&json!({
                "partner": partner,
                "stage": RelationshipStage::from_intimacy(level),
                "stageDescription": intimacy_stage(level),
            }))
        }
        PartnerAction::Preset {
            user,
            partner,
            personality,
        } => match (user, partner, personality) {
            (Some(user), Some(partner), Some(personality)) => {
                let target = Target { user, partner };
                let updated = with_partner(state, &target, move |conn, p| {
                    apply_preset(conn, &p.id, &p.user_id, personality)
                })
                .await?;
                print_json(&updated)
            }
            _ => {
                for preset in all_presets() {
                    println!("{:<16} {}  {}", preset.personality, preset.name, preset.description);
                }
                Ok(())
            }
        },
        PartnerAction::Validate { prompt } => print_json(&validate_prompt_content(&prompt)),
        PartnerAction::Delete { target } => {
            with_partner(state, &target, |conn, p| delete_partner(conn, &p.id, &p.user_id)).await?;
            println!("Partner {} deleted.", target.partner);
            Ok(())
        }
    }
}
