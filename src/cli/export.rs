use anyhow::Result;
use serde::Serialize;

use koibito::chat::messages::{message_history, Message};
use koibito::db::with_conn;
use koibito::image::store::{image_history, GeneratedImage};
use koibito::memory::episodes::{get_episodes, EpisodeFilter};
use koibito::memory::personality::get_personality;
use koibito::memory::store::list_memories;
use koibito::memory::types::{Episode, Memory, PersonalityMemory};
use koibito::partner::store::get_partner_for_user;
use koibito::partner::Partner;
use koibito::relationship::metrics::{get_metrics, RelationshipMetrics};
use koibito::state::AppState;
use koibito::user::{get_or_create_settings, require_user, User, UserSettings};

/// Row cap per table; far above what one conversation accumulates.
const EXPORT_LIMIT: usize = 1_000_000;

/// Everything stored for one user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportData {
    user: User,
    settings: UserSettings,
    partner: Option<PartnerData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PartnerData {
    partner: Partner,
    messages: Vec<Message>,
    memories: Vec<Memory>,
    episodes: Vec<Episode>,
    personality: Option<PersonalityMemory>,
    metrics: Option<RelationshipMetrics>,
    images: Vec<GeneratedImage>,
}

/// Export a user's data as JSON to stdout.
pub async fn export(state: &AppState, user_id: String) -> Result<()> {
    let data = with_conn(&state.db, move |conn| {
        let user = require_user(conn, &user_id)?;
        let settings = get_or_create_settings(conn, &user_id)?;
        let partner = match get_partner_for_user(conn, &user_id)? {
            Some(partner) => {
                let pid = partner.id.clone();
                let episodes = EpisodeFilter {
                    limit: Some(EXPORT_LIMIT),
                    ..Default::default()
                };
                Some(PartnerData {
                    messages: message_history(conn, &pid, EXPORT_LIMIT, 0)?,
                    memories: list_memories(conn, &pid, EXPORT_LIMIT)?,
                    episodes: get_episodes(conn, &pid, &episodes)?,
                    personality: get_personality(conn, &pid)?,
                    metrics: get_metrics(conn, &pid)?,
                    images: image_history(conn, &pid, EXPORT_LIMIT)?,
                    partner,
                })
            }
            None => None,
        };
        Ok(ExportData {
            user,
            settings,
            partner,
        })
    })
    .await?;

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    match &data.partner {
        Some(p) => eprintln!(
            "Exported {} messages, {} memories and {} images.",
            p.messages.len(),
            p.memories.len(),
            p.images.len()
        ),
        None => eprintln!("Exported user without a partner."),
    }
    Ok(())
}
