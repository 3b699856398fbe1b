pub mod chat;
pub mod doctor;
pub mod engage;
pub mod export;
pub mod image;
pub mod locations;
pub mod maintenance;
pub mod memory;
pub mod notify;
pub mod partner;
pub mod re_embed;
pub mod reset;
pub mod stats;
pub mod user;

use anyhow::{Context, Result};
use clap::Args;
use rusqlite::Connection;
use serde::Serialize;

use koibito::config::KoibitoConfig;
use koibito::db::{self, with_conn};
use koibito::partner::store::get_partner;
use koibito::partner::Partner;
use koibito::state::AppState;

/// The user acting and the partner acted on.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// User id
    #[arg(long)]
    pub user: String,
    /// Partner id
    #[arg(long)]
    pub partner: String,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Run `f` on the database after checking that the target user owns the
/// partner.
pub async fn with_partner<T, F>(state: &AppState, target: &Target, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection, &Partner) -> Result<T> + Send + 'static,
{
    let (uid, pid) = (target.user.clone(), target.partner.clone());
    with_conn(&state.db, move |conn| {
        let partner = get_partner(conn, &pid, &uid)?;
        f(conn, &partner)
    })
    .await
}

/// Create the data directory and database.
pub fn init(config: &KoibitoConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)
        .with_context(|| format!("failed to create database at {}", db_path.display()))?;
    let version = db::migrations::get_schema_version(&conn)?;
    println!("Database ready at {} (schema v{version})", db_path.display());
    if config.chat.openai_api_key.is_none() && config.chat.anthropic_api_key.is_none() {
        println!("No chat API key configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY.");
    }
    Ok(())
}
