mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cli::chat::ChatAction;
use cli::engage::EngageAction;
use cli::image::ImageAction;
use cli::locations::LocationAction;
use cli::memory::MemoryAction;
use cli::notify::NotifyAction;
use cli::partner::PartnerAction;
use cli::user::UserAction;
use koibito::config::KoibitoConfig;
use koibito::state::AppState;

#[derive(Parser)]
#[command(name = "koibito", version, about = "AI companion chat engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the data directory and database
    Init,
    /// Manage users and their settings
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Create and shape the partner
    Partner {
        #[command(subcommand)]
        action: PartnerAction,
    },
    /// Talk to the partner
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Let the partner start the conversation
    Engage {
        #[command(subcommand)]
        action: EngageAction,
    },
    /// Browse places and move the partner
    Locations {
        #[command(subcommand)]
        action: LocationAction,
    },
    /// Generate and manage partner images
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },
    /// Search and curate memories
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
    /// Notification preferences, schedules and morning greetings
    Notify {
        #[command(subcommand)]
        action: NotifyAction,
    },
    /// Delete expired memories and messages past retention
    Maintenance {
        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Export a user's data as JSON to stdout
    Export {
        #[arg(long)]
        user: String,
    },
    /// Show memory statistics
    Stats {
        /// Restrict to one partner
        #[arg(long)]
        partner: Option<String>,
    },
    /// Run database and configuration diagnostics
    Doctor,
    /// Regenerate all embeddings with the configured model
    ReEmbed,
    /// Delete all data, or one user's (requires confirmation)
    Reset {
        #[arg(long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = KoibitoConfig::load()?;

    // stderr keeps stdout clean for JSON output.
    let filter = EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Init => cli::init(&config),
        Command::Stats { partner } => cli::stats::stats(&config, partner.as_deref()),
        Command::Doctor => cli::doctor::doctor(&config),
        Command::Reset { user } => cli::reset::reset(&config, user.as_deref()),
        Command::User { action } => cli::user::run(&AppState::open(config)?, action).await,
        Command::Partner { action } => cli::partner::run(&AppState::open(config)?, action).await,
        Command::Chat { action } => cli::chat::run(&AppState::open(config)?, action).await,
        Command::Engage { action } => cli::engage::run(&AppState::open(config)?, action).await,
        Command::Locations { action } => cli::locations::run(&AppState::open(config)?, action).await,
        Command::Image { action } => cli::image::run(&AppState::open(config)?, action).await,
        Command::Memory { action } => cli::memory::run(&AppState::open(config)?, action).await,
        Command::Notify { action } => cli::notify::run(&AppState::open(config)?, action).await,
        Command::Maintenance { dry_run } => cli::maintenance::run(&AppState::open(config)?, dry_run).await,
        Command::Export { user } => cli::export::export(&AppState::open(config)?, user).await,
        Command::ReEmbed => cli::re_embed::re_embed(&AppState::open(config)?).await,
    }
}
