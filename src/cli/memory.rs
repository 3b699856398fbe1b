//! CLI `memory` commands: search, summaries, topics, episodes and traits.

use anyhow::{bail, Result};
use clap::Subcommand;

use super::{print_json, with_partner, Target};
use koibito::chat::messages::recent_messages;
use koibito::memory::episodes::{get_episodes, EpisodeFilter};
use koibito::memory::personality::{add_trait, get_personality, update_core_values, DEFAULT_MAX_TRAITS};
use koibito::memory::search::{search, SearchRequest};
use koibito::memory::store::delete_memory;
use koibito::memory::summary::{create_summary, SummaryRequest, SummaryType};
use koibito::memory::topics::{ongoing_topics, TopicFilter, TopicStatus};
use koibito::memory::types::{MemoryType, PersonalityTrait, TraitKind};
use koibito::relationship::metrics::{relationship_report, update_levels};
use koibito::state::AppState;

#[derive(Subcommand, Debug)]
pub enum MemoryAction {
    /// Search memories by meaning, text and tags
    Search {
        #[command(flatten)]
        target: Target,
        query: String,
        /// Comma-separated memory types
        #[arg(long, value_delimiter = ',')]
        types: Vec<MemoryType>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        min_importance: u8,
    },
    /// Summarize messages into memories and episodes
    Summarize {
        #[command(flatten)]
        target: Target,
        /// Message ids to summarize
        #[arg(long, value_delimiter = ',', conflicts_with = "recent")]
        messages: Vec<String>,
        /// Summarize the latest N messages instead
        #[arg(long)]
        recent: Option<usize>,
        /// daily, weekly, important or episode
        #[arg(long, default_value = "daily")]
        kind: SummaryType,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Topics that keep coming up
    Topics {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// active, dormant or resolved
        #[arg(long, default_value = "active", conflicts_with = "all")]
        status: TopicStatus,
        /// Include every status
        #[arg(long)]
        all: bool,
    },
    /// List remembered episodes
    Episodes {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        min_weight: Option<f64>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, requires = "end")]
        start: Option<String>,
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Relationship metrics with insights
    Relationship {
        #[command(flatten)]
        target: Target,
        /// Set trust (0-100) before reporting
        #[arg(long)]
        trust: Option<i32>,
        /// Set emotional connection (0-100) before reporting
        #[arg(long)]
        connection: Option<i32>,
    },
    /// Delete one memory
    Forget {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        memory: String,
    },
    /// Show or record personality traits
    Traits {
        #[command(flatten)]
        target: Target,
        /// strength or shadow
        #[arg(long, requires = "add")]
        kind: Option<TraitKind>,
        /// Trait name to record
        #[arg(long, requires = "kind")]
        add: Option<String>,
        #[arg(long, default_value_t = 5)]
        importance: u8,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        example: Option<String>,
        /// Replace the core values, comma-separated
        #[arg(long, value_delimiter = ',')]
        core_values: Vec<String>,
    },
}

pub async fn run(state: &AppState, action: MemoryAction) -> Result<()> {
    match action {
        MemoryAction::Search {
            target,
            query,
            types,
            limit,
            min_importance,
        } => {
            let request = SearchRequest {
                types,
                limit,
                min_importance,
                ..SearchRequest::new(query)
            };
            print_json(&search(state, &target.user, &target.partner, request).await?)
        }
        MemoryAction::Summarize {
            target,
            messages,
            recent,
            kind,
            title,
            description,
        } => {
            let message_ids = with_partner(state, &target, move |conn, p| match recent {
                Some(count) => Ok(recent_messages(conn, &p.id, count)?
                    .into_iter()
                    .map(|m| m.id)
                    .collect()),
                None => Ok(messages),
            })
            .await?;
            if message_ids.is_empty() {
                bail!("no messages to summarize; pass --messages or --recent");
            }
            let request = SummaryRequest {
                message_ids,
                summary_type: kind,
                episode_title: title,
                episode_description: description,
            };
            print_json(&create_summary(state, &target.partner, request).await?)
        }
        MemoryAction::Topics {
            target,
            limit,
            status,
            all,
        } => {
            let filter = TopicFilter {
                limit,
                status: (!all).then_some(status),
                ..Default::default()
            };
            let topics = with_partner(state, &target, move |conn, p| ongoing_topics(conn, &p.id, &filter)).await?;
            print_json(&topics)
        }
        MemoryAction::Episodes {
            target,
            limit,
            min_weight,
            tags,
            start,
            end,
        } => {
            let filter = EpisodeFilter {
                limit,
                min_emotional_weight: min_weight,
                tags,
                start_date: start,
                end_date: end,
            };
            let episodes = with_partner(state, &target, move |conn, p| get_episodes(conn, &p.id, &filter)).await?;
            print_json(&episodes)
        }
        MemoryAction::Relationship {
            target,
            trust,
            connection,
        } => {
            let report = with_partner(state, &target, move |conn, p| {
                if trust.is_some() || connection.is_some() {
                    update_levels(conn, &p.id, trust, connection)?;
                }
                relationship_report(conn, &p.id)
            })
            .await?;
            print_json(&report)
        }
        MemoryAction::Forget { target, memory } => {
            let id = memory.clone();
            with_partner(state, &target, move |conn, p| delete_memory(conn, &p.id, &id)).await?;
            println!("Memory {memory} deleted.");
            Ok(())
        }
        MemoryAction::Traits {
            target,
            kind,
            add,
            importance,
            context,
            example,
            core_values,
        } => {
            let personality = with_partner(state, &target, move |conn, p| {
                if let (Some(kind), Some(name)) = (kind, add) {
                    let new = PersonalityTrait {
                        name,
                        context,
                        example,
                        importance,
                        last_seen: chrono::Utc::now().to_rfc3339(),
                        frequency: 1,
                    };
                    add_trait(conn, &p.id, kind, new, DEFAULT_MAX_TRAITS)?;
                }
                if !core_values.is_empty() {
                    update_core_values(conn, &p.id, &core_values)?;
                }
                get_personality(conn, &p.id)
            })
            .await?;
            match personality {
                Some(personality) => print_json(&personality),
                None => {
                    println!("No personality traits recorded yet.");
                    Ok(())
                }
            }
        }
    }
}
