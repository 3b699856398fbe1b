//! CLI `locations` commands.

use anyhow::Result;
use chrono::{NaiveDate, Timelike};
use clap::Subcommand;
use serde_json::json;

use super::{print_json, with_partner, Target};
use koibito::location::backgrounds::{
    background_candidates, background_for_hour, background_priority, suggest_background_change,
};
use koibito::location::{all_locations, available_locations, seasonal_events_on, update_partner_location, Location};
use koibito::state::AppState;

#[derive(Subcommand, Debug)]
pub enum LocationAction {
    /// List every location and seasonal event
    List,
    /// List locations unlocked at an intimacy level
    Available {
        #[arg(long)]
        intimacy: u8,
    },
    /// List seasonal events open on a date (default today)
    Seasonal {
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show background variants of a location, ordered for an hour
    Backgrounds {
        #[arg(long)]
        location: String,
        /// Defaults to the current local hour
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
    },
    /// Move the partner to a location
    Set {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        location: String,
    },
}

fn print_table<'a>(locations: impl IntoIterator<Item = &'a Location>) {
    for location in locations {
        println!(
            "{:<22} {:>3}  {:<10} {}",
            location.id, location.unlock_intimacy, location.category, location.name
        );
    }
}

pub async fn run(state: &AppState, action: LocationAction) -> Result<()> {
    match action {
        LocationAction::List => {
            print_table(all_locations());
            Ok(())
        }
        LocationAction::Available { intimacy } => {
            print_table(available_locations(intimacy));
            Ok(())
        }
        LocationAction::Seasonal { date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let events = seasonal_events_on(date);
            if events.is_empty() {
                println!("No seasonal events on {date}.");
            }
            print_table(events);
            Ok(())
        }
        LocationAction::Backgrounds { location, hour } => {
            let hour = hour.unwrap_or_else(|| chrono::Local::now().hour());
            if background_candidates(&location).is_empty() {
                anyhow::bail!("no backgrounds for location {location}");
            }
            print_json(&json!({
                "location": location,
                "hour": hour,
                "selected": background_for_hour(&location, hour),
                "priority": background_priority(&location, hour),
            }))
        }
        LocationAction::Set { target, location } => {
            let hour = chrono::Local::now().hour();
            let (previous, moved) = with_partner(state, &target, move |conn, p| {
                let moved = update_partner_location(conn, &p.id, &p.user_id, &location)?;
                Ok((p.current_location_id.clone(), moved))
            })
            .await?;
            print_json(&json!({
                "location": moved,
                "backgroundImage": moved.background_image(hour),
                "backgroundChange": suggest_background_change(&previous, moved.id, hour),
            }))
        }
    }
}
