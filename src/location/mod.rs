//! Places the partner can be, unlocked by intimacy, plus seasonal events
//! that are only open during a yearly window.

pub mod backgrounds;
mod data;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

pub use data::{LOCATIONS, SEASONAL_EVENTS};

use crate::error::CompanionError;
use crate::image::clothing::{clothing_prompt, Season};
use crate::partner::store::{get_partner, set_location};
use crate::partner::Gender;

pub const DEFAULT_LOCATION_ID: &str = "school_classroom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Morning => "爽やかな朝の時間",
            Self::Afternoon => "穏やかな午後のひととき",
            Self::Evening => "夕暮れ時の美しい時間",
            Self::Night => "静かでロマンチックな夜",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    /// Clothing style key, see [`crate::image::clothing`].
    pub clothing: &'static str,
    pub unlock_intimacy: u8,
    pub appeal_point: &'static str,
    pub time_of_day: TimeOfDay,
    pub season: Option<Season>,
    /// Inclusive `MM-DD` bounds; `start > end` wraps over new year.
    pub available_period: Option<(&'static str, &'static str)>,
}

impl Location {
    /// Image path for the variant that suits `hour`.
    pub fn background_image(&self, hour: u32) -> String {
        let id = backgrounds::background_for_hour(self.id, hour).unwrap_or(self.id);
        format!("/backgrounds/{id}.jpg")
    }

    pub fn is_seasonal_event(&self) -> bool {
        self.available_period.is_some()
    }

    /// Whether the event window contains `date`. Always true for regular
    /// locations.
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        let Some((start, end)) = self.available_period else {
            return true;
        };
        match (month_day(start), month_day(end)) {
            (Some(start), Some(end)) => in_yearly_range(date.month() * 100 + date.day(), start, end),
            _ => false,
        }
    }
}

/// `"MM-DD"` as `month * 100 + day`.
fn month_day(s: &str) -> Option<u32> {
    let (month, day) = s.split_once('-')?;
    Some(month.parse::<u32>().ok()? * 100 + day.parse::<u32>().ok()?)
}

fn in_yearly_range(current: u32, start: u32, end: u32) -> bool {
    if start > end {
        current >= start || current <= end
    } else {
        current >= start && current <= end
    }
}

/// Every regular location followed by every seasonal event.
pub fn all_locations() -> impl Iterator<Item = &'static Location> {
    LOCATIONS.iter().chain(SEASONAL_EVENTS.iter())
}

pub fn location_by_id(id: &str) -> Option<&'static Location> {
    all_locations().find(|l| l.id == id)
}

/// Regular locations unlocked at `intimacy`.
pub fn available_locations(intimacy: u8) -> Vec<&'static Location> {
    LOCATIONS
        .iter()
        .filter(|l| intimacy >= l.unlock_intimacy)
        .collect()
}

pub fn seasonal_events_on(date: NaiveDate) -> Vec<&'static Location> {
    SEASONAL_EVENTS
        .iter()
        .filter(|e| e.is_available_on(date))
        .collect()
}

/// Regular locations that became available when intimacy rose from
/// `previous` to `current`.
pub fn check_new_unlocks(previous: u8, current: u8) -> Vec<&'static Location> {
    if current <= previous {
        return Vec::new();
    }
    LOCATIONS
        .iter()
        .filter(|l| l.unlock_intimacy > previous && l.unlock_intimacy <= current)
        .collect()
}

/// Move the partner to `location_id` after checking ownership and the
/// unlock threshold against the partner's intimacy.
pub fn update_partner_location(
    conn: &Connection,
    partner_id: &str,
    user_id: &str,
    location_id: &str,
) -> Result<&'static Location> {
    let location = location_by_id(location_id)
        .ok_or_else(|| CompanionError::NotFound("指定された場所が見つかりません".into()))?;
    let partner = get_partner(conn, partner_id, user_id)?;
    if partner.intimacy_level < location.unlock_intimacy {
        return Err(CompanionError::LocationLocked {
            required: location.unlock_intimacy,
        }
        .into());
    }
    set_location(conn, partner_id, location_id)?;
    tracing::info!(partner_id, location_id, "partner location updated");
    Ok(location)
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationPromptData {
    pub location: &'static Location,
    pub clothing_prompt: String,
    pub context_prompt: String,
}

pub fn location_prompt_data(location_id: &str, gender: Gender, season: Season) -> Option<LocationPromptData> {
    let location = location_by_id(location_id)?;
    let context_prompt = format!(
        "現在の場所: {}\n雰囲気: {}\n{}\n時間帯: {}",
        location.name,
        location.description,
        location.appeal_point,
        location.time_of_day.description(),
    );
    Some(LocationPromptData {
        location,
        clothing_prompt: clothing_prompt(location.clothing, gender, season).prompt.to_string(),
        context_prompt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(LOCATIONS.len(), 23);
        assert_eq!(SEASONAL_EVENTS.len(), 11);
        assert!(location_by_id(DEFAULT_LOCATION_ID).is_some());
        assert!(location_by_id("ski_resort").unwrap().is_seasonal_event());
    }

    #[test]
    fn background_image_follows_hour() {
        let cafe = location_by_id("cafe").unwrap();
        assert_eq!(cafe.background_image(9), "/backgrounds/cafe_morning.jpg");
        assert_eq!(cafe.background_image(19), "/backgrounds/cafe_evening.jpg");
        let bar = location_by_id("jazz_bar").unwrap();
        assert_eq!(bar.background_image(9), "/backgrounds/jazz_bar_night.jpg");
    }

    #[test]
    fn availability_by_intimacy() {
        let ids: Vec<_> = available_locations(10).iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["school_classroom", "cafe", "school_library"]);
        assert_eq!(available_locations(100).len(), 23);
    }

    #[test]
    fn seasonal_window_wraps_year() {
        let ids = |d| seasonal_events_on(d).iter().map(|l| l.id).collect::<Vec<_>>();
        assert!(ids(date(1, 5)).contains(&"ski_resort"));
        assert!(ids(date(1, 5)).contains(&"new_year_shrine"));
        assert!(ids(date(12, 24)).contains(&"christmas_party"));
        assert!(!ids(date(6, 1)).contains(&"ski_resort"));
        assert_eq!(ids(date(3, 20)), vec!["cherry_blossoms"]);
    }

    #[test]
    fn new_unlocks_between_levels() {
        let ids: Vec<_> = check_new_unlocks(30, 40).iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["amusement_park", "office", "sports_bar"]);
        assert!(check_new_unlocks(40, 40).is_empty());
        assert!(check_new_unlocks(50, 10).is_empty());
    }

    #[test]
    fn prompt_data_includes_time_of_day() {
        let data = location_prompt_data("jazz_bar", Gender::Girlfriend, Season::Winter).unwrap();
        assert!(data.context_prompt.ends_with("時間帯: 静かでロマンチックな夜"));
        assert!(location_prompt_data("moon", Gender::Girlfriend, Season::Winter).is_none());
    }
}
