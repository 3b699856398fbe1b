//! Time-of-day background variants for each location.

use serde::Serialize;

/// Background ids per location, in fallback order.
const LOCATION_BACKGROUNDS: &[(&str, &[&str])] = &[
    ("school_classroom", &["school_classroom_morning", "school_classroom_afternoon"]),
    ("cafe", &["cafe_morning", "cafe_afternoon", "cafe_evening"]),
    ("beach", &["beach_morning", "beach_afternoon", "beach_sunset"]),
    ("office", &["office_morning", "office_afternoon", "office_evening"]),
    ("school_library", &["school_library_afternoon", "school_library_evening"]),
    ("park", &["park_morning", "park_afternoon", "park_evening"]),
    ("museum", &["museum_afternoon", "museum_evening"]),
    ("amusement_park", &["amusement_park_afternoon", "amusement_park_evening"]),
    ("pool", &["pool_afternoon"]),
    ("gym", &["gym_morning", "gym_afternoon"]),
    ("restaurant", &["restaurant_evening", "restaurant_night"]),
    ("karaoke", &["karaoke_evening"]),
    ("spa", &["spa_afternoon", "spa_evening"]),
    ("jewelry_shop", &["jewelry_shop_afternoon"]),
    ("camping", &["camping_afternoon", "camping_evening", "camping_night"]),
    ("jazz_bar", &["jazz_bar_night"]),
    ("sports_bar", &["sports_bar_evening"]),
    ("home_living", &["home_living_afternoon", "home_living_evening"]),
    ("night_view", &["night_view_night"]),
    ("private_beach_sunset", &["private_beach_sunset"]),
    ("bedroom_night", &["bedroom_night"]),
    ("onsen", &["onsen_evening", "onsen_night"]),
    ("luxury_hotel", &["luxury_hotel_evening", "luxury_hotel_night"]),
    ("cherry_blossoms", &["cherry_blossoms_afternoon"]),
    ("fireworks_festival", &["fireworks_festival_night"]),
    ("summer_festival", &["summer_festival_evening", "summer_festival_night"]),
    ("beach_house", &["beach_house_afternoon"]),
    ("autumn_leaves", &["autumn_leaves_afternoon"]),
    ("halloween_party", &["halloween_party_night"]),
    ("christmas_illumination", &["christmas_illumination_evening", "christmas_illumination_night"]),
    ("christmas_party", &["christmas_party_night"]),
    ("new_year_shrine", &["new_year_shrine_morning", "new_year_shrine_afternoon"]),
    ("valentine_date", &["valentine_date_evening"]),
    ("ski_resort", &["ski_resort_morning", "ski_resort_afternoon"]),
];

/// Preferred suffix for an hour, then the suffixes to try next.
pub fn suffixes_for_hour(hour: u32) -> (&'static str, [&'static str; 2]) {
    match hour {
        6..=11 => ("morning", ["afternoon", "evening"]),
        12..=15 => ("afternoon", ["morning", "evening"]),
        16 => ("afternoon", ["evening", "morning"]),
        17 => ("evening", ["afternoon", "sunset"]),
        18 => ("evening", ["sunset", "afternoon"]),
        19 => ("evening", ["sunset", "night"]),
        20 => ("evening", ["night", "sunset"]),
        5 => ("night", ["morning", "evening"]),
        0..=4 | 21..=23 => ("night", ["evening", "sunset"]),
        _ => ("afternoon", ["morning", "evening"]),
    }
}

/// Every background variant of a location; empty for unknown ids.
pub fn background_candidates(location_id: &str) -> &'static [&'static str] {
    LOCATION_BACKGROUNDS
        .iter()
        .find(|(id, _)| *id == location_id)
        .map(|(_, backgrounds)| *backgrounds)
        .unwrap_or(&[])
}

fn with_suffix(candidates: &[&'static str], suffix: &str) -> Option<&'static str> {
    let marker = format!("_{suffix}");
    candidates.iter().copied().find(|bg| bg.contains(&marker))
}

/// The variant matching `time_of_day` (`morning`, `sunset`, ...), else the
/// first variant.
pub fn background_for_location(location_id: &str, time_of_day: &str) -> Option<&'static str> {
    let candidates = background_candidates(location_id);
    with_suffix(candidates, time_of_day).or_else(|| candidates.first().copied())
}

pub fn background_for_hour(location_id: &str, hour: u32) -> Option<&'static str> {
    background_for_location(location_id, suffixes_for_hour(hour).0)
}

/// All variants ordered for `hour`: the preferred suffix, its fallbacks,
/// then the rest in catalog order.
pub fn background_priority(location_id: &str, hour: u32) -> Vec<&'static str> {
    let candidates = background_candidates(location_id);
    let (preferred, fallbacks) = suffixes_for_hour(hour);

    let mut ordered = Vec::with_capacity(candidates.len());
    for suffix in std::iter::once(preferred).chain(fallbacks) {
        let marker = format!("_{suffix}");
        if let Some(bg) = candidates
            .iter()
            .copied()
            .find(|bg| bg.contains(&marker) && !ordered.contains(bg))
        {
            ordered.push(bg);
        }
    }
    for &bg in candidates {
        if !ordered.contains(&bg) {
            ordered.push(bg);
        }
    }
    ordered
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundChange {
    pub should_change: bool,
    pub suggested_background: Option<&'static str>,
    pub reason: String,
}

/// Whether moving from `current` to `next` at `hour` should swap the chat
/// background.
pub fn suggest_background_change(current: &str, next: &str, hour: u32) -> BackgroundChange {
    let Some(background) = background_for_hour(next, hour) else {
        return BackgroundChange {
            should_change: false,
            suggested_background: None,
            reason: "新しい場所に対応する背景が見つかりません".into(),
        };
    };
    if current == next {
        return BackgroundChange {
            should_change: false,
            suggested_background: None,
            reason: "場所が変更されていません".into(),
        };
    }
    BackgroundChange {
        should_change: true,
        suggested_background: Some(background),
        reason: format!("場所が{current}から{next}に変更されました"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::all_locations;

    #[test]
    fn every_location_has_backgrounds() {
        for location in all_locations() {
            assert!(
                !background_candidates(location.id).is_empty(),
                "{} has no background",
                location.id
            );
        }
    }

    #[test]
    fn picks_matching_time_or_first() {
        assert_eq!(background_for_location("cafe", "evening"), Some("cafe_evening"));
        assert_eq!(background_for_location("jazz_bar", "morning"), Some("jazz_bar_night"));
        assert_eq!(background_for_location("beach", "sunset"), Some("beach_sunset"));
        assert_eq!(background_for_location("nowhere", "morning"), None);
    }

    #[test]
    fn hour_maps_to_suffix() {
        assert_eq!(background_for_hour("cafe", 8), Some("cafe_morning"));
        assert_eq!(background_for_hour("cafe", 16), Some("cafe_afternoon"));
        assert_eq!(background_for_hour("restaurant", 23), Some("restaurant_night"));
        assert_eq!(background_for_hour("park", 30), Some("park_afternoon"));
    }

    #[test]
    fn priority_follows_fallbacks() {
        assert_eq!(
            background_priority("beach", 18),
            vec!["beach_sunset", "beach_afternoon", "beach_morning"]
        );
        assert_eq!(
            background_priority("camping", 5),
            vec!["camping_night", "camping_evening", "camping_afternoon"]
        );
        assert!(background_priority("nowhere", 12).is_empty());
    }

    #[test]
    fn change_only_when_location_differs() {
        let moved = suggest_background_change("cafe", "park", 9);
        assert!(moved.should_change);
        assert_eq!(moved.suggested_background, Some("park_morning"));

        let same = suggest_background_change("park", "park", 9);
        assert!(!same.should_change);
        assert_eq!(same.reason, "場所が変更されていません");

        assert_eq!(suggest_background_change("park", "nowhere", 9).suggested_background, None);
    }
}
