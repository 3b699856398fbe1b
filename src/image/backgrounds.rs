//! Static catalog of chat background images.

use serde::Serialize;

pub const DEFAULT_BACKGROUND_LIMIT: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntimacyBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackgroundImage {
    pub id: String,
    pub name: &'static str,
    pub url: String,
    pub thumbnail: String,
    pub category: &'static str,
    pub time_of_day: &'static str,
    pub season: Option<&'static str>,
    pub intimacy: IntimacyBand,
    pub is_default: bool,
}

struct Entry {
    category: &'static str,
    number: u8,
    name: &'static str,
    file: &'static str,
    time_of_day: &'static str,
    season: Option<&'static str>,
    intimacy: IntimacyBand,
}

const fn entry(
    category: &'static str,
    number: u8,
    name: &'static str,
    file: &'static str,
    time_of_day: &'static str,
    season: Option<&'static str>,
    intimacy: IntimacyBand,
) -> Entry {
    Entry { category, number, name, file, time_of_day, season, intimacy }
}

use IntimacyBand::{High, Low, Medium};

const CATALOG: &[Entry] = &[
    entry("school", 1, "教室", "classroom", "day", Some("all"), Low),
    entry("school", 2, "屋上", "rooftop", "sunset", Some("all"), Medium),
    entry("school", 3, "廊下", "hallway", "day", None, Low),
    entry("school", 4, "校門", "gate", "day", None, Low),
    entry("school", 5, "部室", "club-room", "afternoon", None, Medium),
    entry("school", 6, "図書館", "library", "day", None, Low),
    entry("private", 1, "自室", "bedroom", "night", None, High),
    entry("private", 2, "リビング", "living-room", "evening", None, Medium),
    entry("daily", 1, "カフェ", "cafe", "day", None, Low),
    entry("daily", 2, "レストラン", "restaurant", "evening", None, Medium),
    entry("romantic", 1, "桜並木", "cherry-blossoms", "day", Some("spring"), Medium),
    entry("romantic", 2, "夜景", "night-view", "night", None, High),
    entry("romantic", 3, "水族館", "aquarium", "day", None, Medium),
    entry("romantic", 4, "観覧車", "ferris-wheel", "sunset", None, High),
    entry("romantic", 5, "夕暮れの海", "beach-sunset", "sunset", Some("summer"), Medium),
    entry("romantic", 6, "花火大会", "fireworks", "night", Some("summer"), Medium),
    entry("seasonal", 1, "イルミネーション", "christmas-illumination", "night", Some("winter"), Medium),
    entry("seasonal", 2, "夏祭り", "summer-festival", "evening", Some("summer"), Medium),
    entry("seasonal", 3, "神社", "shrine", "day", Some("all"), Low),
    entry("seasonal", 4, "ハロウィンパーティー", "halloween-party", "night", Some("autumn"), Medium),
    entry("nature", 1, "公園", "park", "day", None, Low),
    entry("urban", 1, "ショッピングモール", "shopping-mall", "day", None, Low),
    entry("urban", 2, "駅", "train-station", "day", None, Low),
    entry("nature", 2, "花畑", "flower-field", "day", Some("spring"), Low),
];

impl Entry {
    fn to_image(&self) -> BackgroundImage {
        let stem = format!("/images/backgrounds/{}/{}", self.category, self.file);
        BackgroundImage {
            id: format!("{}-{:02}", self.category, self.number),
            name: self.name,
            url: format!("{stem}.jpg"),
            thumbnail: format!("{stem}-thumb.jpg"),
            category: self.category,
            time_of_day: self.time_of_day,
            season: self.season,
            intimacy: self.intimacy,
            is_default: self.category == "daily" && self.number == 1,
        }
    }
}

/// Backgrounds in catalog order, optionally restricted to one category.
pub fn background_images(category: Option<&str>, limit: Option<usize>) -> Vec<BackgroundImage> {
    CATALOG
        .iter()
        .filter(|e| category.map_or(true, |c| e.category == c))
        .take(limit.unwrap_or(DEFAULT_BACKGROUND_LIMIT))
        .map(Entry::to_image)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_catalog_has_single_default() {
        let all = background_images(None, None);
        assert_eq!(all.len(), 24);
        let defaults: Vec<_> = all.iter().filter(|b| b.is_default).map(|b| b.id.as_str()).collect();
        assert_eq!(defaults, vec!["daily-01"]);
        assert_eq!(all[8].url, "/images/backgrounds/daily/cafe.jpg");
        assert_eq!(all[8].thumbnail, "/images/backgrounds/daily/cafe-thumb.jpg");
    }

    #[test]
    fn filters_by_category_and_limit() {
        let romantic = background_images(Some("romantic"), Some(2));
        let ids: Vec<_> = romantic.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["romantic-01", "romantic-02"]);
        assert!(background_images(Some("space"), None).is_empty());
    }
}
