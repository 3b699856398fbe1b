//! Clothing prompt fragments by style, gender and season.

use chrono::Datelike;
use serde::Serialize;

use crate::partner::Gender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// 3-5 spring, 6-8 summer, 9-11 autumn, otherwise winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    pub fn current() -> Self {
        Self::from_month(chrono::Local::now().month())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClothingPrompt {
    pub prompt: &'static str,
    pub season: Season,
    pub seasonally_adjusted: bool,
}

pub const FALLBACK_CLOTHING: &str = "casual comfortable clothing";

/// Prompt for a clothing style. `casual_date` and `casual_outdoor` vary with
/// the season; everything else uses the fixed table.
pub fn clothing_prompt(style: &str, gender: Gender, season: Season) -> ClothingPrompt {
    match seasonal_prompt(style, gender, season) {
        Some(prompt) => ClothingPrompt {
            prompt,
            season,
            seasonally_adjusted: true,
        },
        None => ClothingPrompt {
            prompt: basic_prompt(style, gender),
            season,
            seasonally_adjusted: false,
        },
    }
}

fn seasonal_prompt(style: &str, gender: Gender, season: Season) -> Option<&'static str> {
    use Gender::{Boyfriend, Girlfriend};
    use Season::*;

    let prompt = match (style, gender, season) {
        ("casual_date", Boyfriend, Spring) => "soft knit sweater, chino pants, casual leather shoes, light cardigan, fresh spring colors",
        ("casual_date", Boyfriend, Summer) => "short sleeve polo shirt, lightweight chino pants, canvas sneakers, summer casual style",
        ("casual_date", Boyfriend, Autumn) => "soft knit sweater, chino pants, casual leather shoes, autumn colors, cozy atmosphere",
        ("casual_date", Boyfriend, Winter) => "thick wool sweater, dark chino pants, warm boots, winter coat, cozy winter style",
        ("casual_date", Girlfriend, Spring) => "soft pastel sweater, midi flare skirt, comfortable flats, light spring jacket, cherry blossom colors",
        ("casual_date", Girlfriend, Summer) => "sleeveless blouse, summer skirt, comfortable sandals, light and airy summer style",
        ("casual_date", Girlfriend, Autumn) => "soft knit sweater, midi skirt, comfortable flats, autumn colors, warm and cozy",
        ("casual_date", Girlfriend, Winter) => "thick cozy sweater, warm skirt or pants, winter boots, winter coat, warm winter style",
        ("casual_outdoor", Boyfriend, Spring) => "outdoor jacket, cargo pants, hiking boots, spring outdoor gear, comfortable and practical",
        ("casual_outdoor", Boyfriend, Summer) => "quick-dry t-shirt, outdoor shorts, trail running shoes, summer outdoor style",
        ("casual_outdoor", Boyfriend, Autumn) => "fleece jacket, outdoor pants, hiking boots, autumn outdoor gear, warm and functional",
        ("casual_outdoor", Boyfriend, Winter) => "down jacket, thermal pants, winter hiking boots, cold weather gear, warm outdoor style",
        ("casual_outdoor", Girlfriend, Spring) => "active wear top, outdoor leggings, comfortable sneakers, spring outdoor style",
        ("casual_outdoor", Girlfriend, Summer) => "moisture-wicking tank top, outdoor shorts, sport shoes, summer active style",
        ("casual_outdoor", Girlfriend, Autumn) => "fleece jacket, active leggings, comfortable sneakers, autumn outdoor style",
        ("casual_outdoor", Girlfriend, Winter) => "insulated jacket, thermal leggings, warm outdoor boots, winter active gear",
        _ => return None,
    };
    Some(prompt)
}

/// Season-independent prompt; unknown styles get [`FALLBACK_CLOTHING`].
pub fn basic_prompt(style: &str, gender: Gender) -> &'static str {
    let (male, female) = match style {
        "casual" => (
            "casual t-shirt, jeans, sneakers, relaxed comfortable style",
            "casual blouse, comfortable pants, sneakers, relaxed everyday style",
        ),
        "formal" => (
            "dress shirt, suit jacket, dress pants, leather shoes, professional formal style",
            "formal blouse, business skirt or pants, professional heels, elegant business style",
        ),
        "sporty" => (
            "athletic wear, sports shorts, running shoes, sporty active style",
            "athletic top, sports leggings, running shoes, sporty active style",
        ),
        "elegant" => (
            "elegant shirt, dress pants, leather shoes, sophisticated style",
            "elegant dress, high heels, sophisticated jewelry, refined elegant style",
        ),
        "school_uniform" => (
            "school uniform, dress shirt, tie, school blazer, student style",
            "school uniform, blouse, skirt, school blazer, cute student style",
        ),
        "swimsuit" => (
            "swim trunks, beach style, summer swimwear",
            "stylish swimsuit, beach style, summer swimwear",
        ),
        "yukata" => (
            "traditional yukata, geta sandals, Japanese summer festival style",
            "beautiful yukata, traditional obi, geta sandals, Japanese summer festival style",
        ),
        "kimono" => (
            "formal kimono, traditional Japanese formal wear",
            "elegant kimono, beautiful obi, traditional Japanese formal wear",
        ),
        "loungewear" => (
            "comfortable loungewear, relaxed home clothes, cozy style",
            "comfortable loungewear, relaxed home clothes, cozy cute style",
        ),
        "yoga_wear" => (
            "yoga pants, fitted tank top, barefoot, yoga practice style",
            "yoga leggings, sports bra, barefoot, yoga practice style",
        ),
        "devil_costume" => (
            "devil costume, horns, dark colors, Halloween style",
            "cute devil costume, horns, tail, playful Halloween style",
        ),
        "santa_costume" => (
            "Santa costume, red and white, Christmas holiday style",
            "cute Santa costume, red and white, Christmas holiday style",
        ),
        "pajamas" => (
            "comfortable pajamas, bedtime clothes, relaxed sleep style",
            "cute pajamas, comfortable sleepwear, cozy bedtime style",
        ),
        "spring_dress" => (
            "light spring jacket, casual pants, spring casual style",
            "beautiful spring dress, light colors, spring fashion style",
        ),
        "winter_dress" => (
            "warm winter jacket, thick pants, winter casual style",
            "winter dress, warm tights, winter fashion style",
        ),
        "autumn_coat" => (
            "autumn coat, warm layers, fall fashion style",
            "stylish autumn coat, fall fashion, cozy autumn style",
        ),
        "competition_swimsuit" => (
            "competition swim trunks, athletic swimwear, competitive style",
            "competition swimsuit, athletic swimwear, competitive style",
        ),
        "premium_swimsuit" => (
            "premium swim trunks, high-end swimwear, luxury beach style",
            "premium swimsuit, luxury swimwear, high-end beach style",
        ),
        "towel_wrap" => (
            "towel wrapped around waist, post-shower style",
            "towel wrap, post-bath style, spa-like atmosphere",
        ),
        "casual_date" => (
            "casual date outfit, comfortable and stylish, date night style",
            "casual date outfit, cute and comfortable, date night style",
        ),
        "casual_outdoor" => (
            "outdoor casual wear, practical and comfortable, outdoor style",
            "outdoor casual wear, practical and cute, outdoor style",
        ),
        "casual_yukata" => (
            "casual yukata, relaxed Japanese summer style",
            "casual yukata, cute Japanese summer style",
        ),
        "office_suit" => (
            "business suit, tie, professional office style",
            "office suit, professional blouse, business professional style",
        ),
        "ski_wear" => (
            "ski jacket, ski pants, winter sports gear, mountain style",
            "ski jacket, ski pants, winter sports gear, cute mountain style",
        ),
        _ => return FALLBACK_CLOTHING,
    };
    match gender {
        Gender::Boyfriend => male,
        Gender::Girlfriend => female,
    }
}

/// Clothing style suggested for a location id. Seasonal events win over
/// regular places; the gym dresses girlfriends in yoga wear.
pub fn recommended_clothing(location_id: &str, gender: Gender) -> &'static str {
    if location_id == "gym" && gender == Gender::Girlfriend {
        return "yoga_wear";
    }
    match location_id {
        "cherry_blossoms" => "spring_dress",
        "fireworks_festival" => "yukata",
        "summer_festival" => "casual_yukata",
        "beach_house" => "swimsuit",
        "autumn_leaves" => "autumn_coat",
        "christmas_illumination" => "winter_dress",
        "christmas_party" => "santa_costume",
        "halloween_party" => "devil_costume",
        "new_year_shrine" => "kimono",
        "valentine_date" => "elegant",
        "ski_resort" => "ski_wear",
        "school_classroom" => "school_uniform",
        "cafe" => "casual_date",
        "beach" => "swimsuit",
        "office" => "office_suit",
        "home_living" | "spa" => "loungewear",
        "bedroom" | "bedroom_night" => "pajamas",
        "park" | "camping" => "casual_outdoor",
        "gym" => "sporty",
        "restaurant" | "jewelry_shop" | "night_view" | "luxury_hotel" => "elegant",
        "jazz_bar" => "formal",
        "onsen" => "towel_wrap",
        "private_beach_sunset" => "premium_swimsuit",
        _ => "casual",
    }
}

/// Scenery keywords for a location at a time of day. Unknown times fall back
/// to the afternoon variant; unknown places to a generic setting line.
pub fn background_elements(location_id: &str, time_of_day: &str) -> String {
    let variants: Option<[(&str, &str); 3]> = match location_id {
        "cafe" => Some([
            ("morning", "cozy morning cafe, warm lighting, coffee steam, peaceful atmosphere"),
            ("afternoon", "bustling afternoon cafe, natural lighting, social atmosphere"),
            ("evening", "romantic evening cafe, dim lighting, intimate atmosphere"),
        ]),
        "beach" => Some([
            ("morning", "sunrise beach, golden light, peaceful waves, morning breeze"),
            ("afternoon", "sunny beach, blue sky, white sand, tropical atmosphere"),
            ("evening", "sunset beach, romantic lighting, golden hour, peaceful waves"),
        ]),
        "park" => Some([
            ("morning", "fresh morning park, dew on grass, bird songs, peaceful nature"),
            ("afternoon", "sunny park, green trees, blue sky, outdoor activities"),
            ("evening", "evening park, soft lighting, romantic atmosphere, twilight"),
        ]),
        _ => None,
    };

    match variants {
        Some(variants) => variants
            .iter()
            .find(|(time, _)| *time == time_of_day)
            .or_else(|| variants.iter().find(|(time, _)| *time == "afternoon"))
            .map(|(_, text)| text.to_string())
            .unwrap_or_default(),
        None => format!("{location_id} setting, natural lighting, atmospheric background"),
    }
}
