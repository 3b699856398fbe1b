//! English image prompts that keep the partner's look consistent across
//! generations.

use crate::partner::{Gender, Partner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntimacyModifiers {
    pub emotion_intensity: &'static str,
    pub gaze_direction: &'static str,
    pub body_language: &'static str,
    pub atmosphere: &'static str,
}

pub fn intimacy_modifiers(intimacy: u8) -> IntimacyModifiers {
    let (emotion_intensity, gaze_direction, body_language, atmosphere) = match intimacy {
        0..=20 => (
            "subtle reserved",
            "slightly averted gaze",
            "formal distant posture",
            "polite but distant atmosphere",
        ),
        21..=40 => (
            "moderate friendly",
            "occasional eye contact",
            "relaxed but respectful posture",
            "friendly and approachable atmosphere",
        ),
        41..=60 => (
            "warm expressive",
            "direct friendly gaze",
            "open comfortable posture",
            "warm and trusting atmosphere",
        ),
        61..=80 => (
            "deeply expressive",
            "loving direct gaze",
            "intimate relaxed posture",
            "close and affectionate atmosphere",
        ),
        _ => (
            "intensely passionate",
            "deep loving gaze into viewer eyes",
            "very intimate loving posture",
            "deeply romantic and connected atmosphere",
        ),
    };
    IntimacyModifiers {
        emotion_intensity,
        gaze_direction,
        body_language,
        atmosphere,
    }
}

/// English name for a hair colour chosen in Japanese. Unknown colours pass
/// through lowercased; an empty one becomes brown.
pub fn hair_color_english(color: &str) -> String {
    let mapped = match color {
        "黒" => "black",
        "ダークブラウン" => "dark brown",
        "ブラウン" => "brown",
        "ブロンド" => "blonde",
        "ピンク" => "pink",
        "水色" => "light blue",
        "ミントグリーン" => "mint green",
        "ラベンダー" => "lavender",
        "ライトゴールド" => "light gold",
        "シルバー" => "silver",
        "" => "brown",
        other => return other.to_lowercase(),
    };
    mapped.to_string()
}

/// Outfit for a scene name. Scene names here are the free-form settings used
/// in image requests, not location ids.
pub fn clothing_for_scene(scene: &str, gender: Gender) -> &'static str {
    let (male, female) = match scene {
        "cafe" => ("casual shirt and jeans", "casual sweater and skirt"),
        "home" => ("comfortable t-shirt and shorts", "cozy loungewear"),
        "park" => ("sporty casual wear", "comfortable outdoor outfit"),
        "library" => ("smart casual attire", "modest studious outfit"),
        "night_view" => ("elegant jacket and dress shirt", "elegant dress"),
        "beach_sunset" => ("beach shirt and shorts", "summer dress"),
        "cherry_blossoms" => ("spring casual wear", "floral spring dress"),
        "illumination" => ("warm coat and scarf", "stylish winter coat"),
        "forest" => ("outdoor hiking wear", "practical outdoor clothing"),
        "lake" => ("relaxed outdoor wear", "comfortable lake-side outfit"),
        "mountain" => ("mountain climbing gear", "sporty mountain wear"),
        "flower_field" => ("light summer clothing", "flowing summer dress"),
        "station" => ("business casual", "city casual style"),
        "shopping" => ("trendy casual wear", "fashionable shopping outfit"),
        "office" => ("business suit", "professional office attire"),
        "residential" => ("neighborhood casual", "everyday casual wear"),
        "classroom" => (
            "school uniform or casual student attire",
            "school uniform or cute student outfit",
        ),
        "school_rooftop" | "school_hallway" => ("school uniform", "school uniform"),
        "school_gate" => (
            "school uniform or after-school casual",
            "school uniform or after-school cute outfit",
        ),
        "club_room" => (
            "school uniform or club activity wear",
            "school uniform or club activity cute outfit",
        ),
        "bedroom" => ("comfortable casual wear", "comfortable cute outfit"),
        "living_room" => ("relaxed home wear", "cozy home outfit"),
        "restaurant" => ("smart casual or semi-formal", "elegant dinner outfit"),
        "aquarium" => ("casual date outfit", "cute date dress"),
        "ferris_wheel" => ("romantic casual wear", "romantic dress"),
        "fireworks" => (
            "yukata or summer festival outfit",
            "yukata or summer festival dress",
        ),
        "summer_festival" => (
            "yukata or casual summer wear",
            "yukata or summer festival outfit",
        ),
        "shrine" => (
            "formal visit attire or kimono",
            "formal visit outfit or kimono",
        ),
        "halloween_party" => ("halloween costume", "cute halloween costume"),
        "christmas_illumination" => (
            "warm winter coat and scarf",
            "stylish winter coat and accessories",
        ),
        "shopping_mall" => ("trendy shopping outfit", "fashionable shopping style"),
        "train_station" => (
            "commuter casual or business casual",
            "commuter chic or business casual",
        ),
        _ => ("casual shirt and jeans", "casual sweater and skirt"),
    };
    match gender {
        Gender::Boyfriend => male,
        Gender::Girlfriend => female,
    }
}

pub const DEFAULT_SCENE: &str = "cafe";
pub const DEFAULT_EMOTION: &str = "happy";
/// Intimacy assumed when neither the request nor the partner provides one.
pub const DEFAULT_PROMPT_INTIMACY: u8 = 50;

/// Scene parameters shared by avatar and chat prompts.
#[derive(Debug, Clone, Default)]
pub struct SceneRequest {
    pub emotion: Option<String>,
    pub location: Option<String>,
    /// Overrides the outfit derived from the location.
    pub clothing: Option<String>,
    pub intimacy: Option<u8>,
}

/// A usable scene name: `"true"`/`"false"` and blanks are ignored.
fn scene_name(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty() && *v != "true" && *v != "false")
}

fn effective_intimacy(requested: Option<u8>, partner: &Partner) -> u8 {
    requested
        .filter(|v| *v > 0)
        .or(Some(partner.intimacy_level).filter(|v| *v > 0))
        .unwrap_or(DEFAULT_PROMPT_INTIMACY)
}

fn character_parts(partner: &Partner, emotion: &str, modifiers: &IntimacyModifiers) -> Vec<String> {
    let appearance = &partner.appearance;
    let person = match partner.gender {
        Gender::Boyfriend => "young man",
        Gender::Girlfriend => "young woman",
    };
    vec![
        format!("anime style {person}"),
        format!(
            "{} {} hair",
            hair_color_english(appearance.hair_color.as_deref().unwrap_or_default()),
            appearance.hair_style.as_deref().unwrap_or("medium length"),
        ),
        format!("{} eyes", appearance.eye_color.as_deref().unwrap_or("brown")),
        format!("{} personality", partner.personality_type),
        format!("{emotion} expression with {}", modifiers.emotion_intensity),
        modifiers.gaze_direction.to_string(),
        modifiers.body_language.to_string(),
    ]
}

/// Portrait prompt for avatar generation.
pub fn build_consistent_prompt(partner: &Partner, request: &SceneRequest) -> String {
    let modifiers = intimacy_modifiers(effective_intimacy(request.intimacy, partner));
    let location = scene_name(request.location.as_deref()).unwrap_or(DEFAULT_SCENE);
    let clothing = request
        .clothing
        .clone()
        .unwrap_or_else(|| clothing_for_scene(location, partner.gender).to_string());
    let emotion = request.emotion.as_deref().unwrap_or(DEFAULT_EMOTION);

    let mut parts = character_parts(partner, emotion, &modifiers);
    parts.extend([
        format!("wearing {clothing}"),
        format!("in {location} setting"),
        modifiers.atmosphere.to_string(),
        "high quality anime artwork".into(),
        "consistent character design".into(),
    ]);
    parts.join(", ")
}

/// Prompt for an image shown inside the chat. The scene comes from the
/// location, else the situation, else a cafe.
pub fn build_chat_prompt(partner: &Partner, request: &SceneRequest, situation: Option<&str>) -> String {
    let modifiers = intimacy_modifiers(effective_intimacy(request.intimacy, partner));
    let location = scene_name(request.location.as_deref())
        .or_else(|| situation.filter(|s| !s.trim().is_empty()))
        .unwrap_or(DEFAULT_SCENE);
    let clothing = request
        .clothing
        .clone()
        .unwrap_or_else(|| clothing_for_scene(location, partner.gender).to_string());
    let emotion = request.emotion.as_deref().unwrap_or(DEFAULT_EMOTION);

    let mut parts = character_parts(partner, emotion, &modifiers);
    parts.extend([
        format!("wearing {clothing}"),
        format!("sitting in {location}"),
        "looking at viewer".into(),
        modifiers.atmosphere.to_string(),
        "high quality anime artwork".into(),
        "consistent character design".into(),
        "detailed background".into(),
    ]);
    parts.join(", ")
}

/// How well a prompt preserves the partner's defining features:
/// 0.5 base, +0.2 hair colour, +0.2 eye colour, +0.1 personality.
/// Empty appearance fields never count. Rounded to two decimals, at most 1.0.
pub fn consistency_score(partner: &Partner, prompt: &str) -> f64 {
    let appearance = &partner.appearance;
    let mut score = 0.5;

    if let Some(hair) = appearance.hair_color.as_deref().filter(|h| !h.is_empty()) {
        if prompt.contains(hair) || prompt.contains(&hair_color_english(hair)) {
            score += 0.2;
        }
    }
    if let Some(eyes) = appearance.eye_color.as_deref().filter(|e| !e.is_empty()) {
        if prompt.contains(eyes) {
            score += 0.2;
        }
    }
    if prompt.contains(partner.personality_type.as_str()) {
        score += 0.1;
    }

    ((score * 100.0_f64).round() / 100.0).min(1.0)
}
