//! The virtual partner: persona definition, presets, prompt validation and
//! storage.
//!
//! A user owns at most one partner. The partner row also carries the
//! authoritative intimacy level and the current location.

pub mod presets;
pub mod store;
pub mod validate;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Boyfriend,
    Girlfriend,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boyfriend => "boyfriend",
            Self::Girlfriend => "girlfriend",
        }
    }

    /// 男性 / 女性, as used inside Japanese prompts.
    pub fn japanese(&self) -> &'static str {
        match self {
            Self::Boyfriend => "男性",
            Self::Girlfriend => "女性",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boyfriend" => Ok(Self::Boyfriend),
            "girlfriend" => Ok(Self::Girlfriend),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("unknown ", $label, ": {}"), s)),
                }
            }
        }
    };
}

string_enum!(
    /// Persona archetype. Drives presets, calling style and engagement tables.
    PersonalityType, "personality type" {
        Gentle => "gentle",
        Cool => "cool",
        Cheerful => "cheerful",
        Tsundere => "tsundere",
        Sweet => "sweet",
        Reliable => "reliable",
        Clingy => "clingy",
        Genius => "genius",
        Childhood => "childhood",
        Sports => "sports",
        Artist => "artist",
        Cooking => "cooking",
        Mysterious => "mysterious",
        Prince => "prince",
        Otaku => "otaku",
        Younger => "younger",
        Band => "band",
        Imouto => "imouto",
        Oneesan => "oneesan",
        Seiso => "seiso",
        Koakuma => "koakuma",
        Yandere => "yandere",
        Villain => "villain",
        Possessive => "possessive",
        Sadistic => "sadistic",
        Oresama => "oresama",
        Mature => "mature",
    }
);

string_enum!(
    SpeechStyle, "speech style" {
        Polite => "polite",
        Casual => "casual",
        Sweet => "sweet",
        Dialect => "dialect",
        CoolTone => "cool_tone",
        Keigo => "keigo",
        Tame => "tame",
        Kansai => "kansai",
        Ojousama => "ojousama",
    }
);

/// Visual appearance, free-form strings as chosen during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    pub hair_style: Option<String>,
    pub hair_color: Option<String>,
    pub eye_color: Option<String>,
    pub body_type: Option<String>,
    pub clothing_style: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub gender: Gender,
    pub personality_type: PersonalityType,
    pub speech_style: SpeechStyle,
    pub system_prompt: String,
    pub avatar_description: String,
    pub appearance: Appearance,
    pub hobbies: Vec<String>,
    pub intimacy_level: u8,
    pub base_image_url: Option<String>,
    pub current_location_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a partner. An empty `system_prompt` is replaced by the
/// generated default and an empty `avatar_description` by one derived from
/// the appearance.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPartner {
    pub name: String,
    pub gender: Gender,
    pub personality_type: PersonalityType,
    pub speech_style: SpeechStyle,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub avatar_description: String,
    #[serde(default)]
    pub appearance: Appearance,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default)]
    pub intimacy_level: u8,
}

/// Partial partner update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartnerUpdate {
    pub name: Option<String>,
    pub personality_type: Option<PersonalityType>,
    pub speech_style: Option<SpeechStyle>,
    pub system_prompt: Option<String>,
    pub avatar_description: Option<String>,
    pub appearance: Option<Appearance>,
    pub hobbies: Option<Vec<String>>,
    pub intimacy_level: Option<u8>,
}
