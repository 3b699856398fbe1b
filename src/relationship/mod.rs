//! Intimacy arithmetic, relationship stages and how the partner addresses
//! the user.

pub mod metrics;

use serde::Serialize;

use crate::partner::PersonalityType;
use crate::user::User;

pub const MAX_INTIMACY: u8 = 100;

pub fn clamp_intimacy(level: i32) -> u8 {
    level.clamp(0, i32::from(MAX_INTIMACY)) as u8
}

pub fn apply_intimacy_change(current: u8, delta: i32) -> u8 {
    clamp_intimacy(i32::from(current) + delta)
}

/// Prose description of the stage, embedded in the chat system prompt.
pub fn intimacy_stage(level: u8) -> &'static str {
    match level {
        0..=19 => "初対面（緊張感あり、敬語中心）",
        20..=39 => "友達関係に近づく段階（少しずつ打ち解ける）",
        40..=59 => "親しい関係（信頼関係構築、本音も少し）",
        60..=79 => "恋人関係（愛情表現、スキンシップOK）",
        _ => "唯一無二の存在（心も体も結ばれた深くて甘い絆）",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStage {
    Stranger,
    Acquaintance,
    Friend,
    CloseFriend,
    Intimate,
}

impl RelationshipStage {
    pub fn from_intimacy(level: u8) -> Self {
        match level {
            0..=19 => Self::Stranger,
            20..=39 => Self::Acquaintance,
            40..=59 => Self::Friend,
            60..=79 => Self::CloseFriend,
            _ => Self::Intimate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stranger => "stranger",
            Self::Acquaintance => "acquaintance",
            Self::Friend => "friend",
            Self::CloseFriend => "close_friend",
            Self::Intimate => "intimate",
        }
    }
}

impl std::fmt::Display for RelationshipStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's names as the calling-style table sees them. Missing values are
/// empty strings; the nickname falls back to the first name.
#[derive(Debug, Clone, Default)]
pub struct UserNames {
    pub surname: String,
    pub first_name: String,
    pub nickname: String,
}

impl UserNames {
    pub fn from_user(user: &User) -> Self {
        let surname = user.surname.clone().unwrap_or_default();
        let first_name = user.first_name.clone().unwrap_or_default();
        let nickname = user
            .nickname
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| first_name.clone());
        Self {
            surname,
            first_name,
            nickname,
        }
    }

    fn is_empty(&self) -> bool {
        self.surname.is_empty() && self.first_name.is_empty() && self.nickname.is_empty()
    }

    fn first_or_nick(&self) -> String {
        if self.first_name.is_empty() {
            self.nickname.clone()
        } else {
            self.first_name.clone()
        }
    }

    fn surname_or_nick(&self, suffix: &str) -> String {
        if self.surname.is_empty() {
            format!("{}{suffix}", self.nickname)
        } else {
            format!("{}{suffix}", self.surname)
        }
    }
}

/// How the partner addresses the user, by personality and intimacy.
pub fn calling_style(names: &UserNames, personality: PersonalityType, intimacy: u8) -> String {
    if names.is_empty() {
        return "あなた".to_string();
    }
    let nick = names.nickname.clone();

    match personality {
        PersonalityType::Tsundere => match intimacy {
            0..=19 => "あんた".to_string(),
            20..=39 => names.first_or_nick(),
            _ => nick,
        },
        PersonalityType::Cool => match intimacy {
            0..=19 if !names.surname.is_empty() && !names.first_name.is_empty() => {
                format!("{}{}", names.surname, names.first_name)
            }
            0..=19 => nick,
            20..=39 => names.first_or_nick(),
            _ => nick,
        },
        PersonalityType::Prince => match intimacy {
            0..=39 => names.surname_or_nick("様"),
            _ => format!("{nick}様"),
        },
        PersonalityType::Younger => match intimacy {
            0..=19 => format!("{}さん", names.first_name),
            _ => format!("{nick}先輩"),
        },
        PersonalityType::Imouto => "お兄ちゃん".to_string(),
        PersonalityType::Oneesan => match intimacy {
            0..=19 => names.surname_or_nick("くん"),
            20..=39 => format!("{}くん", names.first_name),
            _ => nick,
        },
        PersonalityType::Seiso => match intimacy {
            0..=19 => names.surname_or_nick("さん"),
            20..=39 => format!("{}さん", names.first_name),
            _ => nick,
        },
        PersonalityType::Koakuma => match intimacy {
            0..=19 => format!("{nick}くん"),
            20..=39 => nick,
            _ => "ダーリン".to_string(),
        },
        PersonalityType::Yandere => match intimacy {
            0..=19 => format!("{nick}さん"),
            20..=39 => nick,
            _ => "あなた".to_string(),
        },
        PersonalityType::Villain | PersonalityType::Possessive => match intimacy {
            0..=19 => "君".to_string(),
            _ => nick,
        },
        PersonalityType::Sadistic => match intimacy {
            0..=39 => "お前".to_string(),
            _ => nick,
        },
        PersonalityType::Oresama => match intimacy {
            0..=19 => "お前".to_string(),
            _ => nick,
        },
        PersonalityType::Mature => match intimacy {
            0..=19 => names.surname_or_nick("さん"),
            20..=39 => names.first_or_nick(),
            _ => nick,
        },
        _ => match intimacy {
            0..=19 => names.surname_or_nick("さん"),
            20..=39 => format!("{}さん", names.first_name),
            _ => nick,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> UserNames {
        UserNames {
            surname: "佐藤".into(),
            first_name: "健太".into(),
            nickname: "けんちゃん".into(),
        }
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_intimacy(-5), 0);
        assert_eq!(clamp_intimacy(150), 100);
        assert_eq!(apply_intimacy_change(95, 10), 100);
        assert_eq!(apply_intimacy_change(3, -10), 0);
        assert_eq!(apply_intimacy_change(50, 3), 53);
    }

    #[test]
    fn stage_boundaries() {
        assert_eq!(RelationshipStage::from_intimacy(19), RelationshipStage::Stranger);
        assert_eq!(RelationshipStage::from_intimacy(20), RelationshipStage::Acquaintance);
        assert_eq!(RelationshipStage::from_intimacy(59), RelationshipStage::Friend);
        assert_eq!(RelationshipStage::from_intimacy(60), RelationshipStage::CloseFriend);
        assert_eq!(RelationshipStage::from_intimacy(80), RelationshipStage::Intimate);
        assert!(intimacy_stage(0).starts_with("初対面"));
        assert!(intimacy_stage(100).starts_with("唯一無二"));
    }

    #[test]
    fn default_calling_style_progresses() {
        let n = names();
        assert_eq!(calling_style(&n, PersonalityType::Gentle, 10), "佐藤さん");
        assert_eq!(calling_style(&n, PersonalityType::Gentle, 30), "健太さん");
        assert_eq!(calling_style(&n, PersonalityType::Gentle, 50), "けんちゃん");
    }

    #[test]
    fn personality_specific_styles() {
        let n = names();
        assert_eq!(calling_style(&n, PersonalityType::Tsundere, 5), "あんた");
        assert_eq!(calling_style(&n, PersonalityType::Cool, 5), "佐藤健太");
        assert_eq!(calling_style(&n, PersonalityType::Prince, 90), "けんちゃん様");
        assert_eq!(calling_style(&n, PersonalityType::Younger, 25), "けんちゃん先輩");
        assert_eq!(calling_style(&n, PersonalityType::Imouto, 0), "お兄ちゃん");
        assert_eq!(calling_style(&n, PersonalityType::Koakuma, 70), "ダーリン");
        assert_eq!(calling_style(&n, PersonalityType::Sadistic, 39), "お前");
        assert_eq!(calling_style(&n, PersonalityType::Possessive, 0), "君");
    }

    #[test]
    fn no_names_means_anata() {
        assert_eq!(
            calling_style(&UserNames::default(), PersonalityType::Tsundere, 5),
            "あなた"
        );
    }

    #[test]
    fn nickname_falls_back_to_first_name() {
        let user = User {
            id: "u".into(),
            email: "e".into(),
            surname: None,
            first_name: Some("美咲".into()),
            nickname: None,
            birthday: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let n = UserNames::from_user(&user);
        assert_eq!(n.nickname, "美咲");
        assert_eq!(calling_style(&n, PersonalityType::Gentle, 0), "美咲さん");
    }
}
