//! Partner-initiated conversation: which kind of remark to make, when to
//! speak up, and what to ask about.

pub mod patterns;
pub mod prompt;
pub mod question;
pub mod service;
pub mod timing;

use serde::{Deserialize, Serialize};

pub use patterns::{engagement_priority, select_engagement_type};
pub use timing::{should_ask_question, ShouldAskDecision, ShouldAskRequest};

/// The flavour of an unprompted remark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementType {
    PlayfulTease,
    ShareFeeling,
    Roleplay,
    CasualChat,
    EmotionalCheck,
    SharedMoment,
    Affection,
}

impl EngagementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlayfulTease => "playful_tease",
            Self::ShareFeeling => "share_feeling",
            Self::Roleplay => "roleplay",
            Self::CasualChat => "casual_chat",
            Self::EmotionalCheck => "emotional_check",
            Self::SharedMoment => "shared_moment",
            Self::Affection => "affection",
        }
    }
}

impl std::fmt::Display for EngagementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngagementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playful_tease" => Ok(Self::PlayfulTease),
            "share_feeling" => Ok(Self::ShareFeeling),
            "roleplay" => Ok(Self::Roleplay),
            "casual_chat" => Ok(Self::CasualChat),
            "emotional_check" => Ok(Self::EmotionalCheck),
            "shared_moment" => Ok(Self::SharedMoment),
            "affection" => Ok(Self::Affection),
            _ => Err(format!("unknown engagement type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a proactive question tries to learn about the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    BasicInfo,
    Relationship,
    DeepUnderstanding,
    ValuesFuture,
    FollowUp,
    EmotionalSupport,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasicInfo => "basic_info",
            Self::Relationship => "relationship",
            Self::DeepUnderstanding => "deep_understanding",
            Self::ValuesFuture => "values_future",
            Self::FollowUp => "follow_up",
            Self::EmotionalSupport => "emotional_support",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic_info" => Ok(Self::BasicInfo),
            "relationship" => Ok(Self::Relationship),
            "deep_understanding" => Ok(Self::DeepUnderstanding),
            "values_future" => Ok(Self::ValuesFuture),
            "follow_up" => Ok(Self::FollowUp),
            "emotional_support" => Ok(Self::EmotionalSupport),
            _ => Err(format!("unknown question type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engagement_type_strings() {
        assert_eq!("shared_moment".parse::<EngagementType>(), Ok(EngagementType::SharedMoment));
        assert_eq!(EngagementType::PlayfulTease.to_string(), "playful_tease");
        assert!("hug".parse::<EngagementType>().is_err());
    }

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::High > Priority::Medium && Priority::Medium > Priority::Low);
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"medium\"");
    }
}
