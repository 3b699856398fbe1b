//! Deciding whether the partner should break a silence now.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Priority, QuestionType};

/// Silence after which the partner always reaches out.
pub const FORCED_SILENCE_MINUTES: u32 = 1440;
const MIN_INTERVAL_MINUTES: u32 = 1;
const MAX_INTERVAL_MINUTES: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShouldAskRequest {
    pub silence_minutes: u32,
    pub user_emotional_state: Option<String>,
    pub intimacy: u8,
    /// Local hour, 0..=23.
    pub hour: u32,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShouldAskDecision {
    pub should_ask: bool,
    pub delay_minutes: u32,
    pub reasoning: String,
    pub priority: Priority,
    pub suggested_question_type: Option<QuestionType>,
}

impl ShouldAskDecision {
    fn wait(delay_minutes: u32, reasoning: String) -> Self {
        Self {
            should_ask: false,
            delay_minutes,
            reasoning,
            priority: Priority::Low,
            suggested_question_type: None,
        }
    }
}

/// Inclusive hour window in which questions are allowed.
pub fn allowed_hours(intimacy: u8) -> (u32, u32) {
    match intimacy {
        61..=u8::MAX => (7, 25),
        31..=60 => (7, 22),
        _ => (7, 21),
    }
}

fn minutes_until_allowed(hour: u32, (start, end): (u32, u32)) -> u32 {
    if hour < start {
        (start - hour) * 60
    } else if hour > end {
        (24 + start).saturating_sub(hour) * 60
    } else {
        0
    }
}

pub fn time_of_day_bonus(hour: u32) -> f64 {
    match hour {
        7..=9 | 12..=14 => 0.1,
        17..=20 => 0.15,
        21..=23 => 0.2,
        _ => 0.0,
    }
}

pub fn question_priority(intimacy: u8, silence_minutes: u32, emotional_state: Option<&str>) -> Priority {
    if silence_minutes >= FORCED_SILENCE_MINUTES || matches!(emotional_state, Some("sad" | "angry")) {
        Priority::High
    } else if (intimacy >= 70 && silence_minutes >= 480) || silence_minutes >= 720 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn suggest_question_type(intimacy: u8, silence_minutes: u32) -> QuestionType {
    if silence_minutes >= FORCED_SILENCE_MINUTES {
        QuestionType::EmotionalSupport
    } else if intimacy >= 75 {
        QuestionType::ValuesFuture
    } else if intimacy >= 50 {
        QuestionType::DeepUnderstanding
    } else if intimacy >= 25 {
        QuestionType::Relationship
    } else {
        QuestionType::BasicInfo
    }
}

pub fn should_ask_question(request: &ShouldAskRequest, rng: &mut impl Rng) -> ShouldAskDecision {
    let ShouldAskRequest {
        silence_minutes: silence,
        intimacy,
        hour,
        ..
    } = *request;

    let window = allowed_hours(intimacy);
    if hour < window.0 || hour > window.1 {
        return ShouldAskDecision::wait(
            minutes_until_allowed(hour, window),
            format!(
                "親密度{intimacy}では{}:00-{}:00の間のみ質問可能です",
                window.0, window.1
            ),
        );
    }

    if silence < MIN_INTERVAL_MINUTES {
        return ShouldAskDecision::wait(
            MIN_INTERVAL_MINUTES - silence,
            format!("前回から{MIN_INTERVAL_MINUTES}分以上経過してから質問するのが適切です"),
        );
    }

    if silence >= FORCED_SILENCE_MINUTES {
        return ShouldAskDecision {
            should_ask: true,
            delay_minutes: 0,
            reasoning: "長期間の沈黙により、関係性維持のための積極的な声かけが必要です".into(),
            priority: Priority::High,
            suggested_question_type: Some(QuestionType::EmotionalSupport),
        };
    }

    let weekend_bonus = if request.is_weekend { 0.2 } else { 0.0 };
    let threshold =
        0.3 + f64::from(intimacy) / 100.0 * 0.3 + weekend_bonus + time_of_day_bonus(hour);
    let silence_ratio = (f64::from(silence) / f64::from(MAX_INTERVAL_MINUTES)).min(1.0);
    let score = silence_ratio * (0.7 + rng.gen::<f64>() * 0.3);

    if score >= threshold {
        return ShouldAskDecision {
            should_ask: true,
            delay_minutes: rng.gen_range(0..30),
            reasoning: format!(
                "親密度{intimacy}、沈黙時間{silence}分、時間帯を考慮して質問タイミングと判定"
            ),
            priority: question_priority(intimacy, silence, request.user_emotional_state.as_deref()),
            suggested_question_type: Some(suggest_question_type(intimacy, silence)),
        };
    }

    ShouldAskDecision::wait(
        rng.gen_range(30..90),
        "まだ質問のタイミングではありません。もう少し待ちます".into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request(silence: u32, intimacy: u8, hour: u32) -> ShouldAskRequest {
        ShouldAskRequest {
            silence_minutes: silence,
            intimacy,
            hour,
            ..Default::default()
        }
    }

    #[test]
    fn outside_window_waits_until_morning() {
        let mut rng = StdRng::seed_from_u64(0);
        let early = should_ask_question(&request(100, 10, 5), &mut rng);
        assert!(!early.should_ask);
        assert_eq!(early.delay_minutes, 120);

        let late = should_ask_question(&request(100, 10, 23), &mut rng);
        assert_eq!(late.delay_minutes, (24 - 23 + 7) * 60);
        assert!(late.reasoning.contains("7:00-21:00"));
    }

    #[test]
    fn out_of_range_hour_does_not_underflow() {
        let mut rng = StdRng::seed_from_u64(0);
        let decision = should_ask_question(&request(10, 10, 30), &mut rng);
        assert!(!decision.should_ask);
        assert_eq!(decision.delay_minutes, 60);
    }

    #[test]
    fn high_intimacy_allows_late_night() {
        assert_eq!(allowed_hours(61), (7, 25));
        assert_eq!(allowed_hours(60), (7, 22));
        assert_eq!(allowed_hours(30), (7, 21));
        let mut rng = StdRng::seed_from_u64(0);
        let decision = should_ask_question(&request(FORCED_SILENCE_MINUTES, 80, 23), &mut rng);
        assert!(decision.should_ask);
    }

    #[test]
    fn zero_silence_waits_one_minute() {
        let mut rng = StdRng::seed_from_u64(0);
        let decision = should_ask_question(&request(0, 50, 12), &mut rng);
        assert!(!decision.should_ask);
        assert_eq!(decision.delay_minutes, 1);
    }

    #[test]
    fn day_of_silence_forces_emotional_support() {
        let mut rng = StdRng::seed_from_u64(0);
        let decision = should_ask_question(&request(2000, 10, 10), &mut rng);
        assert!(decision.should_ask);
        assert_eq!(decision.delay_minutes, 0);
        assert_eq!(decision.priority, Priority::High);
        assert_eq!(decision.suggested_question_type, Some(QuestionType::EmotionalSupport));
    }

    #[test]
    fn low_score_declines_with_recheck_delay() {
        // silence 1/5 gives score <= 0.2, below the 0.3 base threshold
        let mut rng = StepRng::new(0, 1 << 40);
        let decision = should_ask_question(&request(1, 0, 15), &mut rng);
        assert!(!decision.should_ask);
        assert!((30..90).contains(&decision.delay_minutes));
    }

    #[test]
    fn long_silence_at_low_intimacy_asks() {
        // ratio 1.0 and score >= 0.7 beats 0.3 + 0.0 + 0.0 + 0.0
        let mut rng = StdRng::seed_from_u64(3);
        let decision = should_ask_question(&request(60, 0, 15), &mut rng);
        assert!(decision.should_ask);
        assert!(decision.delay_minutes < 30);
        assert_eq!(decision.suggested_question_type, Some(QuestionType::BasicInfo));
        assert_eq!(decision.priority, Priority::Low);
    }

    #[test]
    fn priority_rules() {
        assert_eq!(question_priority(10, 30, Some("sad")), Priority::High);
        assert_eq!(question_priority(70, 480, None), Priority::Medium);
        assert_eq!(question_priority(69, 480, None), Priority::Low);
        assert_eq!(question_priority(10, 720, None), Priority::Medium);
    }

    #[test]
    fn question_type_by_intimacy() {
        assert_eq!(suggest_question_type(75, 10), QuestionType::ValuesFuture);
        assert_eq!(suggest_question_type(50, 10), QuestionType::DeepUnderstanding);
        assert_eq!(suggest_question_type(25, 10), QuestionType::Relationship);
        assert_eq!(suggest_question_type(24, 10), QuestionType::BasicInfo);
    }
}
