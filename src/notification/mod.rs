//! Notification preferences, scheduled notifications and the partner's
//! morning greeting.
//!
//! Settings live in `notification_settings`, one row per user. Scheduled
//! notifications live in `notification_schedules`; recurring ones move their
//! `scheduled_time` forward each time they are sent.

pub mod store;

use chrono::{DateTime, Days, Months, NaiveTime, TimeZone, Timelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::CompanionError;

pub const DEFAULT_MORNING_TIME: &str = "07:00";
pub const MAX_MESSAGE_CHARS: usize = 500;

/// `H:MM` or `HH:MM`, 24-hour clock.
static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):([0-5][0-9])$").expect("valid regex"));

const MORNING_GREETINGS: &[&str] = &[
    "おはよう！今日も一日頑張ろうね❤️",
    "おはようございます☀️ 素敵な一日になりますように",
    "おはよう、今日もあなたに会えて嬉しいです💕",
    "おはようございます！今日は何をする予定ですか？",
    "おはよう❤️ あなたのことを想って目が覚めました",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MorningGreeting,
    Reminder,
    SpecialDay,
    Custom,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MorningGreeting => "morning_greeting",
            Self::Reminder => "reminder",
            Self::SpecialDay => "special_day",
            Self::Custom => "custom",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning_greeting" => Ok(Self::MorningGreeting),
            "reminder" => Ok(Self::Reminder),
            "special_day" => Ok(Self::SpecialDay),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("unknown notification kind: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringPattern {
    Daily,
    Weekly,
    Monthly,
}

impl RecurringPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for RecurringPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("unknown recurring pattern: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("unknown schedule status: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub user_id: String,
    pub morning_greeting: bool,
    /// `HH:MM`, local time.
    pub morning_time: String,
    pub reminder_messages: bool,
    pub special_days: bool,
}

impl NotificationSettings {
    fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            morning_greeting: true,
            morning_time: DEFAULT_MORNING_TIME.into(),
            reminder_messages: false,
            special_days: true,
        }
    }

    /// Human-readable list of what is switched on.
    pub fn summary(&self) -> String {
        let mut enabled = Vec::new();
        if self.morning_greeting {
            enabled.push(format!("朝の挨拶({})", self.morning_time));
        }
        if self.reminder_messages {
            enabled.push("リマインダーメッセージ".to_string());
        }
        if self.special_days {
            enabled.push("特別な日の通知".to_string());
        }
        if enabled.is_empty() {
            "通知は無効です".to_string()
        } else {
            format!("有効: {}", enabled.join(", "))
        }
    }
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationUpdate {
    pub morning_greeting: Option<bool>,
    pub morning_time: Option<String>,
    pub reminder_messages: Option<bool>,
    pub special_days: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsCheck {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Problems and advice for a stored configuration.
pub fn check_settings(settings: &NotificationSettings) -> SettingsCheck {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    let time = parse_time(&settings.morning_time);
    if settings.morning_greeting && time.is_none() {
        issues.push("朝の挨拶が有効ですが、時刻が設定されていません".to_string());
    }
    if !settings.morning_greeting && !settings.reminder_messages && !settings.special_days {
        recommendations.push("少なくとも1つの通知を有効にすることをお勧めします".to_string());
    }
    if let (true, Some(time)) = (settings.morning_greeting, time) {
        if !(6..=10).contains(&time.hour()) {
            recommendations.push("朝の挨拶時刻は6:00-10:00の間が効果的です".to_string());
        }
    }

    SettingsCheck {
        is_valid: issues.is_empty(),
        issues,
        recommendations,
    }
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let caps = TIME_OF_DAY.captures(value.trim())?;
    let hour = caps[1].parse().ok()?;
    let minute = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// `7:05` becomes `07:05`.
pub fn normalize_time(value: &str) -> Result<String, CompanionError> {
    parse_time(value)
        .map(|t| t.format("%H:%M").to_string())
        .ok_or_else(|| CompanionError::validation("無効な時刻形式です"))
}

/// Morning greetings must fall between 4:00 and 12:00 inclusive.
pub fn validate_morning_time(value: &str) -> Result<NaiveTime, CompanionError> {
    let time = parse_time(value).ok_or_else(|| CompanionError::validation("時刻形式が正しくありません"))?;
    let minutes = time.hour() * 60 + time.minute();
    if !(4 * 60..=12 * 60).contains(&minutes) {
        return Err(CompanionError::validation(
            "朝の挨拶時刻は4:00から12:00の間で設定してください",
        ));
    }
    Ok(time)
}

/// The first moment strictly after `now` whose local clock reads `time`.
pub fn next_occurrence<Tz: TimeZone>(time: NaiveTime, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let on = |date: chrono::NaiveDate| tz.from_local_datetime(&date.and_time(time)).earliest();
    let today = now.date_naive();

    match on(today) {
        Some(at) if at > *now => at,
        _ => today
            .checked_add_days(Days::new(1))
            .and_then(on)
            .unwrap_or_else(|| now.clone() + chrono::Duration::days(1)),
    }
}

/// When a recurring notification sent at `at` fires again.
pub fn next_run_after(at: DateTime<Utc>, pattern: RecurringPattern) -> Option<DateTime<Utc>> {
    match pattern {
        RecurringPattern::Daily => at.checked_add_days(Days::new(1)),
        RecurringPattern::Weekly => at.checked_add_days(Days::new(7)),
        RecurringPattern::Monthly => at.checked_add_months(Months::new(1)),
    }
}

/// `HH:MM` resolves to its next occurrence; anything else must be an
/// RFC 3339 instant after `now`.
pub fn resolve_schedule_time<Tz: TimeZone>(
    value: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Utc>, CompanionError> {
    if let Some(time) = parse_time(value) {
        return Ok(next_occurrence(time, now).with_timezone(&Utc));
    }
    let at = DateTime::parse_from_rfc3339(value)
        .map_err(|_| CompanionError::validation("無効な日時形式です"))?
        .with_timezone(&Utc);
    if at <= now.with_timezone(&Utc) {
        return Err(CompanionError::validation(
            "スケジュール時刻は未来の時刻である必要があります",
        ));
    }
    Ok(at)
}

pub fn morning_greeting(rng: &mut impl Rng) -> &'static str {
    MORNING_GREETINGS.choose(rng).copied().unwrap_or(MORNING_GREETINGS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tokyo(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn time_format_and_normalization() {
        assert_eq!(normalize_time("7:05").unwrap(), "07:05");
        assert_eq!(normalize_time("23:59").unwrap(), "23:59");
        assert!(normalize_time("24:00").is_err());
        assert!(normalize_time("7:5").is_err());
        assert!(parse_time("morning").is_none());
    }

    #[test]
    fn morning_window() {
        assert!(validate_morning_time("04:00").is_ok());
        assert!(validate_morning_time("12:00").is_ok());
        assert!(validate_morning_time("12:01").is_err());
        assert!(validate_morning_time("3:59").is_err());
    }

    #[test]
    fn next_occurrence_rolls_to_tomorrow() {
        let seven = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        assert_eq!(next_occurrence(seven, &tokyo(2026, 3, 1, 6, 30)), tokyo(2026, 3, 1, 7, 0));
        assert_eq!(next_occurrence(seven, &tokyo(2026, 3, 1, 7, 0)), tokyo(2026, 3, 2, 7, 0));
        assert_eq!(next_occurrence(seven, &tokyo(2026, 12, 31, 22, 0)), tokyo(2027, 1, 1, 7, 0));
    }

    #[test]
    fn recurring_steps() {
        let at = tokyo(2026, 1, 31, 7, 0).with_timezone(&Utc);
        assert_eq!(next_run_after(at, RecurringPattern::Daily), Some(at + chrono::Duration::days(1)));
        assert_eq!(next_run_after(at, RecurringPattern::Weekly), Some(at + chrono::Duration::days(7)));
        let monthly = next_run_after(at, RecurringPattern::Monthly).unwrap();
        assert_eq!(monthly.date_naive().to_string(), "2026-02-28");
    }

    #[test]
    fn schedule_time_must_be_future() {
        let now = tokyo(2026, 5, 1, 12, 0);
        let at = resolve_schedule_time("08:00", &now).unwrap();
        assert_eq!(at, tokyo(2026, 5, 2, 8, 0).with_timezone(&Utc));
        assert!(resolve_schedule_time("2026-05-01T13:00:00+09:00", &now).is_ok());
        assert!(resolve_schedule_time("2026-05-01T11:00:00+09:00", &now).is_err());
        assert!(resolve_schedule_time("tomorrow", &now).is_err());
    }

    #[test]
    fn summary_and_check() {
        let mut settings = NotificationSettings::defaults_for("u1");
        assert_eq!(settings.summary(), "有効: 朝の挨拶(07:00), 特別な日の通知");
        assert!(check_settings(&settings).recommendations.is_empty());

        settings.morning_time = "11:30".into();
        assert_eq!(
            check_settings(&settings).recommendations,
            vec!["朝の挨拶時刻は6:00-10:00の間が効果的です"]
        );

        settings.morning_greeting = false;
        settings.special_days = false;
        assert_eq!(settings.summary(), "通知は無効です");
        let check = check_settings(&settings);
        assert!(check.is_valid);
        assert_eq!(check.recommendations.len(), 1);
    }

    #[test]
    fn greeting_comes_from_templates() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            assert!(MORNING_GREETINGS.contains(&morning_greeting(&mut rng)));
        }
    }
}
