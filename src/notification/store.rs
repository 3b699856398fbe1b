//! Read and write paths for notification settings and schedules.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    morning_greeting, next_run_after, normalize_time, resolve_schedule_time,
    validate_morning_time, NotificationKind, NotificationSettings, NotificationUpdate,
    RecurringPattern, ScheduleStatus, DEFAULT_MORNING_TIME, MAX_MESSAGE_CHARS,
};
use crate::chat::messages::{insert_message, MessageSender};
use crate::error::CompanionError;
use crate::partner::store::{get_partner, get_partner_for_user};
use crate::user::require_user;

const SCHEDULE_COLUMNS: &str = "id, user_id, partner_id, kind, scheduled_time, message, recurring, \
     recurring_pattern, status, next_run_at, last_sent_at, created_at";

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Settings for a user, created with defaults on first access.
pub fn get_or_create_notification_settings(conn: &Connection, user_id: &str) -> Result<NotificationSettings> {
    if let Some(settings) = load_settings(conn, user_id)? {
        return Ok(settings);
    }
    require_user(conn, user_id)?;

    let settings = NotificationSettings::defaults_for(user_id);
    save_settings(conn, &settings)?;
    tracing::debug!(user_id, "default notification settings created");
    Ok(settings)
}

/// Apply a partial update. Turning the morning greeting on together with a
/// time also queues the next daily greeting when the user has a partner.
pub fn update_notification_settings<Tz: TimeZone>(
    conn: &Connection,
    user_id: &str,
    update: &NotificationUpdate,
    now: &DateTime<Tz>,
) -> Result<NotificationSettings> {
    let mut errors = Vec::new();
    let mut morning_time = None;
    if let Some(ref time) = update.morning_time {
        match validate_morning_time(time).and_then(|_| normalize_time(time)) {
            Ok(normalized) => morning_time = Some(normalized),
            Err(e) => errors.push(e.to_string()),
        }
    }
    if update.morning_greeting == Some(true) && update.morning_time.is_none() {
        errors.push("朝の挨拶を有効にする場合は時刻の設定が必要です".to_string());
    }
    if !errors.is_empty() {
        return Err(CompanionError::Validation {
            message: format!("設定の検証に失敗: {}", errors.join(", ")),
            warnings: errors,
        }
        .into());
    }

    let mut settings = get_or_create_notification_settings(conn, user_id)?;
    if let Some(enabled) = update.morning_greeting {
        settings.morning_greeting = enabled;
    }
    if let Some(time) = morning_time {
        settings.morning_time = time;
    }
    if let Some(enabled) = update.reminder_messages {
        settings.reminder_messages = enabled;
    }
    if let Some(enabled) = update.special_days {
        settings.special_days = enabled;
    }
    save_settings(conn, &settings)?;
    tracing::info!(user_id, summary = %settings.summary(), "notification settings updated");

    if update.morning_greeting == Some(true) {
        if let Err(e) = schedule_morning_greeting(conn, &settings, now) {
            tracing::warn!(user_id, error = %e, "failed to schedule morning greeting");
        }
    }
    Ok(settings)
}

/// Morning greeting off at 07:00, reminders off, special days on.
pub fn reset_notification_settings<Tz: TimeZone>(
    conn: &Connection,
    user_id: &str,
    now: &DateTime<Tz>,
) -> Result<NotificationSettings> {
    let defaults = NotificationUpdate {
        morning_greeting: Some(false),
        morning_time: Some(DEFAULT_MORNING_TIME.into()),
        reminder_messages: Some(false),
        special_days: Some(true),
    };
    update_notification_settings(conn, user_id, &defaults, now)
}

/// Replace any pending morning greeting with one at the next occurrence of
/// the configured time. Users without a partner are skipped.
fn schedule_morning_greeting<Tz: TimeZone>(
    conn: &Connection,
    settings: &NotificationSettings,
    now: &DateTime<Tz>,
) -> Result<Option<NotificationSchedule>> {
    let Some(partner) = get_partner_for_user(conn, &settings.user_id)? else {
        tracing::debug!(user_id = %settings.user_id, "no partner, morning greeting skipped");
        return Ok(None);
    };
    conn.execute(
        "UPDATE notification_schedules SET status = 'cancelled' \
         WHERE user_id = ?1 AND kind = 'morning_greeting' AND status = 'pending'",
        params![settings.user_id],
    )?;
    let schedule = NewSchedule {
        partner_id: Some(partner.id),
        kind: NotificationKind::MorningGreeting,
        scheduled_time: settings.morning_time.clone(),
        message: None,
        recurring: true,
        recurring_pattern: Some(RecurringPattern::Daily),
    };
    create_schedule(conn, &settings.user_id, &schedule, now).map(Some)
}

fn load_settings(conn: &Connection, user_id: &str) -> Result<Option<NotificationSettings>> {
    let settings = conn
        .query_row(
            "SELECT user_id, morning_greeting, morning_time, reminder_messages, special_days \
             FROM notification_settings WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(NotificationSettings {
                    user_id: row.get(0)?,
                    morning_greeting: row.get(1)?,
                    morning_time: row.get(2)?,
                    reminder_messages: row.get(3)?,
                    special_days: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(settings)
}

fn save_settings(conn: &Connection, s: &NotificationSettings) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO notification_settings (user_id, morning_greeting, morning_time, reminder_messages, \
             special_days, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
         ON CONFLICT(user_id) DO UPDATE SET \
             morning_greeting = excluded.morning_greeting, morning_time = excluded.morning_time, \
             reminder_messages = excluded.reminder_messages, special_days = excluded.special_days, \
             updated_at = excluded.updated_at",
        params![
            s.user_id,
            s.morning_greeting,
            s.morning_time,
            s.reminder_messages,
            s.special_days,
            now
        ],
    )?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSchedule {
    pub id: String,
    pub user_id: String,
    pub partner_id: Option<String>,
    pub kind: NotificationKind,
    pub scheduled_time: String,
    pub message: Option<String>,
    pub recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub status: ScheduleStatus,
    pub next_run_at: Option<String>,
    pub last_sent_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    pub partner_id: Option<String>,
    pub kind: NotificationKind,
    /// `HH:MM` for the next occurrence, or an RFC 3339 instant.
    pub scheduled_time: String,
    pub message: Option<String>,
    #[serde(default)]
    pub recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
}

fn row_to_schedule(row: &Row<'_>) -> rusqlite::Result<NotificationSchedule> {
    let parse_err = |i: usize, e: String| {
        rusqlite::Error::FromSqlConversionFailure(i, rusqlite::types::Type::Text, e.into())
    };
    let kind: String = row.get(3)?;
    let pattern: Option<String> = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(NotificationSchedule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        partner_id: row.get(2)?,
        kind: kind.parse().map_err(|e| parse_err(3, e))?,
        scheduled_time: row.get(4)?,
        message: row.get(5)?,
        recurring: row.get(6)?,
        recurring_pattern: pattern.map(|p| p.parse()).transpose().map_err(|e| parse_err(7, e))?,
        status: status.parse().map_err(|e| parse_err(8, e))?,
        next_run_at: row.get(9)?,
        last_sent_at: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn check_schedule(new: &NewSchedule) -> Vec<String> {
    let mut errors = Vec::new();
    if new.kind == NotificationKind::MorningGreeting {
        if new.partner_id.is_none() {
            errors.push("朝の挨拶通知にはパートナーIDが必要です".to_string());
        }
        if new.scheduled_time.contains(':') && !new.scheduled_time.contains('T') {
            if let Err(e) = validate_morning_time(&new.scheduled_time) {
                errors.push(e.to_string());
            }
        }
    }
    if new.kind == NotificationKind::Custom && new.message.is_none() {
        errors.push("カスタム通知にはメッセージが必要です".to_string());
    }
    if let Some(ref message) = new.message {
        let len = message.chars().count();
        if len == 0 || len > MAX_MESSAGE_CHARS {
            errors.push("メッセージは1文字以上500文字以下である必要があります".to_string());
        }
    }
    if new.recurring_pattern.is_some() && !new.recurring {
        errors.push("繰り返しパターンを設定する場合は recurring を true にしてください".to_string());
    }
    errors
}

/// Validate and store a pending notification. The partner, when given,
/// must belong to the user.
pub fn create_schedule<Tz: TimeZone>(
    conn: &Connection,
    user_id: &str,
    new: &NewSchedule,
    now: &DateTime<Tz>,
) -> Result<NotificationSchedule> {
    let errors = check_schedule(new);
    if !errors.is_empty() {
        return Err(CompanionError::Validation {
            message: format!("スケジュール検証に失敗: {}", errors.join(", ")),
            warnings: errors,
        }
        .into());
    }
    require_user(conn, user_id)?;
    if let Some(ref partner_id) = new.partner_id {
        get_partner(conn, partner_id, user_id)?;
    }

    let scheduled = resolve_schedule_time(&new.scheduled_time, now)?;
    let next_run = match (new.recurring, new.recurring_pattern) {
        (true, Some(pattern)) => next_run_after(scheduled, pattern),
        _ => None,
    };

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO notification_schedules (id, user_id, partner_id, kind, scheduled_time, message, \
             recurring, recurring_pattern, status, next_run_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9, ?10)",
        params![
            id,
            user_id,
            new.partner_id,
            new.kind.as_str(),
            timestamp(scheduled),
            new.message,
            new.recurring,
            new.recurring_pattern.map(|p| p.as_str()),
            next_run.map(timestamp),
            Utc::now().to_rfc3339()
        ],
    )?;
    tracing::info!(user_id, schedule_id = %id, kind = new.kind.as_str(), at = %timestamp(scheduled), "notification scheduled");
    get_schedule(conn, &id)
}

fn get_schedule(conn: &Connection, id: &str) -> Result<NotificationSchedule> {
    conn.query_row(
        &format!("SELECT {SCHEDULE_COLUMNS} FROM notification_schedules WHERE id = ?1"),
        params![id],
        row_to_schedule,
    )
    .optional()?
    .ok_or_else(|| CompanionError::NotFound("通知スケジュールが見つかりません".into()).into())
}

/// The user's schedules by time; sent and cancelled ones only on request.
pub fn list_schedules(
    conn: &Connection,
    user_id: &str,
    include_completed: bool,
) -> Result<Vec<NotificationSchedule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM notification_schedules \
         WHERE user_id = ?1 AND (?2 OR status IN ('pending', 'failed')) \
         ORDER BY scheduled_time ASC"
    ))?;
    let schedules = stmt
        .query_map(params![user_id, include_completed], row_to_schedule)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(schedules)
}

pub fn cancel_schedule(conn: &Connection, user_id: &str, schedule_id: &str) -> Result<()> {
    let rows = conn.execute(
        "UPDATE notification_schedules SET status = 'cancelled' \
         WHERE id = ?1 AND user_id = ?2 AND status IN ('pending', 'failed')",
        params![schedule_id, user_id],
    )?;
    if rows == 0 {
        return Err(CompanionError::NotFound("通知スケジュールが見つかりません".into()).into());
    }
    Ok(())
}

/// Pending notifications due at `now`, oldest first.
pub fn due_schedules(conn: &Connection, now: DateTime<Utc>, limit: usize) -> Result<Vec<NotificationSchedule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM notification_schedules \
         WHERE status = 'pending' AND scheduled_time <= ?1 \
         ORDER BY scheduled_time ASC LIMIT ?2"
    ))?;
    let schedules = stmt
        .query_map(params![timestamp(now), limit as i64], row_to_schedule)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(schedules)
}

/// Mark a schedule sent. Recurring schedules stay pending and move to their
/// next run.
pub fn mark_sent(conn: &Connection, schedule: &NotificationSchedule, now: DateTime<Utc>) -> Result<()> {
    let next = match (schedule.recurring, schedule.recurring_pattern) {
        (true, Some(pattern)) => DateTime::parse_from_rfc3339(&schedule.scheduled_time)
            .ok()
            .and_then(|at| next_run_after(at.with_timezone(&Utc), pattern))
            .map(|at| (at, next_run_after(at, pattern))),
        _ => None,
    };
    match next {
        Some((at, following)) => conn.execute(
            "UPDATE notification_schedules SET scheduled_time = ?1, next_run_at = ?2, last_sent_at = ?3 \
             WHERE id = ?4",
            params![timestamp(at), following.map(timestamp), timestamp(now), schedule.id],
        )?,
        None => conn.execute(
            "UPDATE notification_schedules SET status = 'sent', last_sent_at = ?1 WHERE id = ?2",
            params![timestamp(now), schedule.id],
        )?,
    };
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub schedule_id: String,
    pub user_id: String,
    pub partner_id: Option<String>,
    pub kind: NotificationKind,
    pub message: String,
}

/// Send every due notification. Messages with a partner are stored as the
/// partner's chat message; morning greetings without text get a template.
pub fn deliver_due(conn: &Connection, now: DateTime<Utc>, limit: usize, rng: &mut impl Rng) -> Result<Vec<Delivery>> {
    let mut delivered = Vec::new();
    for schedule in due_schedules(conn, now, limit)? {
        let message = match (&schedule.message, schedule.kind) {
            (Some(text), _) => text.clone(),
            (None, NotificationKind::MorningGreeting) => morning_greeting(rng).to_string(),
            (None, NotificationKind::SpecialDay) => "今日は特別な日だね。一緒にお祝いしよう❤️".to_string(),
            (None, _) => "そろそろ話そうよ。待ってるね".to_string(),
        };

        let stored = match schedule.partner_id {
            Some(ref partner_id) => insert_message(
                conn,
                partner_id,
                &message,
                MessageSender::Partner,
                None,
                &json!({ "notification": schedule.kind.as_str(), "scheduleId": schedule.id }),
            )
            .map(|_| ()),
            None => Ok(()),
        };
        if let Err(e) = stored {
            tracing::warn!(schedule_id = %schedule.id, error = %e, "notification delivery failed");
            conn.execute(
                "UPDATE notification_schedules SET status = 'failed' WHERE id = ?1",
                params![schedule.id],
            )?;
            continue;
        }

        mark_sent(conn, &schedule, now)?;
        delivered.push(Delivery {
            schedule_id: schedule.id,
            user_id: schedule.user_id,
            partner_id: schedule.partner_id,
            kind: schedule.kind,
            message,
        });
    }
    if !delivered.is_empty() {
        tracing::info!(count = delivered.len(), "notifications delivered");
    }
    Ok(delivered)
}

/// A template greeting from the user's partner.
pub fn morning_greeting_message(
    conn: &Connection,
    user_id: &str,
    partner_id: &str,
    rng: &mut impl Rng,
) -> Result<String> {
    let partner = get_partner(conn, partner_id, user_id)?;
    let message = morning_greeting(rng);
    tracing::debug!(partner = %partner.name, message, "morning greeting chosen");
    Ok(message.to_string())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GreetingTarget {
    pub user_id: String,
    pub partner_id: String,
    pub user_name: String,
    pub partner_name: String,
}

/// Users with the morning greeting on at `time` who have a partner.
pub fn morning_greeting_targets(conn: &Connection, time: &str) -> Result<Vec<GreetingTarget>> {
    let time = normalize_time(time)?;
    let mut stmt = conn.prepare(
        "SELECT n.user_id, p.id, COALESCE(NULLIF(TRIM(u.nickname), ''), NULLIF(TRIM(u.first_name), ''), 'あなた'), p.name \
         FROM notification_settings n \
         JOIN users u ON u.id = n.user_id \
         JOIN partners p ON p.user_id = n.user_id \
         WHERE n.morning_greeting = 1 AND n.morning_time = ?1 \
         ORDER BY n.user_id",
    )?;
    let targets = stmt
        .query_map(params![time], |row| {
            Ok(GreetingTarget {
                user_id: row.get(0)?,
                partner_id: row.get(1)?,
                user_name: row.get(2)?,
                partner_name: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(targets)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeCount {
    pub time: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total_users: u64,
    pub morning_greeting_enabled: u64,
    pub reminder_enabled: u64,
    pub special_days_enabled: u64,
    /// Top five greeting times among users with the greeting on.
    pub popular_morning_times: Vec<TimeCount>,
}

pub fn notification_stats(conn: &Connection) -> Result<NotificationStats> {
    let (total_users, morning_greeting_enabled, reminder_enabled, special_days_enabled) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(morning_greeting), 0), COALESCE(SUM(reminder_messages), 0), \
                COALESCE(SUM(special_days), 0) \
         FROM notification_settings",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT morning_time, COUNT(*) AS n FROM notification_settings \
         WHERE morning_greeting = 1 GROUP BY morning_time ORDER BY n DESC, morning_time ASC LIMIT 5",
    )?;
    let popular_morning_times = stmt
        .query_map([], |row| {
            Ok(TimeCount {
                time: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NotificationStats {
        total_users,
        morning_greeting_enabled,
        reminder_enabled,
        special_days_enabled,
        popular_morning_times,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::user::{create_user, ProfileUpdate};

    #[test]
    fn defaults_are_created_once() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "n@example.com", &ProfileUpdate::default()).unwrap();

        let settings = get_or_create_notification_settings(&conn, &user.id).unwrap();
        assert!(settings.morning_greeting);
        assert_eq!(settings.morning_time, "07:00");
        assert!(!settings.reminder_messages);
        assert!(settings.special_days);

        let stats = notification_stats(&conn).unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(
            stats.popular_morning_times,
            vec![TimeCount { time: "07:00".into(), count: 1 }]
        );
        assert!(get_or_create_notification_settings(&conn, "missing").is_err());
    }
}
