//! Users, their display names and their settings.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::CompanionError;

pub const MIN_RETENTION_DAYS: u32 = 30;
/// A retention period this long means messages are never purged.
pub const KEEP_FOREVER_DAYS: u32 = 9999;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub nickname: Option<String>,
    pub birthday: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Name used when the partner talks about the user in generated prompts:
    /// nickname, then first name, then a neutral "あなた".
    pub fn display_name(&self) -> &str {
        [&self.nickname, &self.first_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
            .unwrap_or("あなた")
    }
}

/// Partial profile update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub nickname: Option<String>,
    pub birthday: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            _ => Err(format!("unknown ai provider: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiModelSettings {
    pub provider: AiProvider,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for AiModelSettings {
    fn default() -> Self {
        Self {
            provider: AiProvider::OpenAi,
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub theme: String,
    pub background_image: String,
    pub sound_enabled: bool,
    pub auto_save: bool,
    pub data_retention_days: u32,
    pub ai_model: AiModelSettings,
}

impl UserSettings {
    fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            theme: "light".into(),
            background_image: "default".into(),
            sound_enabled: true,
            auto_save: true,
            data_retention_days: 365,
            ai_model: AiModelSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub theme: Option<String>,
    pub background_image: Option<String>,
    pub sound_enabled: Option<bool>,
    pub auto_save: Option<bool>,
    pub data_retention_days: Option<u32>,
    pub ai_model: Option<AiModelSettings>,
}

pub fn create_user(conn: &Connection, email: &str, profile: &ProfileUpdate) -> Result<User> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![email],
        |row| row.get(0),
    )?;
    if exists {
        return Err(CompanionError::Conflict(format!("email already registered: {email}")).into());
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (id, email, surname, first_name, nickname, birthday, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            id,
            email,
            profile.surname,
            profile.first_name,
            profile.nickname,
            profile.birthday,
            now
        ],
    )?;
    tracing::info!(user_id = %id, "user created");
    require_user(conn, &id)
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, surname, first_name, nickname, birthday, created_at, updated_at \
             FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    surname: row.get(2)?,
                    first_name: row.get(3)?,
                    nickname: row.get(4)?,
                    birthday: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Like [`get_user`] but a missing user is a `NotFound` error.
pub fn require_user(conn: &Connection, user_id: &str) -> Result<User> {
    get_user(conn, user_id)?
        .ok_or_else(|| CompanionError::NotFound("ユーザーが見つかりません".into()).into())
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let id: Option<String> = conn
        .query_row("SELECT id FROM users WHERE email = ?1", params![email], |row| row.get(0))
        .optional()?;
    match id {
        Some(id) => get_user(conn, &id),
        None => Ok(None),
    }
}

pub fn update_profile(conn: &Connection, user_id: &str, update: &ProfileUpdate) -> Result<User> {
    require_user(conn, user_id)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET \
             surname = COALESCE(?1, surname), \
             first_name = COALESCE(?2, first_name), \
             nickname = COALESCE(?3, nickname), \
             birthday = COALESCE(?4, birthday), \
             updated_at = ?5 \
         WHERE id = ?6",
        params![
            update.surname,
            update.first_name,
            update.nickname,
            update.birthday,
            now,
            user_id
        ],
    )?;
    require_user(conn, user_id)
}

/// Settings for a user, created with defaults on first access.
pub fn get_or_create_settings(conn: &Connection, user_id: &str) -> Result<UserSettings> {
    if let Some(settings) = load_settings(conn, user_id)? {
        return Ok(settings);
    }
    require_user(conn, user_id)?;

    let settings = UserSettings::defaults_for(user_id);
    save_settings(conn, &settings)?;
    tracing::debug!(user_id, "default settings created");
    Ok(settings)
}

pub fn update_settings(
    conn: &Connection,
    user_id: &str,
    update: &SettingsUpdate,
) -> Result<UserSettings> {
    let mut settings = get_or_create_settings(conn, user_id)?;
    if let Some(ref theme) = update.theme {
        settings.theme = theme.clone();
    }
    if let Some(ref bg) = update.background_image {
        settings.background_image = bg.clone();
    }
    if let Some(sound) = update.sound_enabled {
        settings.sound_enabled = sound;
    }
    if let Some(auto_save) = update.auto_save {
        settings.auto_save = auto_save;
    }
    if let Some(days) = update.data_retention_days {
        if !(MIN_RETENTION_DAYS..=KEEP_FOREVER_DAYS).contains(&days) {
            return Err(CompanionError::validation(
                "データ保持期間は30日から9999日の間で指定してください",
            )
            .into());
        }
        settings.data_retention_days = days;
    }
    if let Some(ref ai) = update.ai_model {
        if !(0.0..=2.0).contains(&ai.temperature) {
            return Err(CompanionError::validation("temperature must be between 0.0 and 2.0").into());
        }
        settings.ai_model = ai.clone();
    }
    save_settings(conn, &settings)?;
    Ok(settings)
}

fn load_settings(conn: &Connection, user_id: &str) -> Result<Option<UserSettings>> {
    let settings = conn
        .query_row(
            "SELECT user_id, theme, background_image, sound_enabled, auto_save, data_retention_days, \
                    ai_provider, ai_model, ai_temperature, ai_max_tokens \
             FROM user_settings WHERE user_id = ?1",
            params![user_id],
            |row| {
                let provider: String = row.get(6)?;
                Ok(UserSettings {
                    user_id: row.get(0)?,
                    theme: row.get(1)?,
                    background_image: row.get(2)?,
                    sound_enabled: row.get(3)?,
                    auto_save: row.get(4)?,
                    data_retention_days: row.get(5)?,
                    ai_model: AiModelSettings {
                        provider: provider.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
                        model: row.get(7)?,
                        temperature: row.get(8)?,
                        max_tokens: row.get(9)?,
                    },
                })
            },
        )
        .optional()?;
    Ok(settings)
}

fn save_settings(conn: &Connection, s: &UserSettings) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO user_settings (user_id, theme, background_image, sound_enabled, auto_save, \
             data_retention_days, ai_provider, ai_model, ai_temperature, ai_max_tokens, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11) \
         ON CONFLICT(user_id) DO UPDATE SET \
             theme = excluded.theme, background_image = excluded.background_image, \
             sound_enabled = excluded.sound_enabled, auto_save = excluded.auto_save, \
             data_retention_days = excluded.data_retention_days, ai_provider = excluded.ai_provider, \
             ai_model = excluded.ai_model, ai_temperature = excluded.ai_temperature, \
             ai_max_tokens = excluded.ai_max_tokens, updated_at = excluded.updated_at",
        params![
            s.user_id,
            s.theme,
            s.background_image,
            s.sound_enabled,
            s.auto_save,
            s.data_retention_days,
            s.ai_model.provider.as_str(),
            s.ai_model.model,
            s.ai_model.temperature,
            s.ai_model.max_tokens,
            now
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn create_and_update_profile() {
        let conn = open_memory_database().unwrap();
        let user = create_user(
            &conn,
            "hana@example.com",
            &ProfileUpdate {
                surname: Some("山田".into()),
                first_name: Some("花子".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(user.display_name(), "花子");

        let updated = update_profile(
            &conn,
            &user.id,
            &ProfileUpdate {
                nickname: Some("はなちゃん".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.nickname.as_deref(), Some("はなちゃん"));
        assert_eq!(updated.surname.as_deref(), Some("山田"));
        assert_eq!(updated.display_name(), "はなちゃん");
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let conn = open_memory_database().unwrap();
        create_user(&conn, "a@example.com", &ProfileUpdate::default()).unwrap();
        let err = create_user(&conn, "a@example.com", &ProfileUpdate::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompanionError>(),
            Some(CompanionError::Conflict(_))
        ));
    }

    #[test]
    fn lookup_by_email() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "c@example.com", &ProfileUpdate::default()).unwrap();
        let found = find_user_by_email(&conn, "c@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(find_user_by_email(&conn, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn display_name_falls_back() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "b@example.com", &ProfileUpdate::default()).unwrap();
        assert_eq!(user.display_name(), "あなた");
    }

    #[test]
    fn settings_default_then_update() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "c@example.com", &ProfileUpdate::default()).unwrap();

        let settings = get_or_create_settings(&conn, &user.id).unwrap();
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.data_retention_days, 365);
        assert_eq!(settings.ai_model, AiModelSettings::default());

        let updated = update_settings(
            &conn,
            &user.id,
            &SettingsUpdate {
                theme: Some("dark".into()),
                ai_model: Some(AiModelSettings {
                    provider: AiProvider::Anthropic,
                    model: "claude-3-5-haiku-latest".into(),
                    temperature: 0.7,
                    max_tokens: 1000,
                }),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.theme, "dark");

        let reloaded = get_or_create_settings(&conn, &user.id).unwrap();
        assert_eq!(reloaded.ai_model.provider, AiProvider::Anthropic);
        assert_eq!(reloaded.ai_model.max_tokens, 1000);
        assert!(reloaded.sound_enabled);
    }

    #[test]
    fn settings_for_missing_user_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_or_create_settings(&conn, "nope").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompanionError>(),
            Some(CompanionError::NotFound(_))
        ));
    }
}
