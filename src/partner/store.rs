//! Partner persistence: create, read with ownership checks, update, delete.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::presets::{avatar_description, default_prompt, preset_for};
use super::validate::{validate_new_partner, validate_update};
use super::{NewPartner, Partner, PartnerUpdate, PersonalityType};
use crate::error::CompanionError;
use crate::relationship::apply_intimacy_change;
use crate::user::{self, ProfileUpdate};

const SELECT_COLUMNS: &str = "id, user_id, name, gender, personality_type, speech_style, system_prompt, \
     avatar_description, appearance, hobbies, intimacy_level, base_image_url, current_location_id, \
     created_at, updated_at";

fn not_found() -> anyhow::Error {
    CompanionError::NotFound("パートナーが見つかりません".into()).into()
}

fn already_created() -> anyhow::Error {
    CompanionError::Conflict(
        "既にパートナーが作成されています。既存のパートナーを編集してください。".into(),
    )
    .into()
}

/// Create the user's partner. A user may only have one.
pub fn create_partner(conn: &mut Connection, user_id: &str, new: NewPartner) -> Result<Partner> {
    let mut new = new;
    if new.system_prompt.trim().is_empty() {
        new.system_prompt = default_prompt(&new.name, new.personality_type, new.speech_style);
    }
    if new.avatar_description.trim().is_empty() {
        new.avatar_description = avatar_description(new.gender, &new.appearance);
    }
    validate_new_partner(&new)?;

    let tx = conn.transaction()?;
    user::require_user(&tx, user_id)?;
    if has_partner(&tx, user_id)? {
        return Err(already_created());
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO partners (id, user_id, name, gender, personality_type, speech_style, system_prompt, \
             avatar_description, appearance, hobbies, intimacy_level, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            id,
            user_id,
            new.name.trim(),
            new.gender.as_str(),
            new.personality_type.as_str(),
            new.speech_style.as_str(),
            new.system_prompt,
            new.avatar_description,
            serde_json::to_string(&new.appearance)?,
            serde_json::to_string(&new.hobbies)?,
            new.intimacy_level,
            now,
        ],
    )?;
    tx.commit()?;

    tracing::info!(
        partner_id = %id,
        user_id,
        personality = %new.personality_type,
        "partner created"
    );
    get_partner_by_id(conn, &id)?.ok_or_else(not_found)
}

/// Onboarding: store the user's names and create the partner with intimacy 0.
/// Without an explicit nickname the partner's name is stored in its place.
pub fn create_with_onboarding(
    conn: &mut Connection,
    user_id: &str,
    profile: ProfileUpdate,
    new: NewPartner,
) -> Result<Partner> {
    user::require_user(conn, user_id)?;
    if has_partner(conn, user_id)? {
        return Err(already_created());
    }

    let mut profile = profile;
    if profile.nickname.as_deref().map_or(true, |n| n.trim().is_empty()) {
        profile.nickname = Some(new.name.trim().to_string());
    }
    user::update_profile(conn, user_id, &profile)?;

    let mut new = new;
    new.intimacy_level = 0;
    create_partner(conn, user_id, new)
}

pub fn get_partner_by_id(conn: &Connection, partner_id: &str) -> Result<Option<Partner>> {
    let partner = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM partners WHERE id = ?1"),
            params![partner_id],
            row_to_partner,
        )
        .optional()?;
    Ok(partner)
}

/// Fetch a partner and verify it belongs to `user_id`.
pub fn get_partner(conn: &Connection, partner_id: &str, user_id: &str) -> Result<Partner> {
    match get_partner_by_id(conn, partner_id)? {
        Some(p) if p.user_id == user_id => Ok(p),
        _ => Err(not_found()),
    }
}

pub fn get_partner_for_user(conn: &Connection, user_id: &str) -> Result<Option<Partner>> {
    let partner = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM partners WHERE user_id = ?1"),
            params![user_id],
            row_to_partner,
        )
        .optional()?;
    Ok(partner)
}

pub fn has_partner(conn: &Connection, user_id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM partners WHERE user_id = ?1)",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn update_partner(
    conn: &Connection,
    partner_id: &str,
    user_id: &str,
    update: &PartnerUpdate,
) -> Result<Partner> {
    validate_update(update)?;
    let current = get_partner(conn, partner_id, user_id)?;

    let appearance = update.appearance.as_ref().unwrap_or(&current.appearance);
    let hobbies = update.hobbies.as_ref().unwrap_or(&current.hobbies);
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE partners SET name = ?1, personality_type = ?2, speech_style = ?3, system_prompt = ?4, \
             avatar_description = ?5, appearance = ?6, hobbies = ?7, intimacy_level = ?8, updated_at = ?9 \
         WHERE id = ?10",
        params![
            update.name.as_deref().map(str::trim).unwrap_or(&current.name),
            update.personality_type.unwrap_or(current.personality_type).as_str(),
            update.speech_style.unwrap_or(current.speech_style).as_str(),
            update.system_prompt.as_deref().unwrap_or(&current.system_prompt),
            update
                .avatar_description
                .as_deref()
                .unwrap_or(&current.avatar_description),
            serde_json::to_string(appearance)?,
            serde_json::to_string(hobbies)?,
            update.intimacy_level.unwrap_or(current.intimacy_level),
            now,
            partner_id,
        ],
    )?;
    tracing::info!(partner_id, "partner updated");
    get_partner(conn, partner_id, user_id)
}

pub fn delete_partner(conn: &Connection, partner_id: &str, user_id: &str) -> Result<()> {
    get_partner(conn, partner_id, user_id)?;
    conn.execute("DELETE FROM partners WHERE id = ?1", params![partner_id])?;
    tracing::info!(partner_id, "partner deleted");
    Ok(())
}

/// Overwrite personality, speech style and system prompt from a preset.
pub fn apply_preset(
    conn: &Connection,
    partner_id: &str,
    user_id: &str,
    personality: PersonalityType,
) -> Result<Partner> {
    let preset = preset_for(personality)
        .ok_or_else(|| CompanionError::validation("無効なプリセットタイプです"))?;
    let update = PartnerUpdate {
        personality_type: Some(preset.personality),
        speech_style: Some(preset.speech_style),
        system_prompt: Some(preset.system_prompt.to_string()),
        ..Default::default()
    };
    update_partner(conn, partner_id, user_id, &update)
}

/// Add `delta` to the intimacy level, clamped to 0..=100.
pub fn update_intimacy(
    conn: &Connection,
    partner_id: &str,
    user_id: &str,
    delta: i32,
) -> Result<Partner> {
    let partner = get_partner(conn, partner_id, user_id)?;
    let level = apply_intimacy_change(partner.intimacy_level, delta);
    set_intimacy(conn, partner_id, level)?;
    get_partner(conn, partner_id, user_id)
}

pub(crate) fn set_intimacy(conn: &Connection, partner_id: &str, level: u8) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows = conn.execute(
        "UPDATE partners SET intimacy_level = ?1, updated_at = ?2 WHERE id = ?3",
        params![level, now, partner_id],
    )?;
    if rows == 0 {
        return Err(not_found());
    }
    tracing::debug!(partner_id, intimacy = level, "intimacy updated");
    Ok(())
}

pub(crate) fn set_location(conn: &Connection, partner_id: &str, location_id: &str) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows = conn.execute(
        "UPDATE partners SET current_location_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![location_id, now, partner_id],
    )?;
    if rows == 0 {
        return Err(not_found());
    }
    Ok(())
}

pub fn update_base_image(
    conn: &Connection,
    partner_id: &str,
    user_id: &str,
    image_url: &str,
) -> Result<Partner> {
    get_partner(conn, partner_id, user_id)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE partners SET base_image_url = ?1, updated_at = ?2 WHERE id = ?3",
        params![image_url, now, partner_id],
    )?;
    get_partner(conn, partner_id, user_id)
}

fn row_to_partner(row: &Row<'_>) -> rusqlite::Result<Partner> {
    let parse_err = |_| rusqlite::Error::InvalidQuery;
    let gender: String = row.get(3)?;
    let personality: String = row.get(4)?;
    let speech: String = row.get(5)?;
    let appearance: String = row.get(8)?;
    let hobbies: String = row.get(9)?;
    Ok(Partner {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        gender: gender.parse().map_err(parse_err)?,
        personality_type: personality.parse().map_err(parse_err)?,
        speech_style: speech.parse().map_err(parse_err)?,
        system_prompt: row.get(6)?,
        avatar_description: row.get(7)?,
        appearance: serde_json::from_str(&appearance).unwrap_or_default(),
        hobbies: serde_json::from_str(&hobbies).unwrap_or_default(),
        intimacy_level: row.get(10)?,
        base_image_url: row.get(11)?,
        current_location_id: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}
