//! The partner's picture of the user's character: up to five strengths, up to
//! five shadows and up to three core values.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::types::{PersonalityMemory, PersonalityTrait, TraitKind};

pub const DEFAULT_MAX_TRAITS: usize = 5;
pub const MAX_CORE_VALUES: usize = 3;

pub fn get_personality(conn: &Connection, partner_id: &str) -> Result<Option<PersonalityMemory>> {
    let row = conn
        .query_row(
            "SELECT strengths, shadows, core_values, last_updated FROM personality_memories \
             WHERE partner_id = ?1",
            params![partner_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((strengths, shadows, core_values, last_updated)) = row else {
        return Ok(None);
    };
    Ok(Some(PersonalityMemory {
        partner_id: partner_id.to_string(),
        strengths: serde_json::from_str(&strengths).unwrap_or_default(),
        shadows: serde_json::from_str(&shadows).unwrap_or_default(),
        core_values: serde_json::from_str(&core_values).unwrap_or_default(),
        last_updated,
    }))
}

fn save(conn: &Connection, memory: &PersonalityMemory) -> Result<()> {
    conn.execute(
        "INSERT INTO personality_memories (partner_id, strengths, shadows, core_values, last_updated) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(partner_id) DO UPDATE SET strengths = ?2, shadows = ?3, core_values = ?4, \
             last_updated = ?5",
        params![
            memory.partner_id,
            serde_json::to_string(&memory.strengths)?,
            serde_json::to_string(&memory.shadows)?,
            serde_json::to_string(&memory.core_values)?,
            memory.last_updated,
        ],
    )?;
    Ok(())
}

/// Merge a newly observed trait into a bounded list.
///
/// A trait already present gains one importance (capped at 10) and one
/// frequency, keeping its old example/context when the new one has none.
/// Otherwise it is appended while there is room, or replaces the least
/// important trait if it outranks it. The list is kept sorted by importance.
pub fn merge_trait(
    traits: &mut Vec<PersonalityTrait>,
    new: PersonalityTrait,
    max_traits: usize,
    now: &str,
) {
    if let Some(idx) = traits.iter().position(|t| t.name == new.name) {
        let existing = &mut traits[idx];
        existing.importance = (existing.importance + 1).min(10);
        existing.frequency += 1;
        existing.last_seen = now.to_string();
        if new.example.is_some() {
            existing.example = new.example;
        }
        if new.context.is_some() {
            existing.context = new.context;
        }
    } else if traits.len() < max_traits {
        traits.push(PersonalityTrait {
            frequency: 1,
            last_seen: now.to_string(),
            ..new
        });
    } else if let Some(idx) = lowest_importance(traits) {
        if new.importance > traits[idx].importance {
            traits[idx] = PersonalityTrait {
                frequency: 1,
                last_seen: now.to_string(),
                ..new
            };
        }
    }
    traits.sort_by(|a, b| b.importance.cmp(&a.importance));
}

/// Index of the first trait with the lowest importance.
fn lowest_importance(traits: &[PersonalityTrait]) -> Option<usize> {
    traits
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, u8)>, (i, t)| match best {
            Some((_, imp)) if imp <= t.importance => best,
            _ => Some((i, t.importance)),
        })
        .map(|(i, _)| i)
}

pub fn add_trait(
    conn: &Connection,
    partner_id: &str,
    kind: TraitKind,
    new: PersonalityTrait,
    max_traits: usize,
) -> Result<PersonalityMemory> {
    let now = chrono::Utc::now().to_rfc3339();
    let mut memory = get_personality(conn, partner_id)?.unwrap_or_else(|| PersonalityMemory {
        partner_id: partner_id.to_string(),
        ..Default::default()
    });

    let traits = match kind {
        TraitKind::Strength => &mut memory.strengths,
        TraitKind::Shadow => &mut memory.shadows,
    };
    merge_trait(traits, new, max_traits, &now);
    memory.last_updated = now;

    save(conn, &memory)?;
    tracing::debug!(partner_id, ?kind, "personality trait recorded");
    Ok(memory)
}

/// Replace the core values, keeping only the first three.
pub fn update_core_values(
    conn: &Connection,
    partner_id: &str,
    values: &[String],
) -> Result<PersonalityMemory> {
    let mut memory = get_personality(conn, partner_id)?.unwrap_or_else(|| PersonalityMemory {
        partner_id: partner_id.to_string(),
        ..Default::default()
    });
    memory.core_values = values.iter().take(MAX_CORE_VALUES).cloned().collect();
    memory.last_updated = chrono::Utc::now().to_rfc3339();
    save(conn, &memory)?;
    Ok(memory)
}
