//! CLI `reset` command.

use anyhow::{bail, Result};
use rusqlite::params;
use std::io::Write;

use koibito::config::KoibitoConfig;
use koibito::db::{check_database_health, open_database};

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}\nType YES to confirm: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == "YES")
}

/// Delete one user (partner data follows through cascades) or, without
/// `user_id`, every row in the database.
pub fn reset(config: &KoibitoConfig, user_id: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = open_database(&db_path)?;
    let before = check_database_health(&conn)?;

    let scope = match user_id {
        Some(id) => format!("user {id} with their partner, messages, memories and images"),
        None => format!(
            "ALL {} users, {} messages, {} memories and {} images",
            before.user_count, before.message_count, before.memory_count, before.image_count
        ),
    };
    println!("Database: {}", db_path.display());
    if !confirm(&format!("WARNING: this permanently deletes {scope}."))? {
        bail!("reset cancelled");
    }

    match user_id {
        Some(id) => {
            if conn.execute("DELETE FROM users WHERE id = ?1", params![id])? == 0 {
                bail!("user {id} not found");
            }
        }
        // Users cascade to every partner-owned table.
        None => conn.execute_batch("DELETE FROM users; DELETE FROM memory_log;")?,
    }

    let after = check_database_health(&conn)?;
    tracing::info!(user_id = ?user_id, "database reset");
    println!(
        "Deleted {} users, {} messages, {} memories.",
        before.user_count - after.user_count,
        before.message_count - after.message_count,
        before.memory_count - after.memory_count,
    );
    Ok(())
}
