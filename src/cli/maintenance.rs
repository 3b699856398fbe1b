//! CLI `maintenance` command: memory and message retention.

use anyhow::Result;

use koibito::db::with_conn;
use koibito::memory::maintenance::{cleanup_expired_memories, purge_expired_messages};
use koibito::state::AppState;

/// Delete expired memories and messages past each user's retention period.
pub async fn run(state: &AppState, dry_run: bool) -> Result<()> {
    let delete_after_days = state.config.memory.delete_after_days;
    let (memories, messages) = with_conn(&state.db, move |conn| {
        let now = chrono::Utc::now();
        let memories = cleanup_expired_memories(conn, delete_after_days, dry_run, now)?;
        let messages = purge_expired_messages(conn, dry_run, now)?;
        Ok((memories, messages))
    })
    .await?;

    if memories.candidates.is_empty() {
        println!("No expired memories found.");
    } else if dry_run {
        println!(
            "Found {} expired memory(ies) (dry run, nothing deleted):\n",
            memories.candidates.len()
        );
        println!("{:<38} {:<14} {:<4} {}", "ID", "Type", "Imp", "Preview");
        println!("{}", "-".repeat(90));
        for c in &memories.candidates {
            println!(
                "{:<38} {:<14} {:<4} {}",
                c.id, c.memory_type, c.importance, c.content_preview
            );
        }
    } else {
        println!("Deleted {} expired memories.", memories.deleted);
    }

    if dry_run {
        println!(
            "{} message(s) past retention across {} user(s) (dry run).",
            messages.messages_deleted, messages.users_checked
        );
    } else {
        println!(
            "Deleted {} message(s) past retention across {} user(s).",
            messages.messages_deleted, messages.users_checked
        );
    }
    Ok(())
}
