//! CLI `doctor` command: database diagnostics and configuration checks.

use anyhow::{Context, Result};

use koibito::config::KoibitoConfig;
use koibito::db;

pub fn doctor(config: &KoibitoConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `koibito init` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("koibito Health Report");
    println!("=====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Providers:");
    println!("  OpenAI key:      {}", configured(config.chat.openai_api_key.as_deref()));
    println!("  Anthropic key:   {}", configured(config.chat.anthropic_api_key.as_deref()));
    println!("  Leonardo key:    {}", configured(config.image.leonardo_api_key.as_deref()));
    println!("  Default model:   {}", config.chat.model);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {} ({})", config.embedding.model, config.embedding.provider);
    if let Some(ref stored) = report.embedding_model {
        if config.embedding.provider != "none" && stored != &config.embedding.model {
            println!("  WARNING: model mismatch! Run `koibito re-embed` to update vectors.");
        } else {
            println!("  Status:          OK");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Users:           {}", report.user_count);
    println!("  Partners:        {}", report.partner_count);
    println!("  Messages:        {}", report.message_count);
    println!("  Memories:        {}", report.memory_count);
    println!("  Images:          {}", report.image_count);
    println!("  Audit log:       {}", report.log_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or save what is readable per user: koibito export --user <id> > user.json");
    }

    Ok(())
}

fn configured(key: Option<&str>) -> &'static str {
    match key {
        Some(k) if !k.is_empty() => "set",
        _ => "missing",
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
