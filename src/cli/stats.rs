use anyhow::Result;

use koibito::config::KoibitoConfig;
use koibito::memory::types::MemoryType;

/// Display memory statistics in the terminal.
pub fn stats(config: &KoibitoConfig, partner: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = koibito::db::open_database(&db_path)?;

    let response = koibito::memory::stats::memory_stats(&conn, partner, Some(&db_path))?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    if let Some(partner) = partner {
        println!("  Partner:             {partner}");
    }
    println!("  Total memories:      {}", response.total_memories);
    println!("  Average importance:  {:.1}", response.average_importance);
    println!("  Episodes:            {}", response.episodes);
    println!();

    println!("By Type:");
    for t in MemoryType::ALL {
        let count = response.by_type.get(t.as_str()).copied().unwrap_or(0);
        println!("  {:<14} {}", t, count);
    }
    println!();

    println!("Audit log entries:     {}", response.audit_entries);
    println!("Database size:         {} bytes", response.db_size_bytes);

    if let Some(ref oldest) = response.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = response.newest_memory {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
