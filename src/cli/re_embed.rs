//! CLI `re-embed` command: regenerate all embeddings with the current model.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use koibito::db::{self, with_conn};
use koibito::memory::store::update_embedding;
use koibito::state::AppState;

/// Re-embed every memory with the configured model and record it.
pub async fn re_embed(state: &AppState) -> Result<()> {
    let model = state.embedder.model_name().to_string();
    if model == "none" {
        bail!("embeddings are disabled; set [embedding] provider and an OpenAI API key first");
    }

    let memories: Vec<(String, String)> = with_conn(&state.db, |conn| {
        let mut stmt = conn.prepare("SELECT id, content FROM memories ORDER BY created_at")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await?;

    let total = memories.len();
    if total == 0 {
        println!("No memories to re-embed.");
        return Ok(());
    }

    println!("Re-embedding {total} memories with model '{model}'...");

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    for (id, content) in memories {
        let embedding = state
            .embedder
            .embed(&content)
            .await
            .with_context(|| format!("failed to embed memory {id}"))?;
        with_conn(&state.db, move |conn| update_embedding(conn, &id, &embedding)).await?;
        pb.inc(1);
    }

    pb.finish_and_clear();

    let stored = model.clone();
    with_conn(&state.db, move |conn| {
        db::migrations::set_embedding_model(conn, &stored)?;
        Ok(())
    })
    .await?;

    println!("Re-embedded {total} memories with model '{model}'.");
    Ok(())
}
