//! Relevance search over a partner's memories.
//!
//! Candidates come from SQLite; scoring blends vector similarity with
//! substring, tag and importance signals:
//!
//! `cosine * 0.6 + 0.3 (content contains query) + tag_ratio * 0.1 + importance / 10 * 0.1`
//!
//! Memories scoring at or below [`MIN_RELEVANCE`] are dropped. When the query
//! could not be embedded the cosine term is simply zero.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use super::cosine_similarity;
use super::store::{find_by_importance_and_type, list_memories};
use super::types::{Memory, MemoryType};
use crate::db::with_conn;
use crate::embedding::embed_or_empty;
use crate::error::CompanionError;
use crate::partner::store::get_partner;
use crate::state::AppState;

pub const MIN_RELEVANCE: f64 = 0.1;
pub const MAX_QUERY_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// Empty means any type.
    pub types: Vec<MemoryType>,
    pub limit: usize,
    pub min_importance: u8,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            types: Vec::new(),
            limit: 20,
            min_importance: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub relevance: f64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ScoredMemory>,
    /// Matches above the threshold before truncation to `limit`.
    pub total_found: usize,
}

/// Score one memory against the query.
pub fn relevance(memory: &Memory, query: &str, query_embedding: &[f32]) -> f64 {
    let mut score = 0.0;

    if !memory.embedding.is_empty() && !query_embedding.is_empty() {
        score += cosine_similarity(&memory.embedding, query_embedding) * 0.6;
    }

    let query_lower = query.to_lowercase();
    if memory.content.to_lowercase().contains(&query_lower) {
        score += 0.3;
    }

    let words: Vec<&str> = query_lower.split_whitespace().collect();
    let tag_matches = memory
        .tags
        .iter()
        .filter(|tag| {
            let tag = tag.to_lowercase();
            words.iter().any(|w| tag.contains(w))
        })
        .count();
    score += tag_matches as f64 / memory.tags.len().max(1) as f64 * 0.1;

    score += f64::from(memory.importance) / 10.0 * 0.1;
    score
}

/// Search with a pre-computed query embedding (empty when unavailable).
///
/// With explicit types the candidates are the importance/type filter;
/// otherwise the latest 200 memories regardless of importance.
pub fn search_memories(
    conn: &Connection,
    partner_id: &str,
    request: &SearchRequest,
    query_embedding: &[f32],
    candidate_limit: usize,
) -> Result<SearchResponse> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(CompanionError::validation("検索クエリは必須です").into());
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(CompanionError::validation("検索クエリは500文字以内で入力してください").into());
    }

    let candidates = if request.types.is_empty() {
        list_memories(conn, partner_id, candidate_limit)?
    } else {
        find_by_importance_and_type(conn, partner_id, request.min_importance, &request.types)?
    };
    let candidate_count = candidates.len();

    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .map(|memory| {
            let relevance = relevance(&memory, query, query_embedding);
            ScoredMemory { memory, relevance }
        })
        .filter(|s| s.relevance > MIN_RELEVANCE)
        .collect();
    scored.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

    let total_found = scored.len();
    scored.truncate(request.limit);

    tracing::debug!(
        partner_id,
        candidates = candidate_count,
        matched = total_found,
        "memory search complete"
    );
    Ok(SearchResponse {
        results: scored,
        total_found,
    })
}

/// Ownership-checked search that embeds the query first.
pub async fn search(
    state: &AppState,
    user_id: &str,
    partner_id: &str,
    request: SearchRequest,
) -> Result<SearchResponse> {
    let query = request.query.trim();
    let embedding = if query.is_empty() {
        Vec::new()
    } else {
        embed_or_empty(state.embedder.as_ref(), query).await
    };
    let (uid, pid) = (user_id.to_string(), partner_id.to_string());
    let candidate_limit = state.config.memory.search_candidates;
    with_conn(&state.db, move |conn| {
        get_partner(conn, &pid, &uid)?;
        search_memories(conn, &pid, &request, &embedding, candidate_limit)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(content: &str, tags: &[&str], importance: u8, embedding: Vec<f32>) -> Memory {
        Memory {
            id: "m".into(),
            partner_id: "p".into(),
            memory_type: MemoryType::Preference,
            content: content.into(),
            embedding,
            importance,
            emotional_weight: 0.0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            related_people: vec![],
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn substring_match_and_importance() {
        let m = memory("ラーメンが大好き", &[], 10, vec![]);
        let score = relevance(&m, "ラーメン", &[]);
        assert!((score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn tag_ratio_counts_partial_matches() {
        let m = memory("別の話", &["Food", "travel"], 0, vec![]);
        let score = relevance(&m, "food", &[]);
        assert!((score - 0.05).abs() < 1e-9);
    }

    #[test]
    fn cosine_term_only_with_both_embeddings() {
        let m = memory("x", &[], 0, vec![1.0, 0.0]);
        assert!((relevance(&m, "zzz", &[1.0, 0.0]) - 0.6).abs() < 1e-9);
        assert_eq!(relevance(&m, "zzz", &[]), 0.0);
    }

    #[test]
    fn importance_alone_never_clears_threshold() {
        let m = memory("無関係", &[], 10, vec![]);
        assert!(relevance(&m, "検索", &[]) <= MIN_RELEVANCE);
    }
}
