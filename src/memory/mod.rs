//! Long-term memory about the user: storage, relevance search, personality
//! traits, episodes, ongoing topics, summaries and retention.

pub mod episodes;
pub mod maintenance;
pub mod personality;
pub mod search;
pub mod stats;
pub mod store;
pub mod summary;
pub mod topics;
pub mod types;

/// Serialize an embedding as little-endian f32 bytes for the `embedding` BLOB.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`embedding_to_bytes`]. Trailing bytes that do not form a whole
/// f32 are ignored.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}

/// Truncate to `max_chars` characters, appending "..." if truncated.
pub(crate) fn truncate(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_bytes_round_trip() {
        let v = vec![0.25f32, -1.5, 3.0];
        let bytes = embedding_to_bytes(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes), v);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("こんにちは", 3), "こんに...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
