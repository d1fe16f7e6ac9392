//! Vector similarity utilities.

use slashgpt_core::index::IndexMatch;

use crate::in_memory::IndexedPassage;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank passages by cosine similarity to a query embedding.
///
/// Returns up to `top_k` matches sorted by descending similarity. Ties keep
/// insertion order. The passage text is exposed under the `text` metadata key
/// when `include_metadata` is set.
pub fn rank_passages(
    passages: &[IndexedPassage],
    query_embedding: &[f32],
    top_k: usize,
    include_metadata: bool,
) -> Vec<IndexMatch> {
    let mut scored: Vec<(f32, &IndexedPassage)> = passages
        .iter()
        .map(|p| (cosine_similarity(&p.embedding, query_embedding), p))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(score, p)| {
            let mut metadata = serde_json::Map::new();
            if include_metadata {
                metadata.insert("text".into(), serde_json::Value::String(p.text.clone()));
            }
            IndexMatch {
                id: p.id.clone(),
                score,
                metadata,
            }
        })
        .collect()
}
