pub mod cross_encoder;

pub use cross_encoder::CrossEncoderReranker;

use anyhow::{ensure, Result};

use crate::types::LawChunk;

/// Scores (query, document) pairs. Higher is more relevant.
pub trait Reranker: Send + Sync {
    /// One score per document, aligned with `documents`.
    fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>>;
}

/// Order candidates by descending reranker score and keep the first `final_k`.
///
/// The sort is stable, so equal scores keep candidate order. NaN scores rank last.
pub fn rerank_chunks(
    reranker: &dyn Reranker,
    query: &str,
    candidates: Vec<LawChunk>,
    final_k: usize,
) -> Result<Vec<LawChunk>> {
    if candidates.is_empty() || final_k == 0 {
        return Ok(Vec::new());
    }

    let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
    let scores = reranker.score(query, &texts)?;
    ensure!(
        scores.len() == candidates.len(),
        "Reranker returned {} scores for {} candidates",
        scores.len(),
        candidates.len()
    );

    let mut scored: Vec<(f32, LawChunk)> = scores
        .into_iter()
        .map(|s| if s.is_nan() { f32::NEG_INFINITY } else { s })
        .zip(candidates)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(final_k);

    Ok(scored.into_iter().map(|(_, chunk)| chunk).collect())
}
