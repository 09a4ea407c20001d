//! Cosine similarity between embeddings and its 0-100 presentation score.

use crate::errors::ScoreError;

/// Cosine similarity of two equal-length vectors.
///
/// Lengths are checked before any arithmetic. A zero-magnitude vector scores
/// a similarity of 0 instead of dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, ScoreError> {
    if a.len() != b.len() {
        return Err(ScoreError::DimensionMismatch {
            a: a.len(),
            b: b.len(),
        });
    }
    if a.is_empty() {
        return Err(ScoreError::EmptyVector);
    }

    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }

    if na == 0.0 || nb == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (na.sqrt() * nb.sqrt()))
}

/// Maps a cosine similarity in [-1, 1] onto an integer percentage in [0, 100],
/// rounding half up.
pub fn similarity_to_percent(similarity: f64) -> u8 {
    let clamped = similarity.clamp(-1.0, 1.0);
    let pct = ((clamped + 1.0) / 2.0) * 100.0;
    // pct is non-negative, so floor(x + 0.5) is round-half-up.
    (pct + 0.5).floor().min(100.0) as u8
}

/// Similarity score presented to players.
pub fn score(a: &[f32], b: &[f32]) -> Result<u8, ScoreError> {
    cosine_similarity(a, b).map(similarity_to_percent)
}
