//! Cosine similarity and deterministic ranking.

use std::cmp::Ordering;

/// Returned when a similarity is undefined (zero norm, empty or mismatched
/// inputs). Lies at the bottom of the valid range so such vectors never win.
pub const UNDEFINED_SIMILARITY: f32 = -1.0;

/// Standard cosine similarity in `[-1, 1]`.
///
/// Returns [`UNDEFINED_SIMILARITY`] if either vector has zero norm, the
/// vectors are empty, or their lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return UNDEFINED_SIMILARITY;
    }
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return UNDEFINED_SIMILARITY;
    }
    let sim = dot / (na.sqrt() * nb.sqrt());
    if sim.is_nan() {
        return UNDEFINED_SIMILARITY;
    }
    sim.clamp(-1.0, 1.0) as f32
}

/// Orders `(position, score)` pairs by score descending, earlier position
/// first on ties, and keeps the best `k`.
pub fn top_k(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}
