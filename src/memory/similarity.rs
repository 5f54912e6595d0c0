//! Cosine similarity.

/// Score given when either vector has zero or non-finite norm, or the
/// dimensions differ.
pub const MIN_SIMILARITY: f64 = -1.0;

/// `dot(a, b) / (|a| * |b|)`, clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return MIN_SIMILARITY;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() || !dot.is_finite() {
        return MIN_SIMILARITY;
    }
    (dot / denom).clamp(-1.0, 1.0)
}
