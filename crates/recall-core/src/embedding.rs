//! Vector math and the persisted vector encoding.
//!
//! Vectors are stored as a JSON array of decimal floats. `serde_json`
//! writes each `f32` in its shortest round-trip form, so decoding yields
//! bit-identical values and position ↔ index is preserved.

use tracing::warn;

use crate::error::{RecallError, Result};

/// Encode a vector for storage.
///
/// ```rust
/// use recall_core::embedding::{encode_vector, decode_vector};
///
/// let v = vec![0.5f32, -0.25, 0.0];
/// let text = encode_vector(&v);
/// assert_eq!(text, "[0.5,-0.25,0.0]");
/// assert_eq!(decode_vector(&text).unwrap(), v);
/// ```
pub fn encode_vector(vec: &[f32]) -> String {
    serde_json::to_string(vec).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a stored vector, reporting [`RecallError::MalformedVector`] on
/// anything that is not a JSON array of finite numbers.
pub fn decode_vector(text: &str) -> Result<Vec<f32>> {
    let vec: Vec<f32> =
        serde_json::from_str(text).map_err(|e| RecallError::MalformedVector(e.to_string()))?;
    if vec.iter().any(|x| !x.is_finite()) {
        return Err(RecallError::MalformedVector(
            "non-finite component".to_string(),
        ));
    }
    Ok(vec)
}

/// Decode a stored vector, falling back to an empty vector when it is
/// malformed. Callers treat the empty vector as unrepresentable.
pub fn parse_vector_or_default(text: &str) -> Vec<f32> {
    match decode_vector(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("{}; treating as empty vector", e);
            Vec::new()
        }
    }
}

/// Dot product. Returns `0.0` for vectors of different lengths.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum::<f64>() as f32
}

/// Euclidean norm.
pub fn norm(v: &[f32]) -> f32 {
    v.iter()
        .map(|x| *x as f64 * *x as f64)
        .sum::<f64>()
        .sqrt() as f32
}

/// True if every component is exactly zero (or the vector is empty).
pub fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Scale `v` to unit length in place. A zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let magnitude = v.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    if magnitude > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / magnitude) as f32;
        }
    }
}

/// Compute cosine similarity between two vectors of arbitrary length.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or a zero vector on either side. For unit vectors
/// produced by the same model this equals [`dot`].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let denom = norm(a) * norm(b);
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot(a, b) / denom).clamp(-1.0, 1.0)
}
