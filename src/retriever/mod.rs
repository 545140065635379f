
use tracing::debug;

use crate::{QaError, Result};

/// Cosine similarity between two equal-length vectors, in [-1, 1].
///
/// A zero-magnitude vector has no direction; any comparison against one
/// scores 0.0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Select the index of the chunk vector most similar to the question
/// vector.
///
/// Ties break to the lowest index. Only the index is returned; callers
/// that need the score must compute it separately.
#[inline]
pub fn select_best(question_vector: &[f32], chunk_vectors: &[Vec<f32>]) -> Result<usize> {
    if chunk_vectors.is_empty() {
        return Err(QaError::EmptyCandidateSet);
    }

    let expected = question_vector.len();
    for chunk_vector in chunk_vectors {
        if chunk_vector.len() != expected {
            return Err(QaError::DimensionMismatch {
                expected,
                actual: chunk_vector.len(),
            });
        }
    }

    let mut best_index = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (index, chunk_vector) in chunk_vectors.iter().enumerate() {
        // Strict comparison keeps the first occurrence on ties.
        let score = cosine_similarity(question_vector, chunk_vector);
        if score > best_score {
            best_index = index;
            best_score = score;
        }
    }

    debug!(
        "Selected chunk {} of {} (similarity {:.4})",
        best_index,
        chunk_vectors.len(),
        best_score
    );

    Ok(best_index)
}
