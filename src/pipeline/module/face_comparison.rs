use ndarray::Array1;

/// Cosine similarity between two embeddings: dot product over the product of
/// norms, in [-1, 1]. A zero-norm vector yields 0 rather than NaN.
pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let norms = a.dot(a).sqrt() * b.dot(b).sqrt();
    if norms == 0.0 {
        return 0.0;
    }
    a.dot(b) / norms
}

/// Map a cosine similarity to the response percentage, rounded to 2 decimal
/// places.
pub fn similarity_percentage(similarity: f32) -> f64 {
    (similarity as f64 * 100.0 * 100.0).round() / 100.0
}
