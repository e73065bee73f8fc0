//! Similarity functions shared by the graph search and the brute-force
//! fallback path. All scores are normalized to "higher = more similar",
//! single-threaded for determinism, and never implicitly normalize their
//! inputs — callers are responsible for the unit-norm invariant (§3).

use vgdb_core::DistanceMetric;

/// Compute the similarity score between two vectors under `metric`.
pub fn compute_similarity(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in similarity computation");
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Euclidean => euclidean_similarity(a, b),
        DistanceMetric::Manhattan => manhattan_similarity(a, b),
        DistanceMetric::Dot => dot_product(a, b),
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn euclidean_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dist = euclidean_distance(a, b);
    1.0 / (1.0 + dist)
}

fn manhattan_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dist: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
    1.0 / (1.0 + dist)
}

/// Dot product. Unbounded; meaningful only on pre-normalized vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}
