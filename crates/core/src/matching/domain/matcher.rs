use thiserror::Error;

use crate::matching::domain::fingerprint::{Fingerprint, FingerprintScheme};
use crate::shared::constants::{
    DEFAULT_EMBEDDING_THRESHOLD, DEFAULT_HAMMING_GATE, DEFAULT_LANDMARK_THRESHOLD,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("cannot compare {left} fingerprint against {right} fingerprint")]
    VariantMismatch {
        left: FingerprintScheme,
        right: FingerprintScheme,
    },
    #[error("embedding length mismatch: {left} vs {right}")]
    VectorLengthMismatch { left: usize, right: usize },
    #[error("hash length mismatch: {left} vs {right}")]
    HashLengthMismatch { left: usize, right: usize },
}

/// Similarity policy for one deployment: the variant in use plus its
/// thresholds.
#[derive(Clone, Copy, Debug)]
pub struct MatchConfig {
    pub scheme: FingerprintScheme,
    /// Euclidean distance ceiling for the embedding variant.
    pub embedding_threshold: f64,
    /// Normalized Hamming gate before the landmark refinement runs.
    pub hamming_gate: f64,
    /// Mean per-coordinate distance ceiling for the refinement.
    pub landmark_threshold: f64,
}

impl MatchConfig {
    pub fn for_scheme(scheme: FingerprintScheme) -> Self {
        Self {
            scheme,
            embedding_threshold: DEFAULT_EMBEDDING_THRESHOLD,
            hamming_gate: DEFAULT_HAMMING_GATE,
            landmark_threshold: DEFAULT_LANDMARK_THRESHOLD,
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::for_scheme(FingerprintScheme::Embedding)
    }
}

/// Decides whether two fingerprints belong to the same identity.
///
/// Embedding variant: Euclidean distance under `embedding_threshold`.
/// Hash variant: identical hashes match outright; otherwise the landmark
/// refinement runs only when the normalized Hamming distance clears the
/// gate. The gate is a performance short-circuit, not a correctness
/// requirement.
pub fn compare(a: &Fingerprint, b: &Fingerprint, config: &MatchConfig) -> Result<bool, MatchError> {
    match (a, b) {
        (
            Fingerprint::Embedding { vector: va, .. },
            Fingerprint::Embedding { vector: vb, .. },
        ) => {
            let distance = embedding_distance(va, vb)?;
            Ok(distance < config.embedding_threshold)
        }
        (
            Fingerprint::HashLandmark {
                hash: ha,
                landmarks: la,
                ..
            },
            Fingerprint::HashLandmark {
                hash: hb,
                landmarks: lb,
                ..
            },
        ) => {
            if ha == hb {
                return Ok(true);
            }
            let hamming = normalized_hamming(ha, hb)?;
            if hamming >= config.hamming_gate {
                return Ok(false);
            }
            Ok(landmark_distance(la, lb) < config.landmark_threshold)
        }
        _ => Err(MatchError::VariantMismatch {
            left: a.scheme(),
            right: b.scheme(),
        }),
    }
}

fn embedding_distance(a: &[f32], b: &[f32]) -> Result<f64, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::VectorLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum();
    Ok(sum.sqrt())
}

/// Differing bits over total bits. Lengths are fixed by construction;
/// a mismatch here means corrupt persisted data.
fn normalized_hamming(a: &str, b: &str) -> Result<f64, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::HashLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(0.0);
    }
    let differing = a.chars().zip(b.chars()).filter(|(x, y)| x != y).count();
    Ok(differing as f64 / a.len() as f64)
}

/// Euclidean distance over the flattened normalized landmark lists,
/// divided by coordinate count. Landmark counts can differ across
/// detection models; unequal counts never match.
fn landmark_distance(a: &[(f64, f64)], b: &[(f64, f64)]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return f64::INFINITY;
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|((ax, ay), (bx, by))| (ax - bx).powi(2) + (ay - by).powi(2))
        .sum();
    sum.sqrt() / (a.len() * 2) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::domain::fingerprint::landmark_hash;
    use crate::shared::bounding_box::BoundingBox;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 100.0, 100.0)
    }

    fn embedding_fp(vector: Vec<f32>) -> Fingerprint {
        Fingerprint::Embedding {
            vector,
            bounding_box: bbox(),
        }
    }

    fn hash_fp(landmarks: Vec<(f64, f64)>) -> Fingerprint {
        Fingerprint::HashLandmark {
            hash: landmark_hash(&landmarks),
            landmarks,
            bounding_box: bbox(),
        }
    }

    fn hash_fp_raw(hash: &str, landmarks: Vec<(f64, f64)>) -> Fingerprint {
        Fingerprint::HashLandmark {
            hash: hash.to_string(),
            landmarks,
            bounding_box: bbox(),
        }
    }

    fn embedding_config() -> MatchConfig {
        MatchConfig::for_scheme(FingerprintScheme::Embedding)
    }

    fn landmark_config() -> MatchConfig {
        MatchConfig::for_scheme(FingerprintScheme::Landmark)
    }

    // ── embedding variant ───────────────────────────────────────────

    #[test]
    fn test_identical_vectors_match() {
        let a = embedding_fp(vec![0.1, 0.5, -0.3]);
        assert!(compare(&a, &a.clone(), &embedding_config()).unwrap());
    }

    #[test]
    fn test_vectors_under_threshold_match() {
        // distance = 0.5 < 0.6
        let a = embedding_fp(vec![0.0, 0.0]);
        let b = embedding_fp(vec![0.3, 0.4]);
        assert!(compare(&a, &b, &embedding_config()).unwrap());
    }

    #[test]
    fn test_vectors_over_threshold_do_not_match() {
        // distance = 1.0 >= 0.6
        let a = embedding_fp(vec![0.0, 0.0]);
        let b = embedding_fp(vec![0.6, 0.8]);
        assert!(!compare(&a, &b, &embedding_config()).unwrap());
    }

    #[test]
    fn test_vector_length_mismatch_is_contract_error() {
        let a = embedding_fp(vec![0.1, 0.2]);
        let b = embedding_fp(vec![0.1, 0.2, 0.3]);
        let err = compare(&a, &b, &embedding_config()).unwrap_err();
        assert_eq!(err, MatchError::VectorLengthMismatch { left: 2, right: 3 });
    }

    #[test]
    fn test_embedding_distance_exact() {
        assert_relative_eq!(
            embedding_distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap(),
            5.0,
            epsilon = 1e-9
        );
    }

    // ── hash variant ────────────────────────────────────────────────

    #[test]
    fn test_identical_hashes_match_regardless_of_landmarks() {
        // Same hash, wildly different landmark content: fast path wins.
        let a = hash_fp_raw("1010", vec![(0.9, 0.1)]);
        let b = hash_fp_raw("1010", vec![(0.1, 0.9), (0.5, 0.5)]);
        assert!(compare(&a, &b, &landmark_config()).unwrap());
    }

    #[test]
    fn test_hamming_gate_blocks_distant_hashes() {
        // Landmarks in opposite quadrants: every bit differs, gate fails,
        // refinement never runs even though it would also reject.
        let a = hash_fp(vec![(0.9, 0.9); 40]);
        let b = hash_fp(vec![(0.1, 0.1); 40]);
        assert!(!compare(&a, &b, &landmark_config()).unwrap());
    }

    #[test]
    fn test_near_hashes_refined_by_landmarks_match() {
        // One axis-bit flip out of 40 landmarks: hamming = 1/128 < 0.3,
        // landmark geometry nearly identical → match.
        let mut la = vec![(0.9, 0.9); 40];
        let mut lb = la.clone();
        la[0] = (0.51, 0.9);
        lb[0] = (0.49, 0.9);
        assert!(compare(&hash_fp(la), &hash_fp(lb), &landmark_config()).unwrap());
    }

    #[test]
    fn test_near_hashes_refined_by_landmarks_reject() {
        // One landmark changes quadrant (hamming = 2/128, gate passes)
        // but the geometry is far apart within the shared quadrants.
        let la = vec![(0.55, 0.55); 4];
        let lb = vec![(0.99, 0.99), (0.99, 0.99), (0.99, 0.99), (0.1, 0.1)];
        let a = hash_fp(la);
        let b = hash_fp(lb);
        // mean distance = sqrt(3*2*0.44² + 2*0.45²) / 8 ≈ 0.156 > 0.15
        assert!(!compare(&a, &b, &landmark_config()).unwrap());
    }

    #[test]
    fn test_hash_length_mismatch_is_contract_error() {
        let a = hash_fp_raw("1010", vec![(0.9, 0.1)]);
        let b = hash_fp_raw("10", vec![(0.9, 0.1)]);
        let err = compare(&a, &b, &landmark_config()).unwrap_err();
        assert_eq!(err, MatchError::HashLengthMismatch { left: 4, right: 2 });
    }

    #[test]
    fn test_unequal_landmark_counts_never_match() {
        // Hashes differ by padding only, so the gate passes; the
        // refinement still rejects on count mismatch.
        let a = hash_fp_raw(&landmark_hash(&[(0.9, 0.9)]), vec![(0.9, 0.9)]);
        let b = hash_fp_raw(
            &landmark_hash(&[(0.9, 0.9), (0.6, 0.6)]),
            vec![(0.9, 0.9), (0.6, 0.6)],
        );
        assert!(!compare(&a, &b, &landmark_config()).unwrap());
    }

    // ── cross-variant ───────────────────────────────────────────────

    #[rstest]
    #[case::embedding_config(FingerprintScheme::Embedding)]
    #[case::landmark_config(FingerprintScheme::Landmark)]
    fn test_cross_variant_is_contract_error(#[case] scheme: FingerprintScheme) {
        let a = embedding_fp(vec![0.1]);
        let b = hash_fp(vec![(0.5, 0.5)]);
        let err = compare(&a, &b, &MatchConfig::for_scheme(scheme)).unwrap_err();
        assert_eq!(
            err,
            MatchError::VariantMismatch {
                left: FingerprintScheme::Embedding,
                right: FingerprintScheme::Landmark,
            }
        );
    }

    // ── helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_normalized_hamming_values() {
        assert_relative_eq!(normalized_hamming("0000", "0000").unwrap(), 0.0);
        assert_relative_eq!(normalized_hamming("0011", "0000").unwrap(), 0.5);
        assert_relative_eq!(normalized_hamming("1111", "0000").unwrap(), 1.0);
    }

    #[test]
    fn test_landmark_distance_identical_is_zero() {
        let pts = vec![(0.25, 0.75), (0.5, 0.5)];
        assert_relative_eq!(landmark_distance(&pts, &pts), 0.0);
    }

    #[test]
    fn test_landmark_distance_empty_is_infinite() {
        assert!(landmark_distance(&[], &[]).is_infinite());
    }
}
