use serde::{Deserialize, Serialize};

use crate::detection::domain::face_detector::Detection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::HASH_BITS;

/// Which fingerprint variant a deployment uses. Selected once at
/// configuration time; variants are never mixed at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintScheme {
    Embedding,
    Landmark,
}

impl std::fmt::Display for FingerprintScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintScheme::Embedding => write!(f, "embedding"),
            FingerprintScheme::Landmark => write!(f, "landmark"),
        }
    }
}

/// Compact identity signature for one detected face.
///
/// `Embedding` carries the model's dense identity vector. `HashLandmark`
/// carries a fixed-length binary hash derived from box-normalized
/// landmark positions plus the normalized landmarks themselves for the
/// refined comparison stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Fingerprint {
    Embedding {
        vector: Vec<f32>,
        bounding_box: BoundingBox,
    },
    HashLandmark {
        hash: String,
        /// Landmarks normalized to [0, 1] within the bounding box.
        landmarks: Vec<(f64, f64)>,
        bounding_box: BoundingBox,
    },
}

impl Fingerprint {
    /// Builds a fingerprint from a raw detection under the configured
    /// scheme. Returns `None` when the detection lacks the data the
    /// scheme needs (no embedding, or no landmarks).
    pub fn from_detection(detection: &Detection, scheme: FingerprintScheme) -> Option<Self> {
        match scheme {
            FingerprintScheme::Embedding => {
                let vector = detection.embedding.as_ref()?.clone();
                Some(Fingerprint::Embedding {
                    vector,
                    bounding_box: detection.bounding_box,
                })
            }
            FingerprintScheme::Landmark => {
                let points = detection.landmarks.as_ref()?;
                if points.is_empty() {
                    return None;
                }
                let normalized: Vec<(f64, f64)> = points
                    .iter()
                    .map(|p| detection.bounding_box.normalize_point(*p))
                    .collect();
                Some(Fingerprint::HashLandmark {
                    hash: landmark_hash(&normalized),
                    landmarks: normalized,
                    bounding_box: detection.bounding_box,
                })
            }
        }
    }

    pub fn scheme(&self) -> FingerprintScheme {
        match self {
            Fingerprint::Embedding { .. } => FingerprintScheme::Embedding,
            Fingerprint::HashLandmark { .. } => FingerprintScheme::Landmark,
        }
    }
}

/// Two bits per normalized landmark, one per axis, thresholded at the box
/// midpoint; right-padded with '0' / truncated to `HASH_BITS` so hash
/// comparison is defined regardless of landmark count.
pub fn landmark_hash(normalized: &[(f64, f64)]) -> String {
    let mut bits = String::with_capacity(HASH_BITS);
    for (x, y) in normalized {
        bits.push(if *x >= 0.5 { '1' } else { '0' });
        bits.push(if *y >= 0.5 { '1' } else { '0' });
        if bits.len() >= HASH_BITS {
            break;
        }
    }
    bits.truncate(HASH_BITS);
    while bits.len() < HASH_BITS {
        bits.push('0');
    }
    bits
}
