use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::pixels::ImagePixels;

pub type DetectError = Box<dyn std::error::Error + Send + Sync>;

/// One detected face. Landmark and embedding availability depends on the
/// backing model; fingerprint construction tolerates either being absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    /// Landmark points in absolute image coordinates.
    pub landmarks: Option<Vec<(f64, f64)>>,
    /// Dense identity vector, already L2-normalized by the model.
    pub embedding: Option<Vec<f32>>,
}

/// Domain interface for face detection.
///
/// Must be idempotent and side-effect-free from the pipeline's view.
/// Implementations are shared across batch workers, hence `&self`;
/// stateful backends keep interior state behind a `Mutex`.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, pixels: &ImagePixels) -> Result<Vec<Detection>, DetectError>;
}
