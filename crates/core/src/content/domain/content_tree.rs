use thiserror::Error;

use crate::shared::image_id::ImageId;
use crate::shared::pixels::ImagePixels;

/// Why a pixel read-probe failed. All variants are terminal for the
/// probed image; the pipeline never retries an unreadable input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("pixel access blocked by cross-origin policy")]
    CrossOrigin,
    #[error("image data could not be decoded: {0}")]
    Decode(String),
    #[error("image is no longer present in the content tree")]
    Missing,
}

/// Boundary to the host's content tree.
///
/// Reads: image enumeration, natural geometry, load readiness, and the
/// pixel probe that both verifies readability and feeds detection.
/// Writes: the visual suppression filter and a marker attribute that
/// distinguishes this system's suppression from pre-existing effects.
///
/// Shared across batch workers, hence `&self`; implementations guard
/// interior state as needed.
pub trait ContentTree: Send + Sync {
    /// Current image ids, in document order.
    fn image_ids(&self) -> Vec<ImageId>;

    fn contains(&self, id: ImageId) -> bool;

    /// Natural pixel dimensions, once known.
    fn dimensions(&self, id: ImageId) -> Option<(u32, u32)>;

    /// True once the element's data has fully loaded.
    fn is_loaded(&self, id: ImageId) -> bool;

    /// Attempts a pixel-level read. Failure means the image is
    /// unreadable (cross-origin, decode error) or gone.
    fn probe_pixels(&self, id: ImageId) -> Result<ImagePixels, ProbeError>;

    /// Current visual filter value, if any.
    fn visual_filter(&self, id: ImageId) -> Option<String>;

    /// Writes (or clears) the visual filter.
    fn set_visual_filter(&self, id: ImageId, filter: Option<&str>);

    /// Marks or unmarks the element as suppressed by this system.
    fn set_suppression_marker(&self, id: ImageId, on: bool);

    fn has_suppression_marker(&self, id: ImageId) -> bool;
}
