use std::time::Duration;

/// Fixed bit length of hash-variant fingerprints. Two bits per landmark,
/// right-padded or truncated so comparison is defined for any landmark count.
pub const HASH_BITS: usize = 128;

/// Euclidean distance ceiling for an embedding-variant match.
pub const DEFAULT_EMBEDDING_THRESHOLD: f64 = 0.6;

/// Normalized Hamming distance gate before the landmark refinement runs.
pub const DEFAULT_HAMMING_GATE: f64 = 0.3;

/// Mean per-coordinate distance ceiling for the landmark refinement.
pub const DEFAULT_LANDMARK_THRESHOLD: f64 = 0.15;

/// Ceiling on images processed concurrently within one batch.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Pause between batches so the host is never starved by a long drain.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(25);

/// Quiet interval that ends a burst of mutation events.
pub const DEFAULT_DEBOUNCE_QUIET: Duration = Duration::from_millis(300);

/// Images smaller than this on either side are skipped as too small to
/// carry a meaningful face.
pub const MIN_FACE_IMAGE_DIM: u32 = 96;

/// Load-readiness polls per image before it is given up as failed.
pub const MAX_LOAD_ATTEMPTS: u32 = 10;

/// Delay between enabling the feature and the first full discovery pass.
pub const ENABLE_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Visual treatment written to a suppressed image.
pub const SUPPRESSION_FILTER: &str = "blur(24px) grayscale(40%)";
