use serde::{Deserialize, Serialize};

/// Stable identity for one image element in the content tree.
///
/// The host assigns ids; the pipeline only requires that an id stays
/// constant for the lifetime of its element and is never reused while
/// any lifecycle state for it exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "img#{}", self.0)
    }
}
