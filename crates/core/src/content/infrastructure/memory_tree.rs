use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::content::domain::content_tree::{ContentTree, ProbeError};
use crate::shared::image_id::ImageId;
use crate::shared::pixels::ImagePixels;

/// How an image answers the pixel read-probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeBehavior {
    Readable,
    CrossOrigin,
    DecodeError,
}

#[derive(Clone, Debug)]
struct MemoryImage {
    width: u32,
    height: u32,
    loaded: bool,
    probe: ProbeBehavior,
    filter: Option<String>,
    marker: bool,
}

/// In-memory `ContentTree` for the CLI harness and tests.
///
/// Probe pixels are fabricated (zeroed RGBA of the declared size);
/// detection scripting keys off the image id the probe carries.
#[derive(Default)]
pub struct MemoryTree {
    images: Mutex<BTreeMap<ImageId, MemoryImage>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ImageId, width: u32, height: u32, loaded: bool) {
        self.insert_with_probe(id, width, height, loaded, ProbeBehavior::Readable);
    }

    pub fn insert_with_probe(
        &self,
        id: ImageId,
        width: u32,
        height: u32,
        loaded: bool,
        probe: ProbeBehavior,
    ) {
        if let Ok(mut images) = self.images.lock() {
            images.insert(
                id,
                MemoryImage {
                    width,
                    height,
                    loaded,
                    probe,
                    filter: None,
                    marker: false,
                },
            );
        }
    }

    pub fn mark_loaded(&self, id: ImageId) {
        if let Ok(mut images) = self.images.lock() {
            if let Some(image) = images.get_mut(&id) {
                image.loaded = true;
            }
        }
    }

    pub fn remove(&self, id: ImageId) {
        if let Ok(mut images) = self.images.lock() {
            images.remove(&id);
        }
    }
}

impl ContentTree for MemoryTree {
    fn image_ids(&self) -> Vec<ImageId> {
        self.images
            .lock()
            .map(|images| images.keys().copied().collect())
            .unwrap_or_default()
    }

    fn contains(&self, id: ImageId) -> bool {
        self.images
            .lock()
            .map(|images| images.contains_key(&id))
            .unwrap_or(false)
    }

    fn dimensions(&self, id: ImageId) -> Option<(u32, u32)> {
        self.images
            .lock()
            .ok()
            .and_then(|images| images.get(&id).map(|i| (i.width, i.height)))
    }

    fn is_loaded(&self, id: ImageId) -> bool {
        self.images
            .lock()
            .map(|images| images.get(&id).is_some_and(|i| i.loaded))
            .unwrap_or(false)
    }

    fn probe_pixels(&self, id: ImageId) -> Result<ImagePixels, ProbeError> {
        let images = self.images.lock().map_err(|_| ProbeError::Missing)?;
        let image = images.get(&id).ok_or(ProbeError::Missing)?;
        match image.probe {
            ProbeBehavior::CrossOrigin => Err(ProbeError::CrossOrigin),
            ProbeBehavior::DecodeError => {
                Err(ProbeError::Decode("corrupt image data".to_string()))
            }
            ProbeBehavior::Readable => {
                let len = (image.width as usize) * (image.height as usize) * 4;
                Ok(ImagePixels::new(vec![0u8; len], image.width, image.height, id))
            }
        }
    }

    fn visual_filter(&self, id: ImageId) -> Option<String> {
        self.images
            .lock()
            .ok()
            .and_then(|images| images.get(&id).and_then(|i| i.filter.clone()))
    }

    fn set_visual_filter(&self, id: ImageId, filter: Option<&str>) {
        if let Ok(mut images) = self.images.lock() {
            if let Some(image) = images.get_mut(&id) {
                image.filter = filter.map(str::to_string);
            }
        }
    }

    fn set_suppression_marker(&self, id: ImageId, on: bool) {
        if let Ok(mut images) = self.images.lock() {
            if let Some(image) = images.get_mut(&id) {
                image.marker = on;
            }
        }
    }

    fn has_suppression_marker(&self, id: ImageId) -> bool {
        self.images
            .lock()
            .map(|images| images.get(&id).is_some_and(|i| i.marker))
            .unwrap_or(false)
    }
}
