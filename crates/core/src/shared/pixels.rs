use crate::shared::image_id::ImageId;

/// Decoded image pixels: contiguous RGBA bytes in row-major order.
///
/// Produced by the content tree's read probe; consumed opaquely by the
/// detection capability. Format conversion stays at the tree boundary.
/// Carries the id of the element it was probed from.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePixels {
    data: Vec<u8>,
    width: u32,
    height: u32,
    source: ImageId,
}

impl ImagePixels {
    pub fn new(data: Vec<u8>, width: u32, height: u32, source: ImageId) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 4,
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
            source,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source(&self) -> ImageId {
        self.source
    }
}
