use serde::{Deserialize, Serialize};

/// Axis-aligned face box in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Maps an absolute point into box-relative coordinates, clamped
    /// to [0, 1] on each axis.
    ///
    /// A degenerate box (zero width or height) maps everything to the
    /// midpoint rather than dividing by zero.
    pub fn normalize_point(&self, point: (f64, f64)) -> (f64, f64) {
        let nx = if self.width > 0.0 {
            ((point.0 - self.x) / self.width).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let ny = if self.height > 0.0 {
            ((point.1 - self.y) / self.height).clamp(0.0, 1.0)
        } else {
            0.5
        };
        (nx, ny)
    }
}
