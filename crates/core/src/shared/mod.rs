pub mod bounding_box;
pub mod constants;
pub mod image_id;
pub mod pixels;
