use crate::error::ModelServiceError;
use dataset_format::{PixelBox, YoloLabel};
use image::DynamicImage;

/// A detection in the pixel space of the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: PixelBox,
}

impl Detection {
    pub fn to_label(&self, image_width: u32, image_height: u32) -> YoloLabel {
        YoloLabel {
            class_id: self.class_id,
            bbox: self
                .bbox
                .clamp(image_width, image_height)
                .to_yolo(image_width, image_height),
        }
    }
}

pub trait ModelService {
    fn predict(&mut self, image: &DynamicImage) -> Result<Vec<Detection>, ModelServiceError>;
}
