use crate::{
    config::{ExecutionProvider, ModelConfig},
    error::ModelServiceError,
    model_service::{Detection, ModelService},
};
use dataset_format::PixelBox;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{s, Array, ArrayD, Axis, Ix4};
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::path::Path;

const PAD_VALUE: f32 = 114. / 255.;

/// Maps between original image pixels and the padded square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    resized_width: u32,
    resized_height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Scales the image to fit inside the input keeping its aspect ratio and
    /// centers it, like the trainer's own preprocessing.
    fn fit(img_width: u32, img_height: u32, input_size: u32) -> Self {
        let size = input_size as f32;
        let scale = (size / img_width as f32).min(size / img_height as f32);
        let resized_width = ((img_width as f32 * scale).round() as u32).clamp(1, input_size);
        let resized_height = ((img_height as f32 * scale).round() as u32).clamp(1, input_size);

        Self {
            scale,
            resized_width,
            resized_height,
            pad_x: (input_size - resized_width) / 2,
            pad_y: (input_size - resized_height) / 2,
        }
    }

    fn to_image(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Letterboxes the image into the square model input and lays the pixels out
/// as NCHW in [0, 1], padding with gray.
fn transform_image(image: &DynamicImage, letterbox: &Letterbox, input_size: u32) -> Array<f32, Ix4> {
    let size = input_size as usize;
    let img = image.resize_exact(
        letterbox.resized_width,
        letterbox.resized_height,
        FilterType::CatmullRom,
    );

    let mut input = Array::from_elem((1, 3, size, size), PAD_VALUE);
    let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
    for pixel in img.pixels() {
        let x = pixel.0 as usize + pad_x;
        let y = pixel.1 as usize + pad_y;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    input
}

/// Reads a YOLOv8 head output of shape `[1, 4 + classes, candidates]`.
/// Boxes are mapped back to the original image and clipped to its bounds.
fn decode_output(
    output: &ArrayD<f32>,
    img_width: u32,
    img_height: u32,
    letterbox: &Letterbox,
    min_probability: f32,
) -> Result<Vec<Detection>, ModelServiceError> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
        return Err(ModelServiceError::InvalidOutput(format!(
            "expected [1, 4 + classes, candidates], got {:?}",
            shape
        )));
    }

    let mut boxes = Vec::new();
    let output: ndarray::ArrayView2<f32> = output.slice(s![0, .., ..]);

    for candidate in output.axis_iter(Axis(1)) {
        let Some((class_id, prob)) = candidate
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
        else {
            continue;
        };

        if prob < min_probability {
            continue;
        }

        let (xc, yc) = letterbox.to_image(candidate[0], candidate[1]);
        let bbox = PixelBox::from_center(
            xc,
            yc,
            candidate[2] / letterbox.scale,
            candidate[3] / letterbox.scale,
        )
        .clamp(img_width, img_height);

        boxes.push(Detection {
            class_id: class_id as u32,
            confidence: prob,
            bbox,
        });
    }

    Ok(boxes)
}

/// Greedy per-class suppression, highest confidence first.
fn non_max_suppression(mut boxes: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    boxes.sort_by(|box1, box2| box2.confidence.total_cmp(&box1.confidence));
    let mut result = Vec::new();

    while !boxes.is_empty() {
        let best = boxes.remove(0);
        boxes.retain(|other| {
            other.class_id != best.class_id || best.bbox.iou(&other.bbox) < iou_threshold
        });
        result.push(best);
    }

    result
}

fn build_session(model_path: &Path, provider: ExecutionProvider) -> Result<Session, ort::Error> {
    let builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    let builder = match provider {
        ExecutionProvider::Cpu => builder,
        ExecutionProvider::Cuda => {
            builder.with_execution_providers([CUDAExecutionProvider::default().build()])?
        }
        ExecutionProvider::TensorRt => builder.with_execution_providers([
            TensorRTExecutionProvider::default()
                .with_engine_cache(true)
                .build(),
            CUDAExecutionProvider::default().build(),
        ])?,
    };

    builder.commit_from_file(model_path)
}

pub struct OrtModelService {
    session: Session,
    input_size: u32,
    min_probability: f32,
    iou_threshold: f32,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ModelServiceError> {
        let model_path = model_config.get_path();
        if !model_path.is_file() {
            return Err(ModelServiceError::ModelNotFound(model_path));
        }

        let session = build_session(&model_path, model_config.execution_provider)?;
        tracing::info!(
            "Created ONNX session for {} ({:?})",
            model_path.display(),
            model_config.execution_provider
        );

        Ok(Self {
            session,
            input_size: model_config.input_size,
            min_probability: model_config.min_probability,
            iou_threshold: model_config.iou_threshold,
        })
    }

    fn run_inference(&mut self, input: &Array<f32, Ix4>) -> Result<ArrayD<f32>, ModelServiceError> {
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.as_standard_layout().to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)?;
        let outputs = self.session.run(ort::inputs![tensor_ref])?;

        let (shape, data) = outputs["output0"].try_extract_tensor::<f32>()?;

        let ix = shape.to_ixdyn();
        ArrayD::from_shape_vec(ix, data.to_vec())
            .map_err(|e| ModelServiceError::InvalidOutput(format!("invalid tensor shape: {}", e)))
    }
}

impl ModelService for OrtModelService {
    fn predict(&mut self, image: &DynamicImage) -> Result<Vec<Detection>, ModelServiceError> {
        let (img_width, img_height) = image.dimensions();
        let letterbox = Letterbox::fit(img_width, img_height, self.input_size);
        let input = transform_image(image, &letterbox, self.input_size);

        let outputs = self.run_inference(&input)?;
        let boxes = decode_output(
            &outputs,
            img_width,
            img_height,
            &letterbox,
            self.min_probability,
        )?;
        let detections = non_max_suppression(boxes, self.iou_threshold);

        tracing::debug!("Model returned {} detections", detections.len());
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn detection(class_id: u32, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: PixelBox::new(x1, y1, x2, y2),
        }
    }

    #[test]
    fn test_letterbox_fit() {
        let letterbox = Letterbox::fit(1280, 640, 640);

        assert_eq!(letterbox.scale, 0.5);
        assert_eq!((letterbox.resized_width, letterbox.resized_height), (640, 320));
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (0, 160));
        assert_eq!(letterbox.to_image(320., 320.), (640., 320.));
        assert_eq!(letterbox.to_image(0., 160.), (0., 0.));
    }

    #[test]
    fn test_transform_image_keeps_aspect_ratio() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(100, 50, Rgb([255, 0, 0]));
        let letterbox = Letterbox::fit(100, 50, 64);
        let input = transform_image(&DynamicImage::ImageRgb8(img), &letterbox, 64);

        assert_eq!(input.shape(), &[1, 3, 64, 64]);
        assert_eq!(letterbox.pad_y, 16);
        // Gray bands above and below the image.
        assert_eq!(input[[0, 0, 5, 10]], PAD_VALUE);
        assert_eq!(input[[0, 2, 60, 63]], PAD_VALUE);
        assert_eq!(input[[0, 0, 30, 10]], 1.0);
        assert_eq!(input[[0, 1, 30, 10]], 0.0);
    }

    #[test]
    fn test_decode_output_rescales_and_filters() {
        // Two classes, three candidates, laid out [1, 6, 3].
        #[rustfmt::skip]
        let data = vec![
            // xc, yc, w, h rows
            320.0, 100.0, 630.0,
            320.0, 100.0, 470.0,
            64.0,  20.0,  40.0,
            64.0,  20.0,  40.0,
            // class 0 scores
            0.90,  0.10,  0.30,
            // class 1 scores
            0.05,  0.20,  0.80,
        ];
        let output = ArrayD::from_shape_vec(vec![1, 6, 3], data).unwrap();
        let letterbox = Letterbox::fit(1280, 640, 640);

        let boxes = decode_output(&output, 1280, 640, &letterbox, 0.25).unwrap();

        assert_eq!(boxes.len(), 2);

        assert_eq!(boxes[0].class_id, 0);
        assert_eq!(boxes[0].confidence, 0.90);
        assert_eq!(boxes[0].bbox, PixelBox::new(576., 256., 704., 384.));

        // Overshoots the right/bottom edge and is clipped.
        assert_eq!(boxes[1].class_id, 1);
        assert_eq!(boxes[1].bbox.x2, 1280.);
        assert_eq!(boxes[1].bbox.y1, 580.);
        assert_eq!(boxes[1].bbox.y2, 640.);
    }

    #[test]
    fn test_decode_output_rejects_unexpected_shape() {
        let output = ArrayD::<f32>::zeros(vec![1, 4, 10]);
        let letterbox = Letterbox::fit(10, 10, 640);
        assert!(decode_output(&output, 10, 10, &letterbox, 0.25).is_err());
    }

    #[test]
    fn test_non_max_suppression_is_class_aware() {
        let boxes = vec![
            detection(0, 0.6, 0., 0., 100., 100.),
            detection(0, 0.9, 2., 2., 102., 102.),
            detection(1, 0.8, 0., 0., 100., 100.),
            detection(0, 0.7, 300., 300., 400., 400.),
        ];

        let kept = non_max_suppression(boxes, 0.7);

        let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn test_missing_model_file() {
        let config = ModelConfig {
            onnx_file: "missing.onnx".to_string(),
            model_dir: "/nonexistent".into(),
            min_probability: 0.25,
            iou_threshold: 0.7,
            input_size: 640,
            execution_provider: ExecutionProvider::Cpu,
        };

        assert!(matches!(
            OrtModelService::new(&config),
            Err(ModelServiceError::ModelNotFound(_))
        ));
    }
}
