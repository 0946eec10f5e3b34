use crate::{
    annotator::{Annotator, SplitOutcome},
    config::{AnnotationConfig, Config},
    error::AnnotateError,
    model_service::ModelService,
    ort_service::OrtModelService,
};

/// Runs the annotator over every configured split and sums the outcomes.
pub fn run_annotation<M: ModelService>(
    model_service: M,
    annotation_config: &AnnotationConfig,
) -> Result<SplitOutcome, AnnotateError> {
    let mut annotator = Annotator::new(model_service, annotation_config.progress_every);
    let mut total = SplitOutcome::default();

    for split in &annotation_config.splits {
        total += annotator.annotate_split(split)?;
    }

    Ok(total)
}

pub fn start_app(config: Config) -> Result<SplitOutcome, AnnotateError> {
    let model_path = config.model.get_path();
    tracing::info!("Pre-annotation with YOLO model");
    tracing::info!("Model: {}", model_path.display());
    tracing::info!("Confidence threshold: {}", config.model.min_probability);

    tracing::info!("Loading model...");
    let model_service = OrtModelService::new(&config.model).map_err(|e| {
        tracing::error!(
            "Export the model to ONNX first, or point model.model_dir/model.onnx_file at your trained model"
        );
        AnnotateError::ModelLoad(e)
    })?;
    tracing::info!("Model loaded: {}", model_path.display());

    let total = run_annotation(model_service, &config.annotation)?;

    tracing::info!("Pre-annotation complete");
    tracing::info!("Total annotated: {}", total.annotated);
    tracing::info!("Total skipped (already existed): {}", total.skipped);
    if total.failed > 0 {
        tracing::warn!("Total failed: {}", total.failed);
    }
    tracing::info!(
        "Next steps: review the label files in an annotation tool, correct mistakes and add missed robots"
    );

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ModelServiceError, model_service::Detection};
    use dataset_format::{PixelBox, Split};
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::fs;

    struct FixedModelService;

    impl ModelService for FixedModelService {
        fn predict(&mut self, _image: &DynamicImage) -> Result<Vec<Detection>, ModelServiceError> {
            Ok(vec![Detection {
                class_id: 0,
                confidence: 0.8,
                bbox: PixelBox::new(0., 0., 8., 8.),
            }])
        }
    }

    #[test]
    fn test_run_annotation_sums_splits_and_skips_missing_ones() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");

        let training = Split::Training.dirs(&data);
        fs::create_dir_all(&training.images_dir).unwrap();
        for name in ["r1.png", "r2.png", "r3.png"] {
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(16, 16, Rgb([0, 0, 0]))
                .save(training.images_dir.join(name))
                .unwrap();
        }
        fs::create_dir_all(&training.labels_dir).unwrap();
        fs::write(training.labels_dir.join("r2.txt"), "").unwrap();

        let validation = Split::Validation.dirs(&data);
        fs::create_dir_all(&validation.images_dir).unwrap();
        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(16, 16, Rgb([0, 0, 0]))
            .save(validation.images_dir.join("v1.jpg"))
            .unwrap();

        let annotation_config = AnnotationConfig {
            splits: Split::ALL.iter().map(|split| split.dirs(&data)).collect(),
            progress_every: 50,
        };

        let total = run_annotation(FixedModelService, &annotation_config).unwrap();

        assert_eq!(
            total,
            SplitOutcome {
                annotated: 3,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(
            fs::read_to_string(validation.labels_dir.join("v1.txt")).unwrap(),
            "0 0.250000 0.250000 0.500000 0.500000"
        );
        assert!(!Split::Test.dirs(&data).labels_dir.exists());
    }
}
