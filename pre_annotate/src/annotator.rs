use crate::{error::AnnotateError, model_service::ModelService};
use dataset_format::{label_path_for, list_images, write_label_file, SplitDirs, YoloLabel};
use image::GenericImageView;
use std::{fs, ops::AddAssign, path::Path};
use tracing::instrument;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SplitOutcome {
    pub annotated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AddAssign for SplitOutcome {
    fn add_assign(&mut self, other: Self) {
        self.annotated += other.annotated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub struct Annotator<M: ModelService> {
    model_service: M,
    progress_every: usize,
}

impl<M: ModelService> Annotator<M> {
    pub fn new(model_service: M, progress_every: usize) -> Self {
        Self {
            model_service,
            progress_every,
        }
    }

    /// Writes a label file for every image of the split that does not have one yet.
    /// Existing label files are left untouched.
    #[instrument(skip(self, split), fields(split = %split.name()))]
    pub fn annotate_split(&mut self, split: &SplitDirs) -> Result<SplitOutcome, AnnotateError> {
        let split_name = split.name();

        if !split.images_dir.is_dir() {
            tracing::warn!(
                "Skipping {}: directory not found: {}",
                split_name,
                split.images_dir.display()
            );
            return Ok(SplitOutcome::default());
        }

        fs::create_dir_all(&split.labels_dir).map_err(|source| AnnotateError::LabelsDir {
            path: split.labels_dir.clone(),
            source,
        })?;

        let images = list_images(&split.images_dir)?;
        if images.is_empty() {
            tracing::warn!("No images found in {}", split.images_dir.display());
            return Ok(SplitOutcome::default());
        }

        tracing::info!("Processing {} set: {} images", split_name, images.len());

        let total = images.len();
        let mut outcome = SplitOutcome::default();

        for (index, image_path) in images.iter().enumerate() {
            let position = index + 1;

            match label_path_for(image_path, &split.labels_dir) {
                Some(label_path) if label_path.exists() => outcome.skipped += 1,
                Some(label_path) => match self.annotate_image(image_path, &label_path) {
                    Ok(count) => {
                        tracing::debug!(
                            "Wrote {} annotation(s) to {}",
                            count,
                            label_path.display()
                        );
                        outcome.annotated += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Error processing {}: {}", image_path.display(), e);
                        outcome.failed += 1;
                    }
                },
                None => {
                    tracing::warn!("Cannot derive a label name for {}", image_path.display());
                    outcome.failed += 1;
                }
            }

            if self.progress_every > 0 && position % self.progress_every == 0 {
                tracing::info!(
                    "Progress: {}/{} (annotated: {}, skipped: {}, failed: {})",
                    position,
                    total,
                    outcome.annotated,
                    outcome.skipped,
                    outcome.failed
                );
            }
        }

        tracing::info!(
            "{} complete: annotated {}, skipped (existing) {}, failed {}",
            split_name,
            outcome.annotated,
            outcome.skipped,
            outcome.failed
        );

        Ok(outcome)
    }

    fn annotate_image(&mut self, image_path: &Path, label_path: &Path) -> Result<usize, AnnotateError> {
        let image = image::ImageReader::open(image_path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.decode())
            .map_err(|source| AnnotateError::ImageRead {
                path: image_path.to_path_buf(),
                source,
            })?;
        let (img_width, img_height) = image.dimensions();

        let detections = self.model_service.predict(&image)?;
        let labels: Vec<YoloLabel> = detections
            .iter()
            .map(|detection| detection.to_label(img_width, img_height))
            .collect();

        // Zero detections still produce an (empty) file to review by hand.
        write_label_file(label_path, &labels)?;

        Ok(labels.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ModelServiceError, model_service::Detection};
    use dataset_format::{read_label_file, PixelBox};
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::path::PathBuf;

    struct MockModelService {
        detections: Vec<Detection>,
        calls: usize,
    }

    impl MockModelService {
        fn returning(detections: Vec<Detection>) -> Self {
            Self {
                detections,
                calls: 0,
            }
        }
    }

    impl ModelService for MockModelService {
        fn predict(&mut self, _image: &DynamicImage) -> Result<Vec<Detection>, ModelServiceError> {
            self.calls += 1;
            Ok(self.detections.clone())
        }
    }

    struct FailingModelService;

    impl ModelService for FailingModelService {
        fn predict(&mut self, _image: &DynamicImage) -> Result<Vec<Detection>, ModelServiceError> {
            Err(ModelServiceError::InvalidOutput("boom".to_string()))
        }
    }

    fn robot() -> Detection {
        Detection {
            class_id: 0,
            confidence: 0.9,
            bbox: PixelBox::new(50., 25., 150., 75.),
        }
    }

    fn split_with_images(root: &Path, names: &[&str]) -> SplitDirs {
        let split = SplitDirs::new(root.join("training/images"), root.join("training/labels"));
        fs::create_dir_all(&split.images_dir).unwrap();
        for name in names {
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(200, 100, Rgb([10, 20, 30]))
                .save(split.images_dir.join(name))
                .unwrap();
        }
        split
    }

    fn label_file(split: &SplitDirs, stem: &str) -> PathBuf {
        split.labels_dir.join(format!("{}.txt", stem))
    }

    #[test]
    fn test_annotates_every_image() {
        let root = tempfile::tempdir().unwrap();
        let split = split_with_images(root.path(), &["a.png", "b.jpg"]);
        let mut annotator = Annotator::new(MockModelService::returning(vec![robot()]), 50);

        let outcome = annotator.annotate_split(&split).unwrap();

        assert_eq!(
            outcome,
            SplitOutcome {
                annotated: 2,
                skipped: 0,
                failed: 0
            }
        );
        assert_eq!(
            fs::read_to_string(label_file(&split, "a")).unwrap(),
            "0 0.500000 0.500000 0.500000 0.500000"
        );
        let labels = read_label_file(&label_file(&split, "b")).unwrap();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].bbox.is_normalized());
    }

    #[test]
    fn test_existing_labels_are_not_overwritten() {
        let root = tempfile::tempdir().unwrap();
        let split = split_with_images(root.path(), &["a.png", "b.png"]);
        fs::create_dir_all(&split.labels_dir).unwrap();
        fs::write(label_file(&split, "a"), "0 0.1 0.1 0.1 0.1").unwrap();

        let mut annotator = Annotator::new(MockModelService::returning(vec![robot()]), 50);
        let first = annotator.annotate_split(&split).unwrap();
        assert_eq!(first.annotated, 1);
        assert_eq!(first.skipped, 1);
        assert_eq!(annotator.model_service.calls, 1);
        assert_eq!(
            fs::read_to_string(label_file(&split, "a")).unwrap(),
            "0 0.1 0.1 0.1 0.1"
        );

        let written = fs::read_to_string(label_file(&split, "b")).unwrap();
        let second = annotator.annotate_split(&split).unwrap();
        assert_eq!(second.annotated, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(annotator.model_service.calls, 1);
        assert_eq!(fs::read_to_string(label_file(&split, "b")).unwrap(), written);
    }

    #[test]
    fn test_missing_images_dir_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let split = SplitDirs::new(root.path().join("test/images"), root.path().join("test/labels"));
        let mut annotator = Annotator::new(MockModelService::returning(vec![]), 50);

        let outcome = annotator.annotate_split(&split).unwrap();

        assert_eq!(outcome, SplitOutcome::default());
        assert!(!split.labels_dir.exists());
    }

    #[test]
    fn test_zero_detections_create_empty_file() {
        let root = tempfile::tempdir().unwrap();
        let split = split_with_images(root.path(), &["empty_floor.png"]);
        let mut annotator = Annotator::new(MockModelService::returning(vec![]), 50);

        let outcome = annotator.annotate_split(&split).unwrap();

        assert_eq!(outcome.annotated, 1);
        let path = label_file(&split, "empty_floor");
        assert!(path.exists());
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[test]
    fn test_per_image_failures_do_not_stop_the_batch() {
        let root = tempfile::tempdir().unwrap();
        let split = split_with_images(root.path(), &["good.png"]);
        fs::write(split.images_dir.join("corrupt.png"), b"not an image").unwrap();
        let mut annotator = Annotator::new(MockModelService::returning(vec![robot()]), 1);

        let outcome = annotator.annotate_split(&split).unwrap();

        assert_eq!(outcome.annotated, 1);
        assert_eq!(outcome.failed, 1);
        assert!(!label_file(&split, "corrupt").exists());
        assert!(label_file(&split, "good").exists());
    }

    #[test]
    fn test_inference_errors_are_counted() {
        let root = tempfile::tempdir().unwrap();
        let split = split_with_images(root.path(), &["a.png", "b.png"]);
        let mut annotator = Annotator::new(FailingModelService, 50);

        let outcome = annotator.annotate_split(&split).unwrap();

        assert_eq!(outcome.failed, 2);
        assert!(!label_file(&split, "a").exists());
    }

    #[test]
    fn test_empty_images_dir() {
        let root = tempfile::tempdir().unwrap();
        let split = split_with_images(root.path(), &[]);
        let mut annotator = Annotator::new(MockModelService::returning(vec![robot()]), 50);

        let outcome = annotator.annotate_split(&split).unwrap();

        assert_eq!(outcome, SplitOutcome::default());
        assert!(split.labels_dir.is_dir());
    }
}
