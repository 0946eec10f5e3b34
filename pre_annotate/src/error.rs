use dataset_format::DatasetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelServiceError {
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),
}

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to load model: {0}")]
    ModelLoad(#[source] ModelServiceError),
    #[error("Inference failed: {0}")]
    Inference(#[from] ModelServiceError),
    #[error("Failed to read image {}: {source}", .path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to create labels directory {}: {source}", .path.display())]
    LabelsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
