use dataset_format::DatasetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed while waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Trainer {step} exited with status {code:?}")]
    Failed { step: &'static str, code: Option<i32> },
    #[error("Trainer {step} interrupted by shutdown signal")]
    Interrupted { step: &'static str },
}

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Dataset descriptor {} not found", .0.display())]
    DescriptorMissing(PathBuf),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Training split {} contains no images", .0.display())]
    EmptyTrainingSplit(PathBuf),
    #[error("Trainer is not available: {0}")]
    TrainerUnavailable(#[source] TrainerError),
    #[error("Training failed: {0}")]
    Training(#[source] TrainerError),
    #[error("Best weights not found at {}", .0.display())]
    WeightsMissing(PathBuf),
    #[error("ONNX export failed: {0}")]
    Export(#[source] TrainerError),
    #[error("ONNX file not found after export: {}", .0.display())]
    ExportMissing(PathBuf),
    #[error("Exported ONNX model is unusable: {0}")]
    ExportInvalid(String),
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
