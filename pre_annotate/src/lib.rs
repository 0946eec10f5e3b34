mod annotator;
mod ort_service;

pub mod app;
pub mod config;
pub mod error;
pub mod model_service;

pub use annotator::{Annotator, SplitOutcome};
pub use app::{run_annotation, start_app};
pub use ort_service::OrtModelService;
