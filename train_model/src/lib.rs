mod export_check;
mod results;

pub mod app;
pub mod config;
pub mod error;
pub mod params;
pub mod trainer;

pub use app::{run_pipeline, start_app, TrainingSummary};
pub use results::{FinalMetrics, MetricsQuality, RunArtifacts};
pub use trainer::{Trainer, UltralyticsTrainer};
