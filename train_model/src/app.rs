use crate::{
    config::{Config, TrainingConfig},
    error::TrainingError,
    export_check::{deploy, file_size_mb, verify_onnx},
    params::{ExportParams, TrainingParams},
    results::{read_final_metrics, FinalMetrics, RunArtifacts},
    trainer::{Trainer, UltralyticsTrainer},
};
use dataset_format::{scan_split, DatasetDescriptor, Split};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub artifacts: RunArtifacts,
    pub metrics: Option<FinalMetrics>,
    pub onnx_size_mb: f64,
    pub deployed_to: Option<PathBuf>,
}

/// Loads the descriptor and scans every split it declares.
fn check_dataset(training: &TrainingConfig) -> Result<DatasetDescriptor, TrainingError> {
    if !training.data_yaml.is_file() {
        tracing::error!(
            "Create {} with content like:\n{}",
            training.data_yaml.display(),
            DatasetDescriptor::template()
        );
        return Err(TrainingError::DescriptorMissing(training.data_yaml.clone()));
    }

    let descriptor = DatasetDescriptor::load(&training.data_yaml)?;
    descriptor.validate()?;
    tracing::info!(
        "Found {} ({} class(es): {})",
        training.data_yaml.display(),
        descriptor.class_count(),
        descriptor.class_names().join(", ")
    );

    for split in Split::ALL {
        let Some(dirs) = descriptor.split_dirs(split) else {
            continue;
        };
        let report = scan_split(&dirs, descriptor.class_count())?;

        if split == Split::Training && report.images == 0 {
            return Err(TrainingError::EmptyTrainingSplit(dirs.images_dir));
        }
        if !report.images_dir_found {
            tracing::warn!(
                "{} split directory not found: {}",
                split.as_str(),
                dirs.images_dir.display()
            );
            continue;
        }

        tracing::info!(
            "{}: {} images, {} labelled, {} boxes",
            split.as_str(),
            report.images,
            report.labelled,
            report.boxes
        );
        if report.is_clean() {
            continue;
        }
        if report.missing_labels > 0 {
            tracing::warn!(
                "{}: {} image(s) without a label file",
                split.as_str(),
                report.missing_labels
            );
        }
        if report.empty_labels > 0 {
            tracing::warn!(
                "{}: {} empty label file(s), treated as background images",
                split.as_str(),
                report.empty_labels
            );
        }
        for (path, reason) in &report.invalid {
            tracing::warn!("{}: invalid label {}: {}", split.as_str(), path.display(), reason);
        }
    }

    Ok(descriptor)
}

pub async fn run_pipeline<T: Trainer>(
    trainer: &T,
    config: &Config,
) -> Result<TrainingSummary, TrainingError> {
    let training = &config.training;

    tracing::info!("Step 1: Checking dataset configuration...");
    check_dataset(training)?;

    tracing::info!("Step 2: Preparing trainer...");
    let version = trainer.probe().await.map_err(|e| {
        tracing::error!("Install the trainer with `pip install ultralytics` or set trainer.command");
        TrainingError::TrainerUnavailable(e)
    })?;
    let params = TrainingParams::from_config(training, &config.trainer);
    tracing::info!("Trainer version: {}", version);
    tracing::info!(
        "Base model: {} (downloaded automatically if not found)",
        params.model
    );

    tracing::info!("Step 3: Starting training...");
    tracing::info!("Epochs: {}", training.epochs);
    tracing::info!("Batch size: {}", training.batch_size);
    tracing::info!("Image size: {}x{}", training.image_size, training.image_size);
    trainer.train(&params).await.map_err(|e| {
        tracing::error!("Common issues:");
        tracing::error!("  - Out of memory: reduce training.batch_size (try 8 or 4)");
        tracing::error!("  - Dataset not found: check the paths in {}", training.data_yaml.display());
        tracing::error!("  - No GPU: training falls back to the CPU and is much slower");
        TrainingError::Training(e)
    })?;
    tracing::info!("Training completed");

    tracing::info!("Step 4: Training results");
    let artifacts = RunArtifacts::for_run(&training.project, &training.name);
    if !artifacts.best_weights.is_file() {
        return Err(TrainingError::WeightsMissing(artifacts.best_weights));
    }
    tracing::info!("Best model saved: {}", artifacts.best_weights.display());
    if artifacts.last_weights.is_file() {
        tracing::info!("Last model saved: {}", artifacts.last_weights.display());
    }

    let metrics = match read_final_metrics(&artifacts.results_csv) {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::warn!(
                "Could not read {}: {}",
                artifacts.results_csv.display(),
                e
            );
            None
        }
    };
    if let Some(metrics) = &metrics {
        tracing::info!(
            "Final epoch {:?}: precision {:?}, recall {:?}, mAP50 {:?}, mAP50-95 {:?}",
            metrics.epoch,
            metrics.precision,
            metrics.recall,
            metrics.map50,
            metrics.map50_95
        );
        if let Some(quality) = metrics.quality() {
            tracing::info!("Model quality: {}", quality);
        }
    }

    tracing::info!("Step 5: Exporting to ONNX format...");
    let export_params =
        ExportParams::from_config(&artifacts.best_weights, training.image_size, &config.export);
    trainer.export(&export_params).await.map_err(|e| {
        tracing::error!("Try updating the trainer: pip install --upgrade ultralytics");
        TrainingError::Export(e)
    })?;

    if !artifacts.onnx.is_file() {
        tracing::error!("Check {} for exported files", artifacts.run_dir.join("weights").display());
        return Err(TrainingError::ExportMissing(artifacts.onnx));
    }
    let onnx_size_mb = file_size_mb(&artifacts.onnx)?;
    tracing::info!("ONNX model exported: {}", artifacts.onnx.display());
    tracing::info!("File size: {:.2} MB", onnx_size_mb);

    if config.export.verify {
        verify_onnx(&artifacts.onnx, training.image_size, config.export.dynamic)?;
        tracing::info!("ONNX model loads and has the expected input shape");
    }

    let deployed_to = match &config.export.deploy_path {
        Some(destination) => {
            deploy(&artifacts.onnx, destination)?;
            tracing::info!("Copied ONNX model to {}", destination.display());
            Some(destination.clone())
        }
        None => None,
    };

    tracing::info!("Training complete");
    tracing::info!("Training plots and metrics: {}", artifacts.run_dir.display());
    match &deployed_to {
        Some(destination) => tracing::info!(
            "Next step: load {} in the client application",
            destination.display()
        ),
        None => tracing::info!(
            "Next step: copy {} to the client application's model directory",
            artifacts.onnx.display()
        ),
    }

    Ok(TrainingSummary {
        artifacts,
        metrics,
        onnx_size_mb,
        deployed_to,
    })
}

pub async fn start_app(config: Config) -> Result<TrainingSummary, TrainingError> {
    tracing::info!("Robot detection model training");
    let trainer = UltralyticsTrainer::new(&config.trainer.command);
    run_pipeline(&trainer, &config).await
}
