use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use train_model::{
    config::{self, LogFormat},
    start_app,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match config::get_configuration() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let log_level = &format!("{},ort=warn", config.log_level.as_str());

    let (json_layer, pretty_layer) = match config.log_format {
        LogFormat::Json => (
            Some(tracing_subscriber::fmt::layer().json().with_level(true)),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_target(false)),
        ),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(json_layer)
        .with(pretty_layer)
        .init();

    match start_app(config).await {
        Ok(summary) => {
            tracing::info!("Model ready: {}", summary.artifacts.onnx.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
