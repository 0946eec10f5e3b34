use crate::{
    error::TrainerError,
    params::{ExportParams, TrainingParams},
};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    signal,
};

#[async_trait]
pub trait Trainer: Send + Sync {
    /// Version of the training backend; fails when it cannot be launched.
    async fn probe(&self) -> Result<String, TrainerError>;
    async fn train(&self, params: &TrainingParams) -> Result<(), TrainerError>;
    async fn export(&self, params: &ExportParams) -> Result<(), TrainerError>;
}

/// Drives the Ultralytics `yolo` command line.
#[derive(Debug, Clone)]
pub struct UltralyticsTrainer {
    program: String,
    base_args: Vec<String>,
}

impl UltralyticsTrainer {
    /// `command` is the program followed by any fixed leading arguments.
    pub fn new(command: &[String]) -> Self {
        let (program, base_args) = match command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => ("yolo".to_string(), Vec::new()),
        };
        Self { program, base_args }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.base_args).args(args);
        command
    }

    async fn run(&self, step: &'static str, args: Vec<String>) -> Result<(), TrainerError> {
        tracing::debug!("Running {} {}", self.program, args.join(" "));

        let mut child = self
            .command(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TrainerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let completion = async {
            let (status, _, _) = tokio::join!(
                child.wait(),
                forward_lines(stdout, step),
                forward_lines(stderr, step)
            );
            status
        };

        tokio::select! {
            status = completion => {
                let status = status.map_err(|source| TrainerError::Wait {
                    program: self.program.clone(),
                    source,
                })?;
                if status.success() {
                    Ok(())
                } else {
                    Err(TrainerError::Failed {
                        step,
                        code: status.code(),
                    })
                }
            }
            _ = shutdown_signal() => {
                tracing::warn!("Shutdown signal received, stopping {}", step);
                Err(TrainerError::Interrupted { step })
            }
        }
    }
}

#[async_trait]
impl Trainer for UltralyticsTrainer {
    async fn probe(&self) -> Result<String, TrainerError> {
        let output = self
            .command(&["version".to_string()])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TrainerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TrainerError::Failed {
                step: "version",
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn train(&self, params: &TrainingParams) -> Result<(), TrainerError> {
        let mut args = vec!["detect".to_string(), "train".to_string()];
        args.extend(params.to_args());
        self.run("train", args).await
    }

    async fn export(&self, params: &ExportParams) -> Result<(), TrainerError> {
        let mut args = vec!["export".to_string()];
        args.extend(params.to_args());
        self.run("export", args).await
    }
}

/// Logs the child's output line by line. The pipe is drained to the end even
/// when a line cannot be read, so the child never blocks or dies on a closed pipe.
async fn forward_lines<R: AsyncRead + Unpin>(reader: Option<R>, step: &'static str) {
    let Some(reader) = reader else {
        return;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if !line.is_empty() {
                    tracing::info!(step, "{}", line);
                }
            }
            Err(e) => {
                tracing::debug!("Stopped reading trainer output: {}", e);
                if let Err(e) = io::copy(&mut reader, &mut io::sink()).await {
                    tracing::debug!("Failed to drain trainer output: {}", e);
                }
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
