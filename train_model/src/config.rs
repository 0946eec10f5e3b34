use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

/// How the Ultralytics command line is launched, e.g. `["yolo"]` or
/// `["uv", "run", "yolo"]`.
#[derive(Debug, Deserialize, Clone)]
pub struct TrainerConfig {
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    #[serde(default)]
    pub device: Option<String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            device: None,
        }
    }
}

fn default_command() -> Vec<String> {
    vec!["yolo".to_string()]
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    N,
    S,
    M,
    L,
    X,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::N => "n",
            ModelSize::S => "s",
            ModelSize::M => "m",
            ModelSize::L => "l",
            ModelSize::X => "x",
        }
    }

    /// Pretrained checkpoint the trainer downloads on first use.
    pub fn base_weights(&self) -> String {
        format!("yolov8{}.pt", self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrainingConfig {
    #[serde(default = "default_data_yaml")]
    pub data_yaml: PathBuf,
    #[serde(default = "default_model_size")]
    pub model_size: ModelSize,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    #[serde(default = "default_project")]
    pub project: PathBuf,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_patience")]
    pub patience: u32,
    #[serde(default = "default_save_period")]
    pub save_period: i32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_yaml: default_data_yaml(),
            model_size: default_model_size(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            image_size: default_image_size(),
            project: default_project(),
            name: default_name(),
            patience: default_patience(),
            save_period: default_save_period(),
        }
    }
}

fn default_data_yaml() -> PathBuf {
    PathBuf::from("dataset.yaml")
}

fn default_model_size() -> ModelSize {
    ModelSize::S
}

fn default_epochs() -> u32 {
    100
}

fn default_batch_size() -> u32 {
    16
}

fn default_image_size() -> u32 {
    640
}

fn default_project() -> PathBuf {
    PathBuf::from("runs/detect")
}

fn default_name() -> String {
    "robot_detection".to_string()
}

fn default_patience() -> u32 {
    20
}

fn default_save_period() -> i32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_opset")]
    pub opset: u32,
    #[serde(default = "default_true")]
    pub simplify: bool,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub half: bool,
    #[serde(default = "default_true")]
    pub verify: bool,
    #[serde(default = "default_deploy_path")]
    pub deploy_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            opset: default_opset(),
            simplify: true,
            dynamic: false,
            half: false,
            verify: true,
            deploy_path: default_deploy_path(),
        }
    }
}

fn default_opset() -> u32 {
    12
}

fn default_true() -> bool {
    true
}

fn default_deploy_path() -> Option<PathBuf> {
    Some(PathBuf::from("models/onnx/robot_detection.onnx"))
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.trainer.command.is_empty() || self.trainer.command[0].trim().is_empty() {
            return Err("trainer.command must name an executable".to_string());
        }
        if self.training.epochs == 0 {
            return Err("training.epochs must be at least 1".to_string());
        }
        if self.training.batch_size == 0 {
            return Err("training.batch_size must be at least 1".to_string());
        }
        if self.training.image_size == 0 || self.training.image_size % 32 != 0 {
            return Err(format!(
                "training.image_size must be a positive multiple of 32, got {}",
                self.training.image_size
            ));
        }
        if self.training.name.trim().is_empty() {
            return Err("training.name must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            other => Err(format!(
                "{} is not a supported minimum log level. Use `debug`, `info` or `warn`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration").join("train_model");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    load_configuration(&configuration_directory, &environment)
}

pub fn load_configuration(
    configuration_directory: &Path,
    environment: &Environment,
) -> Result<Config, config::ConfigError> {
    build_configuration(configuration_directory, environment, environment_overrides())
}

/// `TM_TRAINER__COMMAND="uv run yolo"` is split on spaces into the command list.
fn environment_overrides() -> config::Environment {
    config::Environment::with_prefix("TM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("trainer.command")
}

fn build_configuration(
    configuration_directory: &Path,
    environment: &Environment,
    overrides: config::Environment,
) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(overrides)
        .build()?;

    let config = settings.try_deserialize::<Config>()?;
    // Runs before the subscriber exists, so the reason travels in the error.
    config.validate().map_err(|e| {
        config::ConfigError::Message(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}
