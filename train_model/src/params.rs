use crate::config::{ExportConfig, TrainerConfig, TrainingConfig};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn arg(key: &str, value: impl Display) -> String {
    format!("{}={}", key, value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Augmentation {
    pub hsv_h: f32,
    pub hsv_s: f32,
    pub hsv_v: f32,
    pub degrees: f32,
    pub translate: f32,
    pub scale: f32,
    pub flipud: f32,
    pub fliplr: f32,
    pub mosaic: f32,
    pub mixup: f32,
}

impl Default for Augmentation {
    fn default() -> Self {
        Self {
            hsv_h: 0.015,
            hsv_s: 0.7,
            hsv_v: 0.4,
            degrees: 10.0,
            translate: 0.1,
            scale: 0.5,
            flipud: 0.0,
            fliplr: 0.5,
            mosaic: 1.0,
            mixup: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
    pub optimizer: String,
    pub lr0: f32,
    pub lrf: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub warmup_epochs: f32,
    pub warmup_momentum: f32,
    pub warmup_bias_lr: f32,
}

impl Default for Optimization {
    fn default() -> Self {
        Self {
            optimizer: "AdamW".to_string(),
            lr0: 0.01,
            lrf: 0.1,
            momentum: 0.937,
            weight_decay: 0.0005,
            warmup_epochs: 3.0,
            warmup_momentum: 0.8,
            warmup_bias_lr: 0.1,
        }
    }
}

/// Everything handed to `yolo detect train`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub data: PathBuf,
    pub model: String,
    pub epochs: u32,
    pub image_size: u32,
    pub batch_size: u32,
    pub project: PathBuf,
    pub name: String,
    pub patience: u32,
    pub save_period: i32,
    pub device: Option<String>,
    pub augmentation: Augmentation,
    pub optimization: Optimization,
}

impl TrainingParams {
    pub fn from_config(training: &TrainingConfig, trainer: &TrainerConfig) -> Self {
        Self {
            data: training.data_yaml.clone(),
            model: training.model_size.base_weights(),
            epochs: training.epochs,
            image_size: training.image_size,
            batch_size: training.batch_size,
            project: training.project.clone(),
            name: training.name.clone(),
            patience: training.patience,
            save_period: training.save_period,
            device: trainer.device.clone(),
            augmentation: Augmentation::default(),
            optimization: Optimization::default(),
        }
    }

    /// `key=value` arguments in a fixed order. `exist_ok` keeps the run
    /// directory at `<project>/<name>` across reruns.
    pub fn to_args(&self) -> Vec<String> {
        let aug = &self.augmentation;
        let opt = &self.optimization;

        let mut args = vec![
            arg("data", self.data.display()),
            arg("model", &self.model),
            arg("epochs", self.epochs),
            arg("imgsz", self.image_size),
            arg("batch", self.batch_size),
            arg("project", self.project.display()),
            arg("name", &self.name),
            arg("exist_ok", py_bool(true)),
            arg("patience", self.patience),
            arg("save", py_bool(true)),
            arg("save_period", self.save_period),
            arg("plots", py_bool(true)),
            arg("hsv_h", aug.hsv_h),
            arg("hsv_s", aug.hsv_s),
            arg("hsv_v", aug.hsv_v),
            arg("degrees", aug.degrees),
            arg("translate", aug.translate),
            arg("scale", aug.scale),
            arg("flipud", aug.flipud),
            arg("fliplr", aug.fliplr),
            arg("mosaic", aug.mosaic),
            arg("mixup", aug.mixup),
            arg("optimizer", &opt.optimizer),
            arg("lr0", opt.lr0),
            arg("lrf", opt.lrf),
            arg("momentum", opt.momentum),
            arg("weight_decay", opt.weight_decay),
            arg("warmup_epochs", opt.warmup_epochs),
            arg("warmup_momentum", opt.warmup_momentum),
            arg("warmup_bias_lr", opt.warmup_bias_lr),
            arg("val", py_bool(true)),
        ];
        if let Some(device) = &self.device {
            args.push(arg("device", device));
        }

        args
    }
}

/// Everything handed to `yolo export`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportParams {
    pub weights: PathBuf,
    pub image_size: u32,
    pub dynamic: bool,
    pub simplify: bool,
    pub opset: u32,
    pub half: bool,
}

impl ExportParams {
    pub fn from_config(weights: &Path, image_size: u32, export: &ExportConfig) -> Self {
        Self {
            weights: weights.to_path_buf(),
            image_size,
            dynamic: export.dynamic,
            simplify: export.simplify,
            opset: export.opset,
            half: export.half,
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        vec![
            arg("model", self.weights.display()),
            arg("format", "onnx"),
            arg("imgsz", self.image_size),
            arg("dynamic", py_bool(self.dynamic)),
            arg("simplify", py_bool(self.simplify)),
            arg("opset", self.opset),
            arg("half", py_bool(self.half)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_args_carry_full_parameter_set() {
        let params =
            TrainingParams::from_config(&TrainingConfig::default(), &TrainerConfig::default());

        let expected = [
            "data=dataset.yaml",
            "model=yolov8s.pt",
            "epochs=100",
            "imgsz=640",
            "batch=16",
            "project=runs/detect",
            "name=robot_detection",
            "exist_ok=True",
            "patience=20",
            "save=True",
            "save_period=10",
            "plots=True",
            "hsv_h=0.015",
            "hsv_s=0.7",
            "hsv_v=0.4",
            "degrees=10",
            "translate=0.1",
            "scale=0.5",
            "flipud=0",
            "fliplr=0.5",
            "mosaic=1",
            "mixup=0.1",
            "optimizer=AdamW",
            "lr0=0.01",
            "lrf=0.1",
            "momentum=0.937",
            "weight_decay=0.0005",
            "warmup_epochs=3",
            "warmup_momentum=0.8",
            "warmup_bias_lr=0.1",
            "val=True",
        ];

        assert_eq!(params.to_args(), expected);
    }

    #[test]
    fn test_device_is_appended_when_set() {
        let trainer = TrainerConfig {
            command: vec!["yolo".to_string()],
            device: Some("cpu".to_string()),
        };
        let params = TrainingParams::from_config(&TrainingConfig::default(), &trainer);

        assert_eq!(params.to_args().last().map(String::as_str), Some("device=cpu"));
    }

    #[test]
    fn test_export_args() {
        let params = ExportParams::from_config(
            Path::new("runs/detect/robot_detection/weights/best.pt"),
            640,
            &ExportConfig::default(),
        );

        assert_eq!(
            params.to_args(),
            [
                "model=runs/detect/robot_detection/weights/best.pt",
                "format=onnx",
                "imgsz=640",
                "dynamic=False",
                "simplify=True",
                "opset=12",
                "half=False",
            ]
        );
    }
}
