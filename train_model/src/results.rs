use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

/// Files the trainer leaves under `<project>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub run_dir: PathBuf,
    pub best_weights: PathBuf,
    pub last_weights: PathBuf,
    pub onnx: PathBuf,
    pub results_csv: PathBuf,
}

impl RunArtifacts {
    pub fn for_run(project: &Path, name: &str) -> Self {
        let run_dir = project.join(name);
        let weights = run_dir.join("weights");
        Self {
            best_weights: weights.join("best.pt"),
            last_weights: weights.join("last.pt"),
            onnx: weights.join("best.onnx"),
            results_csv: run_dir.join("results.csv"),
            run_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinalMetrics {
    pub epoch: Option<u32>,
    pub precision: Option<f32>,
    pub recall: Option<f32>,
    pub map50: Option<f32>,
    pub map50_95: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsQuality {
    Excellent,
    Good,
    NeedsWork,
}

impl fmt::Display for MetricsQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MetricsQuality::Excellent => "excellent",
            MetricsQuality::Good => "good",
            MetricsQuality::NeedsWork => "needs more data or epochs",
        };
        f.write_str(text)
    }
}

impl FinalMetrics {
    /// Rated on mAP50: above 0.8 is excellent, above 0.7 good.
    pub fn quality(&self) -> Option<MetricsQuality> {
        let map50 = self.map50?;
        Some(if map50 > 0.8 {
            MetricsQuality::Excellent
        } else if map50 > 0.7 {
            MetricsQuality::Good
        } else {
            MetricsQuality::NeedsWork
        })
    }
}

/// Reads the last epoch of the trainer's `results.csv`. A missing file is `Ok(None)`.
pub fn read_final_metrics(path: &Path) -> io::Result<Option<FinalMetrics>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(parse_metrics(&content))
}

fn parse_metrics(content: &str) -> Option<FinalMetrics> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header: Vec<&str> = lines.next()?.split(',').map(str::trim).collect();
    let last: Vec<&str> = lines.last()?.split(',').map(str::trim).collect();

    let float = |name: &str| column(&header, &last, name).and_then(|v| v.parse::<f32>().ok());

    Some(FinalMetrics {
        epoch: float("epoch").map(|v| v as u32),
        precision: float("metrics/precision(B)"),
        recall: float("metrics/recall(B)"),
        map50: float("metrics/mAP50(B)"),
        map50_95: float("metrics/mAP50-95(B)"),
    })
}

fn column<'a>(header: &[&str], row: &[&'a str], name: &str) -> Option<&'a str> {
    let index = header.iter().position(|h| *h == name)?;
    row.get(index).copied()
}
