use crate::{bbox::YoloBox, error::DatasetError};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

pub const LABEL_EXTENSION: &str = "txt";

/// One annotated object: `class_id center_x center_y width height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloLabel {
    pub class_id: u32,
    pub bbox: YoloBox,
}

impl fmt::Display for YoloLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id,
            self.bbox.center_x,
            self.bbox.center_y,
            self.bbox.width,
            self.bbox.height
        )
    }
}

/// Parses a single label line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<YoloLabel>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(format!("expected 5 fields, found {}", parts.len()));
    }

    let class_id: u32 = parts[0]
        .parse()
        .map_err(|_| format!("invalid class id '{}'", parts[0]))?;

    let mut values = [0f32; 4];
    for (value, part) in values.iter_mut().zip(&parts[1..]) {
        *value = part
            .parse()
            .map_err(|_| format!("invalid coordinate '{}'", part))?;
    }

    let bbox = YoloBox {
        center_x: values[0],
        center_y: values[1],
        width: values[2],
        height: values[3],
    };
    if !bbox.is_normalized() {
        return Err(format!("coordinates out of [0, 1]: {}", trimmed));
    }

    Ok(Some(YoloLabel { class_id, bbox }))
}

pub fn read_label_file(path: &Path) -> Result<Vec<YoloLabel>, DatasetError> {
    let content = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;

    let mut labels = Vec::new();
    for (index, line) in content.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(label)) => labels.push(label),
            Ok(None) => {}
            Err(message) => {
                return Err(DatasetError::LabelParse {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message,
                })
            }
        }
    }

    Ok(labels)
}

/// Writes the labels joined by newlines, without a trailing newline.
/// An empty slice produces an empty file.
pub fn write_label_file(path: &Path, labels: &[YoloLabel]) -> Result<(), DatasetError> {
    let content = labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    fs::write(path, content).map_err(|e| DatasetError::io(path, e))
}

/// `images/robot_01.png` -> `<labels_dir>/robot_01.txt`
pub fn label_path_for(image_path: &Path, labels_dir: &Path) -> Option<PathBuf> {
    let mut name = image_path.file_stem()?.to_os_string();
    name.push(".");
    name.push(LABEL_EXTENSION);
    Some(labels_dir.join(name))
}
