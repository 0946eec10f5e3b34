use crate::error::TrainingError;
use ort::session::Session;
use std::{fs, path::Path};

pub fn file_size_mb(path: &Path) -> Result<f64, TrainingError> {
    let metadata = fs::metadata(path).map_err(|source| TrainingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(metadata.len() as f64 / (1024.0 * 1024.0))
}

/// Checks an image input shape against `[1, 3, size, size]`. Dynamic exports
/// report the batch and spatial dimensions as `-1`.
fn check_input_shape(shape: &[i64], image_size: u32, dynamic: bool) -> Result<(), String> {
    let expected = [1, 3, image_size as i64, image_size as i64];
    let matches = shape.len() == expected.len()
        && shape
            .iter()
            .zip(expected)
            .enumerate()
            .all(|(axis, (&actual, expected))| {
                actual == expected || (dynamic && axis != 1 && actual == -1)
            });

    if matches {
        Ok(())
    } else {
        Err(format!("shape {:?}, expected {:?}", shape, expected))
    }
}

/// Loads the exported model and checks it takes a single image tensor and
/// produces `output0`.
pub fn verify_onnx(path: &Path, image_size: u32, dynamic: bool) -> Result<(), TrainingError> {
    let session = Session::builder()?.commit_from_file(path)?;

    match session.inputs.as_slice() {
        [input] => {
            let shape = input.input_type.tensor_shape().ok_or_else(|| {
                TrainingError::ExportInvalid(format!("input `{}` is not a tensor", input.name))
            })?;
            check_input_shape(&shape[..], image_size, dynamic).map_err(|e| {
                TrainingError::ExportInvalid(format!("input `{}` has {}", input.name, e))
            })?;
        }
        inputs => {
            return Err(TrainingError::ExportInvalid(format!(
                "expected a single image input, found {}",
                inputs.len()
            )))
        }
    }

    if !session.outputs.iter().any(|output| output.name == "output0") {
        return Err(TrainingError::ExportInvalid(
            "missing `output0` detection output".to_string(),
        ));
    }

    Ok(())
}

/// Copies the exported model to where the client application loads it from.
pub fn deploy(source: &Path, destination: &Path) -> Result<(), TrainingError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| TrainingError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::copy(source, destination).map_err(|source| TrainingError::Io {
        path: destination.to_path_buf(),
        source,
    })?;
    Ok(())
}
