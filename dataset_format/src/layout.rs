use crate::error::DatasetError;
use serde::Deserialize;
use std::{
    ffi::OsStr,
    fs,
    path::{Component, Path, PathBuf},
};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Training, Split::Validation, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Validation => "validation",
            Split::Test => "test",
        }
    }

    /// `<data_root>/<split>/images` and `<data_root>/<split>/labels`.
    pub fn dirs(&self, data_root: &Path) -> SplitDirs {
        let split_root = data_root.join(self.as_str());
        SplitDirs {
            images_dir: split_root.join("images"),
            labels_dir: split_root.join("labels"),
        }
    }
}

/// A pair of image and label directories for one dataset split.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitDirs {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

impl SplitDirs {
    pub fn new(images_dir: impl Into<PathBuf>, labels_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            labels_dir: labels_dir.into(),
        }
    }

    /// Name of the directory holding `images/`, e.g. `training`.
    pub fn name(&self) -> String {
        self.images_dir
            .parent()
            .and_then(Path::file_name)
            .or_else(|| self.images_dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.images_dir.display().to_string())
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Lists the image files directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let entries = fs::read_dir(dir).map_err(|e| DatasetError::io(dir, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DatasetError::io(dir, e))?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }
    images.sort();

    Ok(images)
}

/// Swaps the last `images` component for `labels`, the way the trainer
/// locates label files. Paths without an `images` component are returned as is.
pub fn labels_dir_for(images_dir: &Path) -> PathBuf {
    let components: Vec<Component> = images_dir.components().collect();
    let position = components
        .iter()
        .rposition(|c| c.as_os_str() == OsStr::new("images"));

    match position {
        Some(index) => components
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == index {
                    OsStr::new("labels")
                } else {
                    c.as_os_str()
                }
            })
            .collect(),
        None => images_dir.to_path_buf(),
    }
}
