use crate::{
    error::DatasetError,
    layout::{labels_dir_for, Split, SplitDirs},
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

const DESCRIPTOR_TEMPLATE: &str = "\
path: ./data
train: training/images
val: validation/images
test: test/images

nc: 1
names:
  0: robot
";

/// Class names may be written as a list or as an `index: name` map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClassNames {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

/// The `dataset.yaml` file handed to the trainer.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDescriptor {
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub train: PathBuf,
    pub val: PathBuf,
    #[serde(default)]
    pub test: Option<PathBuf>,
    #[serde(default)]
    pub nc: Option<usize>,
    pub names: ClassNames,
    #[serde(skip)]
    descriptor_dir: PathBuf,
}

impl DatasetDescriptor {
    pub fn template() -> &'static str {
        DESCRIPTOR_TEMPLATE
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let raw = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        let mut descriptor: DatasetDescriptor =
            serde_yaml::from_str(&raw).map_err(|source| DatasetError::DescriptorParse {
                path: path.to_path_buf(),
                source,
            })?;
        descriptor.descriptor_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(descriptor)
    }

    /// Dataset root. Falls back to the descriptor's directory when `path` is absent.
    pub fn root(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => self.descriptor_dir.clone(),
        }
    }

    pub fn split_images_dir(&self, split: Split) -> Option<PathBuf> {
        let subpath = match split {
            Split::Training => Some(&self.train),
            Split::Validation => Some(&self.val),
            Split::Test => self.test.as_ref(),
        }?;
        Some(self.root().join(subpath))
    }

    pub fn split_dirs(&self, split: Split) -> Option<SplitDirs> {
        let images_dir = self.split_images_dir(split)?;
        let labels_dir = labels_dir_for(&images_dir);
        Some(SplitDirs::new(images_dir, labels_dir))
    }

    /// Class names ordered by index.
    pub fn class_names(&self) -> Vec<String> {
        match &self.names {
            ClassNames::List(names) => names.clone(),
            ClassNames::Map(names) => names.values().cloned().collect(),
        }
    }

    pub fn class_count(&self) -> usize {
        match &self.names {
            ClassNames::List(names) => names.len(),
            ClassNames::Map(names) => names.len(),
        }
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        let count = self.class_count();
        if count == 0 {
            return Err(DatasetError::DescriptorInvalid(
                "at least one class name is required".to_string(),
            ));
        }

        if let ClassNames::Map(names) = &self.names {
            if let Some((expected, found)) = names
                .keys()
                .enumerate()
                .find(|(expected, found)| expected != *found)
            {
                return Err(DatasetError::DescriptorInvalid(format!(
                    "class indices must be contiguous from 0: expected {}, found {}",
                    expected, found
                )));
            }
        }

        if let Some(nc) = self.nc {
            if nc != count {
                return Err(DatasetError::DescriptorInvalid(format!(
                    "nc is {} but {} class name(s) are declared",
                    nc, count
                )));
            }
        }

        Ok(())
    }
}
