//! Shared types for the robot detection dataset: box geometry, YOLO label
//! files, the `dataset.yaml` descriptor and the split directory layout.

pub mod bbox;
pub mod descriptor;
pub mod error;
pub mod label;
pub mod layout;
pub mod preflight;

pub use bbox::{PixelBox, YoloBox};
pub use descriptor::{ClassNames, DatasetDescriptor};
pub use error::DatasetError;
pub use label::{label_path_for, read_label_file, write_label_file, YoloLabel};
pub use layout::{list_images, Split, SplitDirs};
pub use preflight::{scan_split, SplitReport};
