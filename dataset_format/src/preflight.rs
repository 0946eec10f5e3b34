use crate::{
    error::DatasetError,
    label::{label_path_for, read_label_file},
    layout::{list_images, SplitDirs},
};
use std::path::PathBuf;

/// Read-only summary of one split's images and labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitReport {
    pub name: String,
    pub images_dir_found: bool,
    pub images: usize,
    pub labelled: usize,
    pub missing_labels: usize,
    pub empty_labels: usize,
    pub boxes: usize,
    pub invalid: Vec<(PathBuf, String)>,
}

impl SplitReport {
    pub fn is_clean(&self) -> bool {
        self.images_dir_found
            && self.missing_labels == 0
            && self.empty_labels == 0
            && self.invalid.is_empty()
    }
}

pub fn scan_split(dirs: &SplitDirs, class_count: usize) -> Result<SplitReport, DatasetError> {
    let mut report = SplitReport {
        name: dirs.name(),
        ..Default::default()
    };

    if !dirs.images_dir.is_dir() {
        return Ok(report);
    }
    report.images_dir_found = true;

    let images = list_images(&dirs.images_dir)?;
    report.images = images.len();

    for image in &images {
        let Some(label_path) = label_path_for(image, &dirs.labels_dir) else {
            continue;
        };
        if !label_path.is_file() {
            report.missing_labels += 1;
            continue;
        }

        match read_label_file(&label_path) {
            Ok(labels) => {
                if let Some(label) = labels
                    .iter()
                    .find(|label| label.class_id as usize >= class_count)
                {
                    report.invalid.push((
                        label_path,
                        format!(
                            "class id {} is out of range for {} class(es)",
                            label.class_id, class_count
                        ),
                    ));
                    continue;
                }

                report.labelled += 1;
                if labels.is_empty() {
                    report.empty_labels += 1;
                }
                report.boxes += labels.len();
            }
            Err(e) => report.invalid.push((label_path, e.to_string())),
        }
    }

    tracing::debug!(
        split = %report.name,
        images = report.images,
        labelled = report.labelled,
        "Scanned split"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_split_counts() {
        let root = tempfile::tempdir().unwrap();
        let dirs = SplitDirs::new(
            root.path().join("training/images"),
            root.path().join("training/labels"),
        );
        fs::create_dir_all(&dirs.images_dir).unwrap();
        fs::create_dir_all(&dirs.labels_dir).unwrap();

        for name in ["a.png", "b.png", "c.jpg", "d.jpeg", "e.png"] {
            fs::write(dirs.images_dir.join(name), b"").unwrap();
        }
        fs::write(
            dirs.labels_dir.join("a.txt"),
            "0 0.5 0.5 0.1 0.1\n0 0.2 0.2 0.1 0.1",
        )
        .unwrap();
        fs::write(dirs.labels_dir.join("b.txt"), "").unwrap();
        fs::write(dirs.labels_dir.join("c.txt"), "0 0.5 0.5").unwrap();
        fs::write(dirs.labels_dir.join("d.txt"), "3 0.5 0.5 0.1 0.1").unwrap();

        let report = scan_split(&dirs, 1).unwrap();

        assert_eq!(report.name, "training");
        assert!(report.images_dir_found);
        assert_eq!(report.images, 5);
        assert_eq!(report.labelled, 2);
        assert_eq!(report.empty_labels, 1);
        assert_eq!(report.boxes, 2);
        assert_eq!(report.missing_labels, 1);
        assert_eq!(report.invalid.len(), 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_scan_missing_split() {
        let root = tempfile::tempdir().unwrap();
        let dirs = SplitDirs::new(root.path().join("test/images"), root.path().join("test/labels"));

        let report = scan_split(&dirs, 1).unwrap();

        assert!(!report.images_dir_found);
        assert_eq!(report.images, 0);
    }
}
