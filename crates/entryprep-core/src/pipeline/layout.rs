//! Directory and report locations for one run.

use std::path::{Path, PathBuf};

use crate::config::ProcessingConfig;
use crate::error::PipelineError;

/// Metadata report file name.
pub const METADATA_REPORT: &str = "image_metadata.csv";

/// Failure report file name.
pub const FAILURE_REPORT: &str = "processing_errors.txt";

/// Where a run writes its images and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub full_size_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
}

impl OutputLayout {
    /// Compute the layout; nothing is created yet.
    pub fn new(root: &Path, config: &ProcessingConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            full_size_dir: root.join(config.full_size_dir_name()),
            thumbnail_dir: root.join(config.thumbnail_dir_name()),
        }
    }

    /// Create both image directories. Existing directories are fine.
    pub fn create_dirs(&self) -> Result<(), PipelineError> {
        for dir in [&self.full_size_dir, &self.thumbnail_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PipelineError::Setup {
                path: dir.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn metadata_report(&self) -> PathBuf {
        self.root.join(METADATA_REPORT)
    }

    pub fn failure_report(&self) -> PathBuf {
        self.root.join(FAILURE_REPORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new(Path::new("/out/salon"), &ProcessingConfig::default());
        assert_eq!(
            layout.full_size_dir,
            PathBuf::from("/out/salon/4K-size-exifremoved")
        );
        assert_eq!(
            layout.thumbnail_dir,
            PathBuf::from("/out/salon/thumbnails-exifremoved")
        );
        assert_eq!(
            layout.metadata_report(),
            PathBuf::from("/out/salon/image_metadata.csv")
        );
    }

    #[test]
    fn test_create_dirs_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), &ProcessingConfig::default());
        layout.create_dirs().unwrap();
        layout.create_dirs().unwrap();
        assert!(layout.full_size_dir.is_dir());
        assert!(layout.thumbnail_dir.is_dir());
    }

    #[test]
    fn test_create_dirs_reports_blocked_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("run");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let layout = OutputLayout::new(&blocker, &ProcessingConfig::default());
        let err = layout.create_dirs().unwrap_err();
        assert!(matches!(err, PipelineError::Setup { .. }));
    }
}
