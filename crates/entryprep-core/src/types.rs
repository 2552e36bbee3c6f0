//! Core data types for the entryprep pipeline.
//!
//! These types cover one run end to end: the rows read from the input table,
//! the per-record outcome, the report rows, and the events streamed to the
//! presentation layer.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Header of the column holding the entry's file name.
pub const FILE_NAME_COLUMN: &str = "File Name";

/// Header of the column holding the entry's image URL.
pub const IMAGE_URL_COLUMN: &str = "Image: URL";

/// One row of the input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    #[serde(rename = "File Name")]
    pub file_name: String,

    #[serde(rename = "Image: URL")]
    pub image_url: String,
}

impl InputRecord {
    pub fn new(file_name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            image_url: image_url.into(),
        }
    }
}

/// One row of `image_metadata.csv`.
///
/// Dimensions and timestamps always describe the image as fetched, before
/// any resize or metadata stripping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageMetadataRecord {
    /// Name the image was saved under
    pub file_name: String,

    /// Name as given in the input table
    pub original_file_name: String,

    pub width: u32,

    pub height: u32,

    /// EXIF `DateTime` (last modification)
    pub date_time_created: Option<String>,

    /// EXIF `DateTimeOriginal`, falling back to `DateTimeDigitized`
    pub date_time_original: Option<String>,
}

/// One line of `processing_errors.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub original_file_name: String,
    pub error_message: String,
}

impl FailureRecord {
    pub fn new(original_file_name: impl Into<String>, error: &RecordError) -> Self {
        Self {
            original_file_name: original_file_name.into(),
            error_message: error.to_string(),
        }
    }
}

/// Result of processing a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Success {
        metadata: ImageMetadataRecord,
        /// Full-size variant was downscaled
        resized: bool,
        /// As-fetched dimensions, e.g. "5000x3000"
        original_size: String,
    },
    Failure(FailureRecord),
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingOutcome::Success { .. })
    }
}

/// Severity attached to a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Failure,
}

/// Incremental progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// `floor(index * 100 / total)` for the record just handled
    pub percent: u8,
    pub message: String,
    pub severity: Severity,
}

impl ProgressEvent {
    pub fn info(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
            severity: Severity::Info,
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Rows in the input table
    pub total: usize,

    /// Records saved successfully
    pub succeeded: usize,

    /// Records that failed
    pub failed: usize,

    /// Wall-clock run time in seconds
    pub total_seconds: f64,
}

impl ProcessingStats {
    /// Records actually attempted (less than `total` after cancellation).
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Terminal notification closing every event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub ok: bool,
    pub summary: String,
    pub stats: ProcessingStats,
}

/// Everything a run emits, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PipelineEvent {
    Progress(ProgressEvent),
    Completed(CompletionEvent),
}
