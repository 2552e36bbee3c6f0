//! Run reports: the metadata table and the failure list.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::PipelineError;
use crate::types::{FailureRecord, ImageMetadataRecord};

/// Column order of `image_metadata.csv`.
pub const METADATA_HEADERS: [&str; 6] = [
    "FileName",
    "OriginalFileName",
    "Width",
    "Height",
    "DateTimeCreated",
    "DateTimeOriginal",
];

/// First line of `processing_errors.txt`.
pub const FAILURE_BANNER: &str = "The following entries could not be processed:";

/// Writes run reports.
pub struct ReportWriter;

impl ReportWriter {
    /// Write the metadata table, header first, rows in the given order.
    ///
    /// The header is written even when there are no rows. Missing dates are
    /// empty cells.
    pub fn write_metadata(path: &Path, records: &[ImageMetadataRecord]) -> Result<(), PipelineError> {
        let report_err = |message: String| PipelineError::Report {
            path: path.to_path_buf(),
            message,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| report_err(e.to_string()))?;

        writer
            .write_record(METADATA_HEADERS)
            .map_err(|e| report_err(e.to_string()))?;
        for record in records {
            writer.serialize(record).map_err(|e| report_err(e.to_string()))?;
        }
        writer.flush().map_err(|e| report_err(e.to_string()))?;

        tracing::debug!("Wrote {} metadata rows to {:?}", records.len(), path);
        Ok(())
    }

    /// Write the failure list: a banner line, then one
    /// `"{originalFileName}: {errorMessage}"` line per failure.
    pub fn write_failures(path: &Path, failures: &[FailureRecord]) -> Result<(), PipelineError> {
        let report_err = |e: std::io::Error| PipelineError::Report {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut writer = BufWriter::new(File::create(path).map_err(report_err)?);
        writeln!(writer, "{FAILURE_BANNER}").map_err(report_err)?;
        for failure in failures {
            writeln!(
                writer,
                "{}: {}",
                failure.original_file_name, failure.error_message
            )
            .map_err(report_err)?;
        }
        writer.flush().map_err(report_err)?;

        tracing::debug!("Wrote {} failures to {:?}", failures.len(), path);
        Ok(())
    }
}
