//! Input table loading and column validation.

use csv::ReaderBuilder;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::types::{InputRecord, FILE_NAME_COLUMN, IMAGE_URL_COLUMN};

/// A fully loaded, column-validated input table.
#[derive(Debug, Clone)]
pub struct InputTable {
    pub path: PathBuf,
    pub records: Vec<InputRecord>,
}

impl InputTable {
    /// Read the whole table and check for the required columns.
    ///
    /// Nothing is written anywhere; a rejected table leaves no trace.
    /// Quoted fields may contain commas and doubled or backslash-escaped quotes.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let read_err = |message: String| PipelineError::TableRead {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = ReaderBuilder::new()
            .escape(Some(b'\\'))
            .from_path(path)
            .map_err(|e| read_err(e.to_string()))?;

        let headers = reader.headers().map_err(|e| read_err(e.to_string()))?;
        let missing: Vec<String> = [FILE_NAME_COLUMN, IMAGE_URL_COLUMN]
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::TableRejected { missing });
        }

        let mut records = Vec::new();
        for (i, row) in reader.deserialize::<InputRecord>().enumerate() {
            // +2: header line plus 1-based numbering
            let record = row.map_err(|e| read_err(format!("row {}: {e}", i + 2)))?;
            records.push(record);
        }

        tracing::debug!("Loaded {} entries from {:?}", records.len(), path);
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
