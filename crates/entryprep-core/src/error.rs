//! Error types for the entryprep pipeline.
//!
//! Errors are split by blast radius: [`PipelineError`] aborts a whole run,
//! [`RecordError`] downgrades a single entry to a failure and the batch moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for entryprep operations.
#[derive(Error, Debug)]
pub enum EntryPrepError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Run-fatal pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors that abort a run before or outside of per-record processing.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input table lacks one or more required columns
    #[error("CSV file missing required columns: {}", quoted_list(.missing))]
    TableRejected { missing: Vec<String> },

    /// The input table could not be read or parsed
    #[error("Cannot read input table {path}: {message}")]
    TableRead { path: PathBuf, message: String },

    /// Output directories could not be prepared
    #[error("Cannot create output directory {path}: {message}")]
    Setup { path: PathBuf, message: String },

    /// A report file could not be written
    #[error("Cannot write report {path}: {message}")]
    Report { path: PathBuf, message: String },

    /// The HTTP client could not be built
    #[error("Cannot initialize HTTP client: {0}")]
    HttpClient(String),

    /// The background run task died
    #[error("Pipeline worker stopped unexpectedly: {0}")]
    Worker(String),
}

/// Per-record failure taxonomy.
///
/// The `Display` text of each variant is exactly what lands in the failure
/// report and the progress stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The row itself is unusable (empty file name or URL)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    #[error("HTTP error: status code {0}")]
    HttpStatus(u16),

    /// Server answered 2xx with no body
    #[error("Empty response from server")]
    EmptyResponse,

    /// Body is neither declared nor recognizable as an image
    #[error("Response is not an image (Content-Type: {content_type})")]
    NotAnImage { content_type: String },

    /// Body exceeded the configured size cap
    #[error("Response too large: exceeds {max_mb}MB")]
    TooLarge { max_mb: u64 },

    /// Body could not be decoded as an image
    #[error("Image processing error: {0}")]
    Decode(String),

    /// Full-size variant could not be encoded or written
    #[error("Error saving fullsize image: {0}")]
    SaveFullSize(String),

    /// Thumbnail variant could not be encoded or written
    #[error("Error saving thumbnail: {0}")]
    SaveThumbnail(String),

    /// Anything outside the named stages
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Convenience type alias for entryprep results.
pub type Result<T> = std::result::Result<T, EntryPrepError>;

/// Convenience type alias for per-record results.
pub type RecordResult<T> = std::result::Result<T, RecordError>;
