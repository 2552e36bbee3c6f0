//! EntryPrep Core - batch preparation of competition image entries.
//!
//! Takes an entry table (CSV with `File Name` and `Image: URL` columns),
//! downloads every image, and writes judging-ready full-size and thumbnail
//! JPEGs plus two reports.
//!
//! # Architecture
//!
//! Each record flows through a strictly sequential pipeline:
//!
//! ```text
//! Row → Filename → Fetch → Sniff → Decode → Metadata → Transform → Save
//! ```
//!
//! A failing record becomes a line in `processing_errors.txt`; the batch
//! always moves on. Successful records land in `image_metadata.csv`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use entryprep_core::{BatchPipeline, Config, PipelineEvent};
//!
//! #[tokio::main]
//! async fn main() -> entryprep_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = BatchPipeline::new(config)?;
//!
//!     let mut events = pipeline.start("entries.csv".into(), "out/entries".into());
//!     while let Some(event) = events.recv().await {
//!         if let PipelineEvent::Progress(p) = event {
//!             println!("[{:>3}%] {}", p.percent, p.message);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, EntryPrepError, PipelineError, RecordError, RecordResult, Result};
pub use pipeline::{BatchPipeline, CancellationFlag, EventStream, RunReport, RunState};
pub use report::ReportWriter;
pub use table::InputTable;
pub use types::{
    CompletionEvent, FailureRecord, ImageMetadataRecord, InputRecord, PipelineEvent,
    ProcessingOutcome, ProcessingStats, ProgressEvent, Severity,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
