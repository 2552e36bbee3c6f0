//! Record processing pipeline.
//!
//! Stages, in the order a record flows through them:
//! - **filename**: Output name derivation (sequencing + sanitization)
//! - **fetch**: HTTP download behind the [`ImageFetcher`] seam
//! - **sniff**: Advisory content-type / magic-byte check
//! - **decode**: Bounded image decoding with EXIF capture
//! - **metadata**: Dimensions and capture dates for the report
//! - **transform**: Full-size and thumbnail variants, JPEG re-encoding
//! - **processor**: Per-record orchestration into a success or failure outcome
//! - **batch**: Table-level run, progress events and reports
//! - **channel**: Bounded event channel for backpressure

pub mod batch;
pub mod channel;
pub mod decode;
pub mod fetch;
pub mod filename;
pub mod layout;
pub mod metadata;
pub mod processor;
pub mod sniff;
pub mod transform;

#[cfg(test)]
mod fixtures;

// Re-exports for convenient access
pub use batch::{BatchPipeline, CancellationFlag, EventStream, RunReport, RunState};
pub use channel::bounded_channel;
pub use decode::{DecodedImage, ImageDecoder};
pub use fetch::{FetchedImage, HttpFetcher, ImageFetcher};
pub use filename::{sanitize, FilenamePolicy};
pub use layout::OutputLayout;
pub use metadata::{ImageMetadata, MetadataExtractor};
pub use processor::RecordProcessor;
pub use transform::{ImageTransformer, TransformedImage};
