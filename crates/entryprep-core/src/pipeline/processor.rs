//! Per-record orchestration: fetch → verify → decode → metadata → transform → save.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use crate::config::Config;
use crate::error::{RecordError, RecordResult};
use crate::types::{FailureRecord, ImageMetadataRecord, InputRecord, ProcessingOutcome};

use super::decode::{DecodedImage, ImageDecoder};
use super::fetch::ImageFetcher;
use super::filename::FilenamePolicy;
use super::layout::OutputLayout;
use super::metadata::MetadataExtractor;
use super::sniff::verify_image_content;
use super::transform::ImageTransformer;

/// Processes one input record at a time.
///
/// Holds the run's [`FilenamePolicy`], so a processor must not be shared
/// across runs or fed records out of order.
pub struct RecordProcessor {
    fetcher: Arc<dyn ImageFetcher>,
    decoder: ImageDecoder,
    transformer: Arc<ImageTransformer>,
    filenames: FilenamePolicy,
}

impl RecordProcessor {
    /// Create a processor for a single run.
    pub fn new(config: &Config, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            decoder: ImageDecoder::new(config.limits.clone()),
            transformer: Arc::new(ImageTransformer::new(config.processing.clone())),
            filenames: FilenamePolicy::new(config.processing.add_sequence_numbers),
        }
    }

    /// Process a record. Every failure is captured in the outcome, including
    /// a panic in any stage.
    pub async fn process(
        &mut self,
        record: &InputRecord,
        layout: &OutputLayout,
    ) -> ProcessingOutcome {
        let start = Instant::now();
        let result = AssertUnwindSafe(self.try_process(record, layout))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RecordError::Unexpected(panic_message(panic.as_ref()))));
        match result {
            Ok(outcome) => {
                tracing::debug!("Processed {:?} in {:?}", record.file_name, start.elapsed());
                outcome
            }
            Err(error) => {
                tracing::warn!("Failed {:?}: {}", record.file_name, error);
                ProcessingOutcome::Failure(FailureRecord::new(&record.file_name, &error))
            }
        }
    }

    async fn try_process(
        &mut self,
        record: &InputRecord,
        layout: &OutputLayout,
    ) -> RecordResult<ProcessingOutcome> {
        if record.file_name.trim().is_empty() {
            return Err(RecordError::InvalidRecord("empty 'File Name'".to_string()));
        }
        let url = record.image_url.trim();
        if url.is_empty() {
            return Err(RecordError::InvalidRecord("empty 'Image: URL'".to_string()));
        }

        let file_name = self.filenames.derive(&record.file_name);

        // Fetch
        let fetch_start = Instant::now();
        let fetched = self.fetcher.fetch(url).await?;
        tracing::trace!("  Fetch: {:?}", fetch_start.elapsed());

        // Verify (advisory)
        match verify_image_content(fetched.content_type.as_deref(), &fetched.bytes) {
            Some(true) => {}
            Some(false) => {
                let content_type = fetched
                    .content_type
                    .as_deref()
                    .map(|ct| String::from_utf8_lossy(ct).into_owned())
                    .unwrap_or_else(|| "none".to_string());
                return Err(RecordError::NotAnImage { content_type });
            }
            None => tracing::debug!("Content check inconclusive for {url}, decoding anyway"),
        }

        // Decode
        let decode_start = Instant::now();
        let decoded = self.decoder.decode(fetched.bytes).await?;
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        // Metadata reflects the image as fetched
        let metadata = MetadataExtractor::extract(&decoded);
        let original_size = format!("{}x{}", metadata.width, metadata.height);

        // Transform + save
        let save_start = Instant::now();
        let transformer = Arc::clone(&self.transformer);
        let full_path = layout.full_size_dir.join(&file_name);
        let thumb_path = layout.thumbnail_dir.join(&file_name);
        let resized = tokio::task::spawn_blocking(move || {
            render_and_save(&transformer, decoded, full_path, thumb_path)
        })
        .await
        .map_err(|e| RecordError::Unexpected(format!("image task failed: {e}")))??;
        tracing::trace!("  Transform + save: {:?}", save_start.elapsed());

        Ok(ProcessingOutcome::Success {
            metadata: ImageMetadataRecord {
                file_name,
                original_file_name: record.file_name.clone(),
                width: metadata.width,
                height: metadata.height,
                date_time_created: metadata.date_time_created,
                date_time_original: metadata.date_time_original,
            },
            resized,
            original_size,
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}

/// Transform, encode and write both variants. Returns whether the full-size
/// variant was downscaled.
fn render_and_save(
    transformer: &ImageTransformer,
    decoded: DecodedImage,
    full_path: PathBuf,
    thumb_path: PathBuf,
) -> RecordResult<bool> {
    let out = transformer.transform(decoded);

    let full = out
        .encode_full_size()
        .map_err(|e| RecordError::SaveFullSize(e.to_string()))?;
    std::fs::write(&full_path, full).map_err(|e| RecordError::SaveFullSize(e.to_string()))?;

    let thumb = out
        .encode_thumbnail()
        .map_err(|e| RecordError::SaveThumbnail(e.to_string()))?;
    std::fs::write(&thumb_path, thumb).map_err(|e| RecordError::SaveThumbnail(e.to_string()))?;

    Ok(out.resized)
}
