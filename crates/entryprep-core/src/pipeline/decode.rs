//! Image decoding from fetched bytes, with format detection and timeout support.

use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::RecordError;

/// Image decoder with a configurable timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Embedded EXIF container, if the body carried a readable one
    pub exif: Option<exif::Exif>,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode a fetched body on the blocking pool, bounded by the decode timeout.
    pub async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedImage, RecordError> {
        run_bounded(self.limits.decode_timeout_ms, move || Self::decode_sync(&bytes)).await
    }

    /// Synchronous decode (runs in spawn_blocking).
    pub fn decode_sync(bytes: &[u8]) -> Result<DecodedImage, RecordError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| RecordError::Decode(format!("cannot detect image format: {e}")))?;
        if reader.format().is_none() {
            return Err(RecordError::Decode("unrecognized image format".to_string()));
        }
        let image = reader
            .decode()
            .map_err(|e| RecordError::Decode(e.to_string()))?;

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            width,
            height,
            exif: read_exif(bytes),
        })
    }
}

/// Run a decode closure on the blocking pool, giving up after `timeout_ms`.
///
/// A timed-out closure keeps running to completion; its result is dropped.
async fn run_bounded<F>(timeout_ms: u64, f: F) -> Result<DecodedImage, RecordError>
where
    F: FnOnce() -> Result<DecodedImage, RecordError> + Send + 'static,
{
    match timeout(Duration::from_millis(timeout_ms), tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(RecordError::Unexpected(format!("decode task failed: {e}"))),
        Err(_) => Err(RecordError::Decode(format!(
            "decode timed out after {timeout_ms}ms"
        ))),
    }
}

/// Read the EXIF container from an encoded image, if there is one.
fn read_exif(bytes: &[u8]) -> Option<exif::Exif> {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
}
