//! Full-size and thumbnail variants: color normalization, bounded downscale,
//! metadata stripping and JPEG re-encoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageResult, RgbImage};

use crate::config::{Bound, ProcessingConfig};

use super::decode::DecodedImage;

/// Longest EXIF payload that fits in a single APP1 segment.
const MAX_APP1_PAYLOAD: usize = u16::MAX as usize - 2 - EXIF_HEADER.len();
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Output of [`ImageTransformer::transform`].
pub struct TransformedImage {
    pub full_size: DynamicImage,
    pub thumbnail: DynamicImage,
    /// Full-size variant was downscaled to fit the bound
    pub resized: bool,
    /// EXIF payload to embed in the full-size JPEG (never set when stripping)
    pub exif: Option<Vec<u8>>,
    quality: u8,
}

impl TransformedImage {
    /// Encode the full-size variant at the configured quality.
    pub fn encode_full_size(&self) -> ImageResult<Vec<u8>> {
        let jpeg = encode_jpeg(&self.full_size, Some(self.quality))?;
        Ok(match &self.exif {
            Some(payload) => embed_exif(jpeg, payload),
            None => jpeg,
        })
    }

    /// Encode the thumbnail at the encoder's default quality.
    pub fn encode_thumbnail(&self) -> ImageResult<Vec<u8>> {
        encode_jpeg(&self.thumbnail, None)
    }
}

/// Produces the full-size and thumbnail variants for a decoded image.
pub struct ImageTransformer {
    config: ProcessingConfig,
}

impl ImageTransformer {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Transform a decoded image.
    ///
    /// Metadata must be extracted before calling this; the decoded image is
    /// consumed.
    pub fn transform(&self, decoded: DecodedImage) -> TransformedImage {
        let mut image = normalize_color(decoded.image);

        let mut resized = false;
        if self.config.limit_full_size {
            let (w, h) = image.dimensions();
            if !self.config.full_size_bound.contains(w, h) {
                image = downscale(&image, self.config.full_size_bound, FilterType::CatmullRom);
                resized = true;
            }
        }

        let exif = if self.config.remove_metadata {
            image = strip_metadata(image);
            None
        } else {
            decoded.exif.map(|exif| exif.buf().to_vec())
        };

        let thumbnail = make_thumbnail(&image, self.config.thumbnail_bound);

        TransformedImage {
            full_size: image,
            thumbnail,
            resized,
            exif,
            quality: self.config.encode_quality,
        }
    }
}

/// Convert anything the JPEG encoder can't take (alpha, palette-expanded RGBA,
/// 16-bit, float) to 8-bit RGB. 8-bit gray and RGB pass through.
fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageRgb8(other.into_rgb8()),
    }
}

/// Shrink to fit `bound`, preserving aspect ratio.
fn downscale(image: &DynamicImage, bound: Bound, filter: FilterType) -> DynamicImage {
    image.resize(bound.width, bound.height, filter)
}

/// Thumbnail that fits `bound`; smaller images are never enlarged.
fn make_thumbnail(image: &DynamicImage, bound: Bound) -> DynamicImage {
    let (w, h) = image.dimensions();
    if bound.contains(w, h) {
        image.clone()
    } else {
        image.thumbnail(bound.width, bound.height)
    }
}

/// Copy pixels into a freshly allocated buffer of the same size and color type.
fn strip_metadata(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(src) => {
            let mut fresh = GrayImage::new(src.width(), src.height());
            fresh.copy_from_slice(src.as_raw());
            DynamicImage::ImageLuma8(fresh)
        }
        other => {
            let src = other.into_rgb8();
            let mut fresh = RgbImage::new(src.width(), src.height());
            fresh.copy_from_slice(src.as_raw());
            DynamicImage::ImageRgb8(fresh)
        }
    }
}

fn encode_jpeg(image: &DynamicImage, quality: Option<u8>) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = match quality {
        Some(q) => JpegEncoder::new_with_quality(&mut buf, q),
        None => JpegEncoder::new(&mut buf),
    };
    image.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Insert an EXIF APP1 segment after SOI, or after a leading JFIF APP0.
///
/// Payloads too large for one segment, or input that isn't a JPEG, are left
/// untouched.
pub(crate) fn embed_exif(jpeg: Vec<u8>, payload: &[u8]) -> Vec<u8> {
    if payload.len() > MAX_APP1_PAYLOAD || !jpeg.starts_with(&[0xFF, 0xD8]) {
        tracing::debug!("Skipping EXIF carry-over ({} byte payload)", payload.len());
        return jpeg;
    }
    let at = app1_insert_offset(&jpeg);
    let segment_len = (2 + EXIF_HEADER.len() + payload.len()) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + 4 + EXIF_HEADER.len() + payload.len());
    out.extend_from_slice(&jpeg[..at]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[at..]);
    out
}

/// Byte offset just past SOI and, when present and well-formed, APP0.
fn app1_insert_offset(jpeg: &[u8]) -> usize {
    const SOI_LEN: usize = 2;
    if jpeg.get(2..4) != Some(&[0xFF, 0xE0][..]) {
        return SOI_LEN;
    }
    let Some(len) = jpeg.get(4..6).map(|b| u16::from_be_bytes([b[0], b[1]]) as usize) else {
        return SOI_LEN;
    };
    // the length field counts itself but not the marker
    let end = 4 + len;
    if len < 2 || end > jpeg.len() {
        return SOI_LEN;
    }
    end
}
