//! Capture metadata extraction from decoded images.

use exif::{Exif, In, Tag, Value};

use super::decode::DecodedImage;

/// Dimensions and timestamps of an image as fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// EXIF `DateTime`
    pub date_time_created: Option<String>,
    /// EXIF `DateTimeOriginal`, else `DateTimeDigitized`
    pub date_time_original: Option<String>,
}

/// Extracts report metadata from decoded images.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract metadata from a decoded image.
    ///
    /// Width and height always come from the pixel data. Missing or unreadable
    /// EXIF only leaves the date fields empty; this never fails.
    pub fn extract(decoded: &DecodedImage) -> ImageMetadata {
        let (date_time_created, date_time_original) = match &decoded.exif {
            Some(exif) => (
                Self::get_ascii(exif, Tag::DateTime),
                Self::get_ascii(exif, Tag::DateTimeOriginal)
                    .or_else(|| Self::get_ascii(exif, Tag::DateTimeDigitized)),
            ),
            None => (None, None),
        };

        ImageMetadata {
            width: decoded.width,
            height: decoded.height,
            date_time_created,
            date_time_original,
        }
    }

    /// Get an ASCII field verbatim (e.g. "2024:01:02 03:04:05").
    fn get_ascii(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => parts.first().and_then(|raw| {
                let s = String::from_utf8_lossy(raw);
                let s = s.trim_end_matches('\0').trim();
                (!s.is_empty()).then(|| s.to_string())
            }),
            _ => None,
        }
    }
}
