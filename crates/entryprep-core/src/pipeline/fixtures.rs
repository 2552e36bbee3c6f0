//! In-memory image fixtures for tests.

use async_trait::async_trait;
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use crate::error::{RecordError, RecordResult};

use super::fetch::{FetchedImage, ImageFetcher};
use super::transform::embed_exif;

pub(crate) fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A gradient JPEG with no metadata.
pub(crate) fn plain_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// A JPEG carrying the given ASCII EXIF tags.
pub(crate) fn jpeg_with_exif(width: u32, height: u32, tags: &[(Tag, &str)]) -> Vec<u8> {
    let fields: Vec<Field> = tags
        .iter()
        .map(|(tag, value)| Field {
            tag: *tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![value.as_bytes().to_vec()]),
        })
        .collect();

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();

    embed_exif(plain_jpeg(width, height), tiff.get_ref())
}

/// Serves canned results keyed by URL; unknown URLs fail like a refused connection.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    responses: HashMap<String, RecordResult<FetchedImage>>,
    panics: HashSet<String>,
}

impl FakeFetcher {
    pub(crate) fn image(self, url: &str, bytes: Vec<u8>) -> Self {
        self.body(url, "image/jpeg", &bytes)
    }

    pub(crate) fn body(mut self, url: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            Ok(FetchedImage {
                bytes: bytes.to_vec(),
                content_type: Some(content_type.as_bytes().to_vec()),
            }),
        );
        self
    }

    pub(crate) fn error(mut self, url: &str, error: RecordError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    /// Panic instead of answering for `url`.
    pub(crate) fn panic_on(mut self, url: &str) -> Self {
        self.panics.insert(url.to_string());
        self
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> RecordResult<FetchedImage> {
        if self.panics.contains(url) {
            panic!("fetcher bug for {url}");
        }
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(RecordError::Network("connection refused".into())))
    }
}
