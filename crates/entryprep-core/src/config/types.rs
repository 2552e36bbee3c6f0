//! Sub-configuration structs with defaults matching the original tool.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum width/height a resize step must not exceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub width: u32,
    pub height: u32,
}

impl Bound {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when an image of the given size already fits inside the bound.
    pub fn contains(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }
}

/// Largest full-size output when `limit_full_size` is on (4K UHD).
pub const FULL_SIZE_BOUND: Bound = Bound::new(3840, 2160);

/// Thumbnail bounding box.
pub const THUMBNAIL_BOUND: Bound = Bound::new(810, 810);

/// JPEG quality used for the full-size variant.
pub const ENCODE_QUALITY: u8 = 100;

/// Per-run processing options.
///
/// Owned by the batch pipeline for the lifetime of a run and never mutated
/// once the run has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Downscale full-size images that exceed `full_size_bound`
    pub limit_full_size: bool,

    /// Drop embedded metadata from saved images
    pub remove_metadata: bool,

    /// Insert a per-identifier sequence number after numeric ID prefixes
    pub add_sequence_numbers: bool,

    pub full_size_bound: Bound,

    pub thumbnail_bound: Bound,

    /// JPEG quality (1-100) for the full-size variant
    pub encode_quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            limit_full_size: true,
            remove_metadata: true,
            add_sequence_numbers: false,
            full_size_bound: FULL_SIZE_BOUND,
            thumbnail_bound: THUMBNAIL_BOUND,
            encode_quality: ENCODE_QUALITY,
        }
    }
}

impl ProcessingConfig {
    /// Name of the full-size output directory for these options.
    pub fn full_size_dir_name(&self) -> String {
        let mut name = if self.limit_full_size {
            "4K-size".to_string()
        } else {
            "submitted-size".to_string()
        };
        if self.remove_metadata {
            name.push_str("-exifremoved");
        }
        name
    }

    /// Name of the thumbnail output directory for these options.
    pub fn thumbnail_dir_name(&self) -> &'static str {
        if self.remove_metadata {
            "thumbnails-exifremoved"
        } else {
            "thumbnails"
        }
    }
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds (connect + headers + body)
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Responses larger than this are rejected
    pub max_response_mb: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: format!("entryprep/{}", env!("CARGO_PKG_VERSION")),
            max_response_mb: 100,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            decode_timeout_ms: 30_000,
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Progress events buffered before the pipeline waits on the consumer
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { event_buffer: 64 }
    }
}

/// Output location settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Parent directory for run folders. Defaults to the input table's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_dir: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
