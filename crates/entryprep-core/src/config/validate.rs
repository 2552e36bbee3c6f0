//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.processing;
        if p.full_size_bound.width == 0 || p.full_size_bound.height == 0 {
            return Err(ConfigError::ValidationError(
                "processing.full_size_bound dimensions must be > 0".into(),
            ));
        }
        if p.thumbnail_bound.width == 0 || p.thumbnail_bound.height == 0 {
            return Err(ConfigError::ValidationError(
                "processing.thumbnail_bound dimensions must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&p.encode_quality) {
            return Err(ConfigError::ValidationError(
                "processing.encode_quality must be between 1 and 100".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.timeout_secs must be > 0".into(),
            ));
        }
        if self.fetch.max_response_mb == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.max_response_mb must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.pipeline.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.event_buffer must be > 0".into(),
            ));
        }
        Ok(())
    }
}
