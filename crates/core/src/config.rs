use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::options::ProcessingOptions;

pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_FILES_PER_INGEST: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Constraints enforced at the ingestion boundary, before a file enters the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestLimits {
    pub max_file_bytes: u64,
    pub max_files_per_ingest: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_BYTES,
            max_files_per_ingest: MAX_FILES_PER_INGEST,
        }
    }
}

/// Bounds for the image normalizer. The defaults keep receipts legible while
/// bounding recognition latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self { max_width: 800, max_height: 1000, jpeg_quality: 80 }
    }
}

/// Top-level configuration, loadable from TOML:
///
/// ```toml
/// [options]
/// languages = ["eng", "fra"]
/// compress_image = true
///
/// [limits]
/// max_files_per_ingest = 10
///
/// [normalize]
/// max_width = 800
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub options: ProcessingOptions,
    pub limits: IngestLimits,
    pub normalize: NormalizeSettings,
}

impl ScanConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("limits.max_file_bytes must be > 0".into()));
        }
        if self.limits.max_files_per_ingest == 0 {
            return Err(ConfigError::Invalid("limits.max_files_per_ingest must be > 0".into()));
        }
        if self.normalize.max_width == 0 || self.normalize.max_height == 0 {
            return Err(ConfigError::Invalid("normalize bounds must be > 0".into()));
        }
        if !(1..=100).contains(&self.normalize.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "normalize.jpeg_quality must be 1-100, got {}",
                self.normalize.jpeg_quality
            )));
        }
        Ok(())
    }
}
