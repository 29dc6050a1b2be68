//! YAML Configuration File Support for MediaTwin
//!
//! Every stage configuration (perceptual, ingest, store, search, batch) lives
//! in a single YAML file. Each section is optional and falls back to its
//! defaults field by field.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "photo-library"
//!
//! perceptual:
//!   bits: 64
//!   algorithms: [phash, dhash, ahash, colorhash]
//!   aspect: crop
//!   use_parallel: true
//!   video:
//!     frame_interval_secs: 2.0
//!     max_frames: 16
//!
//! ingest:
//!   max_payload_bytes: 52428800
//!   id_strategy: content_derived
//!
//! store:
//!   backend:
//!     kind: redb
//!     path: "/var/lib/mediatwin/index.redb"
//!   compression:
//!     codec: zstd
//!     level: 3
//!
//! search:
//!   algorithm: phash
//!   threshold: 10
//!   limit: 100
//!   weights: { phash: 1.0, dhash: 0.5 }
//!
//! batch:
//!   chunk_size: 5
//!   continue_on_error: true
//!
//! auto_persist: true
//! ```

use std::fs;
use std::path::Path;

use index::StoreConfig;
use ingest::IngestConfig;
use matcher::SearchOptions;
use perceptual::PerceptualConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::BatchOptions;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for a [`MediaTwin`](crate::MediaTwin) instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MediaTwinConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    pub name: Option<String>,

    pub perceptual: PerceptualConfig,
    pub ingest: IngestConfig,
    pub store: StoreConfig,

    /// Defaults used by callers that do not build their own options.
    pub search: SearchOptions,
    pub batch: BatchOptions,

    /// Persist trees after every `add`, `remove`, and batch.
    pub auto_persist: bool,
}

impl Default for MediaTwinConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            perceptual: PerceptualConfig::default(),
            ingest: IngestConfig::default(),
            store: StoreConfig::default(),
            search: SearchOptions::default(),
            batch: BatchOptions::default(),
            auto_persist: true,
        }
    }
}

impl MediaTwinConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: MediaTwinConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.perceptual
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("perceptual: {e}")))?;
        self.ingest
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ingest: {e}")))?;
        self.search
            .validate(self.perceptual.bits.bits())
            .map_err(|e| ConfigLoadError::Validation(format!("search: {e}")))?;
        if !self.perceptual.algorithms.contains(&self.search.algorithm) {
            return Err(ConfigLoadError::Validation(format!(
                "search.algorithm {} is not in perceptual.algorithms",
                self.search.algorithm
            )));
        }
        self.batch
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("batch: {e}")))?;
        Ok(())
    }
}
