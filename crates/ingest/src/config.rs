//! Configuration types for media ingest.
//!
//! [`IngestConfig`] controls how raw media inputs are validated and how ids
//! are assigned when the caller does not supply one. It is cheap to clone and
//! deserializes from YAML or JSON as part of the top-level MediaTwin config.
//!
//! # Quick Start
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How ids are generated for inputs that arrive without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Random UUIDv4 per input.
    #[default]
    Random,
    /// UUIDv5 over the payload bytes in [`IngestConfig::id_namespace`].
    /// Identical bytes always receive the same id.
    ContentDerived,
}

/// Runtime configuration for ingest behavior.
///
/// # Fields
///
/// - `version`: configuration schema version, currently `1`
/// - `strip_control_chars`: remove control characters from caller ids
/// - `max_id_len`: longest accepted id, in bytes, after sanitization
/// - `max_payload_bytes`: largest accepted media payload (optional)
/// - `max_metadata_bytes`: largest accepted serialized metadata (optional)
/// - `id_strategy` / `id_namespace`: id generation for anonymous inputs
///
/// # Serialization
///
/// ```yaml
/// version: 1
/// strip_control_chars: true
/// max_id_len: 256
/// max_payload_bytes: 104857600
/// max_metadata_bytes: 65536
/// id_strategy: content_derived
/// ```
///
/// ```rust
/// use ingest::{IdStrategy, IngestConfig};
///
/// let config = IngestConfig {
///     max_payload_bytes: Some(10 * 1024 * 1024),
///     id_strategy: IdStrategy::ContentDerived,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Configuration schema version. Only `1` is accepted.
    pub version: u32,

    /// Whether to strip control characters from caller-supplied ids.
    ///
    /// Leading and trailing whitespace is always trimmed.
    pub strip_control_chars: bool,

    /// Maximum id length in bytes after sanitization.
    pub max_id_len: usize,

    /// Maximum payload size in bytes. `None` disables the check.
    pub max_payload_bytes: Option<usize>,

    /// Maximum serialized metadata size in bytes. `None` disables the check.
    pub max_metadata_bytes: Option<usize>,

    /// How ids are generated when the input carries none.
    pub id_strategy: IdStrategy,

    /// Namespace for [`IdStrategy::ContentDerived`] ids.
    pub id_namespace: Uuid,
}

impl Default for IngestConfig {
    /// Defaults suitable for development: no size limits, random ids.
    fn default() -> Self {
        Self {
            version: 1,
            strip_control_chars: true,
            max_id_len: 256,
            max_payload_bytes: None,
            max_metadata_bytes: None,
            id_strategy: IdStrategy::Random,
            id_namespace: Uuid::NAMESPACE_OID,
        }
    }
}

/// Errors produced by [`IngestConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unsupported ingest config version {0}; expected 1")]
    UnsupportedVersion(u32),

    /// A size limit was configured as zero, which would reject every input.
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },
}

impl IngestConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// Cheap, in-memory checks only; call once at start-up.
    ///
    /// ```rust
    /// use ingest::IngestConfig;
    ///
    /// let invalid = IngestConfig {
    ///     max_payload_bytes: Some(0),
    ///     ..Default::default()
    /// };
    /// assert!(invalid.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        if self.max_id_len == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_id_len",
            });
        }
        if self.max_payload_bytes == Some(0) {
            return Err(ConfigError::ZeroLimit {
                field: "max_payload_bytes",
            });
        }
        if self.max_metadata_bytes == Some(0) {
            return Err(ConfigError::ZeroLimit {
                field: "max_metadata_bytes",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(IngestConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_version() {
        let cfg = IngestConfig {
            version: 2,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_zero_limits() {
        let cfg = IngestConfig {
            max_metadata_bytes: Some(0),
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroLimit {
                field: "max_metadata_bytes"
            })
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: IngestConfig =
            serde_json::from_str(r#"{"max_payload_bytes": 1024, "id_strategy": "content_derived"}"#)
                .unwrap();
        assert_eq!(cfg.max_payload_bytes, Some(1024));
        assert_eq!(cfg.id_strategy, IdStrategy::ContentDerived);
        assert_eq!(cfg.max_id_len, 256);
        assert!(cfg.strip_control_chars);
    }
}
