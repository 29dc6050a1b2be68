//! Configuration and error types for MediaTwin perceptual fingerprinting.
//!
//! This module defines the public configuration surface for the perceptual
//! layer. It performs no I/O, so fingerprinting stays a pure function of
//! `(pixels, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::{BitWidth, ColorMode, HashAlgorithm};

/// How an image whose aspect ratio differs from the target grid is normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectPolicy {
    /// Resize to the grid ignoring the aspect ratio.
    #[default]
    Stretch,
    /// Center-crop to a square first, then resize.
    Crop,
    /// Fit inside the grid and letterbox with the dominant color.
    Pad,
}

/// Largest accepted `VideoConfig::max_frames`.
pub const MAX_VIDEO_FRAMES: usize = 256;
/// Largest accepted `VideoConfig::frame_side`.
pub const MAX_FRAME_SIDE: u32 = 1024;

/// Frame sampling parameters for video fingerprinting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    /// Seconds between sampled frames.
    pub frame_interval_secs: f64,
    /// Upper bound on sampled frames.
    pub max_frames: usize,
    /// Side length each sampled frame is resized to before tiling.
    pub frame_side: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_interval_secs: 1.0,
            max_frames: 16,
            frame_side: 64,
        }
    }
}

impl VideoConfig {
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if !self.frame_interval_secs.is_finite() || self.frame_interval_secs <= 0.0 {
            return Err(PerceptualError::InvalidVideoConfig(format!(
                "frame_interval_secs must be a positive number (got {})",
                self.frame_interval_secs
            )));
        }
        if self.max_frames == 0 || self.max_frames > MAX_VIDEO_FRAMES {
            return Err(PerceptualError::InvalidVideoConfig(format!(
                "max_frames must be in 1..={MAX_VIDEO_FRAMES} (got {})",
                self.max_frames
            )));
        }
        if !(8..=MAX_FRAME_SIDE).contains(&self.frame_side) {
            return Err(PerceptualError::InvalidVideoConfig(format!(
                "frame_side must be in 8..={MAX_FRAME_SIDE} (got {})",
                self.frame_side
            )));
        }
        Ok(())
    }
}

/// Configuration for the perceptual fingerprinting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerceptualConfig {
    /// Configuration schema version.
    ///
    /// Any algorithmic change that can affect a fingerprint must bump this
    /// version, so stored fingerprints stay comparable.
    pub version: u32,
    /// Fingerprint width (64 or 256 bits).
    pub bits: BitWidth,
    /// Algorithms computed for every media item.
    pub algorithms: Vec<HashAlgorithm>,
    /// Aspect-ratio normalization applied before hashing.
    pub aspect: AspectPolicy,
    pub video: VideoConfig,
    /// Run the configured algorithms on the rayon pool.
    pub use_parallel: bool,
}

impl Default for PerceptualConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bits: BitWidth::Bits64,
            algorithms: HashAlgorithm::ALL.to_vec(),
            aspect: AspectPolicy::Stretch,
            video: VideoConfig::default(),
            use_parallel: false,
        }
    }
}

impl PerceptualConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bits(mut self, bits: BitWidth) -> Self {
        self.bits = bits;
        self
    }

    pub fn with_algorithms(mut self, algorithms: impl Into<Vec<HashAlgorithm>>) -> Self {
        self.algorithms = algorithms.into();
        self
    }

    pub fn with_aspect(mut self, aspect: AspectPolicy) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_video(mut self, video: VideoConfig) -> Self {
        self.video = video;
        self
    }

    /// Enable or disable running algorithms in parallel.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version < 1 {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.algorithms.is_empty() {
            return Err(PerceptualError::NoAlgorithms);
        }
        for (i, alg) in self.algorithms.iter().enumerate() {
            if self.algorithms[..i].contains(alg) {
                return Err(PerceptualError::DuplicateAlgorithm(*alg));
            }
        }
        self.video.validate()
    }
}

/// Errors returned by the perceptual fingerprinting pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PerceptualError {
    #[error("pixel buffer is empty")]
    EmptyBuffer,

    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error(
        "{algorithm} expects a {expected_width}x{expected_height} grid (got {width}x{height})"
    )]
    GridMismatch {
        algorithm: HashAlgorithm,
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("{algorithm} requires {expected} input")]
    ColorModeMismatch {
        algorithm: HashAlgorithm,
        expected: ColorMode,
    },

    #[error("invalid fingerprint hex '{0}'")]
    InvalidHex(String),

    #[error("invalid bit width {bits}; expected 64 or 256")]
    InvalidBitWidth { bits: u32 },

    #[error("fingerprint needs {expected} bits (got {actual})")]
    BitCountMismatch { expected: usize, actual: usize },

    #[error("unknown hash algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("unknown media kind '{0}'")]
    UnknownMediaKind(String),

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error("invalid config: algorithms must not be empty")]
    NoAlgorithms,

    #[error("invalid config: algorithm {0} listed twice")]
    DuplicateAlgorithm(HashAlgorithm),

    #[error("invalid video config: {0}")]
    InvalidVideoConfig(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("video duration {duration} yields no frame timestamps")]
    NoFrameTimestamps { duration: f64 },

    #[error("no frames could be extracted ({attempted} attempted)")]
    NoFramesExtracted { attempted: usize },

    #[error("frame source failed: {0}")]
    FrameSource(String),

    #[error("all {attempted} fingerprint algorithms failed; last error: {last_error}")]
    AllAlgorithmsFailed { attempted: usize, last_error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = PerceptualConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.bits, BitWidth::Bits64);
        assert_eq!(cfg.algorithms.len(), 4);
        assert_eq!(cfg.aspect, AspectPolicy::Stretch);
        assert_eq!(cfg.video.max_frames, 16);
        assert_eq!(cfg.video.frame_side, 64);
        assert!(!cfg.use_parallel);
    }

    #[test]
    fn config_builder_chain() {
        let cfg = PerceptualConfig::new()
            .with_bits(BitWidth::Bits256)
            .with_algorithms([HashAlgorithm::Gradient])
            .with_aspect(AspectPolicy::Pad)
            .with_parallel(true);

        assert_eq!(cfg.bits, BitWidth::Bits256);
        assert_eq!(cfg.algorithms, vec![HashAlgorithm::Gradient]);
        assert_eq!(cfg.aspect, AspectPolicy::Pad);
        assert!(cfg.use_parallel);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_validate_rejects_empty_algorithms() {
        let cfg = PerceptualConfig::new().with_algorithms(Vec::new());
        assert_eq!(cfg.validate(), Err(PerceptualError::NoAlgorithms));
    }

    #[test]
    fn config_validate_rejects_duplicates() {
        let cfg = PerceptualConfig::new()
            .with_algorithms([HashAlgorithm::Average, HashAlgorithm::Average]);
        assert_eq!(
            cfg.validate(),
            Err(PerceptualError::DuplicateAlgorithm(HashAlgorithm::Average))
        );
    }

    #[test]
    fn config_validate_invalid_version_zero() {
        let cfg = PerceptualConfig {
            version: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(PerceptualError::InvalidConfigVersion { version: 0 })
        ));
    }

    #[test]
    fn video_config_validation() {
        let bad_interval = VideoConfig {
            frame_interval_secs: 0.0,
            ..Default::default()
        };
        assert!(bad_interval.validate().is_err());

        let bad_frames = VideoConfig {
            max_frames: 0,
            ..Default::default()
        };
        assert!(bad_frames.validate().is_err());

        let nan = VideoConfig {
            frame_interval_secs: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn video_config_rejects_oversized_collage() {
        let too_many = VideoConfig {
            max_frames: MAX_VIDEO_FRAMES + 1,
            ..Default::default()
        };
        assert!(too_many.validate().is_err());

        let too_wide = VideoConfig {
            frame_side: MAX_FRAME_SIDE + 1,
            ..Default::default()
        };
        assert!(too_wide.validate().is_err());

        let at_limits = VideoConfig {
            max_frames: MAX_VIDEO_FRAMES,
            frame_side: MAX_FRAME_SIDE,
            ..Default::default()
        };
        assert!(at_limits.validate().is_ok());
    }

    #[test]
    fn config_serde_roundtrip_uses_wire_names() {
        let cfg = PerceptualConfig::new()
            .with_bits(BitWidth::Bits256)
            .with_aspect(AspectPolicy::Crop);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"bits\":256"));
        assert!(json.contains("\"phash\""));
        assert!(json.contains("\"crop\""));
        let back: PerceptualConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn config_deserialize_fills_defaults() {
        let cfg: PerceptualConfig = serde_json::from_str(r#"{"algorithms":["dct"]}"#).unwrap();
        assert_eq!(cfg.algorithms, vec![HashAlgorithm::Structural]);
        assert_eq!(cfg.version, 1);
    }

    #[test]
    fn error_display_mentions_grid() {
        let err = PerceptualError::GridMismatch {
            algorithm: HashAlgorithm::Average,
            expected_width: 8,
            expected_height: 8,
            width: 7,
            height: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("ahash"));
        assert!(msg.contains("8x8"));
        assert!(msg.contains("7x8"));
    }
}
