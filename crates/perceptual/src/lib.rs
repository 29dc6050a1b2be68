//! # MediaTwin Perceptual Fingerprinting
//!
//! This crate turns decoded images and sampled video frames into fixed-width
//! perceptual fingerprints whose Hamming distance tracks visual similarity.
//!
//! ## Contract
//!
//! - Every algorithm consumes a [`PixelBuffer`] already normalized to its
//!   grid ([`HashAlgorithm::grid`]). Wrong dimensions or empty buffers are
//!   errors, never zero-filled output.
//! - Output is a pure function of `(pixels, config)`: no I/O, no clocks, no
//!   global state.
//!
//! Invariant: for the same pixels and the same [`PerceptualConfig`], the
//! fingerprints are bit identical.
//!
//! ## Algorithms
//!
//! With `g` the grid side (8 for 64-bit fingerprints, 16 for 256-bit):
//!
//! 1.  **Structural (`phash`)**: orthonormal DCT-II over a `4g × 4g`
//!     grayscale grid; the low-frequency `g × g` corner is thresholded at its
//!     median (DC excluded from the median).
//! 2.  **Gradient (`dhash`)**: compares each pixel of a `(g + 1) × g` grid
//!     with its right neighbour.
//! 3.  **Average (`ahash`)**: thresholds a `g × g` grid at its mean.
//! 4.  **Color histogram (`colorhash`)**: per 8×8 RGB cell, a 64-bin joint
//!     histogram thresholded at its median.
//!
//! Videos are sampled at a fixed interval, tiled into a collage, and hashed
//! with the average hash of the collage XOR a histogram of frame mean colors.
//!
//! ## Example Usage
//!
//! ```
//! use image::{DynamicImage, Rgb, RgbImage};
//! use perceptual::{HashAlgorithm, MediaHasher, PerceptualConfig};
//!
//! let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
//!     Rgb([(x * 3) as u8, (y * 5) as u8, 128])
//! }));
//! let hasher = MediaHasher::new(PerceptualConfig::default()).unwrap();
//! let set = hasher.compute_image(&img).unwrap();
//!
//! assert_eq!(set.len(), 4);
//! assert_eq!(set.get(HashAlgorithm::Structural).unwrap().to_hex().len(), 16);
//! ```
pub mod config;
pub mod dct;
pub mod fingerprint;
mod hasher;
mod hashes;
pub mod pixels;
pub mod prepare;
pub mod video;

pub use crate::config::{
    AspectPolicy, PerceptualConfig, PerceptualError, VideoConfig, MAX_FRAME_SIDE, MAX_VIDEO_FRAMES,
};
pub use crate::dct::DctBasis;
pub use crate::fingerprint::{
    distance_to_similarity, hamming_distance, similarity_to_distance, BitWidth, ColorMode,
    Fingerprint, FingerprintSet, GridSpec, HashAlgorithm, MediaKind,
};
pub use crate::hasher::MediaHasher;
pub use crate::pixels::PixelBuffer;
pub use crate::prepare::{decode_image, dominant_color, prepare};
pub use crate::video::{
    frame_timestamps, CollageLayout, FrameFingerprint, FrameSource, VideoFingerprints,
};

pub use image;

/// Current perceptual algorithm version for this crate.
pub const PERCEPTUAL_VERSION: u16 = 1;

/// Fingerprint an image with every algorithm in `cfg`.
///
/// Builds a throwaway [`MediaHasher`]; keep a hasher around when hashing
/// many images.
pub fn fingerprint_image(
    img: &image::DynamicImage,
    cfg: &PerceptualConfig,
) -> Result<FingerprintSet, PerceptualError> {
    MediaHasher::new(cfg.clone())?.compute_image(img)
}

/// Decode encoded image bytes and fingerprint them with every algorithm in `cfg`.
pub fn fingerprint_bytes(
    bytes: &[u8],
    cfg: &PerceptualConfig,
) -> Result<FingerprintSet, PerceptualError> {
    let img = decode_image(bytes)?;
    fingerprint_image(&img, cfg)
}
