//! Video fingerprinting: frame sampling, collage tiling, and the collage hash.
//!
//! Frames are sampled at a fixed interval, resized to a square, and tiled
//! into a collage. The collage's 8×8 average hash is combined by XOR with a
//! histogram hash over each frame's mean color, so both layout and palette
//! changes move the fingerprint.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{AspectPolicy, PerceptualError, VideoConfig};
use crate::fingerprint::{BitWidth, ColorMode, Fingerprint, FingerprintSet};
use crate::hashes::{average_hash, color_bin, lane_from_counts};
use crate::pixels::PixelBuffer;
use crate::prepare::fit_rgb;

/// Source of decoded video frames.
///
/// Implementations wrap a real decoder; the perceptual layer only asks for
/// the duration and for a frame at a timestamp.
pub trait FrameSource {
    fn duration_secs(&self) -> Result<f64, PerceptualError>;

    fn frame_at(&self, timestamp_secs: f64) -> Result<RgbImage, PerceptualError>;
}

/// Fingerprints of one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFingerprint {
    pub timestamp_secs: f64,
    pub fingerprints: FingerprintSet,
}

/// Per-frame fingerprints plus the collage hash of a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFingerprints {
    pub frames: Vec<FrameFingerprint>,
    pub collage: Option<Fingerprint>,
}

/// Grid used to tile `n` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollageLayout {
    pub cols: u32,
    pub rows: u32,
}

impl CollageLayout {
    pub fn for_frames(n: usize) -> Self {
        if n == 0 {
            return Self { cols: 0, rows: 0 };
        }
        let mut cols = (n as f64).sqrt().ceil() as usize;
        // Guard against float rounding for perfect squares.
        while cols * cols < n {
            cols += 1;
        }
        let rows = n.div_ceil(cols);
        Self {
            cols: cols as u32,
            rows: rows as u32,
        }
    }
}

/// Timestamps `0, Δ, 2Δ, …` strictly below `duration`, capped at `max_frames`.
pub fn frame_timestamps(duration_secs: f64, cfg: &VideoConfig) -> Vec<f64> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Vec::new();
    }
    (0..cfg.max_frames)
        .map(|i| i as f64 * cfg.frame_interval_secs)
        .take_while(|&t| t < duration_secs)
        .collect()
}

/// Sample frames from `source`, resized to `frame_side` squares.
///
/// Frames that fail to decode are logged and skipped.
pub fn extract_frames(
    source: &dyn FrameSource,
    cfg: &VideoConfig,
) -> Result<Vec<(f64, RgbImage)>, PerceptualError> {
    let duration = source.duration_secs()?;
    let timestamps = frame_timestamps(duration, cfg);
    if timestamps.is_empty() {
        return Err(PerceptualError::NoFrameTimestamps { duration });
    }

    let attempted = timestamps.len();
    let mut frames = Vec::with_capacity(attempted);
    for ts in timestamps {
        let frame = source
            .frame_at(ts)
            .and_then(|img| fit_rgb(&img, cfg.frame_side, cfg.frame_side, AspectPolicy::Stretch));
        match frame {
            Ok(img) => frames.push((ts, img)),
            Err(err) => warn!(timestamp_secs = ts, error = %err, "video_frame_skipped"),
        }
    }

    if frames.is_empty() {
        return Err(PerceptualError::NoFramesExtracted { attempted });
    }
    Ok(frames)
}

/// Tile frames row-major into a collage; unused cells stay black.
pub fn build_collage(frames: &[RgbImage], side: u32) -> RgbImage {
    let layout = CollageLayout::for_frames(frames.len());
    let mut collage = RgbImage::from_pixel(layout.cols * side, layout.rows * side, Rgb([0, 0, 0]));
    for (i, frame) in frames.iter().enumerate() {
        let col = i as u32 % layout.cols;
        let row = i as u32 / layout.cols;
        imageops::replace(
            &mut collage,
            frame,
            i64::from(col * side),
            i64::from(row * side),
        );
    }
    collage
}

/// 64-bit collage hash: average hash of the collage XOR the mean-color histogram hash.
pub fn collage_hash(frames: &[RgbImage], side: u32) -> Result<Fingerprint, PerceptualError> {
    if frames.is_empty() {
        return Err(PerceptualError::NoFramesExtracted { attempted: 0 });
    }
    let collage = build_collage(frames, side);
    let thumb = imageops::resize(&collage, 8, 8, FilterType::Triangle);
    let gray = PixelBuffer::from_rgb_image(&thumb, ColorMode::Gray)?;
    let layout = average_hash(&gray, BitWidth::Bits64)?;
    Ok(layout ^ mean_color_hash(frames))
}

fn mean_color_hash(frames: &[RgbImage]) -> Fingerprint {
    let mut counts = [0u32; 64];
    for frame in frames {
        let [r, g, b] = mean_color(frame);
        counts[color_bin(r, g, b)] += 1;
    }
    Fingerprint::from_u64(lane_from_counts(&counts))
}

fn mean_color(img: &RgbImage) -> [u8; 3] {
    let n = u64::from(img.width()) * u64::from(img.height());
    if n == 0 {
        return [0, 0, 0];
    }
    let mut sums = [0u64; 3];
    for px in img.pixels() {
        for (sum, &c) in sums.iter_mut().zip(px.0.iter()) {
            *sum += u64::from(c);
        }
    }
    [
        (sums[0] / n) as u8,
        (sums[1] / n) as u8,
        (sums[2] / n) as u8,
    ]
}
