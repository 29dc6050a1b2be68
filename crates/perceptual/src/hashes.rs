//! Gradient, average, and color-histogram hashes plus shared helpers.

use crate::config::PerceptualError;
use crate::fingerprint::{BitWidth, ColorMode, Fingerprint, HashAlgorithm};
use crate::pixels::PixelBuffer;

/// Side of one color-histogram cell; each cell yields one 64-bit lane.
const CELL: u32 = 8;

/// Reject buffers whose dimensions or color mode do not match the algorithm's grid.
pub(crate) fn check_grid(
    algorithm: HashAlgorithm,
    buf: &PixelBuffer,
    width: BitWidth,
) -> Result<(), PerceptualError> {
    let spec = algorithm.grid(width);
    if buf.width() != spec.width || buf.height() != spec.height {
        return Err(PerceptualError::GridMismatch {
            algorithm,
            expected_width: spec.width,
            expected_height: spec.height,
            width: buf.width(),
            height: buf.height(),
        });
    }
    if spec.color == ColorMode::Rgb && buf.mode() != ColorMode::Rgb {
        return Err(PerceptualError::ColorModeMismatch {
            algorithm,
            expected: ColorMode::Rgb,
        });
    }
    Ok(())
}

/// Median of `values`; even counts average the two middle values.
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Gradient hash over a `(g + 1) × g` grid: bit set when a pixel is brighter
/// than its right neighbour.
pub(crate) fn gradient_hash(
    buf: &PixelBuffer,
    width: BitWidth,
) -> Result<Fingerprint, PerceptualError> {
    check_grid(HashAlgorithm::Gradient, buf, width)?;
    let luma = buf.luma();
    let g = width.grid_side();
    let stride = g + 1;
    let bits = (0..g).flat_map(|y| {
        let row = &luma[y * stride..(y + 1) * stride];
        (0..g).map(move |x| row[x] > row[x + 1])
    });
    Fingerprint::from_bits(width, bits)
}

/// Average hash over a `g × g` grid: bit set when a pixel exceeds the mean.
pub(crate) fn average_hash(
    buf: &PixelBuffer,
    width: BitWidth,
) -> Result<Fingerprint, PerceptualError> {
    check_grid(HashAlgorithm::Average, buf, width)?;
    let luma = buf.luma();
    let mean = luma.iter().sum::<f64>() / luma.len() as f64;
    Fingerprint::from_bits(width, luma.iter().map(|&v| v > mean))
}

/// Color-histogram hash over an RGB `g × g` grid.
///
/// Every 8×8 cell becomes one lane: channels are quantized to four levels,
/// the 64 joint bins are counted, and a bin's bit is set when its count
/// exceeds the lane median. Wide fingerprints order the quadrant lanes
/// top-left, top-right, bottom-left, bottom-right from most significant.
pub(crate) fn color_histogram_hash(
    buf: &PixelBuffer,
    width: BitWidth,
) -> Result<Fingerprint, PerceptualError> {
    check_grid(HashAlgorithm::ColorHistogram, buf, width)?;
    let cells = width.grid_side() as u32 / CELL;
    let mut lanes = Vec::with_capacity((cells * cells) as usize);
    for cy in 0..cells {
        for cx in 0..cells {
            lanes.push(histogram_lane(buf, cx * CELL, cy * CELL));
        }
    }
    Fingerprint::from_lanes(&lanes)
}

fn histogram_lane(buf: &PixelBuffer, x0: u32, y0: u32) -> u64 {
    let mut counts = [0u32; 64];
    for y in y0..y0 + CELL {
        for x in x0..x0 + CELL {
            let [r, g, b] = buf.rgb_at(x, y);
            counts[color_bin(r, g, b)] += 1;
        }
    }
    lane_from_counts(&counts)
}

/// Joint bin of a color quantized to two bits per channel.
#[inline]
pub(crate) fn color_bin(r: u8, g: u8, b: u8) -> usize {
    ((r >> 6) as usize) * 16 + ((g >> 6) as usize) * 4 + (b >> 6) as usize
}

/// Threshold 64 bin counts at their median; bin 0 maps to the lane's top bit.
pub(crate) fn lane_from_counts(counts: &[u32; 64]) -> u64 {
    let as_f64: Vec<f64> = counts.iter().map(|&c| f64::from(c)).collect();
    let threshold = median(&as_f64);
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| f64::from(c) > threshold)
        .fold(0u64, |lane, (i, _)| lane | (1u64 << (63 - i)))
}
