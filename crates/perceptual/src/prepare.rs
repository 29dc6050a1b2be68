//! Decoding and aspect-ratio normalization ahead of hashing.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

use crate::config::{AspectPolicy, PerceptualError};
use crate::fingerprint::GridSpec;
use crate::pixels::PixelBuffer;

/// Decode an encoded image (PNG, JPEG, WebP, GIF, BMP).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PerceptualError> {
    if bytes.is_empty() {
        return Err(PerceptualError::EmptyBuffer);
    }
    image::load_from_memory(bytes).map_err(|err| PerceptualError::Decode(err.to_string()))
}

/// Resize `img` to the algorithm grid according to `policy`.
pub fn prepare(
    img: &DynamicImage,
    spec: GridSpec,
    policy: AspectPolicy,
) -> Result<PixelBuffer, PerceptualError> {
    let rgb = img.to_rgb8();
    let resized = fit_rgb(&rgb, spec.width, spec.height, policy)?;
    PixelBuffer::from_rgb_image(&resized, spec.color)
}

/// Resize an RGB image to exactly `width × height` under `policy`.
pub fn fit_rgb(
    rgb: &RgbImage,
    width: u32,
    height: u32,
    policy: AspectPolicy,
) -> Result<RgbImage, PerceptualError> {
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 || width == 0 || height == 0 {
        return Err(PerceptualError::EmptyBuffer);
    }

    let out = match policy {
        AspectPolicy::Stretch => imageops::resize(rgb, width, height, FilterType::Triangle),
        AspectPolicy::Crop => {
            let side = w.min(h);
            let square = imageops::crop_imm(rgb, (w - side) / 2, (h - side) / 2, side, side)
                .to_image();
            imageops::resize(&square, width, height, FilterType::Triangle)
        }
        AspectPolicy::Pad => {
            let scale = (f64::from(width) / f64::from(w)).min(f64::from(height) / f64::from(h));
            let inner_w = ((f64::from(w) * scale).round() as u32).clamp(1, width);
            let inner_h = ((f64::from(h) * scale).round() as u32).clamp(1, height);
            let inner = imageops::resize(rgb, inner_w, inner_h, FilterType::Triangle);
            let mut canvas = RgbImage::from_pixel(width, height, dominant_color(rgb));
            imageops::overlay(
                &mut canvas,
                &inner,
                i64::from((width - inner_w) / 2),
                i64::from((height - inner_h) / 2),
            );
            canvas
        }
    };
    Ok(out)
}

/// Most frequent color after quantizing to three bits per channel; the
/// returned color is the mean of the pixels in the winning bucket.
pub fn dominant_color(img: &RgbImage) -> Rgb<u8> {
    let mut counts = vec![0u64; 512];
    let mut sums = vec![[0u64; 3]; 512];
    for px in img.pixels() {
        let [r, g, b] = px.0;
        let bucket = (((r >> 5) as usize) << 6) | (((g >> 5) as usize) << 3) | (b >> 5) as usize;
        counts[bucket] += 1;
        sums[bucket][0] += u64::from(r);
        sums[bucket][1] += u64::from(g);
        sums[bucket][2] += u64::from(b);
    }

    let mut best = 0usize;
    for (bucket, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = bucket;
        }
    }
    let count = counts[best];
    if count == 0 {
        return Rgb([0, 0, 0]);
    }
    let [r, g, b] = sums[best];
    Rgb([(r / count) as u8, (g / count) as u8, (b / count) as u8])
}
