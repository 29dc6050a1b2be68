//! Row-major pixel buffers handed to the hashing algorithms.

use image::{DynamicImage, RgbImage};

use crate::config::PerceptualError;
use crate::fingerprint::ColorMode;

/// ITU-R BT.601 luma weights.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// An owned, validated, row-major pixel grid (8 bits per channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    mode: ColorMode,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw bytes. Zero dimensions or a byte count that does not match
    /// `width * height * channels` are rejected.
    pub fn new(
        width: u32,
        height: u32,
        mode: ColorMode,
        data: Vec<u8>,
    ) -> Result<Self, PerceptualError> {
        if width == 0 || height == 0 || data.is_empty() {
            return Err(PerceptualError::EmptyBuffer);
        }
        let expected = width as usize * height as usize * mode.channels();
        if data.len() != expected {
            return Err(PerceptualError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            mode,
            data,
        })
    }

    pub fn gray(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PerceptualError> {
        Self::new(width, height, ColorMode::Gray, data)
    }

    pub fn rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PerceptualError> {
        Self::new(width, height, ColorMode::Rgb, data)
    }

    /// Copy an RGB image into a buffer of the requested mode.
    pub fn from_rgb_image(img: &RgbImage, mode: ColorMode) -> Result<Self, PerceptualError> {
        let rgb = Self::rgb(img.width(), img.height(), img.as_raw().clone())?;
        Ok(match mode {
            ColorMode::Rgb => rgb,
            ColorMode::Gray => rgb.to_gray(),
        })
    }

    pub fn from_dynamic(img: &DynamicImage, mode: ColorMode) -> Result<Self, PerceptualError> {
        Self::from_rgb_image(&img.to_rgb8(), mode)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels (not bytes).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGB triple at `(x, y)`. Gray buffers replicate the single channel.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = y as usize * self.width as usize + x as usize;
        match self.mode {
            ColorMode::Gray => {
                let v = self.data[idx];
                [v, v, v]
            }
            ColorMode::Rgb => {
                let o = idx * 3;
                [self.data[o], self.data[o + 1], self.data[o + 2]]
            }
        }
    }

    /// Grayscale intensities in row-major order, unrounded.
    pub fn luma(&self) -> Vec<f64> {
        match self.mode {
            ColorMode::Gray => self.data.iter().map(|&v| f64::from(v)).collect(),
            ColorMode::Rgb => self
                .data
                .chunks_exact(3)
                .map(|px| luma_of(px[0], px[1], px[2]))
                .collect(),
        }
    }

    /// Convert to an 8-bit grayscale buffer (rounded luma).
    pub fn to_gray(&self) -> PixelBuffer {
        match self.mode {
            ColorMode::Gray => self.clone(),
            ColorMode::Rgb => PixelBuffer {
                width: self.width,
                height: self.height,
                mode: ColorMode::Gray,
                data: self
                    .luma()
                    .into_iter()
                    .map(|v| v.round().clamp(0.0, 255.0) as u8)
                    .collect(),
            },
        }
    }
}

#[inline]
pub(crate) fn luma_of(r: u8, g: u8, b: u8) -> f64 {
    LUMA_R * f64::from(r) + LUMA_G * f64::from(g) + LUMA_B * f64::from(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_mismatched_buffers() {
        assert_eq!(
            PixelBuffer::gray(0, 8, Vec::new()),
            Err(PerceptualError::EmptyBuffer)
        );
        assert_eq!(
            PixelBuffer::rgb(2, 2, vec![0; 4]),
            Err(PerceptualError::BufferSizeMismatch {
                expected: 12,
                actual: 4
            })
        );
    }

    #[test]
    fn luma_uses_bt601_weights() {
        let buf = PixelBuffer::rgb(1, 1, vec![255, 0, 0]).unwrap();
        let luma = buf.luma();
        assert!((luma[0] - 76.245).abs() < 1e-9);
        assert_eq!(buf.to_gray().data(), &[76]);
    }

    #[test]
    fn gray_buffers_expand_to_rgb() {
        let buf = PixelBuffer::gray(2, 1, vec![10, 20]).unwrap();
        assert_eq!(buf.rgb_at(1, 0), [20, 20, 20]);
        assert_eq!(buf.pixel_count(), 2);
    }
}
