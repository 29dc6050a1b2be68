#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use mediatwin::{FrameSource, MediaTwin, MediaTwinConfig, PerceptualError, VideoDecoder};

pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A smooth diagonal gradient; `seed` shifts its phase.
pub fn gradient(seed: u8) -> RgbImage {
    RgbImage::from_fn(64, 64, |x, y| {
        let v = (x * 3 + y * 2) as u8;
        Rgb([v.wrapping_add(seed), (y * 4) as u8, seed])
    })
}

/// Blocky pattern unrelated to [`gradient`].
pub fn checkerboard(cell: u32) -> RgbImage {
    RgbImage::from_fn(64, 64, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgb([250, 250, 250])
        } else {
            Rgb([5, 5, 5])
        }
    })
}

pub fn gradient_png(seed: u8) -> Vec<u8> {
    encode_png(&gradient(seed))
}

/// Minimal MP4 header followed by a seed byte read by [`SyntheticDecoder`].
pub fn synthetic_mp4(seed: u8) -> Vec<u8> {
    let mut bytes = vec![0, 0, 0, 0x18];
    bytes.extend_from_slice(b"ftypisom");
    bytes.extend_from_slice(&[0; 12]);
    bytes.push(seed);
    bytes
}

pub struct SyntheticDecoder;

struct SyntheticVideo {
    seed: u8,
}

impl FrameSource for SyntheticVideo {
    fn duration_secs(&self) -> Result<f64, PerceptualError> {
        Ok(4.0)
    }

    fn frame_at(&self, timestamp_secs: f64) -> Result<RgbImage, PerceptualError> {
        let shift = (timestamp_secs as u8).wrapping_mul(16);
        Ok(RgbImage::from_fn(32, 32, |x, y| {
            Rgb([(x * 8) as u8 ^ self.seed, (y * 8) as u8, shift])
        }))
    }
}

impl VideoDecoder for SyntheticDecoder {
    fn open<'a>(&self, bytes: &'a [u8]) -> Result<Box<dyn FrameSource + 'a>, PerceptualError> {
        let seed = bytes.last().copied().unwrap_or_default();
        Ok(Box::new(SyntheticVideo { seed }))
    }
}

pub fn connected_twin() -> MediaTwin {
    connected_with(MediaTwinConfig::default())
}

pub fn connected_with(config: MediaTwinConfig) -> MediaTwin {
    let mut twin = MediaTwin::in_memory(config)
        .unwrap()
        .with_video_decoder(Arc::new(SyntheticDecoder));
    twin.connect().unwrap();
    twin
}
