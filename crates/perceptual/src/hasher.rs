//! `MediaHasher`: the configured entry point for image and video fingerprinting.

use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::{PerceptualConfig, PerceptualError};
use crate::dct::{structural_hash, DctBasis};
use crate::fingerprint::{BitWidth, Fingerprint, FingerprintSet, HashAlgorithm};
use crate::hashes::{average_hash, color_histogram_hash, gradient_hash};
use crate::pixels::PixelBuffer;
use crate::prepare::prepare;
use crate::video::{
    build_collage, collage_hash, extract_frames, FrameFingerprint, FrameSource, VideoFingerprints,
};

/// Fingerprints a media item with every configured algorithm.
///
/// Holds the validated config and the precomputed DCT basis, so one hasher
/// should be built once and reused.
#[derive(Debug, Clone)]
pub struct MediaHasher {
    cfg: PerceptualConfig,
    basis: DctBasis,
}

impl MediaHasher {
    pub fn new(cfg: PerceptualConfig) -> Result<Self, PerceptualError> {
        cfg.validate()?;
        let basis = DctBasis::for_width(cfg.bits);
        Ok(Self { cfg, basis })
    }

    pub fn config(&self) -> &PerceptualConfig {
        &self.cfg
    }

    pub fn bits(&self) -> BitWidth {
        self.cfg.bits
    }

    /// Run one algorithm over a buffer already normalized to its grid.
    pub fn compute(
        &self,
        algorithm: HashAlgorithm,
        buf: &PixelBuffer,
    ) -> Result<Fingerprint, PerceptualError> {
        let width = self.cfg.bits;
        match algorithm {
            HashAlgorithm::Structural => structural_hash(&self.basis, buf, width),
            HashAlgorithm::Gradient => gradient_hash(buf, width),
            HashAlgorithm::Average => average_hash(buf, width),
            HashAlgorithm::ColorHistogram => color_histogram_hash(buf, width),
        }
    }

    /// Normalize `img` for `algorithm` under the configured aspect policy and hash it.
    pub fn compute_image_one(
        &self,
        algorithm: HashAlgorithm,
        img: &DynamicImage,
    ) -> Result<Fingerprint, PerceptualError> {
        let buf = prepare(img, algorithm.grid(self.cfg.bits), self.cfg.aspect)?;
        self.compute(algorithm, &buf)
    }

    /// Fingerprint an image with every configured algorithm.
    pub fn compute_image(&self, img: &DynamicImage) -> Result<FingerprintSet, PerceptualError> {
        self.compute_set(img, &self.cfg.algorithms)
    }

    /// Fingerprint an image with the given algorithms.
    ///
    /// Each algorithm runs independently. A failing algorithm is logged and
    /// left out of the set; the call fails only when none succeed.
    pub fn compute_set(
        &self,
        img: &DynamicImage,
        algorithms: &[HashAlgorithm],
    ) -> Result<FingerprintSet, PerceptualError> {
        if algorithms.is_empty() {
            return Err(PerceptualError::NoAlgorithms);
        }

        let results: Vec<(HashAlgorithm, Result<Fingerprint, PerceptualError>)> =
            if self.cfg.use_parallel {
                algorithms
                    .par_iter()
                    .map(|&alg| (alg, self.compute_image_one(alg, img)))
                    .collect()
            } else {
                algorithms
                    .iter()
                    .map(|&alg| (alg, self.compute_image_one(alg, img)))
                    .collect()
            };

        let mut set = FingerprintSet::new();
        let mut last_error = None;
        for (alg, result) in results {
            match result {
                Ok(fp) => set.insert(alg, fp),
                Err(err) => {
                    warn!(algorithm = %alg, error = %err, "fingerprint_failure");
                    last_error = Some(err);
                }
            }
        }

        if set.is_empty() {
            return Err(PerceptualError::AllAlgorithmsFailed {
                attempted: algorithms.len(),
                last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
            });
        }
        Ok(set)
    }

    /// Fingerprint a video.
    ///
    /// Returns the set computed over the collage image (used for indexing)
    /// together with the per-frame sets and the collage hash.
    pub fn compute_video(
        &self,
        source: &dyn FrameSource,
    ) -> Result<(FingerprintSet, VideoFingerprints), PerceptualError> {
        let video_cfg = &self.cfg.video;
        let sampled = extract_frames(source, video_cfg)?;

        let mut frames = Vec::with_capacity(sampled.len());
        let mut images: Vec<RgbImage> = Vec::with_capacity(sampled.len());
        for (ts, img) in sampled {
            let dynamic = DynamicImage::ImageRgb8(img);
            match self.compute_image(&dynamic) {
                Ok(fingerprints) => frames.push(FrameFingerprint {
                    timestamp_secs: ts,
                    fingerprints,
                }),
                Err(err) => warn!(timestamp_secs = ts, error = %err, "frame_fingerprint_failure"),
            }
            images.push(dynamic.into_rgb8());
        }

        let collage = collage_hash(&images, video_cfg.frame_side)?;
        let collage_img = DynamicImage::ImageRgb8(build_collage(&images, video_cfg.frame_side));
        let set = self.compute_image(&collage_img)?;

        debug!(
            frames = frames.len(),
            collage = %collage,
            "video_fingerprinted"
        );

        Ok((
            set,
            VideoFingerprints {
                frames,
                collage: Some(collage),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AspectPolicy;
    use image::Rgb;

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        }))
    }

    #[test]
    fn hasher_rejects_invalid_config() {
        let cfg = PerceptualConfig::new().with_algorithms(Vec::new());
        assert!(MediaHasher::new(cfg).is_err());
    }

    #[test]
    fn compute_image_yields_every_algorithm() {
        let hasher = MediaHasher::new(PerceptualConfig::default()).unwrap();
        let set = hasher.compute_image(&gradient_image(60, 40)).unwrap();
        assert_eq!(set.len(), 4);
        for alg in HashAlgorithm::ALL {
            assert_eq!(set.get(alg).unwrap().width(), BitWidth::Bits64);
        }
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let img = gradient_image(50, 50);
        let seq = MediaHasher::new(PerceptualConfig::default()).unwrap();
        let par = MediaHasher::new(PerceptualConfig::default().with_parallel(true)).unwrap();
        assert_eq!(seq.compute_image(&img).unwrap(), par.compute_image(&img).unwrap());
    }

    #[test]
    fn wide_hasher_emits_256_bit_fingerprints() {
        let cfg = PerceptualConfig::default()
            .with_bits(BitWidth::Bits256)
            .with_aspect(AspectPolicy::Crop);
        let hasher = MediaHasher::new(cfg).unwrap();
        let set = hasher.compute_image(&gradient_image(64, 48)).unwrap();
        assert!(set.iter().all(|(_, fp)| fp.to_hex().len() == 64));
    }

    #[test]
    fn compute_rejects_unnormalized_buffer() {
        let hasher = MediaHasher::new(PerceptualConfig::default()).unwrap();
        let buf = PixelBuffer::gray(10, 10, vec![0; 100]).unwrap();
        assert!(matches!(
            hasher.compute(HashAlgorithm::Structural, &buf),
            Err(PerceptualError::GridMismatch { .. })
        ));
    }

    struct Frames;

    impl FrameSource for Frames {
        fn duration_secs(&self) -> Result<f64, PerceptualError> {
            Ok(2.5)
        }

        fn frame_at(&self, ts: f64) -> Result<RgbImage, PerceptualError> {
            let v = (ts * 60.0) as u8;
            Ok(RgbImage::from_fn(48, 32, |x, _| Rgb([v, (x * 5) as u8, 100])))
        }
    }

    #[test]
    fn video_produces_frames_and_collage() {
        let hasher = MediaHasher::new(PerceptualConfig::default()).unwrap();
        let (set, video) = hasher.compute_video(&Frames).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(video.frames.len(), 3);
        assert_eq!(video.frames[2].timestamp_secs, 2.0);
        assert!(video.collage.is_some());

        let (_, again) = hasher.compute_video(&Frames).unwrap();
        assert_eq!(video, again);
    }
}
