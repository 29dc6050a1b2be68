//! Fingerprint, algorithm, and media-kind types for the MediaTwin perceptual layer.
//!
//! A [`Fingerprint`] is a fixed-width bit string (64 or 256 bits) stored as an
//! unsigned integer. Its external representation is a lowercase hexadecimal
//! string of `width / 4` digits, most significant digit first. Leading zeros
//! are part of the value and are always preserved.
//!
//! Bit index `0` addresses the most significant bit of the integer, so the
//! hashing algorithms can emit bits in scan order and the resulting hex
//! string reads left to right in the same order.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitXor;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::PerceptualError;

/// Width of a fingerprint in bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum BitWidth {
    /// 64-bit fingerprints computed over 8×8 grids.
    #[default]
    Bits64,
    /// 256-bit fingerprints computed over 16×16 grids.
    Bits256,
}

impl BitWidth {
    /// Number of bits in a fingerprint of this width.
    pub const fn bits(self) -> u32 {
        match self {
            BitWidth::Bits64 => 64,
            BitWidth::Bits256 => 256,
        }
    }

    /// Side of the square low-frequency grid (8 or 16).
    pub const fn grid_side(self) -> usize {
        match self {
            BitWidth::Bits64 => 8,
            BitWidth::Bits256 => 16,
        }
    }

    /// Number of hex digits in the external representation.
    pub const fn hex_len(self) -> usize {
        (self.bits() / 4) as usize
    }

    const fn words(self) -> usize {
        (self.bits() / 64) as usize
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(BitWidth::Bits64),
            64 => Some(BitWidth::Bits256),
            _ => None,
        }
    }
}

impl TryFrom<u32> for BitWidth {
    type Error = PerceptualError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            64 => Ok(BitWidth::Bits64),
            256 => Ok(BitWidth::Bits256),
            other => Err(PerceptualError::InvalidBitWidth { bits: other }),
        }
    }
}

impl From<BitWidth> for u32 {
    fn from(width: BitWidth) -> Self {
        width.bits()
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Fixed-width perceptual fingerprint.
///
/// Stored as four little-endian 64-bit words; a 64-bit fingerprint only uses
/// the lowest word and keeps the others zeroed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    width: BitWidth,
    words: [u64; 4],
}

impl Fingerprint {
    /// All-zero fingerprint of the given width.
    pub const fn zero(width: BitWidth) -> Self {
        Self {
            width,
            words: [0; 4],
        }
    }

    /// 64-bit fingerprint from its integer value.
    pub const fn from_u64(value: u64) -> Self {
        Self {
            width: BitWidth::Bits64,
            words: [value, 0, 0, 0],
        }
    }

    /// Build a fingerprint from 64-bit lanes, most significant lane first.
    ///
    /// One lane yields a 64-bit fingerprint, four lanes a 256-bit one.
    pub fn from_lanes(lanes: &[u64]) -> Result<Self, PerceptualError> {
        let width = match lanes.len() {
            1 => BitWidth::Bits64,
            4 => BitWidth::Bits256,
            n => {
                return Err(PerceptualError::BitCountMismatch {
                    expected: 64,
                    actual: n * 64,
                })
            }
        };
        let mut words = [0u64; 4];
        for (i, lane) in lanes.iter().rev().enumerate() {
            words[i] = *lane;
        }
        Ok(Self { width, words })
    }

    /// Build a fingerprint from bits in scan order (index 0 = most significant).
    pub fn from_bits<I>(width: BitWidth, bits: I) -> Result<Self, PerceptualError>
    where
        I: IntoIterator<Item = bool>,
    {
        let total = width.bits() as usize;
        let mut fp = Self::zero(width);
        let mut count = 0usize;
        for bit in bits {
            if count < total && bit {
                fp.set_bit(count);
            }
            count += 1;
        }
        if count != total {
            return Err(PerceptualError::BitCountMismatch {
                expected: total,
                actual: count,
            });
        }
        Ok(fp)
    }

    /// Parse a hex fingerprint. Accepts 16 or 64 hex digits in either case.
    pub fn from_hex(hex: &str) -> Result<Self, PerceptualError> {
        let width = BitWidth::from_hex_len(hex.len())
            .ok_or_else(|| PerceptualError::InvalidHex(hex.to_string()))?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PerceptualError::InvalidHex(hex.to_string()));
        }

        let words = width.words();
        let mut fp = Self::zero(width);
        for (chunk_idx, chunk) in hex.as_bytes().chunks(16).enumerate() {
            // All bytes are ASCII hex digits, so the chunk is valid UTF-8.
            let text = std::str::from_utf8(chunk)
                .map_err(|_| PerceptualError::InvalidHex(hex.to_string()))?;
            let value = u64::from_str_radix(text, 16)
                .map_err(|_| PerceptualError::InvalidHex(hex.to_string()))?;
            fp.words[words - 1 - chunk_idx] = value;
        }
        Ok(fp)
    }

    /// Lowercase, zero-padded hex representation.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.width.hex_len());
        for word in self.words[..self.width.words()].iter().rev() {
            out.push_str(&format!("{word:016x}"));
        }
        out
    }

    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// Used words, least significant first.
    pub fn words(&self) -> &[u64] {
        &self.words[..self.width.words()]
    }

    /// Bit at scan index `i` (0 = most significant). Out-of-range reads are `false`.
    pub fn bit(&self, i: usize) -> bool {
        let total = self.width.bits() as usize;
        if i >= total {
            return false;
        }
        let pos = total - 1 - i;
        (self.words[pos / 64] >> (pos % 64)) & 1 == 1
    }

    fn set_bit(&mut self, i: usize) {
        let pos = self.width.bits() as usize - 1 - i;
        self.words[pos / 64] |= 1u64 << (pos % 64);
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Number of differing bits, computed over the full integer width.
    #[inline]
    pub fn hamming_distance(&self, other: &Fingerprint) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

impl BitXor for Fingerprint {
    type Output = Fingerprint;

    fn bitxor(self, rhs: Fingerprint) -> Fingerprint {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.words[i] ^ rhs.words[i];
        }
        Fingerprint {
            width: self.width.max(rhs.width),
            words,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = PerceptualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fingerprint::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&hex).map_err(DeError::custom)
    }
}

/// Hamming distance between two fingerprints.
#[inline]
pub fn hamming_distance(a: &Fingerprint, b: &Fingerprint) -> u32 {
    a.hamming_distance(b)
}

/// Convert a Hamming distance into a similarity in `[0, 1]`.
pub fn distance_to_similarity(distance: u32, bits: u32) -> f64 {
    if bits == 0 {
        return 0.0;
    }
    (1.0 - f64::from(distance) / f64::from(bits)).clamp(0.0, 1.0)
}

/// Inverse of [`distance_to_similarity`], rounded to the nearest integer distance.
pub fn similarity_to_distance(similarity: f64, bits: u32) -> u32 {
    let similarity = if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(0.0, 1.0)
    };
    ((1.0 - similarity) * f64::from(bits)).round() as u32
}

/// Color layout an algorithm expects in its input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Gray,
    Rgb,
}

impl ColorMode {
    pub const fn channels(self) -> usize {
        match self {
            ColorMode::Gray => 1,
            ColorMode::Rgb => 3,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Gray => f.write_str("gray"),
            ColorMode::Rgb => f.write_str("rgb"),
        }
    }
}

/// Normalized input shape required by an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub width: u32,
    pub height: u32,
    pub color: ColorMode,
}

/// The closed set of image fingerprint algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum HashAlgorithm {
    /// DCT-based structural hash (pHash).
    #[serde(rename = "phash", alias = "dct", alias = "structural")]
    Structural,
    /// Horizontal gradient hash (dHash).
    #[serde(rename = "dhash", alias = "gradient")]
    Gradient,
    /// Mean-threshold hash (aHash).
    #[serde(rename = "ahash", alias = "average")]
    Average,
    /// Quantized RGB histogram hash.
    #[serde(rename = "colorhash", alias = "color", alias = "color_histogram")]
    ColorHistogram,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Structural,
        HashAlgorithm::Gradient,
        HashAlgorithm::Average,
        HashAlgorithm::ColorHistogram,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Structural => "phash",
            HashAlgorithm::Gradient => "dhash",
            HashAlgorithm::Average => "ahash",
            HashAlgorithm::ColorHistogram => "colorhash",
        }
    }

    /// Input grid this algorithm expects for the given fingerprint width.
    pub fn grid(self, width: BitWidth) -> GridSpec {
        let g = width.grid_side() as u32;
        match self {
            HashAlgorithm::Structural => GridSpec {
                width: 4 * g,
                height: 4 * g,
                color: ColorMode::Gray,
            },
            HashAlgorithm::Gradient => GridSpec {
                width: g + 1,
                height: g,
                color: ColorMode::Gray,
            },
            HashAlgorithm::Average => GridSpec {
                width: g,
                height: g,
                color: ColorMode::Gray,
            },
            HashAlgorithm::ColorHistogram => GridSpec {
                width: g,
                height: g,
                color: ColorMode::Rgb,
            },
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = PerceptualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phash" | "dct" | "structural" => Ok(HashAlgorithm::Structural),
            "dhash" | "gradient" => Ok(HashAlgorithm::Gradient),
            "ahash" | "average" => Ok(HashAlgorithm::Average),
            "colorhash" | "color" | "color_histogram" => Ok(HashAlgorithm::ColorHistogram),
            _ => Err(PerceptualError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Kind of media a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = PerceptualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(PerceptualError::UnknownMediaKind(s.to_string())),
        }
    }
}

/// Per-algorithm fingerprints of one media item.
///
/// A key is present only when that algorithm succeeded, so "not computed" is
/// distinct from "computed to zero".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintSet(BTreeMap<HashAlgorithm, Fingerprint>);

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, algorithm: HashAlgorithm, fingerprint: Fingerprint) {
        self.0.insert(algorithm, fingerprint);
    }

    pub fn get(&self, algorithm: HashAlgorithm) -> Option<&Fingerprint> {
        self.0.get(&algorithm)
    }

    pub fn contains(&self, algorithm: HashAlgorithm) -> bool {
        self.0.contains_key(&algorithm)
    }

    pub fn remove(&mut self, algorithm: HashAlgorithm) -> Option<Fingerprint> {
        self.0.remove(&algorithm)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn algorithms(&self) -> impl Iterator<Item = HashAlgorithm> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HashAlgorithm, &Fingerprint)> + '_ {
        self.0.iter().map(|(alg, fp)| (*alg, fp))
    }
}

impl FromIterator<(HashAlgorithm, Fingerprint)> for FingerprintSet {
    fn from_iter<T: IntoIterator<Item = (HashAlgorithm, Fingerprint)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_preserves_leading_zeros() {
        let fp = Fingerprint::from_hex("000000000000000f").unwrap();
        assert_eq!(fp.width(), BitWidth::Bits64);
        assert_eq!(fp.to_hex(), "000000000000000f");
        assert_eq!(fp.count_ones(), 4);
    }

    #[test]
    fn hex_parsing_accepts_uppercase_and_emits_lowercase() {
        let fp: Fingerprint = "FFFF0000FFFF0000".parse().unwrap();
        assert_eq!(fp.to_string(), "ffff0000ffff0000");
    }

    #[test]
    fn hex_parsing_rejects_bad_input() {
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(Fingerprint::from_hex("+00000000000000f").is_err());
        assert!(Fingerprint::from_hex("000000000000000g").is_err());
        assert!(Fingerprint::from_hex("").is_err());
    }

    #[test]
    fn wide_hex_orders_words_most_significant_first() {
        let hex = format!("{}{}{}{}", "1".repeat(16), "0".repeat(16), "0".repeat(16), "f".repeat(16));
        let fp = Fingerprint::from_hex(&hex).unwrap();
        assert_eq!(fp.width(), BitWidth::Bits256);
        assert_eq!(fp.words()[0], u64::MAX);
        assert_eq!(fp.words()[3], 0x1111_1111_1111_1111);
        assert_eq!(fp.to_hex(), hex);
    }

    #[test]
    fn from_bits_sets_most_significant_bit_first() {
        let mut bits = vec![false; 64];
        bits[0] = true;
        bits[63] = true;
        let fp = Fingerprint::from_bits(BitWidth::Bits64, bits).unwrap();
        assert_eq!(fp.to_hex(), "8000000000000001");
        assert!(fp.bit(0));
        assert!(fp.bit(63));
        assert!(!fp.bit(1));
    }

    #[test]
    fn from_bits_rejects_wrong_count() {
        let err = Fingerprint::from_bits(BitWidth::Bits64, vec![true; 10]).unwrap_err();
        assert!(matches!(
            err,
            PerceptualError::BitCountMismatch {
                expected: 64,
                actual: 10
            }
        ));
    }

    #[test]
    fn lanes_map_to_hex_in_order() {
        let fp = Fingerprint::from_lanes(&[1, 2, 3, 4]).unwrap();
        assert_eq!(
            fp.to_hex(),
            "0000000000000001000000000000000200000000000000030000000000000004"
        );
    }

    #[test]
    fn hamming_distance_counts_differing_bits() {
        let a = Fingerprint::from_u64(0);
        let b = Fingerprint::from_u64(0xff);
        assert_eq!(hamming_distance(&a, &b), 8);
        assert_eq!(hamming_distance(&b, &a), 8);
        assert_eq!(a.hamming_distance(&Fingerprint::from_u64(u64::MAX)), 64);
    }

    #[test]
    fn similarity_conversions() {
        assert_eq!(distance_to_similarity(32, 64), 0.5);
        assert_eq!(similarity_to_distance(0.5, 64), 32);
        assert_eq!(distance_to_similarity(0, 64), 1.0);
        assert_eq!(distance_to_similarity(64, 64), 0.0);
        for d in 0..=256 {
            assert_eq!(similarity_to_distance(distance_to_similarity(d, 256), 256), d);
        }
    }

    #[test]
    fn algorithm_names_parse_with_aliases() {
        assert_eq!("dct".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Structural);
        assert_eq!("DHASH".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Gradient);
        assert_eq!("color".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::ColorHistogram);
        assert!(matches!(
            "wavelet".parse::<HashAlgorithm>(),
            Err(PerceptualError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn grid_specs_follow_width() {
        let spec = HashAlgorithm::Structural.grid(BitWidth::Bits256);
        assert_eq!((spec.width, spec.height), (64, 64));
        let spec = HashAlgorithm::Gradient.grid(BitWidth::Bits64);
        assert_eq!((spec.width, spec.height), (9, 8));
        assert_eq!(HashAlgorithm::ColorHistogram.grid(BitWidth::Bits64).color, ColorMode::Rgb);
    }

    #[test]
    fn fingerprint_set_serializes_as_hex_map() {
        let mut set = FingerprintSet::new();
        set.insert(HashAlgorithm::Average, Fingerprint::from_u64(0xabc));
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"ahash":"0000000000000abc"}"#);
        let back: FingerprintSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert!(!back.contains(HashAlgorithm::Structural));
    }

    #[test]
    fn bit_width_serde_uses_bit_count() {
        assert_eq!(serde_json::to_string(&BitWidth::Bits256).unwrap(), "256");
        let width: BitWidth = serde_json::from_str("64").unwrap();
        assert_eq!(width, BitWidth::Bits64);
        assert!(serde_json::from_str::<BitWidth>("128").is_err());
    }
}
