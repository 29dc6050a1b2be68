//! Media-type detection from leading magic bytes.
//!
//! Only the container signature is inspected; a positive match says nothing
//! about whether the rest of the file decodes.

use perceptual::MediaKind;
use serde::{Deserialize, Serialize};

/// Container formats recognised by [`detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Mp4,
    QuickTime,
    Matroska,
    Avi,
}

impl MediaFormat {
    pub const fn kind(self) -> MediaKind {
        match self {
            MediaFormat::Png
            | MediaFormat::Jpeg
            | MediaFormat::Gif
            | MediaFormat::WebP
            | MediaFormat::Bmp => MediaKind::Image,
            MediaFormat::Mp4 | MediaFormat::QuickTime | MediaFormat::Matroska | MediaFormat::Avi => {
                MediaKind::Video
            }
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Png => "image/png",
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Gif => "image/gif",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Bmp => "image/bmp",
            MediaFormat::Mp4 => "video/mp4",
            MediaFormat::QuickTime => "video/quicktime",
            MediaFormat::Matroska => "video/x-matroska",
            MediaFormat::Avi => "video/x-msvideo",
        }
    }
}

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const EBML_MAGIC: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];

/// Sniff the container format of `bytes`.
///
/// ```rust
/// use ingest::{detect_format, MediaFormat};
///
/// assert_eq!(detect_format(b"GIF89a...."), Some(MediaFormat::Gif));
/// assert_eq!(detect_format(b"hello"), None);
/// ```
pub fn detect_format(bytes: &[u8]) -> Option<MediaFormat> {
    if bytes.starts_with(PNG_MAGIC) {
        return Some(MediaFormat::Png);
    }
    if bytes.starts_with(JPEG_MAGIC) {
        return Some(MediaFormat::Jpeg);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(MediaFormat::Gif);
    }
    if bytes.starts_with(b"BM") && bytes.len() >= 14 {
        return Some(MediaFormat::Bmp);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" {
        return match &bytes[8..12] {
            b"WEBP" => Some(MediaFormat::WebP),
            b"AVI " => Some(MediaFormat::Avi),
            _ => None,
        };
    }
    if bytes.starts_with(EBML_MAGIC) {
        return Some(MediaFormat::Matroska);
    }
    // ISO base media: 4-byte box size, then "ftyp" and the major brand.
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return match &bytes[8..12] {
            b"qt  " => Some(MediaFormat::QuickTime),
            b"avif" | b"avis" | b"heic" | b"heix" | b"mif1" | b"msf1" => None,
            _ => Some(MediaFormat::Mp4),
        };
    }
    if bytes.len() >= 8 && matches!(&bytes[4..8], b"moov" | b"mdat" | b"wide" | b"free") {
        return Some(MediaFormat::QuickTime);
    }
    None
}

/// Sniff only the media kind of `bytes`.
pub fn detect_media_kind(bytes: &[u8]) -> Option<MediaKind> {
    detect_format(bytes).map(MediaFormat::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut bytes = vec![0, 0, 0, 0x18];
        bytes.extend_from_slice(b"ftyp");
        bytes.extend_from_slice(brand);
        bytes.extend_from_slice(&[0; 8]);
        bytes
    }

    #[test]
    fn detects_image_signatures() {
        assert_eq!(detect_format(PNG_MAGIC), Some(MediaFormat::Png));
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some(MediaFormat::Jpeg));
        assert_eq!(detect_format(b"GIF87a"), Some(MediaFormat::Gif));
        assert_eq!(detect_format(b"RIFF\0\0\0\0WEBPVP8 "), Some(MediaFormat::WebP));
        assert_eq!(detect_format(b"BM\0\0\0\0\0\0\0\0\0\0\0\0"), Some(MediaFormat::Bmp));
    }

    #[test]
    fn detects_video_signatures() {
        assert_eq!(detect_format(&ftyp(b"isom")), Some(MediaFormat::Mp4));
        assert_eq!(detect_format(&ftyp(b"qt  ")), Some(MediaFormat::QuickTime));
        assert_eq!(detect_format(&[0x1A, 0x45, 0xDF, 0xA3, 0x01]), Some(MediaFormat::Matroska));
        assert_eq!(detect_format(b"RIFF\0\0\0\0AVI LIST"), Some(MediaFormat::Avi));
        assert_eq!(detect_media_kind(&ftyp(b"mp42")), Some(MediaKind::Video));
    }

    #[test]
    fn still_image_ftyp_brands_are_not_video() {
        assert_eq!(detect_format(&ftyp(b"avif")), None);
        assert_eq!(detect_format(&ftyp(b"heic")), None);
    }

    #[test]
    fn short_or_unknown_bytes_are_undetected() {
        assert_eq!(detect_format(&[]), None);
        assert_eq!(detect_format(b"BM"), None);
        assert_eq!(detect_format(b"RIFF"), None);
        assert_eq!(detect_format(b"plain text, not media"), None);
    }

    #[test]
    fn formats_report_kind_and_mime() {
        assert_eq!(MediaFormat::WebP.kind(), MediaKind::Image);
        assert_eq!(MediaFormat::Matroska.kind(), MediaKind::Video);
        assert_eq!(MediaFormat::Jpeg.mime_type(), "image/jpeg");
    }
}
