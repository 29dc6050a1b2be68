//! Error types produced by the ingest crate.
//!
//! Every error is a validation failure raised before any fingerprinting work
//! starts, so a rejected input never leaves partial state behind.
//!
//! # Error Categories
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`EmptyPayload`](IngestError::EmptyPayload) | Validation | Payload has zero bytes |
//! | [`InvalidId`](IngestError::InvalidId) | Validation | Caller id empty or too long after sanitization |
//! | [`InvalidMetadata`](IngestError::InvalidMetadata) | Validation | Metadata is not an object or exceeds its limit |
//! | [`PayloadTooLarge`](IngestError::PayloadTooLarge) | Validation | Size limit exceeded |
//! | [`UnsupportedMedia`](IngestError::UnsupportedMedia) | Validation | Bytes match no known image/video signature |
//! | [`KindMismatch`](IngestError::KindMismatch) | Validation | Kind hint contradicts the detected format |
//! | [`Io`](IngestError::Io) | I/O | File payload could not be read |
//!
//! # HTTP Status Code Mapping
//!
//! ```rust
//! use ingest::IngestError;
//!
//! fn to_http_status(error: &IngestError) -> u16 {
//!     match error {
//!         IngestError::PayloadTooLarge(_) => 413,
//!         IngestError::UnsupportedMedia(_) => 415,
//!         _ => 400,
//!     }
//! }
//! ```
use perceptual::MediaKind;
use thiserror::Error;

/// Errors that can occur while validating a media input.
///
/// The enum is `#[non_exhaustive]`; include a catch-all arm when matching.
///
/// ```rust
/// use ingest::IngestError;
///
/// let err = IngestError::EmptyPayload;
/// assert_eq!(err.to_string(), "media payload is empty");
///
/// let err = IngestError::InvalidMetadata("metadata must be a JSON object".into());
/// assert!(err.to_string().contains("JSON object"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The payload (bytes or file contents) has zero length.
    #[error("media payload is empty")]
    EmptyPayload,

    /// A caller-supplied id is empty after sanitization or longer than
    /// [`IngestConfig::max_id_len`](crate::IngestConfig::max_id_len).
    #[error("invalid media id: {0}")]
    InvalidId(String),

    /// Metadata is not a JSON object (or null), or its serialized form
    /// exceeds [`IngestConfig::max_metadata_bytes`](crate::IngestConfig::max_metadata_bytes).
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Payload exceeds [`IngestConfig::max_payload_bytes`](crate::IngestConfig::max_payload_bytes).
    ///
    /// Maps to **413 Payload Too Large** in HTTP contexts.
    #[error("payload exceeds size limit: {0}")]
    PayloadTooLarge(String),

    /// The bytes carry no recognised image or video signature and no kind
    /// hint was supplied.
    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),

    /// The caller's kind hint disagrees with the sniffed format.
    #[error("media kind hint {hint} contradicts detected {detected}")]
    KindMismatch { hint: MediaKind, detected: MediaKind },

    /// Reading a file payload failed.
    #[error("failed to read media file: {0}")]
    Io(String),
}

impl IngestError {
    /// Returns true if this error indicates a client-side issue.
    ///
    /// Everything except [`Io`](IngestError::Io) is caused by the input.
    ///
    /// ```rust
    /// use ingest::IngestError;
    ///
    /// assert!(IngestError::EmptyPayload.is_client_error());
    /// assert!(!IngestError::Io("denied".into()).is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Io(_))
    }

    /// Returns a suggested HTTP status code for this error.
    ///
    /// ```rust
    /// use ingest::IngestError;
    ///
    /// assert_eq!(IngestError::PayloadTooLarge("too big".into()).http_status_code(), 413);
    /// assert_eq!(IngestError::EmptyPayload.http_status_code(), 400);
    /// ```
    pub fn http_status_code(&self) -> u16 {
        match self {
            IngestError::PayloadTooLarge(_) => 413,
            IngestError::UnsupportedMedia(_) => 415,
            IngestError::Io(_) => 500,
            _ => 400,
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}
