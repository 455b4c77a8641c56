//! # Codec Error Types
//!
//! Error taxonomy for format detection and streaming decode.

use thiserror::Error;

/// Errors that can occur during format detection and decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    // ========================================================================
    // Format Detection Errors
    // ========================================================================
    /// Sniffing found no codec whose magic pattern matches the stream.
    ///
    /// Distinct from an I/O failure: the probe itself succeeded, the bytes
    /// simply belong to no registered format.
    #[error("unknown format")]
    UnknownFormat,

    /// Extension-keyed dispatch found no codec owning the extension.
    #[error("extension not found: {0}")]
    UnknownExtension(String),

    // ========================================================================
    // Contract Errors
    // ========================================================================
    /// `play()` was called before a successful `init()`.
    #[error("song not initialized")]
    NotInitialized,

    /// A requested song id does not exist in the decoded set.
    #[error("song not found: {0}")]
    SongNotFound(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Opening or reading the underlying byte stream failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O error while reading stream content.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// The codec engine rejected the content after format detection succeeded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Metadata extraction failed.
    #[error("metadata error: {0}")]
    Metadata(String),
}

impl CodecError {
    /// Returns `true` if this error came from the transport layer rather
    /// than the codec itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, CodecError::Transport(_) | CodecError::Io(_))
    }

    /// Returns `true` if this error means no codec claimed the content.
    pub fn is_unknown_format(&self) -> bool {
        matches!(
            self,
            CodecError::UnknownFormat | CodecError::UnknownExtension(_)
        )
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
