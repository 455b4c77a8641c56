//! # Protocol Error Types
//!
//! Error taxonomy for source registration, authentication, and listing.

use thiserror::Error;

use core_codec::CodecError;

/// Errors that can occur while managing and listing sources.
#[derive(Error, Debug)]
pub enum ProtocolError {
    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// No protocol is registered under the requested name.
    #[error("protocol not found: {0}")]
    UnknownProtocol(String),

    /// A source factory rejected its instance parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The remote service rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// An HTTP request could not be executed or returned a failure status.
    #[error("http error: {0}")]
    Http(String),

    /// A catalog page could not be fetched or parsed. Listing aborts.
    #[error("page fetch failed: {0}")]
    Page(String),

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// A codec-layer failure while building songs from listed content.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ProtocolError {
    /// Returns `true` if retrying with refreshed credentials could help.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ProtocolError::Authentication(_))
    }
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
