//! Drive-specific failures, folded into [`ProtocolError`] at the source
//! boundary.

use thiserror::Error;

use core_protocol::ProtocolError;

#[derive(Error, Debug)]
pub enum DriveError {
    /// The API returned a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// A response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<DriveError> for ProtocolError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::Api { status: 401, message } => ProtocolError::Authentication(message),
            DriveError::Api { .. } => ProtocolError::Page(e.to_string()),
            DriveError::Parse(_) => ProtocolError::Page(e.to_string()),
        }
    }
}
