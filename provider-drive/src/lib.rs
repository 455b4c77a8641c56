//! # Cloud Drive Source
//!
//! Remote source over a Google-style drive API: paginated catalog listing,
//! bearer-token auth, and per-file openers that resolve short-lived
//! download URLs on demand.

mod error;
mod source;
mod types;

pub use error::DriveError;
pub use source::{register, DriveOpener, DriveSource, DriveSourceFactory, AUTH_URL, PROTOCOL_NAME};
