//! # Protocol Layer
//!
//! Pluggable ways of reaching songs. A protocol names a transport (local
//! filesystem, a cloud drive API); a [`Source`] is one configured instance
//! of it, able to list a catalog and hand out playable songs by id.
//!
//! The [`ProtocolRegistry`] is the frontend's view: which protocols exist,
//! what parameters an instance needs, and where a user must go to
//! authenticate.

pub mod auth;
pub mod error;
pub mod http;
pub mod registry;

pub use auth::AuthToken;
pub use error::{ProtocolError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient};
pub use registry::{ProtocolDescriptor, ProtocolRegistry, SongList, Source, SourceFactory};
