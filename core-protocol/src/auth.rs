//! # Authentication Tokens
//!
//! Sources that talk to remote services carry an OAuth-style token set.
//! Issuing and refreshing tokens is the embedding application's job; the
//! protocol layer only threads tokens through to requests and reports when
//! one looks stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Refresh this long before the recorded expiry, so in-flight requests do
/// not race the deadline.
const EXPIRY_BUFFER_SECONDS: i64 = 300;

/// OAuth-style token set attached to a source instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Access token sent as a bearer credential on API requests.
    pub access_token: String,
    /// Refresh token, when the issuing flow produced one.
    pub refresh_token: Option<String>,
    /// Access token expiry (UTC); `None` means the token does not expire.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Token expiring `expires_in` seconds from now.
    pub fn with_expiry(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(expires_in)),
        }
    }

    /// Whether the access token is expired or inside the refresh buffer.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() >= at - chrono::Duration::seconds(EXPIRY_BUFFER_SECONDS),
            None => false,
        }
    }
}

// Tokens never appear in logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
