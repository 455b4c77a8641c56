//! # Protocol Registry and Source Contract
//!
//! A protocol is a way of reaching songs (local filesystem, a cloud drive
//! API); a [`Source`] is one configured instance of a protocol. The
//! registry maps protocol names to factories and describes each protocol's
//! instance parameters so a frontend can render a connect form.
//!
//! Like the codec registry, it is populated during startup and then shared
//! read-only behind an `Arc`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use core_codec::{Song, SongId, Songs};

use crate::auth::AuthToken;
use crate::error::{ProtocolError, Result};

/// The songs a listing produced, keyed by id.
pub type SongList = Songs;

/// A configured instance of a protocol.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable key identifying this instance, unique within its protocol.
    fn key(&self) -> String;

    /// The songs this source currently offers.
    ///
    /// Serves a cached catalog snapshot when one exists; songs themselves
    /// are built fresh per call, since each caller owns its playback state.
    async fn list(&self) -> Result<SongList>;

    /// Drop any cached catalog and re-fetch from the backing store.
    async fn refresh(&self) -> Result<SongList>;

    /// Build one song by id.
    async fn get_song(&self, id: &SongId) -> Result<Box<dyn Song>>;
}

/// Constructor for source instances of one protocol.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Build an instance from positional parameters matching the
    /// descriptor's `params` and an optional credential.
    async fn create(
        &self,
        params: &[String],
        token: Option<AuthToken>,
    ) -> Result<Arc<dyn Source>>;
}

/// Registration entry for one protocol.
pub struct ProtocolDescriptor {
    name: String,
    /// Ordered names of the instance parameters `create` expects.
    params: Vec<String>,
    /// OAuth consent URL, for protocols that authenticate.
    auth_url: Option<String>,
    factory: Arc<dyn SourceFactory>,
}

impl ProtocolDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn auth_url(&self) -> Option<&str> {
        self.auth_url.as_deref()
    }

    pub fn factory(&self) -> &Arc<dyn SourceFactory> {
        &self.factory
    }
}

/// Name-keyed registry of available protocols.
#[derive(Default)]
pub struct ProtocolRegistry {
    protocols: HashMap<String, Arc<ProtocolDescriptor>>,
    order: Vec<String>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol that needs no credential.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        params: Vec<&str>,
        factory: Arc<dyn SourceFactory>,
    ) {
        self.insert(name.into(), params, None, factory);
    }

    /// Register a protocol whose sources authenticate through `auth_url`.
    pub fn register_with_auth(
        &mut self,
        name: impl Into<String>,
        params: Vec<&str>,
        auth_url: impl Into<String>,
        factory: Arc<dyn SourceFactory>,
    ) {
        self.insert(name.into(), params, Some(auth_url.into()), factory);
    }

    fn insert(
        &mut self,
        name: String,
        params: Vec<&str>,
        auth_url: Option<String>,
        factory: Arc<dyn SourceFactory>,
    ) {
        debug!(protocol = %name, "registered protocol");
        let descriptor = Arc::new(ProtocolDescriptor {
            name: name.clone(),
            params: params.into_iter().map(str::to_string).collect(),
            auth_url,
            factory,
        });
        if self.protocols.insert(name.clone(), descriptor).is_none() {
            self.order.push(name);
        }
    }

    /// Look up a protocol by name.
    pub fn by_name(&self, name: &str) -> Result<Arc<ProtocolDescriptor>> {
        self.protocols
            .get(name)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownProtocol(name.to_string()))
    }

    /// Build a source instance of the named protocol.
    pub async fn create_source(
        &self,
        name: &str,
        params: &[String],
        token: Option<AuthToken>,
    ) -> Result<Arc<dyn Source>> {
        self.by_name(name)?.factory().create(params, token).await
    }

    /// All registered protocols, in registration order.
    pub fn descriptors(&self) -> Vec<Arc<ProtocolDescriptor>> {
        self.order
            .iter()
            .filter_map(|name| self.protocols.get(name).cloned())
            .collect()
    }
}
