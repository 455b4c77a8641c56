//! # Drive Source
//!
//! Lists a cloud drive's files through its paginated `files` endpoint and
//! serves them as songs. Listing never downloads content: each entry gets a
//! [`DriveOpener`] that resolves the file's current download URL on every
//! invocation, since those URLs are short-lived.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use core_codec::{ByteStream, ByteStreamOpener, CodecError, CodecRegistry, Opener, Song, SongId};
use core_protocol::{
    AuthToken, HttpClient, HttpRequest, ProtocolError, ProtocolRegistry, Result, SongList, Source,
    SourceFactory,
};

use crate::error::DriveError;
use crate::types::{DriveFile, FileResolveResponse, FilesListResponse};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v2";

/// Listing requests only what the source needs per entry.
const LIST_FIELDS: &str = "nextPageToken,items(id,fileExtension,fileSize,title)";
const RESOLVE_FIELDS: &str = "downloadUrl,fileSize";

/// OAuth consent URL for the drive protocol.
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Protocol name this source registers under.
pub const PROTOCOL_NAME: &str = "drive";

/// A drive account served as a source.
pub struct DriveSource {
    http: Arc<dyn HttpClient>,
    token: AuthToken,
    registry: Arc<CodecRegistry>,
    catalog: Mutex<Option<Vec<DriveFile>>>,
}

impl DriveSource {
    pub fn new(http: Arc<dyn HttpClient>, token: AuthToken, registry: Arc<CodecRegistry>) -> Self {
        Self {
            http,
            token,
            registry,
            catalog: Mutex::new(None),
        }
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<FilesListResponse> {
        let mut url = format!("{}/files?fields={}", DRIVE_API_BASE, LIST_FIELDS);
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let request = HttpRequest::get(url)
            .bearer_token(&self.token.access_token)
            .header("Accept", "application/json");
        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(DriveError::Api {
                status: response.status,
                message: response.text().unwrap_or_default(),
            }
            .into());
        }
        response
            .json()
            .map_err(|e| DriveError::Parse(e.to_string()).into())
    }

    /// Walk the pagination loop to a complete catalog. Any page failure
    /// aborts the whole listing.
    #[instrument(skip(self))]
    async fn fetch_catalog(&self) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.fetch_page(page_token.as_deref()).await?;
            debug!(items = page.items.len(), "fetched listing page");
            files.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        info!(files = files.len(), "listed drive catalog");
        Ok(files)
    }

    /// Build songs for the catalog. A single entry's failure skips that
    /// entry only.
    async fn build_songs(&self, files: &[DriveFile]) -> SongList {
        let mut songs = SongList::new();
        for file in files {
            let Some(ext) = file.file_extension.as_deref() else {
                debug!(id = %file.id, title = %file.title, "skipping entry without extension");
                continue;
            };
            let opener: Opener = Arc::new(self.opener_for(file));
            match self.registry.by_extension(ext, opener).await {
                Ok((decoded, _)) => {
                    for (sub, song) in decoded {
                        songs.insert(SongId::new([file.id.as_str(), sub.as_str()]), song);
                    }
                }
                Err(e) if e.is_transport() => {
                    warn!(id = %file.id, title = %file.title, error = %e, "skipping entry after transport failure");
                }
                Err(e) => {
                    debug!(id = %file.id, title = %file.title, error = %e, "skipping entry");
                }
            }
        }
        songs
    }

    fn opener_for(&self, file: &DriveFile) -> DriveOpener {
        DriveOpener {
            http: Arc::clone(&self.http),
            access_token: self.token.access_token.clone(),
            file_id: file.id.clone(),
            title: file.title.clone(),
        }
    }

    async fn ensure_catalog(&self) -> Result<Vec<DriveFile>> {
        let mut cached = self.catalog.lock().await;
        if let Some(files) = cached.as_ref() {
            return Ok(files.clone());
        }
        let files = self.fetch_catalog().await?;
        *cached = Some(files.clone());
        Ok(files)
    }
}

#[async_trait]
impl Source for DriveSource {
    /// Key derived from the credential, so sources for different accounts
    /// stay distinct without the token appearing anywhere.
    fn key(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.token.access_token.hash(&mut hasher);
        self.token.refresh_token.hash(&mut hasher);
        format!("{}:{:016x}", PROTOCOL_NAME, hasher.finish())
    }

    async fn list(&self) -> Result<SongList> {
        let files = self.ensure_catalog().await?;
        Ok(self.build_songs(&files).await)
    }

    async fn refresh(&self) -> Result<SongList> {
        let files = self.fetch_catalog().await?;
        *self.catalog.lock().await = Some(files.clone());
        Ok(self.build_songs(&files).await)
    }

    async fn get_song(&self, id: &SongId) -> Result<Box<dyn Song>> {
        let (file_id, sub) = id.pop();
        let files = self.ensure_catalog().await?;
        let file = files
            .iter()
            .find(|f| f.id == file_id)
            .ok_or_else(|| CodecError::SongNotFound(id.to_string()))?;
        let ext = file
            .file_extension
            .as_deref()
            .ok_or_else(|| CodecError::UnknownExtension(String::new()))?;
        let opener: Opener = Arc::new(self.opener_for(file));
        let song = self.registry.by_extension_id(ext, &sub, opener).await?;
        Ok(song)
    }
}

/// Re-invocable opener over one drive file.
///
/// Each invocation resolves the file's current download URL and fetches the
/// content; nothing is cached here, callers layer their own caching.
pub struct DriveOpener {
    http: Arc<dyn HttpClient>,
    access_token: String,
    file_id: String,
    title: String,
}

impl DriveOpener {
    async fn request(&self, url: String) -> core_codec::Result<core_protocol::HttpResponse> {
        let request = HttpRequest::get(url).bearer_token(&self.access_token);
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| CodecError::Transport(e.to_string()))?;
        if !response.is_success() {
            return Err(CodecError::Transport(format!(
                "drive request failed with status {}",
                response.status
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ByteStreamOpener for DriveOpener {
    async fn open(&self) -> core_codec::Result<ByteStream> {
        debug!(id = %self.file_id, title = %self.title, "drive download");

        let resolve_url = format!(
            "{}/files/{}?fields={}",
            DRIVE_API_BASE, self.file_id, RESOLVE_FIELDS
        );
        let resolved: FileResolveResponse = self
            .request(resolve_url)
            .await?
            .json()
            .map_err(|e| CodecError::Transport(e.to_string()))?;
        let download_url = resolved
            .download_url
            .ok_or_else(|| CodecError::Transport("no download url".into()))?;

        let body = self.request(download_url).await?.body;
        let len = resolved
            .file_size
            .and_then(|s| s.parse().ok())
            .unwrap_or(body.len() as u64);
        Ok(ByteStream::new(Box::new(Cursor::new(body)), len))
    }
}

/// Factory for [`DriveSource`] instances.
pub struct DriveSourceFactory {
    http: Arc<dyn HttpClient>,
    registry: Arc<CodecRegistry>,
}

impl DriveSourceFactory {
    pub fn new(http: Arc<dyn HttpClient>, registry: Arc<CodecRegistry>) -> Self {
        Self { http, registry }
    }
}

#[async_trait]
impl SourceFactory for DriveSourceFactory {
    async fn create(
        &self,
        params: &[String],
        token: Option<AuthToken>,
    ) -> Result<Arc<dyn Source>> {
        if !params.is_empty() {
            return Err(ProtocolError::InvalidParams(
                "drive takes no parameters".into(),
            ));
        }
        let token = token.ok_or_else(|| {
            ProtocolError::Authentication("drive requires an auth token".into())
        })?;
        if token.is_expired() {
            warn!("drive auth token is expired or about to expire");
        }
        Ok(Arc::new(DriveSource::new(
            Arc::clone(&self.http),
            token,
            Arc::clone(&self.registry),
        )))
    }
}

/// Register the `drive` protocol with `protocols`.
pub fn register(
    protocols: &mut ProtocolRegistry,
    http: Arc<dyn HttpClient>,
    registry: Arc<CodecRegistry>,
) {
    protocols.register_with_auth(
        PROTOCOL_NAME,
        vec![],
        AUTH_URL,
        Arc::new(DriveSourceFactory::new(http, registry)),
    );
}
