//! # Local Filesystem Source
//!
//! Serves songs from a directory tree. Files are dispatched to codecs by
//! extension; unplayable files are skipped. The walk result is cached as a
//! catalog snapshot so repeated listings rebuild songs without re-probing
//! the tree; `refresh` forces a new walk.

mod opener;
mod song;

pub use opener::FileOpener;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use core_codec::{CodecRegistry, Opener, Song, SongId};
use core_protocol::{
    AuthToken, ProtocolError, ProtocolRegistry, Result, SongList, Source, SourceFactory,
};

use song::WithFallbackTags;

/// Protocol name this source registers under.
pub const PROTOCOL_NAME: &str = "file";

/// One playable track discovered by a walk.
#[derive(Debug, Clone)]
struct CatalogEntry {
    path: PathBuf,
    /// Track id within the file; empty for single-song formats.
    sub: SongId,
    /// Tracks the file contained when walked, for title fallbacks.
    siblings: usize,
}

/// A directory tree served as a source.
pub struct LocalSource {
    root: PathBuf,
    registry: Arc<CodecRegistry>,
    catalog: Mutex<Option<Vec<CatalogEntry>>>,
}

impl LocalSource {
    pub fn new(root: PathBuf, registry: Arc<CodecRegistry>) -> Self {
        Self {
            root,
            registry,
            catalog: Mutex::new(None),
        }
    }

    /// Walk the tree and build both the song list and the catalog snapshot.
    async fn walk(&self) -> Result<(SongList, Vec<CatalogEntry>)> {
        let mut files = Vec::new();
        collect_files(&self.root, &mut files)?;

        let mut songs = SongList::new();
        let mut catalog = Vec::new();
        for path in files {
            let Some(path_str) = path.to_str() else {
                debug!(path = %path.display(), "skipping non-UTF-8 path");
                continue;
            };
            let opener: Opener = Arc::new(FileOpener::new(path.clone()));
            let decoded = match self.registry.by_extension(path_str, opener).await {
                Ok((decoded, _)) if !decoded.is_empty() => decoded,
                Ok(_) => continue,
                Err(e) if e.is_unknown_format() => {
                    // Non-audio files are expected in a music tree.
                    debug!(path = %path.display(), "skipping non-audio file");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unplayable file");
                    continue;
                }
            };

            let siblings = decoded.len();
            for (sub, song) in decoded {
                catalog.push(CatalogEntry {
                    path: path.clone(),
                    sub: sub.clone(),
                    siblings,
                });
                songs.insert(
                    SongId::new([path_str, sub.as_str()]),
                    wrap(song, &path, &sub, siblings),
                );
            }
        }
        info!(root = %self.root.display(), songs = songs.len(), "walked directory");
        Ok((songs, catalog))
    }

    /// Rebuild songs from a cached catalog without walking the tree.
    async fn rebuild(&self, catalog: &[CatalogEntry]) -> SongList {
        let mut songs = SongList::new();
        for entry in catalog {
            let Some(path_str) = entry.path.to_str() else {
                continue;
            };
            let opener: Opener = Arc::new(FileOpener::new(entry.path.clone()));
            match self
                .registry
                .by_extension_id(path_str, &entry.sub, opener)
                .await
            {
                Ok(song) => {
                    songs.insert(
                        SongId::new([path_str, entry.sub.as_str()]),
                        wrap(song, &entry.path, &entry.sub, entry.siblings),
                    );
                }
                Err(e) => {
                    debug!(path = %entry.path.display(), error = %e, "skipping catalog entry");
                }
            }
        }
        songs
    }

    /// Track count of `path` per the cached catalog, so `get_song` applies
    /// the same title fallback as a listing would.
    async fn siblings_of(&self, path: &str, sub: &SongId) -> usize {
        let cached = self.catalog.lock().await;
        if let Some(catalog) = cached.as_ref() {
            let count = catalog
                .iter()
                .filter(|e| e.path.to_str() == Some(path))
                .count();
            if count > 0 {
                return count;
            }
        }
        // No catalog: a sub-id implies a multi-track file.
        if sub.is_none() {
            1
        } else {
            2
        }
    }
}

fn wrap(song: Box<dyn Song>, path: &Path, sub: &SongId, siblings: usize) -> Box<dyn Song> {
    let mut title = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if siblings != 1 {
        title = format!("{}:{}", title, sub);
    }
    let album = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Box::new(WithFallbackTags::new(song, title, album))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| ProtocolError::InvalidParams(format!("{}: {}", dir.display(), e)))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[async_trait]
impl Source for LocalSource {
    fn key(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }

    async fn list(&self) -> Result<SongList> {
        let mut cached = self.catalog.lock().await;
        if let Some(catalog) = cached.as_ref() {
            return Ok(self.rebuild(catalog).await);
        }
        let (songs, catalog) = self.walk().await?;
        *cached = Some(catalog);
        Ok(songs)
    }

    async fn refresh(&self) -> Result<SongList> {
        let (songs, catalog) = self.walk().await?;
        *self.catalog.lock().await = Some(catalog);
        Ok(songs)
    }

    async fn get_song(&self, id: &SongId) -> Result<Box<dyn Song>> {
        let (path, sub) = id.pop();
        let opener: Opener = Arc::new(FileOpener::new(PathBuf::from(path)));
        let song = self.registry.by_extension_id(path, &sub, opener).await?;
        let siblings = self.siblings_of(path, &sub).await;
        Ok(wrap(song, Path::new(path), &sub, siblings))
    }
}

/// Factory for [`LocalSource`] instances.
pub struct LocalSourceFactory {
    registry: Arc<CodecRegistry>,
}

impl LocalSourceFactory {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl SourceFactory for LocalSourceFactory {
    async fn create(
        &self,
        params: &[String],
        _token: Option<AuthToken>,
    ) -> Result<Arc<dyn Source>> {
        let [directory] = params else {
            return Err(ProtocolError::InvalidParams(
                "expected one parameter: directory".into(),
            ));
        };
        let root = std::fs::canonicalize(directory)
            .map_err(|e| ProtocolError::InvalidParams(format!("{}: {}", directory, e)))?;
        if !root.is_dir() {
            return Err(ProtocolError::InvalidParams(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        Ok(Arc::new(LocalSource::new(root, Arc::clone(&self.registry))))
    }
}

/// Register the `file` protocol with `protocols`.
pub fn register(protocols: &mut ProtocolRegistry, registry: Arc<CodecRegistry>) {
    protocols.register(
        PROTOCOL_NAME,
        vec!["directory"],
        Arc::new(LocalSourceFactory::new(registry)),
    );
}
