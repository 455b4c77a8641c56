//! Decorator supplying path-derived tags when a file carries none.

use async_trait::async_trait;

use core_codec::{AudioParams, PlayChunk, Result, Song, SongInfo};

/// Delegates everything to the inner song, filling empty title and album
/// fields from the file's path.
pub struct WithFallbackTags {
    inner: Box<dyn Song>,
    title: String,
    album: String,
}

impl WithFallbackTags {
    pub fn new(inner: Box<dyn Song>, title: String, album: String) -> Self {
        Self {
            inner,
            title,
            album,
        }
    }
}

#[async_trait]
impl Song for WithFallbackTags {
    async fn init(&mut self) -> Result<AudioParams> {
        self.inner.init().await
    }

    async fn play(&mut self, n: usize) -> Result<PlayChunk> {
        self.inner.play(n).await
    }

    async fn info(&mut self) -> Result<SongInfo> {
        let mut info = self.inner.info().await.unwrap_or_default();
        if info.title.is_empty() {
            info.title = self.title.clone();
        }
        if info.album.is_empty() {
            info.album = self.album.clone();
        }
        Ok(info)
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}
