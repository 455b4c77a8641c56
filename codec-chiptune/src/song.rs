//! # Chiptune Song Adapter
//!
//! Whole-buffer adapter: the dump is materialized once through a shared
//! [`CachedBytes`] cell, so every track of a multi-track archive reads the
//! same single fetch. Native `i16` engine output is normalized to `f32`
//! with a fixed linear mapping.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use core_codec::{
    AudioParams, CachedBytes, CodecError, PlayChunk, Result, Song, SongInfo,
};

use crate::engine::{ChipEngine, ChipEngineFactory};

/// Sample rate requested from every chip engine.
pub const CHIP_SAMPLE_RATE: u32 = 44100;

/// Linear mapping from the engine's native `i16` range onto `[0, 1)`.
pub(crate) fn normalize(s: i16) -> f32 {
    (s as f32 - i16::MIN as f32) / (i16::MAX as f32 - i16::MIN as f32)
}

/// One track of an emulated-console dump.
pub struct ChiptuneSong {
    data: Arc<CachedBytes>,
    factory: Arc<dyn ChipEngineFactory>,
    track: usize,
    engine: Option<Box<dyn ChipEngine>>,
    params: Option<AudioParams>,
    buffer: Vec<f32>,
    eof: bool,
    info: Option<SongInfo>,
}

impl ChiptuneSong {
    pub fn new(data: Arc<CachedBytes>, factory: Arc<dyn ChipEngineFactory>, track: usize) -> Self {
        Self {
            data,
            factory,
            track,
            engine: None,
            params: None,
            buffer: Vec::new(),
            eof: false,
            info: None,
        }
    }
}

#[async_trait]
impl Song for ChiptuneSong {
    async fn init(&mut self) -> Result<AudioParams> {
        if let (Some(params), Some(_)) = (self.params, self.engine.as_ref()) {
            return Ok(params);
        }

        let data = self.data.get().await?;
        let mut engine = self
            .factory
            .create(&data, CHIP_SAMPLE_RATE)
            .map_err(CodecError::Decode)?;
        engine.start_track(self.track).map_err(CodecError::Decode)?;

        let params = AudioParams {
            sample_rate: engine.sample_rate(),
            channels: engine.channels(),
        };
        debug!(track = self.track, sample_rate = params.sample_rate, "chip engine started");
        self.engine = Some(engine);
        self.params = Some(params);
        self.eof = false;
        Ok(params)
    }

    async fn play(&mut self, n: usize) -> Result<PlayChunk> {
        let engine = self.engine.as_mut().ok_or(CodecError::NotInitialized)?;

        while self.buffer.len() < n && !self.eof {
            let want = (n - self.buffer.len()).max(1);
            let mut native = vec![0i16; want];
            match engine.render(&mut native) {
                Ok(0) => self.eof = true,
                Ok(wrote) => self
                    .buffer
                    .extend(native[..wrote].iter().copied().map(normalize)),
                Err(e) => {
                    let partial = std::mem::take(&mut self.buffer);
                    return Ok(PlayChunk::failed(partial, CodecError::Decode(e)));
                }
            }
        }

        let take = n.min(self.buffer.len());
        let samples: Vec<f32> = self.buffer.drain(..take).collect();
        if samples.len() < n {
            Ok(PlayChunk::end_of_stream(samples))
        } else {
            Ok(PlayChunk::playing(samples))
        }
    }

    async fn info(&mut self) -> Result<SongInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }

        // Info pass over the shared bytes, without touching the playback
        // engine's render position.
        let data = self.data.get().await?;
        let engine = self
            .factory
            .create(&data, CHIP_SAMPLE_RATE)
            .map_err(CodecError::Decode)?;
        let track = engine.track_info(self.track);

        let title = if track.name.is_empty() {
            format!("{}:{:02}", track.game, self.track + 1)
        } else {
            track.name
        };
        let info = SongInfo {
            duration: track.duration,
            artist: track.author,
            title,
            album: track.game,
            track: self.track as f64,
            ..SongInfo::default()
        };
        self.info = Some(info.clone());
        Ok(info)
    }

    async fn close(&mut self) {
        self.engine = None;
        self.params = None;
        self.buffer = Vec::new();
        self.eof = false;
    }
}
