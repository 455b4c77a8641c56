//! # Song Decode Contract
//!
//! Every codec adapter implements [`Song`]: a pull-based decode state
//! machine over one playable track.
//!
//! ## State machine
//!
//! ```text
//! Uninitialized → Ready → Playing* → Closed
//! ```
//!
//! - `init()` opens the underlying stream exactly once and reports the
//!   engine's sample rate and channel count. Calling it again after a
//!   success is a no-op returning cached parameters.
//! - `play(n)` returns exactly `n` samples unless the source is exhausted
//!   or a decode failure intervenes; adapters buffer leftovers internally
//!   so heterogeneous packet sizes never leak through the contract.
//! - `info()` may run a separate pass over the source and caches its result.
//! - `close()` is idempotent and infallible.
//!
//! Samples are normalized interleaved `f32` values; each adapter maps its
//! native representation with a fixed linear mapping and preserves the
//! engine's channel order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{CodecError, Result};
use crate::id::SongId;

/// Parameters reported by a decode engine at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParams {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

/// Metadata about one song.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongInfo {
    /// Total duration, if known.
    pub duration: Option<Duration>,
    pub artist: String,
    pub title: String,
    pub album: String,
    /// Track number; floating to allow fractional/virtual tracks.
    pub track: f64,
    /// Artwork URL (possibly a `data:` URL for embedded pictures).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Override title for live sources whose title changes mid-stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<String>,
}

/// Terminal condition of a `play()` call.
#[derive(Debug)]
pub enum PlayStatus {
    /// The full requested count was delivered; more data remains.
    Playing,
    /// The source is exhausted; the chunk holds the final samples (possibly
    /// none). Subsequent calls keep returning empty end-of-stream chunks.
    EndOfStream,
    /// A mid-stream decode failure. The chunk still carries every sample
    /// buffered before the failure; callers must not discard them.
    Failed(CodecError),
}

/// Decoded samples returned by one `play()` call.
#[derive(Debug)]
pub struct PlayChunk {
    /// Interleaved samples, at most the requested count.
    pub samples: Vec<f32>,
    pub status: PlayStatus,
}

impl PlayChunk {
    pub fn playing(samples: Vec<f32>) -> Self {
        Self {
            samples,
            status: PlayStatus::Playing,
        }
    }

    pub fn end_of_stream(samples: Vec<f32>) -> Self {
        Self {
            samples,
            status: PlayStatus::EndOfStream,
        }
    }

    pub fn failed(samples: Vec<f32>, err: CodecError) -> Self {
        Self {
            samples,
            status: PlayStatus::Failed(err),
        }
    }

    /// Returns `true` once the stream has nothing further to deliver.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.status, PlayStatus::EndOfStream)
    }
}

/// One playable track behind the uniform decode contract.
///
/// A `Song` owns its decode-engine handle and sample buffer but not the
/// underlying transport until `init()` is called. At most one caller drives
/// a given `Song`; concurrent calls must be serialized by the owner.
#[async_trait]
pub trait Song: Send {
    /// Prepare the decode engine, opening the underlying stream once.
    ///
    /// Subsequent calls after the first success return the cached
    /// parameters without touching the transport.
    async fn init(&mut self) -> Result<AudioParams>;

    /// Pull the next `n` normalized samples.
    ///
    /// Fewer than `n` samples are returned only at end of stream or on an
    /// interior decode failure, both signaled through [`PlayStatus`].
    /// Calling before a successful `init()` is an error with zero samples.
    async fn play(&mut self, n: usize) -> Result<PlayChunk>;

    /// Metadata for this song. May run an independent pass over the source;
    /// implementations cache so repeated calls are cheap.
    async fn info(&mut self) -> Result<SongInfo>;

    /// Release the decode engine and any open stream.
    ///
    /// Idempotent; safe to call multiple times or without a prior `init()`.
    async fn close(&mut self);
}

/// Mapping of song identifiers to songs produced by a decode or listing.
pub type Songs = HashMap<SongId, Box<dyn Song>>;

/// A `Songs` map holding one unkeyed song, for single-track formats.
pub fn single_song(song: Box<dyn Song>) -> Songs {
    let mut songs = Songs::new();
    songs.insert(SongId::none(), song);
    songs
}
