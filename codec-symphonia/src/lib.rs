//! # Symphonia Codec Adapters
//!
//! Registers the packet-streaming formats decoded through the symphonia
//! engine: MP3, FLAC, Ogg Vorbis, and WAV. Each format produces a single
//! [`SymphoniaSong`] per stream; the shared adapter handles buffering,
//! normalization, and end-of-stream bookkeeping.

mod song;

pub use song::SymphoniaSong;

use async_trait::async_trait;
use std::sync::Arc;

use core_codec::{
    single_song, CodecDescriptor, CodecRegistry, MagicPattern, Opener, Result, SongFactory, Songs,
};

/// Factory producing one symphonia-backed song per stream.
struct SymphoniaFactory {
    extension: &'static str,
}

#[async_trait]
impl SongFactory for SymphoniaFactory {
    async fn decode(&self, opener: Opener) -> Result<Songs> {
        Ok(single_song(Box::new(SymphoniaSong::new(
            opener,
            self.extension,
        ))))
    }
}

/// Register every symphonia-backed format with `registry`.
///
/// MP3 has no single magic; the six MPEG audio frame-sync prefixes are
/// registered instead, and ID3-tagged files are reached through extension
/// dispatch.
pub fn register_all(registry: &mut CodecRegistry) {
    registry.register(CodecDescriptor::new(
        "MP3",
        vec![
            MagicPattern::parse(b"\xff\xfa"),
            MagicPattern::parse(b"\xff\xfb"),
            MagicPattern::parse(b"\xff\xfc"),
            MagicPattern::parse(b"\xff\xfd"),
            MagicPattern::parse(b"\xff\xfe"),
            MagicPattern::parse(b"\xff\xff"),
        ],
        vec!["mp3"],
        Arc::new(SymphoniaFactory { extension: "mp3" }),
    ));
    registry.register(CodecDescriptor::new(
        "FLAC",
        vec![MagicPattern::parse(b"fLaC")],
        vec!["flac"],
        Arc::new(SymphoniaFactory { extension: "flac" }),
    ));
    registry.register(CodecDescriptor::new(
        "VORBIS",
        vec![MagicPattern::parse(b"OggS")],
        vec!["ogg"],
        Arc::new(SymphoniaFactory { extension: "ogg" }),
    ));
    registry.register(CodecDescriptor::new(
        "WAV",
        vec![MagicPattern::parse(b"RIFF????WAVE")],
        vec!["wav"],
        Arc::new(SymphoniaFactory { extension: "wav" }),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_codec::{CodecError, MemoryOpener, PlayStatus, Song, SongId};

    /// Minimal PCM s16le WAV file.
    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        out.extend_from_slice(&(channels * 2).to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    fn wav_song(samples: &[i16]) -> SymphoniaSong {
        let opener: Opener = Arc::new(MemoryOpener::new(wav_bytes(samples, 44100, 1)));
        SymphoniaSong::new(opener, "wav")
    }

    #[tokio::test]
    async fn play_before_init_fails_with_zero_samples() {
        let mut song = wav_song(&[0; 16]);
        let err = song.play(64).await.unwrap_err();
        assert!(matches!(err, CodecError::NotInitialized));
    }

    #[tokio::test]
    async fn init_reports_engine_params_and_is_idempotent() {
        let mut song = wav_song(&[0; 16]);
        let params = song.init().await.unwrap();
        assert_eq!(params.sample_rate, 44100);
        assert_eq!(params.channels, 1);
        assert_eq!(song.init().await.unwrap(), params);
        song.close().await;
    }

    #[tokio::test]
    async fn play_returns_exact_counts_until_exhaustion() {
        let source: Vec<i16> = (0..300).map(|i| (i * 100) as i16).collect();
        let mut song = wav_song(&source);
        song.init().await.unwrap();

        let mut decoded = Vec::new();
        let a = song.play(128).await.unwrap();
        assert_eq!(a.samples.len(), 128);
        assert!(matches!(a.status, PlayStatus::Playing));
        decoded.extend(a.samples);

        let b = song.play(128).await.unwrap();
        assert_eq!(b.samples.len(), 128);
        decoded.extend(b.samples);

        let c = song.play(128).await.unwrap();
        assert_eq!(c.samples.len(), 44);
        assert!(c.is_end_of_stream());
        decoded.extend(c.samples);

        // Concatenation equals the full decoded sequence.
        assert_eq!(decoded.len(), source.len());
        for (got, want) in decoded.iter().zip(&source) {
            assert!((got - *want as f32 / 32768.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn short_source_signals_end_of_stream_not_error() {
        let mut song = wav_song(&[1000; 100]);
        song.init().await.unwrap();

        let chunk = song.play(4096).await.unwrap();
        assert_eq!(chunk.samples.len(), 100);
        assert!(chunk.is_end_of_stream());

        // Further calls keep signaling end of stream with no samples.
        let after = song.play(4096).await.unwrap();
        assert!(after.samples.is_empty());
        assert!(after.is_end_of_stream());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut song = wav_song(&[0; 8]);
        song.close().await;
        song.init().await.unwrap();
        song.close().await;
        song.close().await;
    }

    #[tokio::test]
    async fn registry_sniffs_wav_by_wildcard_magic() {
        let mut registry = CodecRegistry::new();
        register_all(&mut registry);

        let opener: Opener = Arc::new(MemoryOpener::new(wav_bytes(&[0; 32], 8000, 1)));
        let (mut songs, name) = registry.decode(opener).await.unwrap();
        assert_eq!(name, "WAV");

        let mut song = songs.remove(&SongId::none()).unwrap();
        let params = song.init().await.unwrap();
        assert_eq!(params.sample_rate, 8000);
        song.close().await;
    }
}
