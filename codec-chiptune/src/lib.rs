//! # Chiptune Codec Adapter
//!
//! Decodes emulated-console music dumps (NSF, NSFE, SPC) through a
//! pluggable [`ChipEngine`]. A single dump usually carries many tracks;
//! `decode` enumerates them all as sibling songs over one shared byte
//! buffer, and `get` addresses one track by index without enumerating.

mod engine;
mod song;

pub use engine::{ChipEngine, ChipEngineFactory, ChipTrackInfo};
pub use song::{ChiptuneSong, CHIP_SAMPLE_RATE};

use async_trait::async_trait;
use std::sync::Arc;

// `core_codec::Result` is spelled out at its use sites; importing the
// one-parameter alias here would shadow `std::result::Result` for the
// two-parameter engine signatures below and in tests.
use core_codec::{
    CachedBytes, CodecDescriptor, CodecError, CodecRegistry, MagicPattern, Opener, Song,
    SongFactory, SongId, Songs,
};

/// Factory producing one song per track of a dump.
pub struct ChiptuneFactory {
    engines: Arc<dyn ChipEngineFactory>,
}

impl ChiptuneFactory {
    pub fn new(engines: Arc<dyn ChipEngineFactory>) -> Self {
        Self { engines }
    }
}

#[async_trait]
impl SongFactory for ChiptuneFactory {
    async fn decode(&self, opener: Opener) -> core_codec::Result<Songs> {
        let shared = Arc::new(CachedBytes::new(opener));

        // One probe engine to count tracks; siblings re-use the cached bytes.
        let data = shared.get().await?;
        let probe = self
            .engines
            .create(&data, CHIP_SAMPLE_RATE)
            .map_err(CodecError::Decode)?;
        let count = probe.track_count();
        drop(probe);

        let mut songs = Songs::new();
        for track in 0..count {
            songs.insert(
                SongId::from_index(track),
                Box::new(ChiptuneSong::new(
                    Arc::clone(&shared),
                    Arc::clone(&self.engines),
                    track,
                )) as Box<dyn Song>,
            );
        }
        Ok(songs)
    }

    async fn get(&self, opener: Opener, id: &SongId) -> core_codec::Result<Box<dyn Song>> {
        let track = id
            .as_index()
            .ok_or_else(|| CodecError::SongNotFound(id.to_string()))?;
        Ok(Box::new(ChiptuneSong::new(
            Arc::new(CachedBytes::new(opener)),
            Arc::clone(&self.engines),
            track,
        )))
    }
}

/// Register the chiptune dump formats with `registry`, all backed by the
/// same engine factory.
pub fn register_all(registry: &mut CodecRegistry, engines: Arc<dyn ChipEngineFactory>) {
    let nsf = Arc::new(ChiptuneFactory::new(Arc::clone(&engines)));
    let nsfe = Arc::new(ChiptuneFactory::new(Arc::clone(&engines)));
    let spc = Arc::new(ChiptuneFactory::new(engines));

    registry.register(CodecDescriptor::new(
        "NSF",
        vec![MagicPattern::parse(b"NESM\x1a")],
        vec!["nsf"],
        nsf,
    ));
    registry.register(CodecDescriptor::new(
        "NSFE",
        vec![MagicPattern::parse(b"NSFE")],
        vec!["nsfe"],
        nsfe,
    ));
    registry.register(CodecDescriptor::new(
        "SPC",
        vec![MagicPattern::parse(b"SNES-SPC")],
        vec!["spc"],
        spc,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::normalize;
    use bytes::Bytes;
    use core_codec::{ByteStream, ByteStreamOpener, MemoryOpener, PlayStatus};
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    mock! {
        Engine {}

        impl ChipEngine for Engine {
            fn track_count(&self) -> usize;
            fn start_track(&mut self, index: usize) -> Result<(), String>;
            fn render(&mut self, out: &mut [i16]) -> Result<usize, String>;
            fn track_info(&self, index: usize) -> ChipTrackInfo;
            fn sample_rate(&self) -> u32;
            fn channels(&self) -> u16;
        }
    }

    /// Engine over a fixed sample script, shared by most tests.
    struct ScriptedEngine {
        samples: Vec<i16>,
        pos: usize,
    }

    impl ChipEngine for ScriptedEngine {
        fn track_count(&self) -> usize {
            3
        }

        fn start_track(&mut self, _index: usize) -> Result<(), String> {
            self.pos = 0;
            Ok(())
        }

        fn render(&mut self, out: &mut [i16]) -> Result<usize, String> {
            let n = out.len().min(self.samples.len() - self.pos);
            out[..n].copy_from_slice(&self.samples[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn track_info(&self, _index: usize) -> ChipTrackInfo {
            ChipTrackInfo {
                name: String::new(),
                author: "author".into(),
                game: "game".into(),
                duration: None,
            }
        }

        fn sample_rate(&self) -> u32 {
            CHIP_SAMPLE_RATE
        }

        fn channels(&self) -> u16 {
            2
        }
    }

    struct ScriptedFactory {
        samples: Vec<i16>,
        creates: AtomicUsize,
    }

    impl ScriptedFactory {
        fn new(samples: Vec<i16>) -> Self {
            Self {
                samples,
                creates: AtomicUsize::new(0),
            }
        }
    }

    impl ChipEngineFactory for ScriptedFactory {
        fn create(&self, _data: &[u8], _rate: u32) -> Result<Box<dyn ChipEngine>, String> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedEngine {
                samples: self.samples.clone(),
                pos: 0,
            }))
        }
    }

    /// Hands out one pre-built engine, then fails further creates.
    struct OnceFactory(Mutex<Option<Box<dyn ChipEngine>>>);

    impl ChipEngineFactory for OnceFactory {
        fn create(&self, _data: &[u8], _rate: u32) -> Result<Box<dyn ChipEngine>, String> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| "engine already taken".to_string())
        }
    }

    struct CountingOpener {
        inner: MemoryOpener,
        opens: AtomicUsize,
    }

    #[async_trait]
    impl ByteStreamOpener for CountingOpener {
        async fn open(&self) -> core_codec::Result<ByteStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.inner.open().await
        }
    }

    #[test]
    fn normalization_maps_native_range_onto_unit_interval() {
        assert_eq!(normalize(i16::MIN), 0.0);
        assert!((normalize(0) - 0.5).abs() < 1e-4);
        assert!((normalize(i16::MAX) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn decode_enumerates_tracks_over_one_fetch() {
        let opener = Arc::new(CountingOpener {
            inner: MemoryOpener::new(Bytes::from_static(b"NESM\x1adump")),
            opens: AtomicUsize::new(0),
        });
        let factory = ChiptuneFactory::new(Arc::new(ScriptedFactory::new(vec![0; 64])));

        let songs = factory.decode(Arc::clone(&opener) as Opener).await.unwrap();
        assert_eq!(songs.len(), 3);
        for track in 0..3 {
            assert!(songs.contains_key(&SongId::from_index(track)));
        }

        // Every sibling init reads the same cached buffer.
        let mut songs = songs;
        for (_, song) in songs.iter_mut() {
            song.init().await.unwrap();
        }
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn play_before_init_is_rejected() {
        let factory = ChiptuneFactory::new(Arc::new(ScriptedFactory::new(vec![0; 8])));
        let opener: Opener = Arc::new(MemoryOpener::new(Bytes::from_static(b"NESM\x1a")));
        let mut song = factory.get(opener, &SongId::from_index(0)).await.unwrap();

        let err = song.play(16).await.unwrap_err();
        assert!(matches!(err, CodecError::NotInitialized));
    }

    #[tokio::test]
    async fn play_returns_exact_counts_then_end_of_stream() {
        let source: Vec<i16> = (0..100).map(|i| (i * 300) as i16).collect();
        let factory = ChiptuneFactory::new(Arc::new(ScriptedFactory::new(source.clone())));
        let opener: Opener = Arc::new(MemoryOpener::new(Bytes::from_static(b"NESM\x1a")));
        let mut song = factory.get(opener, &SongId::from_index(1)).await.unwrap();

        let params = song.init().await.unwrap();
        assert_eq!(params.sample_rate, CHIP_SAMPLE_RATE);
        assert_eq!(params.channels, 2);

        let a = song.play(64).await.unwrap();
        assert_eq!(a.samples.len(), 64);
        assert!(matches!(a.status, PlayStatus::Playing));
        assert!((a.samples[1] - normalize(source[1])).abs() < 1e-6);

        let b = song.play(64).await.unwrap();
        assert_eq!(b.samples.len(), 36);
        assert!(b.is_end_of_stream());

        let after = song.play(64).await.unwrap();
        assert!(after.samples.is_empty());
        assert!(after.is_end_of_stream());
    }

    #[tokio::test]
    async fn render_error_surfaces_partial_samples() {
        let mut engine = MockEngine::new();
        engine.expect_start_track().return_once(|_| Ok(()));
        engine.expect_sample_rate().return_const(CHIP_SAMPLE_RATE);
        engine.expect_channels().return_const(1u16);
        let mut first = true;
        engine.expect_render().returning(move |out| {
            if first {
                first = false;
                out[..5].fill(0);
                Ok(5)
            } else {
                Err("apu desync".to_string())
            }
        });

        let factory = ChiptuneFactory::new(Arc::new(OnceFactory(Mutex::new(Some(
            Box::new(engine),
        )))));
        let opener: Opener = Arc::new(MemoryOpener::new(Bytes::from_static(b"NESM\x1a")));
        let mut song = factory.get(opener, &SongId::from_index(0)).await.unwrap();
        song.init().await.unwrap();

        let chunk = song.play(64).await.unwrap();
        assert_eq!(chunk.samples.len(), 5);
        assert!(matches!(chunk.status, PlayStatus::Failed(CodecError::Decode(_))));
    }

    #[tokio::test]
    async fn info_falls_back_to_game_and_track_number() {
        let factory = ChiptuneFactory::new(Arc::new(ScriptedFactory::new(vec![0; 4])));
        let opener: Opener = Arc::new(MemoryOpener::new(Bytes::from_static(b"NESM\x1a")));
        let mut song = factory.get(opener, &SongId::from_index(2)).await.unwrap();

        let info = song.info().await.unwrap();
        assert_eq!(info.title, "game:03");
        assert_eq!(info.album, "game");
        assert_eq!(info.artist, "author");
        assert_eq!(info.track, 2.0);
    }

    #[tokio::test]
    async fn get_rejects_non_index_ids() {
        let factory = ChiptuneFactory::new(Arc::new(ScriptedFactory::new(vec![])));
        let opener: Opener = Arc::new(MemoryOpener::new(Bytes::from_static(b"NESM\x1a")));
        let err = factory
            .get(opener, &SongId::from("not-a-number"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CodecError::SongNotFound(_)));
    }

    #[tokio::test]
    async fn registry_sniffs_dump_formats() {
        let mut registry = CodecRegistry::new();
        register_all(&mut registry, Arc::new(ScriptedFactory::new(vec![0; 8])));
        assert_eq!(registry.formats(), vec!["NSF", "NSFE", "SPC"]);

        let opener: Opener =
            Arc::new(MemoryOpener::new(Bytes::from_static(b"SNES-SPC700 Sound File Data")));
        let (songs, name) = registry.decode(opener).await.unwrap();
        assert_eq!(name, "SPC");
        assert_eq!(songs.len(), 3);
    }
}
