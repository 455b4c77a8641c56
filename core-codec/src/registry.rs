//! # Codec Registry and Format Sniffing
//!
//! The registry maps magic-byte patterns and file extensions to codec
//! adapter factories. It is constructed explicitly during process startup,
//! then shared read-only behind an `Arc`; the read path takes no locks.
//!
//! Sniffing is peek-only: probing never consumes stream bytes, because the
//! same opener is re-invoked later for the actual decode.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{CodecError, Result};
use crate::id::SongId;
use crate::opener::{ByteStream, Opener};
use crate::song::{Song, Songs};

/// A magic-byte pattern with wildcard positions.
///
/// Parsed from a byte literal where `b'?'` matches any byte, e.g.
/// `RIFF????WAVE`. Pattern length equals the number of probe bytes
/// compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicPattern(Vec<Option<u8>>);

impl MagicPattern {
    /// Parse a pattern; `b'?'` positions match any byte.
    pub fn parse(pattern: &[u8]) -> Self {
        MagicPattern(
            pattern
                .iter()
                .map(|&b| if b == b'?' { None } else { Some(b) })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Byte-for-byte comparison; `probe` must be exactly pattern length.
    pub fn matches(&self, probe: &[u8]) -> bool {
        probe.len() == self.0.len()
            && self
                .0
                .iter()
                .zip(probe)
                .all(|(p, &b)| p.map_or(true, |expected| expected == b))
    }
}

/// Factory producing zero or more songs from an opener.
///
/// `decode` enumerates every playable track; `get` addresses one track by
/// id, which container formats override to avoid enumerating siblings.
#[async_trait]
pub trait SongFactory: Send + Sync {
    async fn decode(&self, opener: Opener) -> Result<Songs>;

    async fn get(&self, opener: Opener, id: &SongId) -> Result<Box<dyn Song>> {
        let mut songs = self.decode(opener).await?;
        songs
            .remove(id)
            .ok_or_else(|| CodecError::SongNotFound(id.to_string()))
    }
}

/// Registration entry for one codec adapter.
pub struct CodecDescriptor {
    name: String,
    magic: Vec<MagicPattern>,
    extensions: Vec<String>,
    factory: Arc<dyn SongFactory>,
}

impl CodecDescriptor {
    pub fn new(
        name: impl Into<String>,
        magic: Vec<MagicPattern>,
        extensions: Vec<&str>,
        factory: Arc<dyn SongFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            magic,
            extensions: extensions.into_iter().map(str::to_string).collect(),
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered, append-only codec registry.
///
/// Registration happens during initialization, before concurrent use;
/// lookups run lock-free from any number of playback sessions. Colliding
/// magics are tried in registration order, so adapters register their
/// most-specific patterns first.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: Vec<Arc<CodecDescriptor>>,
    extensions: HashMap<String, Arc<CodecDescriptor>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a codec. No de-duplication is performed; for extensions the
    /// first registration wins.
    pub fn register(&mut self, descriptor: CodecDescriptor) {
        let descriptor = Arc::new(descriptor);
        for ext in &descriptor.extensions {
            if let Some(owner) = self.extensions.get(ext) {
                warn!(
                    extension = %ext,
                    owner = %owner.name,
                    ignored = %descriptor.name,
                    "extension already registered, keeping first owner"
                );
                continue;
            }
            self.extensions
                .insert(ext.clone(), Arc::clone(&descriptor));
        }
        debug!(codec = %descriptor.name, "registered codec");
        self.codecs.push(descriptor);
    }

    /// Determine the format of the stream's data by peeking magic bytes.
    ///
    /// A stream too short for some pattern simply does not match it;
    /// sniffing itself never fails.
    pub fn sniff(&self, stream: &mut ByteStream) -> Option<Arc<CodecDescriptor>> {
        for codec in &self.codecs {
            for magic in &codec.magic {
                let probe = match stream.peek(magic.len()) {
                    Ok(probe) => probe,
                    Err(_) => continue,
                };
                if magic.matches(probe) {
                    return Some(Arc::clone(codec));
                }
            }
        }
        None
    }

    /// Sniff the opener's content and decode it with the matched codec.
    ///
    /// Returns the songs and the registered format name, or
    /// [`CodecError::UnknownFormat`] if no magic pattern matches.
    pub async fn decode(&self, opener: Opener) -> Result<(Songs, String)> {
        let mut stream = opener.open().await?;
        let codec = self.sniff(&mut stream).ok_or(CodecError::UnknownFormat)?;
        drop(stream);

        debug!(codec = %codec.name, "sniffed format");
        let songs = codec.factory.decode(opener).await?;
        Ok((songs, codec.name.clone()))
    }

    /// Dispatch by file extension instead of content sniffing.
    ///
    /// `path` may be a full path, a bare extension, or a filename; the
    /// trailing dot-suffix is used, or the whole string when there is none.
    pub async fn by_extension(&self, path: &str, opener: Opener) -> Result<(Songs, String)> {
        let codec = self.codec_for_extension(path)?;
        let songs = codec.factory.decode(opener).await?;
        Ok((songs, codec.name.clone()))
    }

    /// Extension-keyed dispatch addressing a single song by id.
    pub async fn by_extension_id(
        &self,
        path: &str,
        id: &SongId,
        opener: Opener,
    ) -> Result<Box<dyn Song>> {
        let codec = self.codec_for_extension(path)?;
        codec.factory.get(opener, id).await
    }

    /// Registered format names, in registration order.
    pub fn formats(&self) -> Vec<&str> {
        self.codecs.iter().map(|c| c.name.as_str()).collect()
    }

    fn codec_for_extension(&self, path: &str) -> Result<&Arc<CodecDescriptor>> {
        let ext = extension_of(path);
        self.extensions
            .get(ext)
            .ok_or_else(|| CodecError::UnknownExtension(ext.to_string()))
    }
}

/// The lowercase-preserving extension of `path`: text after the last dot,
/// or the whole string when there is no dot.
fn extension_of(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opener::MemoryOpener;
    use crate::song::{single_song, AudioParams, PlayChunk, SongInfo};
    use bytes::Bytes;

    struct StubSong;

    #[async_trait]
    impl Song for StubSong {
        async fn init(&mut self) -> Result<AudioParams> {
            Ok(AudioParams {
                sample_rate: 44100,
                channels: 2,
            })
        }

        async fn play(&mut self, _n: usize) -> Result<PlayChunk> {
            Ok(PlayChunk::end_of_stream(Vec::new()))
        }

        async fn info(&mut self) -> Result<SongInfo> {
            Ok(SongInfo::default())
        }

        async fn close(&mut self) {}
    }

    struct StubFactory;

    #[async_trait]
    impl SongFactory for StubFactory {
        async fn decode(&self, _opener: Opener) -> Result<Songs> {
            Ok(single_song(Box::new(StubSong)))
        }
    }

    fn registry_with(name: &str, magic: &[u8], exts: Vec<&str>) -> CodecRegistry {
        let mut registry = CodecRegistry::new();
        registry.register(CodecDescriptor::new(
            name,
            vec![MagicPattern::parse(magic)],
            exts,
            Arc::new(StubFactory),
        ));
        registry
    }

    fn opener(data: &'static [u8]) -> Opener {
        Arc::new(MemoryOpener::new(Bytes::from_static(data)))
    }

    #[test]
    fn magic_wildcards_match_any_byte() {
        let magic = MagicPattern::parse(b"RIFF????WAVE");
        assert!(magic.matches(b"RIFF\x10\x00\x00\x99WAVE"));
        assert!(!magic.matches(b"RIFX\x10\x00\x00\x99WAVE"));
        // Length must equal the pattern length exactly.
        assert!(!magic.matches(b"RIFF????WAVEextra"));
        assert!(!magic.matches(b"RIFF"));
    }

    #[tokio::test]
    async fn decode_selects_matching_codec() {
        let registry = registry_with("NSF", b"NESM\x1a", vec!["nsf"]);
        let (songs, name) = registry
            .decode(opener(b"NESM\x1a arbitrary trailing content"))
            .await
            .unwrap();
        assert_eq!(name, "NSF");
        assert_eq!(songs.len(), 1);
    }

    #[tokio::test]
    async fn altered_magic_byte_is_unknown_format() {
        let registry = registry_with("NSF", b"NESM\x1a", vec!["nsf"]);
        let err = registry.decode(opener(b"NESN\x1a....")).await.err().unwrap();
        assert!(matches!(err, CodecError::UnknownFormat));
    }

    #[tokio::test]
    async fn short_stream_is_no_match_not_error() {
        let registry = registry_with("SPC", b"SNES-SPC", vec!["spc"]);
        let err = registry.decode(opener(b"SNE")).await.err().unwrap();
        assert!(matches!(err, CodecError::UnknownFormat));
    }

    #[tokio::test]
    async fn sniff_precedence_is_registration_order() {
        let mut registry = CodecRegistry::new();
        registry.register(CodecDescriptor::new(
            "FUZZY",
            vec![MagicPattern::parse(b"??gS")],
            vec![],
            Arc::new(StubFactory),
        ));
        registry.register(CodecDescriptor::new(
            "VORBIS",
            vec![MagicPattern::parse(b"OggS")],
            vec!["ogg"],
            Arc::new(StubFactory),
        ));

        let (_, name) = registry.decode(opener(b"OggS.....")).await.unwrap();
        assert_eq!(name, "FUZZY");
    }

    #[tokio::test]
    async fn extension_dispatch() {
        let registry = registry_with("WAV", b"RIFF????WAVE", vec!["wav"]);

        let (songs, name) = registry
            .by_extension("some/dir/track.wav", opener(b"ignored"))
            .await
            .unwrap();
        assert_eq!(name, "WAV");
        assert_eq!(songs.len(), 1);

        let err = registry
            .by_extension("track.xyz", opener(b""))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CodecError::UnknownExtension(e) if e == "xyz"));
    }

    #[tokio::test]
    async fn extension_collision_keeps_first_owner() {
        let mut registry = registry_with("FIRST", b"AAAA", vec!["nsf"]);
        registry.register(CodecDescriptor::new(
            "SECOND",
            vec![MagicPattern::parse(b"BBBB")],
            vec!["nsf"],
            Arc::new(StubFactory),
        ));

        let (_, name) = registry.by_extension("nsf", opener(b"")).await.unwrap();
        assert_eq!(name, "FIRST");
    }

    #[tokio::test]
    async fn registries_are_isolated() {
        let a = registry_with("NSF", b"NESM\x1a", vec!["nsf"]);
        let b = CodecRegistry::new();
        assert_eq!(a.formats(), vec!["NSF"]);
        assert!(b.formats().is_empty());
    }

    #[test]
    fn extension_of_variants() {
        assert_eq!(extension_of("a/b/c.mp3"), "mp3");
        assert_eq!(extension_of("mp3"), "mp3");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("trailingdot."), "trailingdot.");
    }
}
