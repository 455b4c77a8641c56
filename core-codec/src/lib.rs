//! # Codec Core
//!
//! Format-sniffing dispatcher and the streaming decode contract shared by
//! every codec backend.
//!
//! ## Overview
//!
//! - [`CodecRegistry`]: ordered registry of codec descriptors (magic-byte
//!   patterns with wildcards, file extensions, adapter factories) with
//!   peek-only sniffing.
//! - [`Song`]: the pull-based decode contract (`init` / `play` / `info` /
//!   `close`) every adapter satisfies, producing normalized interleaved
//!   `f32` samples.
//! - [`ByteStreamOpener`]: a re-invocable capability yielding fresh streams
//!   over the same content, so decoding and metadata extraction can run
//!   independent passes.
//!
//! ## Data flow
//!
//! ```text
//! Opener → CodecRegistry::decode → sniff magic → SongFactory → Songs
//!                                                      │
//!                              init() → play(n)* → close()
//! ```

pub mod error;
pub mod id;
pub mod metadata;
pub mod opener;
pub mod registry;
pub mod song;

pub use error::{CodecError, Result};
pub use id::SongId;
pub use opener::{ByteStream, ByteStreamOpener, CachedBytes, MemoryOpener, Opener};
pub use registry::{CodecDescriptor, CodecRegistry, MagicPattern, SongFactory};
pub use song::{single_song, AudioParams, PlayChunk, PlayStatus, Song, SongInfo, Songs};
