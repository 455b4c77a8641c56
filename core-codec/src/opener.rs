//! # Byte Stream Capability
//!
//! A [`ByteStreamOpener`] is a re-invocable capability: every `open()` call
//! yields a fresh readable stream over the same content. Decoding and
//! metadata extraction run independent passes, so the same opener may be
//! invoked several times over the life of a song (e.g. a remote file is
//! re-requested for the tag pass).
//!
//! [`ByteStream`] supports non-consuming look-ahead (`peek`) so format
//! sniffing can probe leading bytes without disturbing the read position.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{CodecError, Result};

/// A readable byte stream with a declared length and look-ahead peeking.
///
/// A declared length of 0 means "unknown, read until exhaustion".
pub struct ByteStream {
    reader: Box<dyn Read + Send + Sync>,
    len: u64,
    lookahead: Vec<u8>,
}

impl ByteStream {
    pub fn new(reader: Box<dyn Read + Send + Sync>, len: u64) -> Self {
        Self {
            reader,
            len,
            lookahead: Vec::new(),
        }
    }

    /// An in-memory stream. The declared length is the buffer length.
    pub fn from_bytes(data: Bytes) -> Self {
        let len = data.len() as u64;
        Self::new(Box::new(Cursor::new(data)), len)
    }

    /// Declared total length in bytes, or 0 if unknown.
    pub fn declared_len(&self) -> u64 {
        self.len
    }

    /// Peek up to `n` bytes without consuming them.
    ///
    /// Returns fewer than `n` bytes if the stream ends first; a short peek
    /// is not an error, callers treat it as "no match".
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.lookahead.len() < n {
            let mut chunk = [0u8; 512];
            let want = (n - self.lookahead.len()).min(chunk.len());
            let got = self.reader.read(&mut chunk[..want])?;
            if got == 0 {
                break;
            }
            self.lookahead.extend_from_slice(&chunk[..got]);
        }
        Ok(&self.lookahead[..self.lookahead.len().min(n)])
    }

    /// Read the remainder of the stream into memory.
    pub fn read_all(mut self) -> io::Result<Bytes> {
        let mut buf = std::mem::take(&mut self.lookahead);
        if self.len > buf.len() as u64 {
            buf.reserve((self.len - buf.len() as u64) as usize);
        }
        self.reader.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Drain the look-ahead buffer before touching the inner reader.
        if !self.lookahead.is_empty() {
            let n = buf.len().min(self.lookahead.len());
            buf[..n].copy_from_slice(&self.lookahead[..n]);
            self.lookahead.drain(..n);
            return Ok(n);
        }
        self.reader.read(buf)
    }
}

/// Re-invocable capability producing a fresh stream over some content.
///
/// Each invocation may re-open the underlying resource (re-request a URL,
/// re-open a file). Implementations capture only what they need to
/// reconnect; no mutable state is shared between invocations.
#[async_trait]
pub trait ByteStreamOpener: Send + Sync {
    async fn open(&self) -> Result<ByteStream>;
}

/// Shared handle to an opener.
pub type Opener = Arc<dyn ByteStreamOpener>;

/// Opener over an in-memory buffer. Used for archive members and tests.
pub struct MemoryOpener {
    data: Bytes,
}

impl MemoryOpener {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl ByteStreamOpener for MemoryOpener {
    async fn open(&self) -> Result<ByteStream> {
        Ok(ByteStream::from_bytes(self.data.clone()))
    }
}

/// Lazy, fetch-once materialization of an opener's content.
///
/// The cell is populated on first use and then shared read-only, so sibling
/// tracks of one archive read the bytes without re-invoking the opener.
pub struct CachedBytes {
    opener: Opener,
    cell: OnceCell<Bytes>,
}

impl CachedBytes {
    pub fn new(opener: Opener) -> Self {
        Self {
            opener,
            cell: OnceCell::new(),
        }
    }

    /// The cached content, fetching it on first call.
    pub async fn get(&self) -> Result<Bytes> {
        let bytes = self
            .cell
            .get_or_try_init(|| async {
                let stream = self.opener.open().await?;
                stream.read_all().map_err(CodecError::from)
            })
            .await?;
        Ok(bytes.clone())
    }

    /// Whether the content has already been materialized.
    pub fn is_cached(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOpener {
        data: Bytes,
        opens: AtomicUsize,
    }

    #[async_trait]
    impl ByteStreamOpener for CountingOpener {
        async fn open(&self) -> Result<ByteStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(ByteStream::from_bytes(self.data.clone()))
        }
    }

    #[test]
    fn peek_does_not_consume() {
        let mut s = ByteStream::from_bytes(Bytes::from_static(b"NESM\x1arest"));
        assert_eq!(s.peek(5).unwrap(), b"NESM\x1a");
        assert_eq!(s.peek(4).unwrap(), b"NESM");

        let mut buf = Vec::new();
        s.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"NESM\x1arest");
    }

    #[test]
    fn short_peek_is_not_an_error() {
        let mut s = ByteStream::from_bytes(Bytes::from_static(b"ab"));
        assert_eq!(s.peek(8).unwrap(), b"ab");
    }

    #[test]
    fn read_all_includes_peeked_bytes() {
        let mut s = ByteStream::from_bytes(Bytes::from_static(b"OggS data"));
        s.peek(4).unwrap();
        assert_eq!(&s.read_all().unwrap()[..], b"OggS data");
    }

    #[tokio::test]
    async fn cached_bytes_opens_once() {
        let opener = Arc::new(CountingOpener {
            data: Bytes::from_static(b"SNES-SPC"),
            opens: AtomicUsize::new(0),
        });
        let cached = CachedBytes::new(opener.clone());
        assert!(!cached.is_cached());

        let a = cached.get().await.unwrap();
        let b = cached.get().await.unwrap();
        assert_eq!(a, b);
        assert!(cached.is_cached());
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);
    }
}
