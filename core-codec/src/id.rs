//! # Song Identifiers
//!
//! Opaque, composite identifiers for addressing individual tracks.
//!
//! Sources produce ids that stay stable across repeated listings, and
//! container formats (archives, multi-track dumps) nest a child id under the
//! containing entry's id. Parts are joined with a separator that cannot occur
//! in filenames or remote object ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between id parts.
const ID_SEP: char = '\n';

/// Opaque song identifier, unique per source.
///
/// An id is a sequence of string parts. `top()` addresses the outermost
/// container entry and `pop()` peels one level off for nested dispatch
/// (e.g. a track inside an archive inside a remote file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    /// Join `parts` into a composite id.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(&ID_SEP.to_string());
        SongId(joined)
    }

    /// The empty id, used by single-song formats.
    pub fn none() -> Self {
        SongId(String::new())
    }

    /// Id from a track index.
    pub fn from_index(i: usize) -> Self {
        SongId(i.to_string())
    }

    /// The first (outermost) part of the id.
    pub fn top(&self) -> &str {
        self.0.split(ID_SEP).next().unwrap_or("")
    }

    /// Split off the first part, returning it and the remainder.
    pub fn pop(&self) -> (&str, SongId) {
        match self.0.split_once(ID_SEP) {
            Some((head, rest)) => (head, SongId(rest.to_string())),
            None => (self.0.as_str(), SongId::none()),
        }
    }

    /// Append a part to the id.
    pub fn push(&self, part: &str) -> SongId {
        if self.0.is_empty() {
            SongId(part.to_string())
        } else {
            SongId(format!("{}{}{}", self.0, ID_SEP, part))
        }
    }

    /// Parse the id as a track index, if it is one.
    pub fn as_index(&self) -> Option<usize> {
        self.0.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.replace(ID_SEP, "/"))
    }
}

impl From<&str> for SongId {
    fn from(s: &str) -> Self {
        SongId(s.to_string())
    }
}

impl From<String> for SongId {
    fn from(s: String) -> Self {
        SongId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_roundtrip() {
        let id = SongId::new(["album.rsn", "3"]);
        assert_eq!(id.top(), "album.rsn");

        let (head, rest) = id.pop();
        assert_eq!(head, "album.rsn");
        assert_eq!(rest, SongId::from("3"));
        assert_eq!(rest.as_index(), Some(3));
    }

    #[test]
    fn pop_single_part() {
        let id = SongId::from("only");
        let (head, rest) = id.pop();
        assert_eq!(head, "only");
        assert!(rest.is_none());
    }

    #[test]
    fn push_onto_empty() {
        let id = SongId::none().push("file.mp3");
        assert_eq!(id, SongId::from("file.mp3"));
        assert_eq!(id.push("0").top(), "file.mp3");
    }

    #[test]
    fn serde_transparent() {
        let id = SongId::new(["a", "b"]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"a\\nb\"");
        let back: SongId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
