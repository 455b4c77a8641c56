//! # Tag-Based Metadata Extraction
//!
//! Reads container tags (ID3v2, Vorbis Comments, FLAC, ...) through `lofty`
//! for formats whose per-track metadata requires a separate parse pass over
//! the source. Callers cache the result; the opener is re-invoked
//! independently of the decode pass.

use base64::Engine;
use bytes::Bytes;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag};
use std::io::Cursor;
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::opener::Opener;
use crate::song::SongInfo;

/// Read the opener's full content and extract tag metadata from it.
///
/// Returns the extracted info together with the materialized bytes so a
/// caller can run a second parse (e.g. a duration scan) without another
/// fetch. Streams of unknown declared length are refused: the tag pass
/// would otherwise buffer an unbounded live stream.
pub async fn read_tags(opener: &Opener) -> Result<(SongInfo, Bytes)> {
    let stream = opener.open().await?;
    if stream.declared_len() == 0 {
        return Err(CodecError::Metadata(
            "cannot read tags from a stream of unknown length".to_string(),
        ));
    }
    let data = stream.read_all()?;

    let tagged = Probe::new(Cursor::new(data.as_ref()))
        .guess_file_type()
        .map_err(|e| CodecError::Metadata(format!("failed to probe tags: {e}")))?
        .read()
        .map_err(|e| CodecError::Metadata(format!("failed to parse tags: {e}")))?;

    let duration = tagged.properties().duration();
    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());

    let mut info = SongInfo {
        duration: Some(duration),
        ..SongInfo::default()
    };
    if let Some(tag) = tag {
        info.artist = tag.artist().map(|s| s.to_string()).unwrap_or_default();
        info.title = tag.title().map(|s| s.to_string()).unwrap_or_default();
        info.album = tag.album().map(|s| s.to_string()).unwrap_or_default();
        info.track = tag.track().map(f64::from).unwrap_or_default();
        info.image_url = artwork_data_url(tag);
    } else {
        debug!("no tags found in content");
    }

    Ok((info, data))
}

/// Encode the first embedded picture as a `data:` URL.
///
/// A picture whose MIME type is `-->` holds a plain URL in its data, per
/// the ID3v2 APIC convention.
fn artwork_data_url(tag: &Tag) -> Option<String> {
    let picture = tag.pictures().first()?;
    let mime = picture
        .mime_type()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    if mime == "-->" {
        return String::from_utf8(picture.data().to_vec()).ok();
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(picture.data());
    Some(format!("data:{mime};base64,{encoded}"))
}
