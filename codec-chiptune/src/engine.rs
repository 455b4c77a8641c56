//! # Chip Engine Boundary
//!
//! Emulated-console audio (NSF, NSFE, SPC dumps) is rendered by an external
//! emulation engine. The engine's internals are a collaborator; this module
//! only fixes the boundary the adapter drives.
//!
//! Engines are whole-buffer: the complete dump must be in memory before any
//! track can start. Native output is interleaved `i16` samples.

use std::time::Duration;

/// Metadata an engine reports for one track of a dump.
#[derive(Debug, Clone, Default)]
pub struct ChipTrackInfo {
    /// Track name; empty if the dump carries none.
    pub name: String,
    pub author: String,
    /// Game or album title of the dump.
    pub game: String,
    pub duration: Option<Duration>,
}

/// A running emulation engine over one dump.
pub trait ChipEngine: Send {
    /// Number of playable tracks in the dump.
    fn track_count(&self) -> usize;

    /// Begin rendering the given track from its start.
    fn start_track(&mut self, index: usize) -> Result<(), String>;

    /// Render up to `out.len()` native samples into `out`, returning the
    /// count written. Returning 0 signals the track is exhausted.
    fn render(&mut self, out: &mut [i16]) -> Result<usize, String>;

    /// Metadata for one track.
    fn track_info(&self, index: usize) -> ChipTrackInfo;

    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Number of interleaved output channels.
    fn channels(&self) -> u16;
}

/// Constructor boundary for a chip engine.
pub trait ChipEngineFactory: Send + Sync {
    /// Build an engine over a complete in-memory dump.
    fn create(&self, data: &[u8], sample_rate: u32) -> Result<Box<dyn ChipEngine>, String>;
}
