//! # Streaming Symphonia Adapter
//!
//! Bridges symphonia's packet-oriented decode API to the pull-based
//! `play(n)` contract. Packets are pulled on demand and their samples
//! accumulated in an internal buffer; leftovers carry over between calls so
//! every call returns exactly the requested count until the stream drains.

use async_trait::async_trait;
use std::io::ErrorKind;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use core_codec::{
    metadata, AudioParams, CodecError, Opener, PlayChunk, Result, Song, SongInfo,
};

/// Live decode pipeline: demuxer, codec decoder, and the selected track.
struct DecodeState {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

/// One song decoded through symphonia.
///
/// The underlying stream is opened once at `init()` and packets are pulled
/// from it on demand; `close()` drops the open stream along with the
/// decoder.
pub struct SymphoniaSong {
    opener: Opener,
    extension: &'static str,
    state: Option<DecodeState>,
    params: Option<AudioParams>,
    buffer: Vec<f32>,
    eof: bool,
    info: Option<SongInfo>,
}

impl SymphoniaSong {
    pub fn new(opener: Opener, extension: &'static str) -> Self {
        Self {
            opener,
            extension,
            state: None,
            params: None,
            buffer: Vec::new(),
            eof: false,
            info: None,
        }
    }

    /// Decode the next packet belonging to the selected track.
    ///
    /// Returns `Ok(None)` at end of stream. Packets of other tracks are
    /// skipped.
    fn next_samples(state: &mut DecodeState) -> Result<Option<Vec<f32>>> {
        loop {
            let packet = match state.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(CodecError::Decode(
                        "track list changed mid-stream".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(CodecError::Decode(format!("failed to read packet: {e}")));
                }
            };

            if packet.track_id() != state.track_id {
                continue;
            }

            let decoded = state
                .decoder
                .decode(&packet)
                .map_err(|e| CodecError::Decode(format!("failed to decode packet: {e}")))?;

            // Convert whatever native representation the codec produced
            // (planar or interleaved, integer or float) into interleaved
            // f32, preserving channel order.
            let spec = *decoded.spec();
            let mut converted = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            converted.copy_interleaved_ref(decoded);
            return Ok(Some(converted.samples().to_vec()));
        }
    }
}

#[async_trait]
impl Song for SymphoniaSong {
    async fn init(&mut self) -> Result<AudioParams> {
        if let Some(params) = self.params {
            return Ok(params);
        }

        let stream = self.opener.open().await?;
        let source = MediaSourceStream::new(
            Box::new(ReadOnlySource::new(stream)),
            Default::default(),
        );

        let mut hint = Hint::new();
        hint.with_extension(self.extension);

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::Decode(format!("failed to probe format: {e}")))?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CodecError::Decode("no decodable audio track".to_string()))?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CodecError::Decode("missing sample rate".to_string()))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::Decode(format!("failed to create decoder: {e}")))?;

        debug!(sample_rate, channels, track_id, "decoder ready");

        self.state = Some(DecodeState {
            reader,
            decoder,
            track_id,
        });
        let params = AudioParams {
            sample_rate,
            channels,
        };
        self.params = Some(params);
        self.eof = false;
        Ok(params)
    }

    async fn play(&mut self, n: usize) -> Result<PlayChunk> {
        let state = self.state.as_mut().ok_or(CodecError::NotInitialized)?;

        while self.buffer.len() < n && !self.eof {
            match Self::next_samples(state) {
                Ok(Some(samples)) => self.buffer.extend_from_slice(&samples),
                Ok(None) => self.eof = true,
                Err(err) => {
                    // Surface the failure together with everything decoded
                    // before it; partial output is never dropped.
                    let partial = std::mem::take(&mut self.buffer);
                    return Ok(PlayChunk::failed(partial, err));
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
        // Independent tag pass over a fresh invocation of the opener.
        let (info, _) = metadata::read_tags(&self.opener).await?;
        self.info = Some(info.clone());
        Ok(info)
    }

    async fn close(&mut self) {
        self.state = None;
        self.params = None;
        self.buffer = Vec::new();
        self.eof = false;
    }
}
