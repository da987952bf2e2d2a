// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The top-level decoder: container probing, stream marker, metadata
//! sequencing, frame sequencing, and the OGG transport wiring.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

use rill_format_ogg::mappings::flac::IdentReader;
use rill_format_ogg::PageReader;

use log::{debug, warn};

use crate::frame::{
    BlockSequence, BlockingStrategy, ChannelAssignment, Frame, StreamParams, FRAME_SYNC_CODE,
};
use crate::metadata::{BlockType, MetadataReader};

/// The native FLAC stream marker.
const STREAM_MARKER: [u8; 4] = *b"fLaC";

/// The container a stream arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Probe the first byte: `f` for native FLAC, `O` for OGG.
    Unknown,
    Native,
    Ogg,
}

/// The top-level phase of the decoder. Also the targets of
/// [`FlacDecoder::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Expecting the OGG-FLAC identification packet.
    OggHeader,
    /// Expecting either a stream marker or a frame; decided by one byte.
    MarkerOrFrame,
    /// Expecting the `fLaC` stream marker.
    StreamMarker,
    /// Expecting either a metadata block or a frame; decided by 14 bits.
    MetadataOrFrame,
    /// Within the metadata sequence.
    Metadata,
    /// Within the audio frame sequence.
    Frame,
}

/// What [`FlacDecoder::sync`] stopped in front of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synced {
    /// A metadata block header was parsed; its fields are readable.
    Metadata,
    /// A frame header was parsed; the frame is ready to decode.
    Frame,
}

/// A summary of the frame a [`FlacDecoder::decode`] call completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub blocking_strategy: BlockingStrategy,
    pub sequence: BlockSequence,
    pub block_size: u32,
    pub sample_rate: u32,
    pub channels: u32,
    pub bits_per_sample: u32,
    pub channel_assignment: ChannelAssignment,
    /// Whole-frame size in bytes, header through footer.
    pub frame_size: u32,
}

/// A resumable recognizer for the native `fLaC` stream marker.
#[derive(Default)]
struct StreamMarker {
    pos: u8,
}

impl StreamMarker {
    fn reinit(&mut self) {
        self.pos = 0;
    }

    fn decode(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        while self.pos < 4 {
            br.fill_nocrc(feed, 8)?;
            if br.read(8) as u8 != STREAM_MARKER[usize::from(self.pos)] {
                return Err(Error::InvalidStreamMarker);
            }
            self.pos += 1;
        }
        self.pos = 0;
        debug_assert!(br.bits_available() == 0);
        br.reset_crc();
        Ok(())
    }
}

/// A byte-resumable FLAC stream decoder for native and OGG-embedded
/// streams.
///
/// Every operation takes the caller's input as a byte slice and returns the
/// number of bytes it consumed alongside its value. When an operation
/// returns [`Error::MoreData`] the entire slice was consumed and the
/// operation should be repeated, with the same output buffers where it
/// takes any, on a slice holding subsequent bytes. Any other error leaves
/// the decoder in an unspecified state; [`reset`](FlacDecoder::reset) is
/// the supported recovery.
///
/// The decoder performs no allocation and retains no reference to the
/// input between calls.
pub struct FlacDecoder {
    phase: Phase,
    container: Container,
    br: BitReader,
    ogg: PageReader,
    ident: IdentReader,
    marker: StreamMarker,
    metadata: MetadataReader,
    frame: Frame,
    /// The bound OGG serial, fixed by the first accepted identification
    /// packet and released at that stream's end.
    serial: Option<u32>,
    bytes_read_native: u64,
    bytes_read_ogg: u64,
}

impl FlacDecoder {
    pub fn new(container: Container) -> Self {
        let mut decoder = FlacDecoder {
            phase: Phase::StreamMarker,
            container,
            br: BitReader::new(),
            ogg: PageReader::new(),
            ident: IdentReader::new(),
            marker: Default::default(),
            metadata: MetadataReader::new(),
            frame: Frame::new(),
            serial: None,
            bytes_read_native: 0,
            bytes_read_ogg: 0,
        };
        match container {
            Container::Unknown => decoder.reset(Phase::StreamMarker),
            Container::Native => decoder.reset(Phase::MarkerOrFrame),
            Container::Ogg => decoder.reset(Phase::OggHeader),
        }
        decoder
    }

    /// Reinitializes the decoder into the given phase.
    ///
    /// Resetting into [`Phase::Frame`] preserves the STREAMINFO sample rate
    /// and sample size so frames using the inherit encodings stay
    /// decodable; every reset preserves the container kind and the OGG
    /// serial binding. An OGG container always re-enters at
    /// [`Phase::OggHeader`] so the next logical stream is picked up.
    pub fn reset(&mut self, phase: Phase) {
        let params = if phase == Phase::Frame {
            self.metadata.stream_params()
        }
        else {
            StreamParams::default()
        };

        self.br.reinit();
        self.ogg = PageReader::new();
        self.ident.reinit();
        self.marker.reinit();
        self.metadata.reinit();
        self.frame.reinit();
        self.bytes_read_native = 0;
        self.bytes_read_ogg = 0;
        self.phase = phase;

        if phase == Phase::Frame {
            self.metadata.restore_stream_params(params);
        }

        if self.container == Container::Ogg {
            self.phase = Phase::OggHeader;
        }
    }

    // Queries. Header-derived values are those of the most recently parsed
    // unit and are meaningful after a successful `sync` or `decode`.

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True if the current metadata block is flagged as the last one.
    pub fn block_is_last(&self) -> bool {
        self.metadata.header.is_last
    }

    pub fn block_type(&self) -> BlockType {
        self.metadata.header.block_type
    }

    /// The payload length of the current metadata block.
    pub fn block_length(&self) -> u32 {
        self.metadata.header.length
    }

    pub fn blocking_strategy(&self) -> BlockingStrategy {
        self.frame.header.blocking_strategy
    }

    pub fn block_size(&self) -> u32 {
        self.frame.header.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.frame.header.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.frame.header.channel_assignment.num_channels()
    }

    pub fn channel_assignment(&self) -> ChannelAssignment {
        self.frame.header.channel_assignment
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.frame.header.bits_per_sample
    }

    /// The current frame's coded frame or sample number, per the blocking
    /// strategy.
    pub fn block_sequence(&self) -> BlockSequence {
        self.frame.header.block_sequence()
    }

    /// The byte size of the current frame's header, sync code and CRC byte
    /// included.
    pub fn frame_header_size(&self) -> u32 {
        self.frame.header.size
    }

    /// The byte size of the last fully decoded frame.
    pub fn frame_size(&self) -> u32 {
        self.frame.size
    }

    /// Cumulative FLAC-stream bytes consumed (packet payload bytes when the
    /// container is OGG).
    pub fn bytes_read_native(&self) -> u64 {
        self.bytes_read_native
    }

    /// Cumulative OGG transport bytes consumed, payloads included. Zero for
    /// native streams.
    pub fn bytes_read_ogg(&self) -> u64 {
        self.bytes_read_ogg
    }

    /// The bound OGG serial number, if a FLAC logical stream is active.
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    /// The granule position of the current OGG page.
    pub fn granule_position(&self) -> i64 {
        self.ogg.granule_position()
    }

    /// The sequence number of the current OGG page.
    pub fn page_sequence(&self) -> u32 {
        self.ogg.sequence()
    }

    // Entry points.

    /// Advances to the next unit boundary: the end of a metadata block
    /// header or of a frame header. Only headers are parsed; a metadata
    /// block's fields are read when asked for, and a pending frame is
    /// traversed without storing samples.
    pub fn sync(&mut self, src: &[u8]) -> Result<(usize, Synced)> {
        self.dispatch(src, |dec, feed| dec.sync_step(feed))
    }

    /// Decodes through the end of the next audio frame, skipping any
    /// metadata in between. `out` must hold one buffer per channel, each
    /// with room for the stream's maximum block size; passing `None`
    /// traverses the frame without storing samples.
    pub fn decode(
        &mut self,
        src: &[u8],
        out: Option<&mut [&mut [i32]]>,
    ) -> Result<(usize, FrameInfo)> {
        let mut out = out;
        self.dispatch(src, move |dec, feed| dec.decode_op(feed, out.as_deref_mut()))
    }

    // Internals.

    /// Determines the container from the first byte of the stream.
    fn probe(&mut self, src: &[u8]) -> Result<()> {
        let Some(&first) = src.first() else {
            return Err(Error::MoreData);
        };
        match first {
            b'f' => {
                self.container = Container::Native;
                self.phase = Phase::StreamMarker;
            }
            b'O' => {
                self.container = Container::Ogg;
                self.phase = Phase::OggHeader;
            }
            _ => return Err(Error::UnsupportedContainer),
        }
        debug!("probed container: {:?}", self.container);
        Ok(())
    }

    /// Runs a native-layer operation against the input, routing it through
    /// the OGG transport when the container calls for it.
    fn dispatch<T>(
        &mut self,
        src: &[u8],
        mut op: impl FnMut(&mut Self, &mut Feed<'_>) -> Result<T>,
    ) -> Result<(usize, T)> {
        if self.container == Container::Unknown {
            self.probe(src)?;
        }
        match self.container {
            Container::Native => {
                let mut feed = Feed::new(src);
                let result = op(self, &mut feed);
                self.bytes_read_native += feed.pos() as u64;
                result.map(|value| (feed.pos(), value))
            }
            Container::Ogg => self.dispatch_ogg(src, op),
            Container::Unknown => Err(Error::UnsupportedContainer),
        }
    }

    /// The OGG transport loop: page headers are parsed from the outer
    /// slice, and the native operation runs against a window over the
    /// current page's payload.
    fn dispatch_ogg<T>(
        &mut self,
        src: &[u8],
        mut op: impl FnMut(&mut Self, &mut Feed<'_>) -> Result<T>,
    ) -> Result<(usize, T)> {
        let mut pages = Feed::new(src);

        let result = loop {
            if let Err(err) = self.sync_page(&mut pages) {
                break Err(err);
            }

            let start = pages.pos();
            let avail = (self.ogg.available() as usize).min(src.len() - start);
            let mut packet = Feed::new(&src[start..start + avail]);

            let result = op(self, &mut packet);

            let used = packet.pos();
            self.bytes_read_native += used as u64;
            pages.advance(used);
            self.finish_packet(used);

            match result {
                Err(Error::MoreData) if pages.remaining() > 0 => continue,
                Err(Error::OggHeaderNotFlac) => {
                    // Not a FLAC logical stream; drop the page and keep
                    // scanning for one.
                    warn!("serial {:#x} is not ogg-flac, skipping page", self.ogg.serial());
                    self.ogg.skip_page();
                    self.ident.reinit();
                    if pages.remaining() > 0 {
                        continue;
                    }
                    break Err(Error::MoreData);
                }
                other => break other,
            }
        };

        self.bytes_read_ogg += pages.pos() as u64;
        result.map(|value| (pages.pos(), value))
    }

    /// Advances the page reader into a payload, honoring the serial
    /// binding: before a stream is bound, a begin-of-stream page tears the
    /// inner decoder down for a fresh logical stream; after binding, pages
    /// on other serials are skipped.
    fn sync_page(&mut self, pages: &mut Feed<'_>) -> Result<()> {
        while !self.ogg.in_page() {
            self.ogg.sync(pages)?;
            match self.serial {
                None => {
                    if self.ogg.is_first_page() {
                        self.reset_logical_stream();
                    }
                }
                Some(serial) => {
                    if self.ogg.serial() != serial {
                        debug!("skipping page of unbound serial {:#x}", self.ogg.serial());
                        self.ogg.skip_page();
                    }
                    else if self.ogg.is_first_page() {
                        // A new logical stream is starting over the bound
                        // serial; restart on it.
                        self.reset_logical_stream();
                    }
                }
            }
        }
        Ok(())
    }

    /// Tears the inner decoder down for a new OGG logical stream.
    fn reset_logical_stream(&mut self) {
        self.br.reinit();
        self.ident.reinit();
        self.marker.reinit();
        self.metadata.reinit();
        self.frame.reinit();
        self.phase = Phase::OggHeader;
    }

    /// Accounts for payload bytes consumed by the inner decoder; at the end
    /// of the bound stream's last page the serial binding is released so a
    /// chained stream can be picked up.
    fn finish_packet(&mut self, used: usize) {
        let page_done = self.ogg.consume(used);
        if page_done && self.ogg.is_last_page() && self.serial == Some(self.ogg.serial()) {
            debug!("end of bound serial {:#x}", self.ogg.serial());
            self.serial = None;
        }
    }

    /// One step of the top-level state machine: runs the current phase to
    /// its next unit boundary.
    fn sync_step(&mut self, feed: &mut Feed<'_>) -> Result<Synced> {
        loop {
            match self.phase {
                Phase::OggHeader => {
                    self.ident.decode(&mut self.br, feed)?;
                    self.serial = Some(self.ogg.serial());
                    self.phase = Phase::StreamMarker;
                }
                Phase::MarkerOrFrame => {
                    self.br.fill(&mut *feed, 8)?;
                    match self.br.peek(8) as u8 {
                        b'f' => self.phase = Phase::StreamMarker,
                        0xff => self.phase = Phase::Frame,
                        _ => return Err(Error::InvalidStreamMarker),
                    }
                }
                Phase::StreamMarker => {
                    self.marker.decode(&mut self.br, feed)?;
                    self.phase = Phase::MetadataOrFrame;
                }
                Phase::MetadataOrFrame => {
                    self.br.fill(&mut *feed, 16)?;
                    self.phase = if self.br.peek(14) == FRAME_SYNC_CODE {
                        Phase::Frame
                    }
                    else {
                        Phase::Metadata
                    };
                }
                Phase::Metadata => {
                    if !self.metadata.at_header() {
                        // Mid-block: finish it, then decide what follows.
                        self.metadata.decode(&mut self.br, feed)?;
                        self.phase = Phase::MetadataOrFrame;
                        continue;
                    }
                    self.metadata.sync(&mut self.br, feed)?;
                    return Ok(Synced::Metadata);
                }
                Phase::Frame => {
                    let params = self.metadata.stream_params();
                    while !self.frame.at_header() {
                        // Mid-frame: traverse it without storing samples.
                        self.frame.decode(&mut self.br, feed, params, None)?;
                    }
                    self.frame.sync(&mut self.br, feed, params)?;
                    return Ok(Synced::Frame);
                }
            }
        }
    }

    fn decode_op(
        &mut self,
        feed: &mut Feed<'_>,
        out: Option<&mut [&mut [i32]]>,
    ) -> Result<FrameInfo> {
        while self.phase != Phase::Frame {
            self.sync_step(feed)?;
        }
        let params = self.metadata.stream_params();
        self.frame.decode(&mut self.br, feed, params, out)?;

        Ok(FrameInfo {
            blocking_strategy: self.frame.header.blocking_strategy,
            sequence: self.frame.header.block_sequence(),
            block_size: self.frame.header.block_size,
            sample_rate: self.frame.header.sample_rate,
            channels: self.frame.header.channel_assignment.num_channels(),
            bits_per_sample: self.frame.header.bits_per_sample,
            channel_assignment: self.frame.header.channel_assignment,
            frame_size: self.frame.size,
        })
    }

    /// Syncs forward until the current metadata block is of the wanted
    /// type, finishing partially read blocks and skipping others along the
    /// way. Running into the frame sequence instead is an error.
    fn sync_to_block(&mut self, feed: &mut Feed<'_>, block_type: BlockType) -> Result<()> {
        while self.phase != Phase::Metadata {
            self.sync_step(feed)?;
        }
        while self.metadata.header.block_type != block_type {
            self.sync_step(feed)?;
            if self.phase != Phase::Metadata {
                return Err(Error::InvalidState);
            }
        }
        Ok(())
    }
}

/// Generates a metadata field accessor returning a value.
macro_rules! metadata_value_accessor {
    ($(#[$attr:meta])* $name:ident, $block:ident, $reader:ident, $method:ident, $ret:ty) => {
        $(#[$attr])*
        pub fn $name(&mut self, src: &[u8]) -> Result<(usize, $ret)> {
            self.dispatch(src, |dec, feed| {
                dec.sync_to_block(feed, BlockType::$block)?;
                dec.metadata.$reader.$method(&mut dec.br, feed)
            })
        }
    };
}

/// Generates a metadata field accessor copying into a caller buffer.
macro_rules! metadata_buffer_accessor {
    ($(#[$attr:meta])* $name:ident, $block:ident, $reader:ident, $method:ident, $ret:ty) => {
        $(#[$attr])*
        pub fn $name(&mut self, src: &[u8], out: &mut [u8]) -> Result<(usize, $ret)> {
            self.dispatch(src, |dec, feed| {
                dec.sync_to_block(feed, BlockType::$block)?;
                dec.metadata.$reader.$method(&mut dec.br, feed, &mut out[..])
            })
        }
    };
}

/// The per-field metadata accessors.
///
/// Each accessor first syncs forward to the next block of its type (earlier
/// blocks are skipped, a partially read block is finished), then reads its
/// field. Within a block, fields must be visited in stream order, but may
/// be skipped forward: asking for a later field reads and discards the
/// earlier ones. String and data accessors copy into the caller's buffer,
/// truncating silently, and report the copied length; iterating accessors
/// return `None` when their iteration is exhausted.
impl FlacDecoder {
    metadata_value_accessor!(streaminfo_min_block_size, StreamInfo, streaminfo, read_min_block_size, u16);
    metadata_value_accessor!(streaminfo_max_block_size, StreamInfo, streaminfo, read_max_block_size, u16);
    metadata_value_accessor!(streaminfo_min_frame_size, StreamInfo, streaminfo, read_min_frame_size, u32);
    metadata_value_accessor!(streaminfo_max_frame_size, StreamInfo, streaminfo, read_max_frame_size, u32);
    metadata_value_accessor!(streaminfo_sample_rate, StreamInfo, streaminfo, read_sample_rate, u32);
    metadata_value_accessor!(streaminfo_channels, StreamInfo, streaminfo, read_channels, u8);
    metadata_value_accessor!(streaminfo_bps, StreamInfo, streaminfo, read_bps, u8);
    metadata_value_accessor!(streaminfo_total_samples, StreamInfo, streaminfo, read_total_samples, u64);
    metadata_value_accessor!(streaminfo_md5_length, StreamInfo, streaminfo, read_md5_length, u32);
    metadata_buffer_accessor!(streaminfo_md5_data, StreamInfo, streaminfo, read_md5_data, Option<usize>);

    metadata_value_accessor!(vorbis_comment_vendor_length, VorbisComment, comment, read_vendor_length, u32);
    metadata_buffer_accessor!(vorbis_comment_vendor_string, VorbisComment, comment, read_vendor_string, usize);
    metadata_value_accessor!(vorbis_comment_total, VorbisComment, comment, read_total, u32);
    metadata_value_accessor!(
        /// The length of the next comment, or `None` when the comments are
        /// exhausted.
        vorbis_comment_length, VorbisComment, comment, read_comment_length, Option<u32>);
    metadata_buffer_accessor!(
        /// The next comment string, or `None` when the comments are
        /// exhausted.
        vorbis_comment_string, VorbisComment, comment, read_comment_string, Option<usize>);

    metadata_value_accessor!(picture_type, Picture, picture, read_type, u32);
    metadata_value_accessor!(picture_mime_length, Picture, picture, read_mime_length, u32);
    metadata_buffer_accessor!(picture_mime_string, Picture, picture, read_mime_string, usize);
    metadata_value_accessor!(picture_description_length, Picture, picture, read_description_length, u32);
    metadata_buffer_accessor!(picture_description_string, Picture, picture, read_description_string, usize);
    metadata_value_accessor!(picture_width, Picture, picture, read_width, u32);
    metadata_value_accessor!(picture_height, Picture, picture, read_height, u32);
    metadata_value_accessor!(picture_colordepth, Picture, picture, read_colordepth, u32);
    metadata_value_accessor!(picture_totalcolors, Picture, picture, read_totalcolors, u32);
    metadata_value_accessor!(picture_length, Picture, picture, read_data_length, u32);
    metadata_buffer_accessor!(
        /// The picture data, or `None` once it has been consumed (a
        /// zero-length picture is exhausted from the start).
        picture_data, Picture, picture, read_data, Option<usize>);

    metadata_value_accessor!(cuesheet_catalog_length, Cuesheet, cuesheet, read_catalog_length, u32);
    metadata_buffer_accessor!(cuesheet_catalog_string, Cuesheet, cuesheet, read_catalog_string, usize);
    metadata_value_accessor!(cuesheet_leadin, Cuesheet, cuesheet, read_leadin, u64);
    metadata_value_accessor!(cuesheet_cd_flag, Cuesheet, cuesheet, read_cd_flag, bool);
    metadata_value_accessor!(cuesheet_tracks, Cuesheet, cuesheet, read_tracks, u8);
    metadata_value_accessor!(
        /// The offset of the next track, or `None` when the tracks are
        /// exhausted.
        cuesheet_track_offset, Cuesheet, cuesheet, read_track_offset, Option<u64>);
    metadata_value_accessor!(cuesheet_track_number, Cuesheet, cuesheet, read_track_number, u8);
    metadata_value_accessor!(cuesheet_track_isrc_length, Cuesheet, cuesheet, read_track_isrc_length, u32);
    metadata_buffer_accessor!(cuesheet_track_isrc_string, Cuesheet, cuesheet, read_track_isrc_string, usize);
    metadata_value_accessor!(cuesheet_track_type, Cuesheet, cuesheet, read_track_type, u8);
    metadata_value_accessor!(cuesheet_track_preemph, Cuesheet, cuesheet, read_track_preemph, bool);
    metadata_value_accessor!(
        /// The index-point count of the current track, or `None` when the
        /// tracks are exhausted.
        cuesheet_track_indexpoints, Cuesheet, cuesheet, read_track_indexpoints, Option<u8>);
    metadata_value_accessor!(
        /// The offset of the next index point, or `None` when the current
        /// track's points are exhausted.
        cuesheet_index_point_offset, Cuesheet, cuesheet, read_index_point_offset, Option<u64>);
    metadata_value_accessor!(cuesheet_index_point_number, Cuesheet, cuesheet, read_index_point_number, u8);

    metadata_value_accessor!(seektable_seekpoints, SeekTable, seektable, seekpoints, u32);
    metadata_value_accessor!(
        /// The sample number of the next seek point, or `None` when the
        /// table is exhausted.
        seektable_sample_number, SeekTable, seektable, read_sample_number, Option<u64>);
    metadata_value_accessor!(seektable_sample_offset, SeekTable, seektable, read_sample_offset, u64);
    metadata_value_accessor!(seektable_samples, SeekTable, seektable, read_samples, u16);

    metadata_value_accessor!(application_id, Application, application, read_id, u32);
    metadata_value_accessor!(application_length, Application, application, read_length, u32);
    metadata_buffer_accessor!(application_data, Application, application, read_data, usize);

    metadata_value_accessor!(padding_length, Padding, padding, read_length, u32);
    metadata_buffer_accessor!(padding_data, Padding, padding, read_data, usize);
}
