// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metadata block parsing: the 4-byte block header and the lazy per-block
//! field readers.
//!
//! Block payloads are exposed field by field; a field accessor consumes only
//! its own bytes, so a caller that stops asking stops paying. Accessors may
//! be called ahead of the current position (earlier fields are then read
//! and discarded) but never behind it. Payload bytes bypass the frame CRCs.

mod application;
mod comment;
mod cuesheet;
mod padding;
mod picture;
mod seektable;
mod streaminfo;

pub use application::ApplicationReader;
pub use comment::CommentReader;
pub use cuesheet::CuesheetReader;
pub use padding::PaddingReader;
pub use picture::PictureReader;
pub use seektable::SeekTableReader;
pub use streaminfo::StreamInfoReader;

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

use log::debug;

use crate::frame::StreamParams;

/// The type of a metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    Cuesheet,
    Picture,
    /// The forbidden type code 127.
    Invalid,
    /// A reserved type code; the block is skippable by length.
    Unknown,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockHeaderState {
    LastFlag,
    Type,
    Length,
}

/// The 4-byte metadata block header: a last-block flag, a 7-bit type, and
/// a 24-bit payload length.
pub struct BlockHeader {
    state: BlockHeaderState,
    pub is_last: bool,
    pub raw_type: u8,
    pub block_type: BlockType,
    pub length: u32,
}

impl Default for BlockHeader {
    fn default() -> Self {
        BlockHeader {
            state: BlockHeaderState::LastFlag,
            is_last: false,
            raw_type: 0,
            block_type: BlockType::Unknown,
            length: 0,
        }
    }
}

impl BlockHeader {
    fn decode(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        loop {
            match self.state {
                BlockHeaderState::LastFlag => {
                    br.fill(feed, 1)?;
                    *self = Default::default();
                    self.is_last = br.read(1) != 0;
                    self.state = BlockHeaderState::Type;
                }
                BlockHeaderState::Type => {
                    br.fill(feed, 7)?;
                    self.raw_type = br.read(7) as u8;
                    // The type byte is consumed either way, so a reserved
                    // type leaves the header parsable: driving the decoder
                    // again reads the length and skips the block.
                    self.state = BlockHeaderState::Length;
                    self.block_type = match self.raw_type {
                        0 => BlockType::StreamInfo,
                        1 => BlockType::Padding,
                        2 => BlockType::Application,
                        3 => BlockType::SeekTable,
                        4 => BlockType::VorbisComment,
                        5 => BlockType::Cuesheet,
                        6 => BlockType::Picture,
                        127 => {
                            self.block_type = BlockType::Invalid;
                            return Err(Error::InvalidMetadataType);
                        }
                        _ => {
                            self.block_type = BlockType::Unknown;
                            return Err(Error::ReservedMetadataType);
                        }
                    };
                }
                BlockHeaderState::Length => {
                    br.fill(feed, 24)?;
                    self.length = br.read(24) as u32;
                    self.state = BlockHeaderState::LastFlag;
                    return Ok(());
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MetadataState {
    Header,
    Data,
}

/// The metadata layer: one block header plus one reader per block type, of
/// which only the one selected by the header is live at a time.
pub struct MetadataReader {
    state: MetadataState,
    skip_pos: u32,
    pub header: BlockHeader,
    pub streaminfo: StreamInfoReader,
    pub comment: CommentReader,
    pub picture: PictureReader,
    pub cuesheet: CuesheetReader,
    pub seektable: SeekTableReader,
    pub application: ApplicationReader,
    pub padding: PaddingReader,
}

impl Default for MetadataReader {
    fn default() -> Self {
        MetadataReader {
            state: MetadataState::Header,
            skip_pos: 0,
            header: Default::default(),
            streaminfo: Default::default(),
            comment: Default::default(),
            picture: Default::default(),
            cuesheet: Default::default(),
            seektable: Default::default(),
            application: Default::default(),
            padding: Default::default(),
        }
    }
}

impl MetadataReader {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reinit(&mut self) {
        *self = Default::default();
    }

    /// Returns true when the next unit to parse is a block header.
    pub fn at_header(&self) -> bool {
        self.state == MetadataState::Header
    }

    /// The sample rate and sample size remembered from the last STREAMINFO
    /// block, for frame-header inheritance.
    pub fn stream_params(&self) -> StreamParams {
        self.streaminfo.stream_params()
    }

    pub fn restore_stream_params(&mut self, params: StreamParams) {
        self.streaminfo.restore_stream_params(params);
    }

    /// Parses the next block header and arms the reader the block type
    /// selects.
    pub fn sync(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        debug_assert!(self.state == MetadataState::Header);
        self.header.decode(br, feed)?;

        debug!(
            "metadata block {{ type={:?}, length={}, is_last={} }}",
            self.header.block_type, self.header.length, self.header.is_last
        );

        match self.header.block_type {
            BlockType::StreamInfo => self.streaminfo.reinit(),
            BlockType::VorbisComment => self.comment.reinit(),
            BlockType::Picture => self.picture.reinit(),
            BlockType::Cuesheet => self.cuesheet.reinit(),
            BlockType::SeekTable => self.seektable.reinit(self.header.length / 18),
            BlockType::Application => {
                self.application.reinit(self.header.length.saturating_sub(4))
            }
            BlockType::Padding => self.padding.reinit(self.header.length),
            BlockType::Invalid | BlockType::Unknown => {}
        }

        self.state = MetadataState::Data;
        self.skip_pos = 0;
        Ok(())
    }

    /// Finishes the current block, draining whatever its reader has not yet
    /// consumed, and re-arms for the next block header.
    pub fn decode(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        if self.state == MetadataState::Header {
            self.sync(br, feed)?;
        }

        match self.header.block_type {
            BlockType::StreamInfo => {
                let _ = self.streaminfo.read_md5_data(br, feed, &mut [])?;
            }
            BlockType::VorbisComment => {
                while self.comment.read_comment_length(br, feed)?.is_some() {}
            }
            BlockType::Picture => {
                let _ = self.picture.read_data(br, feed, &mut [])?;
            }
            BlockType::Cuesheet => {
                while self.cuesheet.read_track_indexpoints(br, feed)?.is_some() {}
            }
            BlockType::SeekTable => {
                while self.seektable.read_sample_number(br, feed)?.is_some() {
                    self.seektable.read_sample_offset(br, feed)?;
                    self.seektable.read_samples(br, feed)?;
                }
            }
            BlockType::Application => {
                self.application.read_data(br, feed, &mut [])?;
            }
            BlockType::Padding => {
                self.padding.read_data(br, feed, &mut [])?;
            }
            BlockType::Invalid | BlockType::Unknown => {
                while self.skip_pos < self.header.length {
                    br.fill_nocrc(feed, 8)?;
                    br.discard(8);
                    self.skip_pos += 1;
                }
            }
        }

        debug_assert!(br.bits_available() == 0);
        br.reset_crc();
        self.state = MetadataState::Header;
        self.skip_pos = 0;
        Ok(())
    }
}
