// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

use crate::frame::StreamParams;

/// The fields of a STREAMINFO block, in stream order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    MinBlockSize,
    MaxBlockSize,
    MinFrameSize,
    MaxFrameSize,
    SampleRate,
    Channels,
    Bps,
    TotalSamples,
    Md5,
}

/// A lazy field reader for the 34-byte STREAMINFO block.
///
/// The sample rate and sample size are remembered beyond the block itself:
/// frame headers may encode "inherit from STREAMINFO", and a decoder reset
/// into the frame phase carries the two values over.
pub struct StreamInfoReader {
    state: Field,
    /// MD5 cursor.
    pos: u32,
    sample_rate: u32,
    bits_per_sample: u32,
}

impl Default for StreamInfoReader {
    fn default() -> Self {
        StreamInfoReader {
            state: Field::MinBlockSize,
            pos: 0,
            sample_rate: 0,
            bits_per_sample: 0,
        }
    }
}

impl StreamInfoReader {
    pub fn reinit(&mut self) {
        *self = Default::default();
    }

    pub fn stream_params(&self) -> StreamParams {
        StreamParams { sample_rate: self.sample_rate, bits_per_sample: self.bits_per_sample }
    }

    pub fn restore_stream_params(&mut self, params: StreamParams) {
        self.sample_rate = params.sample_rate;
        self.bits_per_sample = params.bits_per_sample;
    }

    /// Consumes every field before `target`, discarding values (the cached
    /// sample rate and sample size are stored as a side effect). Fields
    /// already consumed cannot be revisited.
    fn catch_up(&mut self, br: &mut BitReader, feed: &mut Feed<'_>, target: Field) -> Result<()> {
        if self.state > target {
            return Err(Error::InvalidState);
        }
        while self.state < target {
            self.step(br, feed)?;
        }
        Ok(())
    }

    fn step(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        match self.state {
            Field::MinBlockSize => {
                br.fill_nocrc(feed, 16)?;
                br.discard(16);
                self.state = Field::MaxBlockSize;
            }
            Field::MaxBlockSize => {
                br.fill_nocrc(feed, 16)?;
                br.discard(16);
                self.state = Field::MinFrameSize;
            }
            Field::MinFrameSize => {
                br.fill_nocrc(feed, 24)?;
                br.discard(24);
                self.state = Field::MaxFrameSize;
            }
            Field::MaxFrameSize => {
                br.fill_nocrc(feed, 24)?;
                br.discard(24);
                self.state = Field::SampleRate;
            }
            Field::SampleRate => {
                br.fill_nocrc(feed, 20)?;
                self.sample_rate = br.read(20) as u32;
                self.state = Field::Channels;
            }
            Field::Channels => {
                br.fill_nocrc(feed, 3)?;
                br.discard(3);
                self.state = Field::Bps;
            }
            Field::Bps => {
                br.fill_nocrc(feed, 5)?;
                self.bits_per_sample = br.read(5) as u32 + 1;
                self.state = Field::TotalSamples;
            }
            Field::TotalSamples => {
                br.fill_nocrc(feed, 36)?;
                br.discard(36);
                self.state = Field::Md5;
            }
            Field::Md5 => return Err(Error::InvalidState),
        }
        Ok(())
    }

    pub fn read_min_block_size(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u16> {
        self.catch_up(br, feed, Field::MinBlockSize)?;
        br.fill_nocrc(feed, 16)?;
        let value = br.read(16) as u16;
        self.state = Field::MaxBlockSize;
        Ok(value)
    }

    pub fn read_max_block_size(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u16> {
        self.catch_up(br, feed, Field::MaxBlockSize)?;
        br.fill_nocrc(feed, 16)?;
        let value = br.read(16) as u16;
        self.state = Field::MinFrameSize;
        Ok(value)
    }

    pub fn read_min_frame_size(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::MinFrameSize)?;
        br.fill_nocrc(feed, 24)?;
        let value = br.read(24) as u32;
        self.state = Field::MaxFrameSize;
        Ok(value)
    }

    pub fn read_max_frame_size(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::MaxFrameSize)?;
        br.fill_nocrc(feed, 24)?;
        let value = br.read(24) as u32;
        self.state = Field::SampleRate;
        Ok(value)
    }

    pub fn read_sample_rate(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::SampleRate)?;
        br.fill_nocrc(feed, 20)?;
        self.sample_rate = br.read(20) as u32;
        self.state = Field::Channels;
        Ok(self.sample_rate)
    }

    pub fn read_channels(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u8> {
        self.catch_up(br, feed, Field::Channels)?;
        br.fill_nocrc(feed, 3)?;
        let value = br.read(3) as u8 + 1;
        self.state = Field::Bps;
        Ok(value)
    }

    pub fn read_bps(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u8> {
        self.catch_up(br, feed, Field::Bps)?;
        br.fill_nocrc(feed, 5)?;
        self.bits_per_sample = br.read(5) as u32 + 1;
        self.state = Field::TotalSamples;
        Ok(self.bits_per_sample as u8)
    }

    pub fn read_total_samples(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u64> {
        self.catch_up(br, feed, Field::TotalSamples)?;
        br.fill_nocrc(feed, 36)?;
        let value = br.read(36);
        self.state = Field::Md5;
        Ok(value)
    }

    pub fn read_md5_length(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::Md5)?;
        Ok(16)
    }

    /// Copies the 16 MD5 bytes into `out` (truncating silently) and reports
    /// the copied length. A second call returns `None`.
    pub fn read_md5_data(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<Option<usize>> {
        self.catch_up(br, feed, Field::Md5)?;
        if self.pos == 16 {
            return Ok(None);
        }
        while self.pos < 16 {
            br.fill_nocrc(feed, 8)?;
            let byte = br.read(8) as u8;
            if (self.pos as usize) < out.len() {
                out[self.pos as usize] = byte;
            }
            self.pos += 1;
        }
        Ok(Some(out.len().min(16)))
    }
}
