// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    SampleNumber,
    SampleOffset,
    FrameSamples,
}

/// A lazy reader for the SEEKTABLE block: `length / 18` seek points, each
/// an 18-byte (sample number, byte offset, samples-in-block) triple.
///
/// `read_sample_number` is the iteration entry point; it returns `None`
/// once every point has been consumed.
pub struct SeekTableReader {
    state: Field,
    /// Number of seek points, from the block length.
    len: u32,
    /// Seek points consumed so far.
    pos: u32,
}

impl Default for SeekTableReader {
    fn default() -> Self {
        SeekTableReader { state: Field::SampleNumber, len: 0, pos: 0 }
    }
}

impl SeekTableReader {
    pub fn reinit(&mut self, seekpoints: u32) {
        *self = SeekTableReader { len: seekpoints, ..Default::default() }
    }

    /// The number of seek points in the block. Free; consumes nothing.
    pub fn seekpoints(&mut self, _br: &mut BitReader, _feed: &mut Feed<'_>) -> Result<u32> {
        match self.state {
            Field::SampleNumber => Ok(self.len),
            _ => Err(Error::InvalidState),
        }
    }

    /// The sample number of the next seek point, or `None` once the table
    /// is exhausted.
    pub fn read_sample_number(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<Option<u64>> {
        match self.state {
            Field::SampleNumber => {
                if self.pos == self.len {
                    return Ok(None);
                }
                br.fill_nocrc(feed, 64)?;
                let value = br.read(64);
                self.state = Field::SampleOffset;
                Ok(Some(value))
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_sample_offset(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u64> {
        if self.state == Field::SampleNumber {
            if self.read_sample_number(br, feed)?.is_none() {
                return Err(Error::InvalidState);
            }
        }
        match self.state {
            Field::SampleOffset => {
                br.fill_nocrc(feed, 64)?;
                let value = br.read(64);
                self.state = Field::FrameSamples;
                Ok(value)
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_samples(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u16> {
        if matches!(self.state, Field::SampleNumber | Field::SampleOffset) {
            self.read_sample_offset(br, feed)?;
        }
        match self.state {
            Field::FrameSamples => {
                br.fill_nocrc(feed, 16)?;
                let value = br.read(16) as u16;
                self.pos += 1;
                self.state = Field::SampleNumber;
                Ok(value)
            }
            _ => Err(Error::InvalidState),
        }
    }
}
