// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

/// The fields of a PICTURE block, in stream order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    Type,
    MimeLength,
    MimeString,
    DescriptionLength,
    DescriptionString,
    Width,
    Height,
    ColorDepth,
    TotalColors,
    DataLength,
    Data,
}

/// A lazy field reader for the PICTURE block.
pub struct PictureReader {
    state: Field,
    /// Length of the string or data run being read.
    len: u32,
    /// Position within the string or data run being read.
    pos: u32,
}

impl Default for PictureReader {
    fn default() -> Self {
        PictureReader { state: Field::Type, len: 0, pos: 0 }
    }
}

impl PictureReader {
    pub fn reinit(&mut self) {
        *self = Default::default();
    }

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
            Field::Type => {
                br.fill_nocrc(feed, 32)?;
                br.discard(32);
                self.state = Field::MimeLength;
            }
            Field::MimeLength => {
                br.fill_nocrc(feed, 32)?;
                self.len = br.read(32) as u32;
                self.pos = 0;
                self.state = Field::MimeString;
            }
            Field::MimeString => {
                self.drain_run(br, feed)?;
                self.state = Field::DescriptionLength;
            }
            Field::DescriptionLength => {
                br.fill_nocrc(feed, 32)?;
                self.len = br.read(32) as u32;
                self.pos = 0;
                self.state = Field::DescriptionString;
            }
            Field::DescriptionString => {
                self.drain_run(br, feed)?;
                self.state = Field::Width;
            }
            Field::Width => {
                br.fill_nocrc(feed, 32)?;
                br.discard(32);
                self.state = Field::Height;
            }
            Field::Height => {
                br.fill_nocrc(feed, 32)?;
                br.discard(32);
                self.state = Field::ColorDepth;
            }
            Field::ColorDepth => {
                br.fill_nocrc(feed, 32)?;
                br.discard(32);
                self.state = Field::TotalColors;
            }
            Field::TotalColors => {
                br.fill_nocrc(feed, 32)?;
                br.discard(32);
                self.state = Field::DataLength;
            }
            Field::DataLength => {
                br.fill_nocrc(feed, 32)?;
                self.len = br.read(32) as u32;
                self.pos = 0;
                self.state = Field::Data;
            }
            Field::Data => return Err(Error::InvalidState),
        }
        Ok(())
    }

    fn drain_run(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        while self.pos < self.len {
            br.fill_nocrc(feed, 8)?;
            br.discard(8);
            self.pos += 1;
        }
        Ok(())
    }

    fn read_run(&mut self, br: &mut BitReader, feed: &mut Feed<'_>, out: &mut [u8]) -> Result<usize> {
        while self.pos < self.len {
            br.fill_nocrc(feed, 8)?;
            let byte = br.read(8) as u8;
            if (self.pos as usize) < out.len() {
                out[self.pos as usize] = byte;
            }
            self.pos += 1;
        }
        Ok(out.len().min(self.len as usize))
    }

    pub fn read_type(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::Type)?;
        br.fill_nocrc(feed, 32)?;
        let value = br.read(32) as u32;
        self.state = Field::MimeLength;
        Ok(value)
    }

    pub fn read_mime_length(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::MimeLength)?;
        self.step(br, feed)?;
        Ok(self.len)
    }

    pub fn read_mime_string(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<usize> {
        self.catch_up(br, feed, Field::MimeString)?;
        let copied = self.read_run(br, feed, out)?;
        self.state = Field::DescriptionLength;
        Ok(copied)
    }

    pub fn read_description_length(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<u32> {
        self.catch_up(br, feed, Field::DescriptionLength)?;
        self.step(br, feed)?;
        Ok(self.len)
    }

    pub fn read_description_string(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<usize> {
        self.catch_up(br, feed, Field::DescriptionString)?;
        let copied = self.read_run(br, feed, out)?;
        self.state = Field::Width;
        Ok(copied)
    }

    pub fn read_width(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::Width)?;
        br.fill_nocrc(feed, 32)?;
        let value = br.read(32) as u32;
        self.state = Field::Height;
        Ok(value)
    }

    pub fn read_height(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::Height)?;
        br.fill_nocrc(feed, 32)?;
        let value = br.read(32) as u32;
        self.state = Field::ColorDepth;
        Ok(value)
    }

    pub fn read_colordepth(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::ColorDepth)?;
        br.fill_nocrc(feed, 32)?;
        let value = br.read(32) as u32;
        self.state = Field::TotalColors;
        Ok(value)
    }

    pub fn read_totalcolors(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::TotalColors)?;
        br.fill_nocrc(feed, 32)?;
        let value = br.read(32) as u32;
        self.state = Field::DataLength;
        Ok(value)
    }

    pub fn read_data_length(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        self.catch_up(br, feed, Field::DataLength)?;
        self.step(br, feed)?;
        Ok(self.len)
    }

    /// The picture data, or `None` once it has been consumed. A
    /// zero-length picture yields `None` immediately.
    pub fn read_data(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<Option<usize>> {
        self.catch_up(br, feed, Field::Data)?;
        if self.pos == self.len {
            return Ok(None);
        }
        let copied = self.read_run(br, feed, out)?;
        Ok(Some(copied))
    }
}
