// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Part {
    VendorLength,
    VendorString,
    Total,
    CommentLength,
    CommentString,
}

/// A lazy field reader for the VORBIS_COMMENT block: vendor length and
/// string, a comment count, then that many length-prefixed comment strings.
///
/// Every length in this block is a little-endian `u32`, the only
/// little-endian fields in a FLAC stream. Strings are UTF-8 by convention
/// and are not NUL-terminated.
pub struct CommentReader {
    state: Part,
    /// Length of the string being read.
    len: u32,
    /// Position within the string being read.
    pos: u32,
    /// Total number of comments.
    total: u32,
    /// Comments consumed so far.
    cur: u32,
}

impl Default for CommentReader {
    fn default() -> Self {
        CommentReader { state: Part::VendorLength, len: 0, pos: 0, total: 0, cur: 0 }
    }
}

impl CommentReader {
    pub fn reinit(&mut self) {
        *self = Default::default();
    }

    pub fn read_vendor_length(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        match self.state {
            Part::VendorLength => {
                br.fill_nocrc(feed, 32)?;
                self.len = br.read_u32le();
                self.pos = 0;
                self.state = Part::VendorString;
                Ok(self.len)
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_vendor_string(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<usize> {
        if self.state == Part::VendorLength {
            self.read_vendor_length(br, feed)?;
        }
        match self.state {
            Part::VendorString => {
                while self.pos < self.len {
                    br.fill_nocrc(feed, 8)?;
                    let byte = br.read(8) as u8;
                    if (self.pos as usize) < out.len() {
                        out[self.pos as usize] = byte;
                    }
                    self.pos += 1;
                }
                self.state = Part::Total;
                Ok(out.len().min(self.len as usize))
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_total(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        if matches!(self.state, Part::VendorLength | Part::VendorString) {
            self.read_vendor_string(br, feed, &mut [])?;
        }
        match self.state {
            Part::Total => {
                br.fill_nocrc(feed, 32)?;
                self.total = br.read_u32le();
                self.cur = 0;
                self.state = Part::CommentLength;
                Ok(self.total)
            }
            _ => Err(Error::InvalidState),
        }
    }

    /// The length of the next comment, or `None` once every comment has
    /// been consumed.
    pub fn read_comment_length(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<Option<u32>> {
        if matches!(self.state, Part::VendorLength | Part::VendorString | Part::Total) {
            self.read_total(br, feed)?;
        }
        if self.state == Part::CommentString {
            // A previous comment's string was never asked for; discard it.
            self.read_comment_string(br, feed, &mut [])?;
        }
        match self.state {
            Part::CommentLength => {
                if self.cur == self.total {
                    return Ok(None);
                }
                br.fill_nocrc(feed, 32)?;
                self.len = br.read_u32le();
                self.pos = 0;
                self.state = Part::CommentString;
                Ok(Some(self.len))
            }
            _ => Err(Error::InvalidState),
        }
    }

    /// The next comment string, or `None` once every comment has been
    /// consumed.
    pub fn read_comment_string(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<Option<usize>> {
        if self.state != Part::CommentString {
            if self.read_comment_length(br, feed)?.is_none() {
                return Ok(None);
            }
        }
        match self.state {
            Part::CommentString => {
                while self.pos < self.len {
                    br.fill_nocrc(feed, 8)?;
                    let byte = br.read(8) as u8;
                    if (self.pos as usize) < out.len() {
                        out[self.pos as usize] = byte;
                    }
                    self.pos += 1;
                }
                self.cur += 1;
                self.state = Part::CommentLength;
                Ok(Some(out.len().min(self.len as usize)))
            }
            _ => Err(Error::InvalidState),
        }
    }
}
