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
    Id,
    Data,
}

/// A lazy reader for the APPLICATION block: a 4-byte application id
/// followed by `length - 4` opaque data bytes.
pub struct ApplicationReader {
    state: Field,
    /// Data length, from the block length.
    len: u32,
    /// Data bytes consumed so far.
    pos: u32,
}

impl Default for ApplicationReader {
    fn default() -> Self {
        ApplicationReader { state: Field::Id, len: 0, pos: 0 }
    }
}

impl ApplicationReader {
    pub fn reinit(&mut self, data_len: u32) {
        *self = ApplicationReader { len: data_len, ..Default::default() }
    }

    pub fn read_id(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        match self.state {
            Field::Id => {
                br.fill_nocrc(feed, 32)?;
                let value = br.read(32) as u32;
                self.state = Field::Data;
                Ok(value)
            }
            Field::Data => Err(Error::InvalidState),
        }
    }

    /// The data length. Consumes the id if it was never asked for.
    pub fn read_length(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u32> {
        if self.state == Field::Id {
            self.read_id(br, feed)?;
        }
        Ok(self.len)
    }

    pub fn read_data(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<usize> {
        if self.state == Field::Id {
            self.read_id(br, feed)?;
        }
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
}
