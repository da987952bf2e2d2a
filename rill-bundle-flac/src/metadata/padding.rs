// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::Result;
use rill_core::io::{BitReader, Feed};

/// A lazy reader for the PADDING block: `length` bytes, nominally zero.
#[derive(Default)]
pub struct PaddingReader {
    len: u32,
    pos: u32,
}

impl PaddingReader {
    pub fn reinit(&mut self, len: u32) {
        *self = PaddingReader { len, pos: 0 }
    }

    pub fn read_length(&mut self, _br: &mut BitReader, _feed: &mut Feed<'_>) -> Result<u32> {
        Ok(self.len)
    }

    pub fn read_data(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<usize> {
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
