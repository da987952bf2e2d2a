// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

use bitflags::bitflags;
use log::debug;

const OGG_PAGE_MARKER: [u8; 4] = *b"OggS";

bitflags! {
    /// The header-type flags of an OGG page.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct PageFlags: u8 {
        /// The page continues a packet started on the previous page.
        const CONTINUATION = 0x01;
        /// The page is the first page of a logical stream.
        const FIRST_PAGE = 0x02;
        /// The page is the last page of a logical stream.
        const LAST_PAGE = 0x04;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PageState {
    /// Matching the `OggS` capture pattern; the index is the next marker
    /// byte expected.
    Marker(u8),
    Version,
    Flags,
    Granule,
    Serial,
    Sequence,
    Checksum,
    SegmentCount,
    SegmentTable,
    /// Inside the page payload; the embedding decoder consumes it through a
    /// re-sliced window and reports the consumption via `consume`.
    InData,
    /// Draining the rest of the payload without handing it to anyone.
    SkipData,
}

/// A resumable reader of OGG page headers.
///
/// The reader owns its own [`BitReader`]: OGG transport bytes are outside
/// every FLAC checksum region, so all fills bypass the CRC registers. Page
/// headers are validated lightly, capture pattern and version only. The
/// 32-bit page checksum is read and ignored.
pub struct PageReader {
    state: PageState,
    br: BitReader,
    flags: PageFlags,
    granule_position: i64,
    serial: u32,
    sequence: u32,
    segments: u8,
    cur_segment: u8,
    /// Total payload length, the sum of the segment table.
    length: u32,
    /// Consumed payload bytes.
    pos: u32,
}

impl Default for PageReader {
    fn default() -> Self {
        PageReader {
            state: PageState::Marker(0),
            br: BitReader::new(),
            flags: PageFlags::empty(),
            granule_position: 0,
            serial: 0,
            sequence: 0,
            segments: 0,
            cur_segment: 0,
            length: 0,
            pos: 0,
        }
    }
}

impl PageReader {
    pub fn new() -> Self {
        Default::default()
    }

    /// Advances to the start of the next page's payload, parsing a page
    /// header and draining any unconsumed or skipped payload first. On `Ok`
    /// the reader is in the payload (`in_page` returns true).
    pub fn sync(&mut self, feed: &mut Feed<'_>) -> Result<()> {
        loop {
            match self.state {
                PageState::InData | PageState::SkipData => {
                    while self.pos < self.length {
                        self.br.fill_nocrc(feed, 8)?;
                        self.br.discard(8);
                        self.pos += 1;
                    }
                    self.state = PageState::Marker(0);
                }
                PageState::Marker(index) => {
                    self.br.fill_nocrc(feed, 8)?;
                    if self.br.read(8) as u8 != OGG_PAGE_MARKER[usize::from(index)] {
                        return Err(Error::InvalidPage);
                    }
                    self.state = if usize::from(index) + 1 < OGG_PAGE_MARKER.len() {
                        PageState::Marker(index + 1)
                    }
                    else {
                        PageState::Version
                    };
                }
                PageState::Version => {
                    self.br.fill_nocrc(feed, 8)?;
                    // There is only one OGG version, and that is version 0.
                    if self.br.read(8) != 0 {
                        return Err(Error::InvalidPage);
                    }
                    self.state = PageState::Flags;
                }
                PageState::Flags => {
                    self.br.fill_nocrc(feed, 8)?;
                    self.flags = PageFlags::from_bits_truncate(self.br.read(8) as u8);
                    self.state = PageState::Granule;
                }
                PageState::Granule => {
                    self.br.fill_nocrc(feed, 64)?;
                    self.granule_position = self.br.read_u64le() as i64;
                    self.state = PageState::Serial;
                }
                PageState::Serial => {
                    self.br.fill_nocrc(feed, 32)?;
                    self.serial = self.br.read_u32le();
                    self.state = PageState::Sequence;
                }
                PageState::Sequence => {
                    self.br.fill_nocrc(feed, 32)?;
                    self.sequence = self.br.read_u32le();
                    self.state = PageState::Checksum;
                }
                PageState::Checksum => {
                    // Parsed for position only; the page checksum is not
                    // verified.
                    self.br.fill_nocrc(feed, 32)?;
                    self.br.discard(32);
                    self.state = PageState::SegmentCount;
                }
                PageState::SegmentCount => {
                    self.br.fill_nocrc(feed, 8)?;
                    self.segments = self.br.read(8) as u8;
                    self.cur_segment = 0;
                    self.length = 0;
                    self.state = PageState::SegmentTable;
                }
                PageState::SegmentTable => {
                    while self.cur_segment < self.segments {
                        self.br.fill_nocrc(feed, 8)?;
                        self.length += self.br.read(8) as u32;
                        self.cur_segment += 1;
                    }
                    self.pos = 0;
                    self.state = PageState::InData;

                    debug!(
                        "page {{ serial={:#x}, sequence={}, granule={}, len={}, \
                         first={}, last={}, continuation={} }}",
                        self.serial,
                        self.sequence,
                        self.granule_position,
                        self.length,
                        self.is_first_page(),
                        self.is_last_page(),
                        self.is_continuation(),
                    );

                    return Ok(());
                }
            }
        }
    }

    /// Returns true while positioned inside a page payload.
    pub fn in_page(&self) -> bool {
        self.state == PageState::InData
    }

    /// The number of unconsumed payload bytes in the current page.
    pub fn available(&self) -> u32 {
        self.length - self.pos
    }

    /// Records that `len` payload bytes were consumed through a re-sliced
    /// window. Returns true when the page is finished.
    pub fn consume(&mut self, len: usize) -> bool {
        debug_assert!(len as u32 <= self.available());
        self.pos += len as u32;
        if self.pos == self.length {
            self.state = PageState::Marker(0);
            true
        }
        else {
            false
        }
    }

    /// Drains the rest of the current page on the next `sync`.
    pub fn skip_page(&mut self) {
        self.state = PageState::SkipData;
    }

    /// The serial number of the current page.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// The sequence number of the current page.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The granule position of the current page.
    pub fn granule_position(&self) -> i64 {
        self.granule_position
    }

    pub fn is_continuation(&self) -> bool {
        self.flags.contains(PageFlags::CONTINUATION)
    }

    pub fn is_first_page(&self) -> bool {
        self.flags.contains(PageFlags::FIRST_PAGE)
    }

    pub fn is_last_page(&self) -> bool {
        self.flags.contains(PageFlags::LAST_PAGE)
    }
}
