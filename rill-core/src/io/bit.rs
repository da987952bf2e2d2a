// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::checksum::{Crc16Ansi, Crc8Ccitt};
use crate::errors::{more_data, Result};

/// A transient cursor over the caller's input slice.
///
/// A `Feed` is created at every public entry point of a decoder and dropped
/// when that call returns; only its position outlives the call, reported to
/// the caller as the consumed-byte count. The underlying slice is never
/// retained.
pub struct Feed<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Feed<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Feed { buf, pos: 0 }
    }

    /// The number of bytes consumed from the slice so far.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The number of bytes left in the slice.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Advances the cursor over `len` bytes that were consumed out-of-band,
    /// e.g. through a re-sliced packet window handed to an inner decoder.
    pub fn advance(&mut self, len: usize) {
        debug_assert!(len <= self.remaining());
        self.pos += len;
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.buf.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }
}

/// A resumable MSB-first bit reader with CRC-8 and CRC-16 side channels.
///
/// The reader keeps up to 64 bits live in an accumulator that persists
/// across calls; the input slice behind a [`Feed`] does not. [`fill`] is the
/// single suspension point of every Rill decoder: it pulls whole bytes from
/// the feed until the requested number of bits is live, or reports
/// [`Error::MoreData`] with the already-pulled bytes retained, so the next
/// call continues mid-value.
///
/// Both CRC registers are updated as each byte is shifted in, never as bits
/// are consumed. The checksummed region therefore always ends on a byte
/// boundary and covers exactly the bytes that entered the accumulator since
/// the last [`reset_crc`], which is precisely the region FLAC checksums.
/// [`fill_nocrc`] exists for the two regions FLAC does not cover: metadata
/// block payloads and Ogg transport bytes.
///
/// [`fill`]: BitReader::fill
/// [`fill_nocrc`]: BitReader::fill_nocrc
/// [`reset_crc`]: BitReader::reset_crc
/// [`Error::MoreData`]: crate::errors::Error::MoreData
#[derive(Default)]
pub struct BitReader {
    val: u64,
    bits: u32,
    crc8: Crc8Ccitt,
    crc16: Crc16Ansi,
    tot: u32,
}

impl BitReader {
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of live bits in the accumulator.
    pub fn bits_available(&self) -> u32 {
        self.bits
    }

    /// The CRC-8 of every byte shifted in since the last CRC reset.
    pub fn crc8(&self) -> u8 {
        self.crc8.crc()
    }

    /// The CRC-16 of every byte shifted in since the last CRC reset.
    pub fn crc16(&self) -> u16 {
        self.crc16.crc()
    }

    /// The number of bytes shifted in since the last CRC reset.
    pub fn bytes_since_reset(&self) -> u32 {
        self.tot
    }

    /// Ensures at least `bits` bits are live, pulling bytes from `feed` and
    /// folding them into both CRC registers. Suspends with `MoreData` if the
    /// feed runs dry first; bytes pulled so far stay in the accumulator.
    pub fn fill(&mut self, feed: &mut Feed<'_>, bits: u32) -> Result<()> {
        debug_assert!(bits <= 64);
        while self.bits < bits {
            // The accumulator cannot hold a partial byte plus 8 more bits
            // past 64; reachable only by a >56-bit fill at a non-byte
            // position, which no Rill bitstream layout produces.
            debug_assert!(self.bits <= 56);
            let Some(byte) = feed.next_byte() else {
                return more_data();
            };
            self.val = (self.val << 8) | u64::from(byte);
            self.bits += 8;
            self.crc8.process_byte(byte);
            self.crc16.process_byte(byte);
            self.tot += 1;
        }
        Ok(())
    }

    /// As [`fill`](BitReader::fill), but the pulled bytes bypass the CRC
    /// registers. Used for metadata payloads and Ogg transport bytes.
    pub fn fill_nocrc(&mut self, feed: &mut Feed<'_>, bits: u32) -> Result<()> {
        debug_assert!(bits <= 64);
        while self.bits < bits {
            debug_assert!(self.bits <= 56);
            let Some(byte) = feed.next_byte() else {
                return more_data();
            };
            self.val = (self.val << 8) | u64::from(byte);
            self.bits += 8;
            self.tot += 1;
        }
        Ok(())
    }

    /// Consumes `bits` live bits MSB-first and returns them right-aligned.
    /// The bits must already be live.
    pub fn read(&mut self, bits: u32) -> u64 {
        debug_assert!(bits <= self.bits);
        if bits == 0 {
            return 0;
        }
        self.bits -= bits;
        let value = (self.val >> self.bits) & (u64::MAX >> (64 - bits));
        self.val &= live_mask(self.bits);
        value
    }

    /// Consumes `bits` live bits and sign-extends the result.
    pub fn read_signed(&mut self, bits: u32) -> i64 {
        if bits == 0 {
            return 0;
        }
        let value = self.read(bits);
        let shift = 64 - bits;
        ((value << shift) as i64) >> shift
    }

    /// Reads four live bytes as a little-endian `u32`. The sole consumers
    /// are the VORBIS_COMMENT lengths and the Ogg page header, the only
    /// little-endian fields in the entire system.
    pub fn read_u32le(&mut self) -> u32 {
        debug_assert!(self.bits >= 32);
        let mut buf = [0u8; 4];
        for byte in buf.iter_mut() {
            *byte = self.read(8) as u8;
        }
        u32::from_le_bytes(buf)
    }

    /// Reads eight live bytes as a little-endian `u64`.
    pub fn read_u64le(&mut self) -> u64 {
        debug_assert!(self.bits >= 64);
        let mut buf = [0u8; 8];
        for byte in buf.iter_mut() {
            *byte = self.read(8) as u8;
        }
        u64::from_le_bytes(buf)
    }

    /// Returns `bits` live bits without consuming them.
    pub fn peek(&self, bits: u32) -> u64 {
        debug_assert!(bits <= self.bits);
        if bits == 0 {
            return 0;
        }
        (self.val >> (self.bits - bits)) & (u64::MAX >> (64 - bits))
    }

    /// Consumes `bits` live bits without returning them.
    pub fn discard(&mut self, bits: u32) {
        debug_assert!(bits <= self.bits);
        if bits == 0 {
            return;
        }
        self.bits -= bits;
        self.val &= live_mask(self.bits);
    }

    /// Discards the live fractional byte. The accumulator must hold fewer
    /// than 8 bits.
    pub fn align(&mut self) {
        debug_assert!(self.bits < 8);
        self.bits = 0;
        self.val = 0;
    }

    /// Zeros both CRC registers and the byte counter, then folds any live
    /// accumulator bytes back in, so the registers reflect a checksummed
    /// region that begins at the byte boundary the live bits came from.
    pub fn reset_crc(&mut self) {
        debug_assert!(self.bits % 8 == 0);
        self.crc8 = Crc8Ccitt::new(0);
        self.crc16 = Crc16Ansi::new(0);
        self.tot = 0;

        let mut bits = self.bits;
        while bits > 0 {
            bits -= 8;
            let byte = ((self.val >> bits) & 0xff) as u8;
            self.crc8.process_byte(byte);
            self.crc16.process_byte(byte);
            self.tot += 1;
        }
    }

    /// Drops all live bits and zeroes the CRC registers. Used when an inner
    /// decoder is torn down for a fresh logical stream.
    pub fn reinit(&mut self) {
        *self = Default::default();
    }
}

fn live_mask(bits: u32) -> u64 {
    if bits == 0 {
        0
    }
    else {
        u64::MAX >> (64 - bits)
    }
}

#[cfg(test)]
mod tests {
    use super::{BitReader, Feed};
    use crate::errors::Error;

    #[test]
    fn verify_read_msb_first() {
        let mut br = BitReader::new();
        let mut feed = Feed::new(&[0b1010_1100, 0b0101_0011]);

        br.fill(&mut feed, 3).unwrap();
        assert_eq!(br.read(3), 0b101);
        br.fill(&mut feed, 5).unwrap();
        assert_eq!(br.read(5), 0b0_1100);
        br.fill(&mut feed, 8).unwrap();
        assert_eq!(br.read(8), 0b0101_0011);
        assert_eq!(feed.pos(), 2);
    }

    #[test]
    fn verify_fill_suspends_and_resumes() {
        let mut br = BitReader::new();

        let mut feed = Feed::new(&[0xab]);
        assert_eq!(br.fill(&mut feed, 16), Err(Error::MoreData));
        assert_eq!(feed.pos(), 1);

        // The byte pulled before the suspension is retained.
        let mut feed = Feed::new(&[0xcd]);
        br.fill(&mut feed, 16).unwrap();
        assert_eq!(br.read(16), 0xabcd);
    }

    #[test]
    fn verify_peek_and_discard() {
        let mut br = BitReader::new();
        let mut feed = Feed::new(&[0xf0, 0x0f]);

        br.fill(&mut feed, 16).unwrap();
        assert_eq!(br.peek(4), 0xf);
        assert_eq!(br.peek(12), 0xf00);
        br.discard(12);
        assert_eq!(br.read(4), 0xf);
    }

    #[test]
    fn verify_read_signed() {
        let mut br = BitReader::new();
        let mut feed = Feed::new(&[0b1111_0111]);

        br.fill(&mut feed, 4).unwrap();
        assert_eq!(br.read_signed(4), -1);
        assert_eq!(br.read_signed(4), 7);
        assert_eq!(br.read_signed(0), 0);
    }

    #[test]
    fn verify_read_u32le() {
        let mut br = BitReader::new();
        let mut feed = Feed::new(&[0x78, 0x56, 0x34, 0x12]);

        br.fill_nocrc(&mut feed, 32).unwrap();
        assert_eq!(br.read_u32le(), 0x1234_5678);
    }

    #[test]
    fn verify_crc_covers_filled_bytes() {
        let mut br = BitReader::new();
        let mut feed = Feed::new(b"123456789");

        for _ in 0..9 {
            br.fill(&mut feed, 8).unwrap();
            br.read(8);
        }
        assert_eq!(br.crc8(), 0xf4);
        assert_eq!(br.crc16(), 0xfee8);
        assert_eq!(br.bytes_since_reset(), 9);
    }

    #[test]
    fn verify_fill_nocrc_bypasses_crc() {
        let mut br = BitReader::new();
        let mut feed = Feed::new(&[0xff, 0xff]);

        br.fill_nocrc(&mut feed, 16).unwrap();
        br.read(16);
        assert_eq!(br.crc8(), 0);
        assert_eq!(br.crc16(), 0);
    }

    #[test]
    fn verify_reset_crc_folds_live_bits() {
        let mut reference = BitReader::new();
        let mut feed = Feed::new(&[0x12, 0x34]);
        reference.fill(&mut feed, 16).unwrap();

        // Fill two bytes with the CRC dirty from earlier traffic, then
        // reset: the registers must match a reader that only ever saw the
        // two live bytes.
        let mut br = BitReader::new();
        let mut feed = Feed::new(&[0xde, 0xad, 0x12, 0x34]);
        br.fill(&mut feed, 16).unwrap();
        br.read(16);
        br.fill(&mut feed, 16).unwrap();
        br.reset_crc();

        assert_eq!(br.crc8(), reference.crc8());
        assert_eq!(br.crc16(), reference.crc16());
        assert_eq!(br.bytes_since_reset(), 2);
    }

    #[test]
    fn verify_align() {
        let mut br = BitReader::new();
        let mut feed = Feed::new(&[0xaa, 0xbb]);

        br.fill(&mut feed, 3).unwrap();
        br.read(3);
        br.align();
        br.fill(&mut feed, 8).unwrap();
        assert_eq!(br.read(8), 0xbb);
    }
}
