// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audio frame decoding: the frame header, per-channel subframe dispatch,
//! the CRC-16 footer, and the inter-channel decorrelation inverse.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

use crate::subframe::Subframe;

/// The 14-bit frame synchronization code.
pub(crate) const FRAME_SYNC_CODE: u64 = 0x3ffe;

/// How a stream sequences its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingStrategy {
    /// Every block but the last has the same size; frames carry a frame
    /// number.
    Fixed,
    /// Block sizes vary; frames carry the number of their first sample.
    Variable,
}

/// The position of a frame in its stream, per the blocking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSequence {
    ByFrame(u32),
    BySample(u64),
}

/// How the two channels of a stereo frame were decorrelated, if at all.
/// The difference channel of a decorrelated pair is coded with one extra
/// bit per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAssignment {
    /// All channels are coded independently.
    Independent(u32),
    /// Channel 0 is the left channel, channel 1 is left minus right.
    LeftSide,
    /// Channel 0 is the average channel, channel 1 is left minus right.
    MidSide,
    /// Channel 0 is left minus right, channel 1 is the right channel.
    RightSide,
}

impl ChannelAssignment {
    pub fn num_channels(&self) -> u32 {
        match *self {
            ChannelAssignment::Independent(channels) => channels,
            _ => 2,
        }
    }
}

/// The sample rate and sample size a frame header inherits when it uses the
/// "get from STREAMINFO" encodings. Zero means the stream never said.
#[derive(Clone, Copy, Default)]
pub struct StreamParams {
    pub sample_rate: u32,
    pub bits_per_sample: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    Sync,
    Reserved1,
    Strategy,
    BlockSize,
    SampleRate,
    Channels,
    SampleSize,
    Reserved2,
    /// The first byte of the variable-length frame/sample number.
    SequenceHead,
    /// Continuation bytes of the number; the payload is how many remain.
    SequenceTail(u8),
    BlockSizeExt,
    SampleRateExt,
    Crc8,
}

/// A resumable frame-header parser.
///
/// The decoded `sample_rate` and `bits_per_sample` are zero when the header
/// uses the inherit-from-STREAMINFO encodings; `Frame::sync` substitutes
/// the stream values before subframe decoding begins.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameHeader {
    state: HeaderState,
    block_size_enc: u32,
    sample_rate_enc: u32,
    crc8: u8,
    pub blocking_strategy: BlockingStrategy,
    pub block_size: u32,
    pub sample_rate: u32,
    pub channel_assignment: ChannelAssignment,
    pub bits_per_sample: u32,
    /// The raw coded number; a frame number or a first-sample number per
    /// the blocking strategy.
    pub sequence: u64,
    /// Header size in bytes, sync code and CRC byte included.
    pub size: u32,
}

impl Default for FrameHeader {
    fn default() -> Self {
        FrameHeader {
            state: HeaderState::Sync,
            block_size_enc: 0,
            sample_rate_enc: 0,
            crc8: 0,
            blocking_strategy: BlockingStrategy::Fixed,
            block_size: 0,
            sample_rate: 0,
            channel_assignment: ChannelAssignment::Independent(0),
            bits_per_sample: 0,
            sequence: 0,
            size: 0,
        }
    }
}

impl FrameHeader {
    pub fn block_sequence(&self) -> BlockSequence {
        match self.blocking_strategy {
            BlockingStrategy::Fixed => BlockSequence::ByFrame(self.sequence as u32),
            BlockingStrategy::Variable => BlockSequence::BySample(self.sequence),
        }
    }

    pub fn decode(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        loop {
            match self.state {
                HeaderState::Sync => {
                    // The header CRC-8 covers the sync code onward. Any live
                    // bits were pulled by the metadata-or-frame peek and are
                    // folded back into the fresh registers.
                    br.reset_crc();
                    br.fill(feed, 14)?;
                    if br.read(14) != FRAME_SYNC_CODE {
                        return Err(Error::InvalidSyncCode);
                    }
                    *self = Default::default();
                    self.size = 2;
                    self.state = HeaderState::Reserved1;
                }
                HeaderState::Reserved1 => {
                    br.fill(feed, 1)?;
                    if br.read(1) != 0 {
                        return Err(Error::FrameReservedBit);
                    }
                    self.state = HeaderState::Strategy;
                }
                HeaderState::Strategy => {
                    br.fill(feed, 1)?;
                    self.blocking_strategy = match br.read(1) {
                        0 => BlockingStrategy::Fixed,
                        _ => BlockingStrategy::Variable,
                    };
                    self.state = HeaderState::BlockSize;
                }
                HeaderState::BlockSize => {
                    br.fill(feed, 4)?;
                    self.block_size_enc = br.read(4) as u32;
                    self.block_size = match self.block_size_enc {
                        0 => return Err(Error::ReservedBlockSize),
                        1 => 192,
                        2..=5 => 576 << (self.block_size_enc - 2),
                        // 6 and 7 read an extension after the coded number.
                        6 | 7 => 0,
                        _ => 256 << (self.block_size_enc - 8),
                    };
                    self.state = HeaderState::SampleRate;
                }
                HeaderState::SampleRate => {
                    br.fill(feed, 4)?;
                    self.sample_rate_enc = br.read(4) as u32;
                    self.sample_rate = match self.sample_rate_enc {
                        0 => 0, // Get from STREAMINFO.
                        1 => 88_200,
                        2 => 176_400,
                        3 => 192_000,
                        4 => 8_000,
                        5 => 16_000,
                        6 => 22_050,
                        7 => 24_000,
                        8 => 32_000,
                        9 => 44_100,
                        10 => 48_000,
                        11 => 96_000,
                        // 12, 13 and 14 read an extension after the coded
                        // number.
                        12 | 13 | 14 => 0,
                        _ => return Err(Error::InvalidSampleRate),
                    };
                    self.size += 1;
                    self.state = HeaderState::Channels;
                }
                HeaderState::Channels => {
                    br.fill(feed, 4)?;
                    self.channel_assignment = match br.read(4) {
                        code @ 0..=7 => ChannelAssignment::Independent(code as u32 + 1),
                        8 => ChannelAssignment::LeftSide,
                        9 => ChannelAssignment::RightSide,
                        10 => ChannelAssignment::MidSide,
                        _ => return Err(Error::ReservedChannelAssignment),
                    };
                    self.state = HeaderState::SampleSize;
                }
                HeaderState::SampleSize => {
                    br.fill(feed, 3)?;
                    self.bits_per_sample = match br.read(3) {
                        0 => 0, // Get from STREAMINFO.
                        1 => 8,
                        2 => 12,
                        4 => 16,
                        5 => 20,
                        6 => 24,
                        _ => return Err(Error::ReservedSampleSize),
                    };
                    self.state = HeaderState::Reserved2;
                }
                HeaderState::Reserved2 => {
                    br.fill(feed, 1)?;
                    if br.read(1) != 0 {
                        return Err(Error::FrameReservedBit);
                    }
                    self.size += 1;
                    self.state = HeaderState::SequenceHead;
                }
                HeaderState::SequenceHead => {
                    // A UTF-8-like variable-length number of 1 to 7 bytes.
                    // The leading-one count of the first byte selects the
                    // total length; continuation bytes append 6 bits each.
                    br.fill(feed, 8)?;
                    let head = br.read(8);
                    self.size += 1;
                    let (value, tail) = match head {
                        0x00..=0x7f => (head, 0),
                        0xc0..=0xdf => (head & 0x1f, 1),
                        0xe0..=0xef => (head & 0x0f, 2),
                        0xf0..=0xf7 => (head & 0x07, 3),
                        0xf8..=0xfb => (head & 0x03, 4),
                        0xfc..=0xfd => (head & 0x01, 5),
                        0xfe => (0, 6),
                        _ => return Err(Error::InvalidSampleNumber),
                    };
                    self.sequence = value;
                    self.state = if tail > 0 {
                        HeaderState::SequenceTail(tail)
                    }
                    else {
                        HeaderState::BlockSizeExt
                    };
                }
                HeaderState::SequenceTail(_) => {
                    while let HeaderState::SequenceTail(remaining) = self.state {
                        br.fill(feed, 8)?;
                        self.sequence = (self.sequence << 6) | (br.read(8) & 0x3f);
                        self.size += 1;
                        self.state = if remaining > 1 {
                            HeaderState::SequenceTail(remaining - 1)
                        }
                        else {
                            HeaderState::BlockSizeExt
                        };
                    }
                }
                HeaderState::BlockSizeExt => {
                    match self.block_size_enc {
                        6 => {
                            br.fill(feed, 8)?;
                            self.block_size = br.read(8) as u32 + 1;
                            self.size += 1;
                        }
                        7 => {
                            br.fill(feed, 16)?;
                            let coded = br.read(16) as u32;
                            if coded == 0xffff {
                                return Err(Error::InvalidBlockSize);
                            }
                            self.block_size = coded + 1;
                            self.size += 2;
                        }
                        _ => {}
                    }
                    self.state = HeaderState::SampleRateExt;
                }
                HeaderState::SampleRateExt => {
                    match self.sample_rate_enc {
                        12 => {
                            br.fill(feed, 8)?;
                            self.sample_rate = br.read(8) as u32 * 1000;
                            self.size += 1;
                        }
                        13 => {
                            br.fill(feed, 16)?;
                            self.sample_rate = br.read(16) as u32;
                            self.size += 2;
                        }
                        14 => {
                            br.fill(feed, 16)?;
                            self.sample_rate = br.read(16) as u32 * 10;
                            self.size += 2;
                        }
                        _ => {}
                    }
                    // Snapshot the register before the CRC byte itself is
                    // shifted in.
                    self.crc8 = br.crc8();
                    self.state = HeaderState::Crc8;
                }
                HeaderState::Crc8 => {
                    br.fill(feed, 8)?;
                    if br.read(8) as u8 != self.crc8 {
                        return Err(Error::FrameCrc8Mismatch);
                    }
                    self.size += 1;
                    self.state = HeaderState::Sync;
                    return Ok(());
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Header,
    Subframe,
    Footer,
}

/// A resumable decoder for one audio frame: header, one subframe per
/// channel, byte alignment, and the CRC-16 footer, then the decorrelation
/// inverse over the caller's buffers.
pub struct Frame {
    state: FrameState,
    cur_subframe: u32,
    crc16: u16,
    subframe: Subframe,
    pub header: FrameHeader,
    /// Whole-frame size in bytes, valid after the footer validates.
    pub size: u32,
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            state: FrameState::Header,
            cur_subframe: 0,
            crc16: 0,
            subframe: Subframe::new(),
            header: Default::default(),
            size: 0,
        }
    }
}

impl Frame {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reinit(&mut self) {
        *self = Default::default();
    }

    /// Returns true when the next unit to parse is a frame header.
    pub fn at_header(&self) -> bool {
        self.state == FrameState::Header
    }

    /// Parses the frame header and applies STREAMINFO inheritance, leaving
    /// the frame poised at its first subframe.
    pub fn sync(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        params: StreamParams,
    ) -> Result<()> {
        debug_assert!(self.state == FrameState::Header);
        self.header.decode(br, feed)?;

        if self.header.sample_rate == 0 {
            if params.sample_rate == 0 {
                return Err(Error::InvalidSampleRate);
            }
            self.header.sample_rate = params.sample_rate;
        }

        if self.header.bits_per_sample == 0 {
            if params.bits_per_sample == 0 {
                return Err(Error::InvalidSampleSize);
            }
            self.header.bits_per_sample = params.bits_per_sample;
        }

        self.state = FrameState::Subframe;
        self.cur_subframe = 0;
        self.subframe.reinit();
        Ok(())
    }

    /// Decodes one whole frame. `out`, when present, must hold at least as
    /// many channel buffers as the frame has channels, each with room for
    /// `block_size` samples; with `out` absent the frame is parsed and
    /// checksummed but no samples are stored.
    pub fn decode(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        params: StreamParams,
        mut out: Option<&mut [&mut [i32]]>,
    ) -> Result<()> {
        if self.state == FrameState::Header {
            self.sync(br, feed, params)?;
        }

        if self.state == FrameState::Subframe {
            let n_channels = self.header.channel_assignment.num_channels();
            while self.cur_subframe < n_channels {
                // The difference channel of a decorrelated pair carries one
                // extra bit per sample.
                let mut bps = self.header.bits_per_sample;
                match self.header.channel_assignment {
                    ChannelAssignment::LeftSide | ChannelAssignment::MidSide => {
                        if self.cur_subframe == 1 {
                            bps += 1;
                        }
                    }
                    ChannelAssignment::RightSide => {
                        if self.cur_subframe == 0 {
                            bps += 1;
                        }
                    }
                    ChannelAssignment::Independent(_) => {}
                }

                let chan = match out.as_mut() {
                    Some(chans) => Some(&mut *chans[self.cur_subframe as usize]),
                    None => None,
                };
                self.subframe.decode(br, feed, chan, self.header.block_size, bps)?;
                self.cur_subframe += 1;
            }

            // The frame body is padded to a byte boundary; the padding byte
            // already entered the CRC when it was filled.
            br.align();
            self.crc16 = br.crc16();
            self.state = FrameState::Footer;
        }

        br.fill(feed, 16)?;
        if br.read(16) as u16 != self.crc16 {
            return Err(Error::FrameCrc16Mismatch);
        }
        self.size = br.bytes_since_reset();

        if let Some(chans) = out {
            let len = self.header.block_size as usize;
            match self.header.channel_assignment {
                ChannelAssignment::Independent(_) => {}
                ChannelAssignment::LeftSide => {
                    let (left, side) = chans.split_at_mut(1);
                    decorrelate_left_side(&left[0][..len], &mut side[0][..len]);
                }
                ChannelAssignment::MidSide => {
                    let (mid, side) = chans.split_at_mut(1);
                    decorrelate_mid_side(&mut mid[0][..len], &mut side[0][..len]);
                }
                ChannelAssignment::RightSide => {
                    let (side, right) = chans.split_at_mut(1);
                    decorrelate_right_side(&right[0][..len], &mut side[0][..len]);
                }
            }
        }

        debug_assert!(br.bits_available() == 0);
        br.reset_crc();
        self.cur_subframe = 0;
        self.state = FrameState::Header;
        self.subframe.reinit();
        Ok(())
    }
}

/// Restores the right channel in place: R = L - D.
fn decorrelate_left_side(left: &[i32], side: &mut [i32]) {
    for (s, l) in side.iter_mut().zip(left) {
        *s = *l - *s;
    }
}

/// Restores the left channel in place: L = R + D.
fn decorrelate_right_side(right: &[i32], side: &mut [i32]) {
    for (s, r) in side.iter_mut().zip(right) {
        *s += *r;
    }
}

/// Restores both channels from the mid/side pair in place. Doubling the mid
/// channel and OR-ing in the side channel's low bit restores the half-sample
/// of precision integer averaging discarded, so the odd-side case rounds
/// correctly.
fn decorrelate_mid_side(mid: &mut [i32], side: &mut [i32]) {
    for (m, s) in mid.iter_mut().zip(side) {
        let doubled = (i64::from(*m) << 1) | (i64::from(*s) & 1);
        let side = i64::from(*s);
        *m = ((doubled + side) >> 1) as i32;
        *s = ((doubled - side) >> 1) as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decorrelate_left_side, decorrelate_mid_side, decorrelate_right_side, BlockingStrategy,
        FrameHeader,
    };
    use rill_core::errors::Error;
    use rill_core::io::{BitReader, Feed};

    #[test]
    fn verify_decorrelate_left_side() {
        let left = [5, 10, -3];
        let mut side = [1, -2, 3];
        decorrelate_left_side(&left, &mut side);
        assert_eq!(side, [4, 12, -6]);
    }

    #[test]
    fn verify_decorrelate_right_side() {
        let right = [4, 12, -6];
        let mut side = [1, -2, 3];
        decorrelate_right_side(&right, &mut side);
        assert_eq!(side, [5, 10, -3]);
    }

    #[test]
    fn verify_decorrelate_mid_side() {
        // Odd side values exercise the restored low bit of the doubled mid.
        let mut mid = [4, -2];
        let mut side = [1, 1];
        decorrelate_mid_side(&mut mid, &mut side);
        assert_eq!(mid, [5, -1]);
        assert_eq!(side, [4, -2]);

        // The transform must be the exact inverse of the encoder's
        // m = (l + r) >> 1 (floored), s = l - r.
        for &(l, r) in &[(5, 4), (-1, -2), (7, -7), (0, 1)] {
            let mut mid = [(l + r) >> 1];
            let mut side = [l - r];
            decorrelate_mid_side(&mut mid, &mut side);
            assert_eq!((mid[0], side[0]), (l, r));
        }
    }

    fn decode_header(bytes: &[u8]) -> Result<FrameHeader, Error> {
        let mut header = FrameHeader::default();
        let mut br = BitReader::new();
        let mut feed = Feed::new(bytes);
        header.decode(&mut br, &mut feed).map(|_| header)
    }

    // A fixed-blocking header: block-size code 12 (4096), rate code 9
    // (44.1 kHz), stereo, 16 bits, frame number 0.
    const HEADER: [u8; 5] = [0xff, 0xf8, 0xc9, 0x18, 0x00];

    fn with_crc(bytes: &[u8]) -> std::vec::Vec<u8> {
        use rill_core::checksum::Crc8Ccitt;
        let mut crc8 = Crc8Ccitt::new(0);
        crc8.process_buf_bytes(bytes);
        let mut v = std::vec::Vec::from(bytes);
        v.push(crc8.crc());
        v
    }

    #[test]
    fn verify_frame_header_decode() {
        let header = decode_header(&with_crc(&HEADER)).unwrap();
        assert_eq!(header.blocking_strategy, BlockingStrategy::Fixed);
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.sample_rate, 44_100);
        assert_eq!(header.channel_assignment.num_channels(), 2);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.sequence, 0);
        assert_eq!(header.size, 6);
    }

    #[test]
    fn verify_frame_header_crc8_mismatch() {
        let mut bytes = with_crc(&HEADER);
        *bytes.last_mut().unwrap() ^= 0x01;
        assert_eq!(decode_header(&bytes), Err(Error::FrameCrc8Mismatch));
    }

    #[test]
    fn verify_frame_header_corrupt_body_fails_crc() {
        let mut bytes = with_crc(&HEADER);
        bytes[2] ^= 0x40; // Flip a block-size bit; code 12 -> 8.
        assert_eq!(decode_header(&bytes), Err(Error::FrameCrc8Mismatch));
    }

    #[test]
    fn verify_two_byte_sample_number() {
        // Variable blocking so the number is a sample number. The 2-byte
        // form 0xc1 0x80 decodes to (1 << 6) | 0 = 0x40.
        let bytes = [0xff, 0xf9, 0xc9, 0x18, 0xc1, 0x80];
        let header = decode_header(&with_crc(&bytes)).unwrap();
        assert_eq!(header.blocking_strategy, BlockingStrategy::Variable);
        assert_eq!(header.sequence, 0x40);
        assert_eq!(header.size, 7);
    }

    #[test]
    fn verify_invalid_sample_number_head() {
        // 0xff can introduce neither a sync code nor a coded number.
        let bytes = [0xff, 0xf8, 0xc9, 0x18, 0xff];
        assert_eq!(decode_header(&bytes), Err(Error::InvalidSampleNumber));
    }

    #[test]
    fn verify_reserved_block_size() {
        let bytes = [0xff, 0xf8, 0x09, 0x18, 0x00];
        assert_eq!(decode_header(&bytes), Err(Error::ReservedBlockSize));
    }

    #[test]
    fn verify_header_resumes_byte_at_a_time() {
        let bytes = with_crc(&HEADER);
        let mut header = FrameHeader::default();
        let mut br = BitReader::new();

        for &byte in &bytes[..bytes.len() - 1] {
            let mut feed = Feed::new(core::slice::from_ref(&byte));
            assert_eq!(header.decode(&mut br, &mut feed), Err(Error::MoreData));
        }
        let mut feed = Feed::new(&bytes[bytes.len() - 1..]);
        header.decode(&mut br, &mut feed).unwrap();
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.size, 6);
    }
}
