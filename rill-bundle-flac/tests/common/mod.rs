// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builders for synthetic FLAC and OGG-FLAC streams used by the
//! integration tests.

#![allow(dead_code)]

use rill_core::checksum::{Crc16Ansi, Crc8Ccitt};

/// An MSB-first bit packer.
pub struct BitWriter {
    out: Vec<u8>,
    cur: u8,
    nbits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter { out: Vec::new(), cur: 0, nbits: 0 }
    }

    pub fn put(&mut self, bits: u32, value: u64) {
        for i in (0..bits).rev() {
            self.cur = (self.cur << 1) | ((value >> i) & 1) as u8;
            self.nbits += 1;
            if self.nbits == 8 {
                self.out.push(self.cur);
                self.cur = 0;
                self.nbits = 0;
            }
        }
    }

    pub fn put_signed(&mut self, bits: u32, value: i64) {
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        self.put(bits, (value as u64) & mask);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(self.nbits, 0, "unaligned");
        self.out.extend_from_slice(bytes);
    }

    /// Pads the current byte with zero bits.
    pub fn align_zero(&mut self) {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.out.push(self.cur);
            self.cur = 0;
            self.nbits = 0;
        }
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align_zero();
        self.out
    }
}

fn block_header(is_last: bool, block_type: u8, length: u32) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put(1, u64::from(is_last));
    w.put(7, u64::from(block_type));
    w.put(24, u64::from(length));
    w.into_bytes()
}

pub fn stream_marker() -> Vec<u8> {
    b"fLaC".to_vec()
}

pub fn streaminfo_block(
    is_last: bool,
    sample_rate: u32,
    channels: u8,
    bps: u8,
    total_samples: u64,
) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put(16, 4096); // min block size
    w.put(16, 4096); // max block size
    w.put(24, 0); // min frame size (unknown)
    w.put(24, 0); // max frame size (unknown)
    w.put(20, u64::from(sample_rate));
    w.put(3, u64::from(channels - 1));
    w.put(5, u64::from(bps - 1));
    w.put(36, total_samples);
    w.put_bytes(&[0u8; 16]); // md5 (unknown)

    let body = w.into_bytes();
    let mut block = block_header(is_last, 0, body.len() as u32);
    block.extend_from_slice(&body);
    block
}

pub fn vorbis_comment_block(is_last: bool, vendor: &[u8], comments: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    body.extend_from_slice(vendor);
    body.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        body.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        body.extend_from_slice(comment);
    }

    let mut block = block_header(is_last, 4, body.len() as u32);
    block.extend_from_slice(&body);
    block
}

pub fn picture_block(
    is_last: bool,
    picture_type: u32,
    mime: &[u8],
    description: &[u8],
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&picture_type.to_be_bytes());
    body.extend_from_slice(&(mime.len() as u32).to_be_bytes());
    body.extend_from_slice(mime);
    body.extend_from_slice(&(description.len() as u32).to_be_bytes());
    body.extend_from_slice(description);
    body.extend_from_slice(&640u32.to_be_bytes()); // width
    body.extend_from_slice(&480u32.to_be_bytes()); // height
    body.extend_from_slice(&24u32.to_be_bytes()); // color depth
    body.extend_from_slice(&0u32.to_be_bytes()); // colors used
    body.extend_from_slice(&(data.len() as u32).to_be_bytes());
    body.extend_from_slice(data);

    let mut block = block_header(is_last, 6, body.len() as u32);
    block.extend_from_slice(&body);
    block
}

pub struct SeekPoint {
    pub sample_number: u64,
    pub offset: u64,
    pub samples: u16,
}

pub fn seektable_block(is_last: bool, points: &[SeekPoint]) -> Vec<u8> {
    let mut body = Vec::new();
    for point in points {
        body.extend_from_slice(&point.sample_number.to_be_bytes());
        body.extend_from_slice(&point.offset.to_be_bytes());
        body.extend_from_slice(&point.samples.to_be_bytes());
    }

    let mut block = block_header(is_last, 3, body.len() as u32);
    block.extend_from_slice(&body);
    block
}

pub fn application_block(is_last: bool, id: u32, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&id.to_be_bytes());
    body.extend_from_slice(data);

    let mut block = block_header(is_last, 2, body.len() as u32);
    block.extend_from_slice(&body);
    block
}

pub fn padding_block(is_last: bool, length: u32) -> Vec<u8> {
    let mut block = block_header(is_last, 1, length);
    block.extend_from_slice(&vec![0u8; length as usize]);
    block
}

pub struct CuesheetTrack {
    pub offset: u64,
    pub number: u8,
    pub isrc: [u8; 12],
    pub non_audio: bool,
    pub preemph: bool,
    pub index_points: Vec<(u64, u8)>,
}

pub fn cuesheet_block(
    is_last: bool,
    catalog: &[u8],
    leadin: u64,
    is_cd: bool,
    tracks: &[CuesheetTrack],
) -> Vec<u8> {
    assert!(catalog.len() <= 128);
    let mut body = Vec::new();
    body.extend_from_slice(catalog);
    body.resize(128, 0);
    body.extend_from_slice(&leadin.to_be_bytes());
    body.push(u8::from(is_cd) << 7);
    body.extend_from_slice(&[0u8; 258]);
    body.push(tracks.len() as u8);
    for track in tracks {
        body.extend_from_slice(&track.offset.to_be_bytes());
        body.push(track.number);
        body.extend_from_slice(&track.isrc);
        body.push((u8::from(track.non_audio) << 7) | (u8::from(track.preemph) << 6));
        body.extend_from_slice(&[0u8; 13]);
        body.push(track.index_points.len() as u8);
        for &(offset, number) in &track.index_points {
            body.extend_from_slice(&offset.to_be_bytes());
            body.push(number);
            body.extend_from_slice(&[0u8; 3]);
        }
    }

    let mut block = block_header(is_last, 5, body.len() as u32);
    block.extend_from_slice(&body);
    block
}

pub fn unknown_block(is_last: bool, block_type: u8, data: &[u8]) -> Vec<u8> {
    let mut block = block_header(is_last, block_type, data.len() as u32);
    block.extend_from_slice(data);
    block
}

// Frame building.

fn put_coded_number(w: &mut BitWriter, number: u64) {
    if number < 0x80 {
        w.put(8, number);
    }
    else {
        assert!(number < 0x800, "builder only emits the 1 and 2 byte forms");
        w.put(8, 0xc0 | (number >> 6));
        w.put(8, 0x80 | (number & 0x3f));
    }
}

pub fn subframe_constant(w: &mut BitWriter, bps: u32, value: i64) {
    w.put(1, 0);
    w.put(6, 0);
    w.put(1, 0);
    w.put_signed(bps, value);
}

pub fn subframe_verbatim(w: &mut BitWriter, bps: u32, samples: &[i32]) {
    w.put(1, 0);
    w.put(6, 1);
    w.put(1, 0);
    for &sample in samples {
        w.put_signed(bps, i64::from(sample));
    }
}

/// A FIXED subframe of order 2 whose residuals are all zero: the decoded
/// channel continues the line through the two warmup samples.
pub fn subframe_fixed2_zero_residual(
    w: &mut BitWriter,
    bps: u32,
    warmup: [i32; 2],
    block_size: u32,
) {
    w.put(1, 0);
    w.put(6, 10); // FIXED, order 2
    w.put(1, 0);
    w.put_signed(bps, i64::from(warmup[0]));
    w.put_signed(bps, i64::from(warmup[1]));
    w.put(2, 0); // coding method 0
    w.put(4, 0); // partition order 0
    w.put(4, 0); // rice parameter 0
    for _ in 0..block_size - 2 {
        w.put(1, 1); // zero: quotient 0, no remainder bits
    }
}

/// An LPC subframe of order 1 with coefficient 1 and shift 0: each sample
/// is the previous sample plus its residual.
pub fn subframe_lpc1(w: &mut BitWriter, bps: u32, warmup: i32, residuals: &[i32]) {
    w.put(1, 0);
    w.put(6, 32); // LPC, order 1
    w.put(1, 0);
    w.put_signed(bps, i64::from(warmup));
    w.put(4, 3); // precision 4 bits
    w.put(5, 0); // shift 0
    w.put_signed(4, 1); // coefficient
    w.put(2, 0); // coding method 0
    w.put(4, 0); // partition order 0
    w.put(4, 1); // rice parameter 1
    for &residual in residuals {
        let folded = if residual < 0 {
            (((-i64::from(residual)) << 1) - 1) as u64
        }
        else {
            (i64::from(residual) << 1) as u64
        };
        let quotient = (folded >> 1) as u32;
        w.put(quotient, 0); // quotient, in unary zeros
        w.put(1, 1);
        w.put(1, folded & 1); // remainder

    }
}

/// Builds one whole frame: a fixed-blocking header using the 8-bit
/// block-size extension, the given subframes, byte alignment, and the
/// CRC-16 footer. `subframes` writes every channel's subframe at the bps
/// the channel assignment calls for.
pub fn build_frame(
    frame_number: u64,
    block_size: u32,
    sample_rate_code: u32,
    channel_code: u32,
    sample_size_code: u32,
    subframes: impl FnOnce(&mut BitWriter),
) -> Vec<u8> {
    assert!((1..=256).contains(&block_size));

    let mut w = BitWriter::new();
    w.put(14, 0x3ffe);
    w.put(1, 0); // reserved
    w.put(1, 0); // fixed blocking
    w.put(4, 6); // block size from an 8-bit extension
    w.put(4, u64::from(sample_rate_code));
    w.put(4, u64::from(channel_code));
    w.put(3, u64::from(sample_size_code));
    w.put(1, 0); // reserved
    put_coded_number(&mut w, frame_number);
    w.put(8, u64::from(block_size - 1));

    let mut frame = w.into_bytes();
    let mut crc8 = Crc8Ccitt::new(0);
    crc8.process_buf_bytes(&frame);
    frame.push(crc8.crc());

    let mut w = BitWriter::new();
    subframes(&mut w);
    frame.extend_from_slice(&w.into_bytes());

    let mut crc16 = Crc16Ansi::new(0);
    crc16.process_buf_bytes(&frame);
    frame.extend_from_slice(&crc16.crc().to_be_bytes());
    frame
}

// OGG building.

pub fn ogg_page(serial: u32, sequence: u32, flags: u8, payload: &[u8]) -> Vec<u8> {
    ogg_page_with_granule(serial, sequence, flags, 0, payload)
}

pub fn ogg_page_with_granule(
    serial: u32,
    sequence: u32,
    flags: u8,
    granule: i64,
    payload: &[u8],
) -> Vec<u8> {
    assert!(payload.len() < 255 * 255);
    let mut segments = Vec::new();
    let mut rest = payload.len();
    loop {
        if rest >= 255 {
            segments.push(255u8);
            rest -= 255;
        }
        else {
            segments.push(rest as u8);
            break;
        }
    }

    let mut page = Vec::new();
    page.extend_from_slice(b"OggS");
    page.push(0); // version
    page.push(flags);
    page.extend_from_slice(&granule.to_le_bytes());
    page.extend_from_slice(&serial.to_le_bytes());
    page.extend_from_slice(&sequence.to_le_bytes());
    page.extend_from_slice(&0u32.to_le_bytes()); // checksum, unchecked
    page.push(segments.len() as u8);
    page.extend_from_slice(&segments);
    page.extend_from_slice(payload);
    page
}

/// The OGG-FLAC identification packet, without the trailing native stream.
pub fn ogg_flac_ident() -> Vec<u8> {
    let mut packet = vec![0x7f];
    packet.extend_from_slice(b"FLAC");
    packet.push(0x01);
    packet.push(0x00);
    packet.extend_from_slice(&0u16.to_be_bytes());
    packet
}
