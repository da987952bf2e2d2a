// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Native-stream decoding tests: frame decoding, decorrelation, CRC
//! validation, and chunking invariance.

mod common;

use common::*;

use rill_bundle_flac::{
    BlockSequence, BlockType, Container, Error, FlacDecoder, FrameInfo, Phase, Synced,
};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const MAX_CHANNELS: usize = 2;
const MAX_BLOCK: usize = 256;

/// Feeds `data` to a fresh decoder in chunks of `next_chunk()` bytes and
/// collects every decoded frame with its samples.
fn drive(data: &[u8], mut next_chunk: impl FnMut() -> usize) -> Vec<(FrameInfo, Vec<Vec<i32>>)> {
    let mut decoder = FlacDecoder::new(Container::Unknown);
    let mut bufs = vec![vec![0i32; MAX_BLOCK]; MAX_CHANNELS];
    let mut frames = Vec::new();

    let mut pos = 0;
    let mut avail = 0;
    loop {
        let mut refs: Vec<&mut [i32]> = bufs.iter_mut().map(|b| b.as_mut_slice()).collect();
        match decoder.decode(&data[pos..avail], Some(&mut refs)) {
            Ok((used, info)) => {
                pos += used;
                let samples = bufs[..info.channels as usize]
                    .iter()
                    .map(|b| b[..info.block_size as usize].to_vec())
                    .collect();
                frames.push((info, samples));
            }
            Err(Error::MoreData) => {
                pos = avail;
                if avail == data.len() {
                    break;
                }
                avail = avail.saturating_add(next_chunk().max(1)).min(data.len());
            }
            Err(err) => panic!("decode failed: {err}"),
        }
    }
    frames
}

fn stereo_stream() -> Vec<u8> {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 1000));
    // Frame 0: two CONSTANT subframes.
    data.extend(build_frame(0, 16, 9, 1, 4, |w| {
        subframe_constant(w, 16, 1000);
        subframe_constant(w, 16, -1000);
    }));
    // Frame 1: a VERBATIM ramp and a FIXED line.
    let ramp: Vec<i32> = (0..16).map(|i| i * 3 - 20).collect();
    data.extend(build_frame(1, 16, 9, 1, 4, move |w| {
        subframe_verbatim(w, 16, &ramp);
        subframe_fixed2_zero_residual(w, 16, [7, 9], 16);
    }));
    // Frame 2: an LPC accumulator.
    data.extend(build_frame(2, 8, 9, 1, 4, |w| {
        subframe_lpc1(w, 16, 100, &[1, -1, 2, -2, 3, -3, 0]);
        subframe_constant(w, 16, 0);
    }));
    data
}

#[test]
fn verify_decode_constant_frame() {
    let frames = drive(&stereo_stream(), || usize::MAX);
    assert_eq!(frames.len(), 3);

    let (info, samples) = &frames[0];
    assert_eq!(info.block_size, 16);
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(info.channels, 2);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(info.sequence, BlockSequence::ByFrame(0));
    assert_eq!(samples[0], vec![1000; 16]);
    assert_eq!(samples[1], vec![-1000; 16]);
}

#[test]
fn verify_decode_verbatim_and_fixed() {
    let frames = drive(&stereo_stream(), || usize::MAX);

    let (_, samples) = &frames[1];
    let ramp: Vec<i32> = (0..16).map(|i| i * 3 - 20).collect();
    assert_eq!(samples[0], ramp);
    // FIXED order 2 with zero residuals is the arithmetic progression
    // through the warmup samples.
    let line: Vec<i32> = (0..16).map(|i| 7 + 2 * i).collect();
    assert_eq!(samples[1], line);
}

#[test]
fn verify_decode_lpc() {
    let frames = drive(&stereo_stream(), || usize::MAX);

    let (info, samples) = &frames[2];
    assert_eq!(info.block_size, 8);
    // Coefficient 1, shift 0: a running sum of the residuals.
    assert_eq!(samples[0], vec![100, 101, 100, 102, 100, 103, 100, 100]);
}

#[test]
fn verify_chunking_invariance_byte_at_a_time() {
    let data = stereo_stream();
    let bulk = drive(&data, || usize::MAX);
    let trickled = drive(&data, || 1);

    assert_eq!(bulk.len(), trickled.len());
    for ((a, sa), (b, sb)) in bulk.iter().zip(&trickled) {
        assert_eq!(a.block_size, b.block_size);
        assert_eq!(sa, sb);
    }
}

#[test]
fn verify_chunking_invariance_random() {
    let data = stereo_stream();
    let bulk = drive(&data, || usize::MAX);

    let mut rng = SmallRng::seed_from_u64(0x5eed);
    for _ in 0..16 {
        let chunked = drive(&data, || rng.random_range(1..23));
        assert_eq!(bulk.len(), chunked.len());
        for ((a, sa), (b, sb)) in bulk.iter().zip(&chunked) {
            assert_eq!(a.block_size, b.block_size);
            assert_eq!(sa, sb);
        }
    }
}

#[test]
fn verify_decode_without_output_consumes_identically() {
    let data = stereo_stream();
    let mut with_out = FlacDecoder::new(Container::Unknown);
    let mut without_out = FlacDecoder::new(Container::Unknown);

    let mut l = [0i32; MAX_BLOCK];
    let mut r = [0i32; MAX_BLOCK];

    let mut pos_a = 0;
    let mut pos_b = 0;
    for _ in 0..3 {
        let mut refs: [&mut [i32]; 2] = [&mut l, &mut r];
        let (used_a, info_a) = with_out.decode(&data[pos_a..], Some(&mut refs)).unwrap();
        let (used_b, info_b) = without_out.decode(&data[pos_b..], None).unwrap();
        assert_eq!(used_a, used_b);
        assert_eq!(info_a.frame_size, info_b.frame_size);
        pos_a += used_a;
        pos_b += used_b;
    }
    assert_eq!(pos_a, data.len());
}

#[test]
fn verify_frame_size_queries() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    let frame = build_frame(0, 16, 9, 1, 4, |w| {
        subframe_constant(w, 16, 5);
        subframe_constant(w, 16, 6);
    });
    data.extend(&frame);

    let mut decoder = FlacDecoder::new(Container::Unknown);
    let (used, info) = decoder.decode(&data, None).unwrap();
    assert_eq!(used, data.len());
    assert_eq!(info.frame_size as usize, frame.len());
    assert_eq!(decoder.frame_size() as usize, frame.len());
    // Header: 2 sync/desc + 2 desc + 1 number + 1 block size + 1 crc.
    assert_eq!(decoder.frame_header_size(), 7);
    assert_eq!(decoder.bytes_read_native(), data.len() as u64);
}

#[test]
fn verify_sync_stops_at_each_header() {
    let data = stereo_stream();
    let mut decoder = FlacDecoder::new(Container::Unknown);

    let mut pos = 0;
    let (used, synced) = decoder.sync(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(synced, Synced::Metadata);
    assert_eq!(decoder.block_type(), BlockType::StreamInfo);
    assert!(decoder.block_is_last());
    assert_eq!(decoder.block_length(), 34);

    // Three frames follow; sync parses each header, then traverses the
    // frame on the next call.
    for frame_no in 0..3u32 {
        let (used, synced) = decoder.sync(&data[pos..]).unwrap();
        pos += used;
        assert_eq!(synced, Synced::Frame);
        assert_eq!(decoder.block_sequence(), BlockSequence::ByFrame(frame_no));
        assert_eq!(decoder.phase(), Phase::Frame);
    }

    // Past the last frame there is nothing left to sync to.
    assert_eq!(decoder.sync(&data[pos..]), Err(Error::MoreData));
}

#[test]
fn verify_streaminfo_fields() {
    // The stream marker, a 34-byte STREAMINFO header with the last-block
    // bit clear, and a body declaring 4096-sample blocks, 44.1 kHz,
    // stereo, 16 bits, and 10000 total samples.
    let data: Vec<u8> = vec![
        0x66, 0x4c, 0x61, 0x43, 0x00, 0x00, 0x00, 0x22, 0x10, 0x00, 0x10, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x0a, 0xc4, 0x42, 0xf0, 0x00, 0x00, 0x27, 0x10, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    let mut decoder = FlacDecoder::new(Container::Unknown);
    let mut pos = 0;

    let (used, synced) = decoder.sync(&data).unwrap();
    pos += used;
    assert_eq!(used, 8);
    assert_eq!(synced, Synced::Metadata);
    assert_eq!(decoder.block_type(), BlockType::StreamInfo);
    assert!(!decoder.block_is_last());

    let (used, min_block) = decoder.streaminfo_min_block_size(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(min_block, 4096);

    let (used, max_block) = decoder.streaminfo_max_block_size(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(max_block, 4096);

    let (used, min_frame) = decoder.streaminfo_min_frame_size(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(min_frame, 0);

    let (used, max_frame) = decoder.streaminfo_max_frame_size(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(max_frame, 0);

    let (used, sample_rate) = decoder.streaminfo_sample_rate(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(sample_rate, 44_100);

    let (used, channels) = decoder.streaminfo_channels(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(channels, 2);

    let (used, bps) = decoder.streaminfo_bps(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(bps, 16);

    let (used, total) = decoder.streaminfo_total_samples(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(total, 10_000);

    let (used, md5_len) = decoder.streaminfo_md5_length(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(md5_len, 16);

    let mut md5 = [0xffu8; 16];
    let (used, copied) = decoder.streaminfo_md5_data(&data[pos..], &mut md5).unwrap();
    pos += used;
    assert_eq!(copied, Some(16));
    assert_eq!(md5, [0u8; 16]);

    assert_eq!(pos, data.len());
    assert_eq!(decoder.bytes_read_native(), data.len() as u64);
}

#[test]
fn verify_skipping_to_later_field() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 48_000, 1, 24, 77));

    let mut decoder = FlacDecoder::new(Container::Unknown);
    // Never synced, never read the earlier fields: the accessor runs the
    // whole prefix itself.
    let (_, bps) = decoder.streaminfo_bps(&data).unwrap();
    assert_eq!(bps, 24);
}

#[test]
fn verify_frame_crc8_corruption_detected() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    let mut frame = build_frame(0, 16, 9, 1, 4, |w| {
        subframe_constant(w, 16, 1);
        subframe_constant(w, 16, 2);
    });
    // Flip a bit in the frame-number byte, before the header CRC.
    frame[4] ^= 0x01;
    data.extend(&frame);

    let mut decoder = FlacDecoder::new(Container::Unknown);
    let (used, _) = decoder.sync(&data).unwrap();
    assert_eq!(decoder.sync(&data[used..]), Err(Error::FrameCrc8Mismatch));
}

#[test]
fn verify_frame_crc16_corruption_detected() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    let mut frame = build_frame(0, 16, 9, 1, 4, |w| {
        subframe_constant(w, 16, 1);
        subframe_constant(w, 16, 2);
    });
    // Flip a bit in the subframe body, after the header CRC.
    let body = frame.len() - 4;
    frame[body] ^= 0x10;
    data.extend(&frame);

    let mut decoder = FlacDecoder::new(Container::Unknown);
    assert_eq!(decoder.decode(&data, None), Err(Error::FrameCrc16Mismatch));
}

#[test]
fn verify_truncated_frame_never_completes() {
    let data = stereo_stream();
    let truncated = &data[..data.len() - 3];

    let mut decoder = FlacDecoder::new(Container::Unknown);
    let mut pos = 0;
    let mut completed = 0;
    loop {
        match decoder.decode(&truncated[pos..], None) {
            Ok((used, _)) => {
                pos += used;
                completed += 1;
            }
            Err(Error::MoreData) => {
                pos = truncated.len();
                break;
            }
            Err(err) => panic!("decode failed: {err}"),
        }
    }
    assert_eq!(completed, 2);

    // Starved of the last bytes, the decoder suspends forever and never
    // claims the partial frame.
    for _ in 0..4 {
        assert_eq!(decoder.decode(&[], None), Err(Error::MoreData));
    }
}

#[test]
fn verify_probe_rejects_unknown_container() {
    let mut decoder = FlacDecoder::new(Container::Unknown);
    assert_eq!(decoder.decode(b"RIFF", None), Err(Error::UnsupportedContainer));
}

#[test]
fn verify_left_side_decorrelation() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    // Left/side: channel 1 is decoded as left minus side. The side channel
    // is coded with one extra bit.
    data.extend(build_frame(0, 8, 9, 8, 4, |w| {
        subframe_constant(w, 16, 5);
        subframe_constant(w, 17, 1);
    }));

    let frames = drive(&data, || usize::MAX);
    let (_, samples) = &frames[0];
    assert_eq!(samples[0], vec![5; 8]);
    assert_eq!(samples[1], vec![4; 8]);
}

#[test]
fn verify_right_side_decorrelation() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    // Right/side: channel 0 is decoded as right plus side; the side channel
    // comes first.
    data.extend(build_frame(0, 8, 9, 9, 4, |w| {
        subframe_constant(w, 17, 1);
        subframe_constant(w, 16, 4);
    }));

    let frames = drive(&data, || usize::MAX);
    let (_, samples) = &frames[0];
    assert_eq!(samples[0], vec![5; 8]);
    assert_eq!(samples[1], vec![4; 8]);
}

#[test]
fn verify_mid_side_decorrelation() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    // Mid 4, side 1 restores left 5, right 4; the odd side value exercises
    // the rounding carry.
    data.extend(build_frame(0, 8, 9, 10, 4, |w| {
        subframe_constant(w, 16, 4);
        subframe_constant(w, 17, 1);
    }));

    let frames = drive(&data, || usize::MAX);
    let (_, samples) = &frames[0];
    assert_eq!(samples[0], vec![5; 8]);
    assert_eq!(samples[1], vec![4; 8]);
}

#[test]
fn verify_inherited_sample_rate_and_bps() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 32_000, 2, 16, 0));
    // Sample-rate code 0 and sample-size code 0 inherit from STREAMINFO.
    data.extend(build_frame(0, 8, 0, 1, 0, |w| {
        subframe_constant(w, 16, 9);
        subframe_constant(w, 16, 9);
    }));

    let mut decoder = FlacDecoder::new(Container::Unknown);
    let (_, info) = decoder.decode(&data, None).unwrap();
    assert_eq!(info.sample_rate, 32_000);
    assert_eq!(info.bits_per_sample, 16);
}

#[test]
fn verify_inherit_without_streaminfo_fails() {
    let frame = build_frame(0, 8, 0, 1, 0, |w| {
        subframe_constant(w, 16, 9);
        subframe_constant(w, 16, 9);
    });

    // A fresh decoder reset into the frame phase has no STREAMINFO values
    // to inherit.
    let mut decoder = FlacDecoder::new(Container::Native);
    decoder.reset(Phase::Frame);
    assert_eq!(decoder.decode(&frame, None), Err(Error::InvalidSampleRate));
}

#[test]
fn verify_reset_to_frame_preserves_stream_params() {
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 32_000, 2, 16, 0));
    let frame = build_frame(0, 8, 0, 1, 0, |w| {
        subframe_constant(w, 16, 9);
        subframe_constant(w, 16, 9);
    });
    data.extend(&frame);

    let mut decoder = FlacDecoder::new(Container::Unknown);
    let (_, info) = decoder.decode(&data, None).unwrap();
    assert_eq!(info.sample_rate, 32_000);

    // After a reset into the frame phase the inherited parameters survive,
    // so the same frame decodes standalone.
    decoder.reset(Phase::Frame);
    let (_, info) = decoder.decode(&frame, None).unwrap();
    assert_eq!(info.sample_rate, 32_000);
    assert_eq!(info.bits_per_sample, 16);

    // Any other reset target drops them.
    decoder.reset(Phase::MarkerOrFrame);
    assert_eq!(decoder.decode(&frame, None), Err(Error::InvalidSampleRate));
}

#[test]
fn verify_marker_or_frame_entry() {
    let frame = build_frame(0, 8, 9, 1, 4, |w| {
        subframe_constant(w, 16, 3);
        subframe_constant(w, 16, 3);
    });

    // A native-container decoder accepts a stream that starts at a marker.
    let mut data = stream_marker();
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    data.extend(&frame);
    let mut decoder = FlacDecoder::new(Container::Native);
    assert!(decoder.decode(&data, None).is_ok());

    // And, with explicit header codes, one that starts directly at a
    // frame.
    let mut decoder = FlacDecoder::new(Container::Native);
    assert!(decoder.decode(&frame, None).is_ok());
}

#[test]
fn verify_reserved_metadata_block_is_skippable() {
    let mut data = stream_marker();
    data.extend(unknown_block(false, 50, b"abc"));
    data.extend(streaminfo_block(true, 44_100, 2, 16, 0));

    let mut decoder = FlacDecoder::new(Container::Unknown);

    // The reserved type surfaces once; driving on skips the block.
    assert_eq!(decoder.sync(&data), Err(Error::ReservedMetadataType));
    let consumed = decoder.bytes_read_native() as usize;

    let mut pos = consumed;
    let (used, synced) = decoder.sync(&data[pos..]).unwrap();
    pos += used;
    assert_eq!(synced, Synced::Metadata);
    assert_eq!(decoder.block_type(), BlockType::Unknown);

    let (_, synced) = decoder.sync(&data[pos..]).unwrap();
    assert_eq!(synced, Synced::Metadata);
    assert_eq!(decoder.block_type(), BlockType::StreamInfo);
}

#[test]
fn verify_ogg_page_queries() {
    let mut payload = ogg_flac_ident();
    payload.extend(stream_marker());
    payload.extend(streaminfo_block(true, 44_100, 2, 16, 0));
    let frame = build_frame(0, 8, 9, 1, 4, |w| {
        subframe_constant(w, 16, 1);
        subframe_constant(w, 16, -1);
    });

    let mut data = ogg_page(0x51, 0, 0x02, &payload);
    data.extend(ogg_page_with_granule(0x51, 1, 0x04, 8, &frame));

    let mut decoder = FlacDecoder::new(Container::Ogg);
    let (used, info) = decoder.decode(&data, None).unwrap();
    assert_eq!(used, data.len());
    assert_eq!(info.block_size, 8);
    // The frame landed on the second page, which carries its granule.
    assert_eq!(decoder.page_sequence(), 1);
    assert_eq!(decoder.granule_position(), 8);
}

#[test]
fn verify_invalid_metadata_type_is_fatal() {
    let mut data = stream_marker();
    data.extend(unknown_block(true, 127, b""));

    let mut decoder = FlacDecoder::new(Container::Unknown);
    assert_eq!(decoder.sync(&data), Err(Error::InvalidMetadataType));
}
