// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A byte-resumable FLAC stream decoder.
//!
//! [`FlacDecoder`] consumes a native FLAC stream, or FLAC embedded in OGG
//! pages, from caller-provided byte slices of any size. Every operation
//! either completes a unit (a metadata field, a parsed header, a decoded
//! audio frame) or suspends with
//! [`Error::MoreData`](rill_core::errors::Error::MoreData) once the slice
//! is exhausted, resuming from the exact bit it stopped at when called
//! again with more input. The decoder allocates nothing; sample buffers and
//! string buffers are owned by the caller.
//!
//! ```no_run
//! use rill_bundle_flac::{Container, FlacDecoder};
//!
//! let mut decoder = FlacDecoder::new(Container::Unknown);
//! let mut left = [0i32; 4096];
//! let mut right = [0i32; 4096];
//!
//! # fn refill(_: &mut [u8]) -> usize { 0 }
//! let mut buf = [0u8; 4096];
//! let mut len = refill(&mut buf);
//! let mut pos = 0;
//! loop {
//!     let mut out: [&mut [i32]; 2] = [&mut left, &mut right];
//!     match decoder.decode(&buf[pos..len], Some(&mut out)) {
//!         Ok((used, info)) => {
//!             pos += used;
//!             // out[c][..info.block_size] holds channel c.
//!             let _ = info;
//!         }
//!         Err(rill_bundle_flac::Error::MoreData) => {
//!             len = refill(&mut buf);
//!             pos = 0;
//!             if len == 0 {
//!                 break;
//!             }
//!         }
//!         Err(err) => panic!("decode failed: {}", err),
//!     }
//! }
//! ```

#![no_std]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

mod decoder;
mod frame;
mod metadata;
mod residual;
mod subframe;

pub use rill_core::errors::{Error, Result};

pub use decoder::{Container, FlacDecoder, FrameInfo, Phase, Synced};
pub use frame::{BlockSequence, BlockingStrategy, ChannelAssignment};
pub use metadata::BlockType;
