// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared foundations for Project Rill decoders.
//!
//! Rill decoders are *byte-resumable*: the caller hands them an arbitrary
//! slice of bytes, the decoder consumes what it can, and when the slice runs
//! dry the decoder suspends and reports [`Error::MoreData`]. The next call
//! with fresh bytes resumes exactly where the previous one stopped. This
//! crate provides the pieces that make that style of decoder possible with
//! no allocation and no `std`:
//!
//! * [`errors`]: the common error type shared by every Rill crate.
//! * [`checksum`]: the CRC-8 and CRC-16 codes used by FLAC framing.
//! * [`io`]: the persistent bit accumulator and the per-call input cursor.
//!
//! [`Error::MoreData`]: errors::Error::MoreData

#![no_std]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod checksum;
pub mod errors;
pub mod io;
