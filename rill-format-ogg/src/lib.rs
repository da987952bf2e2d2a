// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-resumable OGG page transport for Project Rill.
//!
//! [`PageReader`] walks OGG page headers one byte at a time and exposes the
//! page payload as a window the embedding decoder re-slices its input
//! against; [`mappings::flac::IdentReader`] recognizes the OGG-FLAC
//! identification packet that begins a FLAC logical stream. Neither type
//! performs any allocation, and both suspend with
//! [`Error::MoreData`](rill_core::errors::Error::MoreData) whenever the
//! caller's slice runs out.

#![no_std]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod mappings;
mod page;

pub use page::{PageFlags, PageReader};
