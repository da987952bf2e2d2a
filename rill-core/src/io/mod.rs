// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module provides the bit-level input machinery shared by all
//! Rill decoders.
//!
//! Input arrives as caller-owned byte slices that are only borrowed for the
//! duration of a single call. The persistent half of the reader is
//! [`BitReader`]; the per-call half is [`Feed`]. A decoder suspends when
//! [`BitReader::fill`] cannot satisfy a request from the current `Feed`.

mod bit;

pub use bit::{BitReader, Feed};
