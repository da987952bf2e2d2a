// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

/// The OGG-FLAC header packet type value.
const OGG_FLAC_PACKET_TYPE: u8 = 0x7f;

/// The OGG-FLAC header packet signature, in ASCII.
const OGG_FLAC_HEADER_SIGNATURE: [u8; 4] = *b"FLAC";

/// The major version number of the supported OGG-FLAC mapping.
const OGG_FLAC_MAPPING_MAJOR_VERSION: u8 = 1;

#[derive(Clone, Copy, PartialEq, Eq)]
enum IdentState {
    PacketType,
    /// Matching the `FLAC` signature; the index is the next byte expected.
    Signature(u8),
    MajorVersion,
    MinorVersion,
    HeaderPackets,
}

/// A resumable reader of the OGG-FLAC identification packet.
///
/// The packet is `0x7F "FLAC" <major> <minor> <u16be header-packets>`,
/// followed in the same OGG packet by the native `fLaC` marker and the
/// STREAMINFO block, which this reader leaves for the embedding decoder.
///
/// A wrong packet-type byte yields [`Error::OggHeaderNotFlac`], which the
/// embedding decoder treats as "this logical stream is not FLAC; skip the
/// page". Mismatches after that point yield [`Error::InvalidIdentHeader`].
pub struct IdentReader {
    state: IdentState,
}

impl Default for IdentReader {
    fn default() -> Self {
        IdentReader { state: IdentState::PacketType }
    }
}

impl IdentReader {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reinit(&mut self) {
        self.state = IdentState::PacketType;
    }

    /// Consumes the identification packet up to and including the
    /// header-packet count.
    pub fn decode(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        loop {
            match self.state {
                IdentState::PacketType => {
                    br.fill_nocrc(feed, 8)?;
                    if br.read(8) as u8 != OGG_FLAC_PACKET_TYPE {
                        return Err(Error::OggHeaderNotFlac);
                    }
                    self.state = IdentState::Signature(0);
                }
                IdentState::Signature(index) => {
                    br.fill_nocrc(feed, 8)?;
                    if br.read(8) as u8 != OGG_FLAC_HEADER_SIGNATURE[usize::from(index)] {
                        return Err(Error::InvalidIdentHeader);
                    }
                    self.state = if usize::from(index) + 1 < OGG_FLAC_HEADER_SIGNATURE.len() {
                        IdentState::Signature(index + 1)
                    }
                    else {
                        IdentState::MajorVersion
                    };
                }
                IdentState::MajorVersion => {
                    br.fill_nocrc(feed, 8)?;
                    if br.read(8) as u8 != OGG_FLAC_MAPPING_MAJOR_VERSION {
                        return Err(Error::InvalidIdentHeader);
                    }
                    self.state = IdentState::MinorVersion;
                }
                IdentState::MinorVersion => {
                    br.fill_nocrc(feed, 8)?;
                    // All version 1 minor revisions are supported.
                    br.discard(8);
                    self.state = IdentState::HeaderPackets;
                }
                IdentState::HeaderPackets => {
                    // The number of header packets may be 0 to signify it is
                    // unknown, so it carries no actionable information.
                    br.fill_nocrc(feed, 16)?;
                    br.discard(16);
                    self.state = IdentState::PacketType;
                    return Ok(());
                }
            }
        }
    }
}
