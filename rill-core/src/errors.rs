// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use core::fmt;
use core::result;

/// `Error` enumerates everything a Rill decoder can report besides a
/// completed unit.
///
/// One variant is not a failure at all: [`Error::MoreData`] is the decoder's
/// suspension signal. It means the input slice was exhausted before the
/// current unit (a metadata field, a frame header, a frame) completed, and
/// the same operation should be repeated with a slice that starts at the
/// first unconsumed byte. All other variants leave the decoder in an
/// unspecified state; `reset` is the supported recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The input slice ran out mid-unit. Feed more bytes and retry; this is
    /// a flow signal, not a failure.
    MoreData,
    /// The stream did not begin with the `fLaC` marker.
    InvalidStreamMarker,
    /// A frame header did not begin with the 14-bit sync code.
    InvalidSyncCode,
    /// A reserved bit in a frame header was set.
    FrameReservedBit,
    /// A frame header used the reserved block-size code.
    ReservedBlockSize,
    /// A frame header carried a block size larger than the format allows.
    InvalidBlockSize,
    /// A frame header used the invalid sample-rate code, or requested
    /// inheritance from a STREAMINFO block that was never seen.
    InvalidSampleRate,
    /// A frame header used a reserved sample-size code.
    ReservedSampleSize,
    /// A frame header requested the STREAMINFO sample size, but no
    /// STREAMINFO block was ever seen.
    InvalidSampleSize,
    /// A frame header used a reserved channel-assignment code.
    ReservedChannelAssignment,
    /// The coded frame/sample number was not a valid variable-length form.
    InvalidSampleNumber,
    /// A subframe header's reserved bit was set.
    SubframeReservedBit,
    /// A subframe header used a reserved type code.
    ReservedSubframeType,
    /// A residual block used a reserved coding method.
    ReservedCodingMethod,
    /// The residual partition order does not tile the block.
    InvalidPartitionOrder,
    /// A metadata header used the invalid type code 127.
    InvalidMetadataType,
    /// A metadata header used a reserved type code. The block can still be
    /// skipped by continuing to drive the decoder.
    ReservedMetadataType,
    /// An Ogg page was malformed (bad capture pattern or version).
    InvalidPage,
    /// The first packet of an Ogg logical stream was not a FLAC
    /// identification packet. The page is skippable.
    OggHeaderNotFlac,
    /// A FLAC identification packet was recognized but malformed.
    InvalidIdentHeader,
    /// The frame header checksum did not match the CRC-8 of the header
    /// bytes.
    FrameCrc8Mismatch,
    /// The frame footer checksum did not match the CRC-16 of the frame
    /// bytes.
    FrameCrc16Mismatch,
    /// The container probe saw a first byte that is neither `f` nor `O`.
    UnsupportedContainer,
    /// An operation was invoked in a phase where it cannot apply.
    InvalidState,
}

impl Error {
    fn as_str(&self) -> &'static str {
        match *self {
            Error::MoreData => "more input required",
            Error::InvalidStreamMarker => "invalid stream marker",
            Error::InvalidSyncCode => "invalid frame sync code",
            Error::FrameReservedBit => "frame header reserved bit is set",
            Error::ReservedBlockSize => "frame block size set to reserved value",
            Error::InvalidBlockSize => "frame block size out of range",
            Error::InvalidSampleRate => "frame sample rate invalid or unknown",
            Error::ReservedSampleSize => "frame sample size set to reserved value",
            Error::InvalidSampleSize => "frame sample size unknown",
            Error::ReservedChannelAssignment => "channel assignment set to reserved value",
            Error::InvalidSampleNumber => "coded frame/sample number is not valid",
            Error::SubframeReservedBit => "subframe header reserved bit is set",
            Error::ReservedSubframeType => "subframe type set to reserved value",
            Error::ReservedCodingMethod => "residual coding method set to reserved value",
            Error::InvalidPartitionOrder => "residual partitions do not tile the block",
            Error::InvalidMetadataType => "metadata type set to invalid value",
            Error::ReservedMetadataType => "metadata type set to reserved value",
            Error::InvalidPage => "malformed ogg page",
            Error::OggHeaderNotFlac => "ogg packet is not a flac identification packet",
            Error::InvalidIdentHeader => "malformed flac identification packet",
            Error::FrameCrc8Mismatch => "frame header crc mismatch",
            Error::FrameCrc16Mismatch => "frame footer crc mismatch",
            Error::UnsupportedContainer => "unrecognized container",
            Error::InvalidState => "operation does not apply in the current state",
        }
    }

    /// Returns true if this is the [`Error::MoreData`] flow signal rather
    /// than a failure.
    pub fn is_more_data(&self) -> bool {
        matches!(self, Error::MoreData)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a `MoreData` suspension.
pub fn more_data<T>() -> Result<T> {
    Err(Error::MoreData)
}
