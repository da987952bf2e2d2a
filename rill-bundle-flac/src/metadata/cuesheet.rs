// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

/// The fields of a CUESHEET block. `TrackOffset` through `TrackPoints`
/// repeat per track; `IndexOffset` through `IndexReserve` repeat per index
/// point within a track.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Catalog,
    LeadIn,
    CdFlag,
    SheetReserve,
    Tracks,
    TrackOffset,
    TrackNumber,
    TrackIsrc,
    TrackType,
    TrackPreemph,
    TrackReserve,
    TrackPoints,
    IndexOffset,
    IndexNumber,
    IndexReserve,
}

/// A lazy field reader for the CUESHEET block, with two nested iterations:
/// tracks, and index points within each track.
///
/// `read_track_offset` and `read_index_point_offset` are the iteration
/// entry points; they return `None` when their iteration is exhausted.
/// Asking for the next track implicitly drains any index points of the
/// current track that were never read.
pub struct CuesheetReader {
    state: Field,
    /// Cursor within the catalog number, ISRC, or a reserved run.
    pos: u32,
    track: u8,
    tracks: u8,
    point: u8,
    points: u8,
}

impl Default for CuesheetReader {
    fn default() -> Self {
        CuesheetReader { state: Field::Catalog, pos: 0, track: 0, tracks: 0, point: 0, points: 0 }
    }
}

impl CuesheetReader {
    pub fn reinit(&mut self) {
        *self = Default::default();
    }

    /// The catalog number is a fixed 128-byte field.
    pub fn read_catalog_length(&mut self, _br: &mut BitReader, _feed: &mut Feed<'_>) -> Result<u32> {
        match self.state {
            Field::Catalog => Ok(128),
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_catalog_string(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<usize> {
        match self.state {
            Field::Catalog => {
                while self.pos < 128 {
                    br.fill_nocrc(feed, 8)?;
                    let byte = br.read(8) as u8;
                    if (self.pos as usize) < out.len() {
                        out[self.pos as usize] = byte;
                    }
                    self.pos += 1;
                }
                self.pos = 0;
                self.state = Field::LeadIn;
                Ok(out.len().min(128))
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_leadin(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u64> {
        if self.state == Field::Catalog {
            self.read_catalog_string(br, feed, &mut [])?;
        }
        match self.state {
            Field::LeadIn => {
                br.fill_nocrc(feed, 64)?;
                let value = br.read(64);
                self.state = Field::CdFlag;
                Ok(value)
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_cd_flag(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<bool> {
        if matches!(self.state, Field::Catalog | Field::LeadIn) {
            self.read_leadin(br, feed)?;
        }
        match self.state {
            Field::CdFlag => {
                br.fill_nocrc(feed, 8)?;
                let flag = br.read(1) != 0;
                br.discard(7);
                self.pos = 0;
                self.state = Field::SheetReserve;
                Ok(flag)
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_tracks(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u8> {
        if matches!(self.state, Field::Catalog | Field::LeadIn | Field::CdFlag) {
            self.read_cd_flag(br, feed)?;
        }
        if self.state == Field::SheetReserve {
            while self.pos < 258 {
                br.fill_nocrc(feed, 8)?;
                br.discard(8);
                self.pos += 1;
            }
            self.pos = 0;
            self.state = Field::Tracks;
        }
        match self.state {
            Field::Tracks => {
                br.fill_nocrc(feed, 8)?;
                self.tracks = br.read(8) as u8;
                self.track = 0;
                self.state = Field::TrackOffset;
                Ok(self.tracks)
            }
            _ => Err(Error::InvalidState),
        }
    }

    /// The offset of the next track, or `None` once every track has been
    /// consumed. Any unread index points of the current track are drained
    /// first.
    pub fn read_track_offset(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<Option<u64>> {
        match self.state {
            Field::Catalog | Field::LeadIn | Field::CdFlag | Field::SheetReserve | Field::Tracks => {
                self.read_tracks(br, feed)?;
            }
            Field::IndexOffset | Field::IndexNumber | Field::IndexReserve => {
                while self.read_index_point_offset(br, feed)?.is_some() {}
                // The index iteration's end re-armed us at `TrackOffset`.
            }
            _ => {}
        }
        match self.state {
            Field::TrackOffset => {
                if self.track == self.tracks {
                    return Ok(None);
                }
                br.fill_nocrc(feed, 64)?;
                let value = br.read(64);
                self.state = Field::TrackNumber;
                Ok(Some(value))
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_track_number(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u8> {
        if self.state != Field::TrackNumber {
            if self.read_track_offset(br, feed)?.is_none() {
                return Err(Error::InvalidState);
            }
        }
        br.fill_nocrc(feed, 8)?;
        let value = br.read(8) as u8;
        self.pos = 0;
        self.state = Field::TrackIsrc;
        Ok(value)
    }

    /// The ISRC is a fixed 12-byte field.
    pub fn read_track_isrc_length(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<u32> {
        if self.state != Field::TrackIsrc {
            self.read_track_number(br, feed)?;
        }
        Ok(12)
    }

    pub fn read_track_isrc_string(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: &mut [u8],
    ) -> Result<usize> {
        if self.state != Field::TrackIsrc {
            self.read_track_number(br, feed)?;
        }
        while self.pos < 12 {
            br.fill_nocrc(feed, 8)?;
            let byte = br.read(8) as u8;
            if (self.pos as usize) < out.len() {
                out[self.pos as usize] = byte;
            }
            self.pos += 1;
        }
        self.pos = 0;
        self.state = Field::TrackType;
        Ok(out.len().min(12))
    }

    /// The track-type bit: 0 for audio, 1 for non-audio.
    pub fn read_track_type(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<u8> {
        if self.state != Field::TrackType {
            self.read_track_isrc_string(br, feed, &mut [])?;
        }
        br.fill_nocrc(feed, 8)?;
        let value = br.read(1) as u8;
        self.state = Field::TrackPreemph;
        Ok(value)
    }

    pub fn read_track_preemph(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<bool> {
        if self.state != Field::TrackPreemph {
            self.read_track_type(br, feed)?;
        }
        br.fill_nocrc(feed, 1)?;
        let flag = br.read(1) != 0;
        br.discard(6);
        self.pos = 0;
        self.state = Field::TrackReserve;
        Ok(flag)
    }

    /// The number of index points of the current track, or `None` once
    /// every track has been consumed.
    pub fn read_track_indexpoints(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<Option<u8>> {
        if matches!(self.state, Field::IndexOffset | Field::IndexNumber | Field::IndexReserve) {
            // Finish the current track's index points; the iteration end
            // re-arms the reader at the next track's offset.
            while self.read_index_point_offset(br, feed)?.is_some() {}
        }
        if matches!(
            self.state,
            Field::Catalog | Field::LeadIn | Field::CdFlag | Field::SheetReserve | Field::Tracks
        ) {
            self.read_tracks(br, feed)?;
        }
        if self.state == Field::TrackOffset && self.track == self.tracks {
            return Ok(None);
        }
        if self.state != Field::TrackReserve && self.state != Field::TrackPoints {
            self.read_track_preemph(br, feed)?;
        }
        if self.state == Field::TrackReserve {
            while self.pos < 13 {
                br.fill_nocrc(feed, 8)?;
                br.discard(8);
                self.pos += 1;
            }
            self.state = Field::TrackPoints;
        }
        match self.state {
            Field::TrackPoints => {
                br.fill_nocrc(feed, 8)?;
                self.points = br.read(8) as u8;
                self.point = 0;
                self.state = Field::IndexOffset;
                Ok(Some(self.points))
            }
            _ => Err(Error::InvalidState),
        }
    }

    /// The offset of the next index point, or `None` once the current
    /// track's index points are exhausted (the reader is then poised at the
    /// next track).
    pub fn read_index_point_offset(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<Option<u64>> {
        match self.state {
            Field::IndexNumber => {
                self.read_index_point_number(br, feed)?;
            }
            Field::IndexOffset | Field::IndexReserve => {}
            _ => {
                if self.read_track_indexpoints(br, feed)?.is_none() {
                    return Ok(None);
                }
            }
        }
        if self.state == Field::IndexReserve {
            while self.pos < 3 {
                br.fill_nocrc(feed, 8)?;
                br.discard(8);
                self.pos += 1;
            }
            self.point += 1;
            self.state = Field::IndexOffset;
        }
        match self.state {
            Field::IndexOffset => {
                if self.point == self.points {
                    // Done with this track.
                    self.track += 1;
                    self.state = Field::TrackOffset;
                    return Ok(None);
                }
                br.fill_nocrc(feed, 64)?;
                let value = br.read(64);
                self.state = Field::IndexNumber;
                Ok(Some(value))
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn read_index_point_number(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
    ) -> Result<u8> {
        if self.state != Field::IndexNumber {
            if self.read_index_point_offset(br, feed)?.is_none() {
                return Err(Error::InvalidState);
            }
        }
        br.fill_nocrc(feed, 8)?;
        let value = br.read(8) as u8;
        self.pos = 0;
        self.state = Field::IndexReserve;
        Ok(value)
    }
}
