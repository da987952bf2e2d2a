// Rill
// Copyright (c) 2025-2026 The Project Rill Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subframe decoding: one channel's worth of samples within a frame.

use rill_core::errors::{Error, Result};
use rill_core::io::{BitReader, Feed};

use crate::residual::Residual;

/// The coding of a subframe, with the predictor order for the predictive
/// kinds.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SubframeKind {
    Constant,
    Verbatim,
    Fixed,
    Lpc,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SubframeHeaderState {
    ReservedBit,
    Kind,
    WastedFlag,
    WastedUnary,
}

struct SubframeHeader {
    state: SubframeHeaderState,
    kind: SubframeKind,
    order: u32,
    wasted_bits: u32,
}

impl Default for SubframeHeader {
    fn default() -> Self {
        SubframeHeader {
            state: SubframeHeaderState::ReservedBit,
            kind: SubframeKind::Constant,
            order: 0,
            wasted_bits: 0,
        }
    }
}

impl SubframeHeader {
    /// Decodes the subframe header: a reserved zero bit, a 6-bit type code,
    /// and an optional unary-coded wasted-bits count.
    fn decode(&mut self, br: &mut BitReader, feed: &mut Feed<'_>) -> Result<()> {
        loop {
            match self.state {
                SubframeHeaderState::ReservedBit => {
                    br.fill(feed, 1)?;
                    if br.read(1) != 0 {
                        return Err(Error::SubframeReservedBit);
                    }
                    self.state = SubframeHeaderState::Kind;
                }
                SubframeHeaderState::Kind => {
                    br.fill(feed, 6)?;
                    let code = br.read(6) as u32;
                    (self.kind, self.order) = match code {
                        0 => (SubframeKind::Constant, 0),
                        1 => (SubframeKind::Verbatim, 0),
                        8..=12 => (SubframeKind::Fixed, code - 8),
                        32..=63 => (SubframeKind::Lpc, code - 31),
                        _ => return Err(Error::ReservedSubframeType),
                    };
                    self.state = SubframeHeaderState::WastedFlag;
                }
                SubframeHeaderState::WastedFlag => {
                    br.fill(feed, 1)?;
                    self.wasted_bits = 0;
                    if br.read(1) == 0 {
                        self.state = SubframeHeaderState::ReservedBit;
                        return Ok(());
                    }
                    self.state = SubframeHeaderState::WastedUnary;
                }
                SubframeHeaderState::WastedUnary => {
                    // A run of k zero bits terminated by a one means k + 1
                    // wasted bits.
                    loop {
                        br.fill(feed, 1)?;
                        self.wasted_bits += 1;
                        if br.read(1) != 0 {
                            self.state = SubframeHeaderState::ReservedBit;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SubframeState {
    Header,
    Constant,
    Verbatim,
    Fixed,
    Lpc,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LpcStage {
    Precision,
    Shift,
    Coeffs,
}

/// A resumable decoder for one subframe.
///
/// The `pos` cursor doubles as the warmup counter and the output index the
/// residual decoder appends at, exactly as a suspended decode requires.
pub struct Subframe {
    state: SubframeState,
    header: SubframeHeader,
    /// Effective bits per sample: the channel bps minus wasted bits.
    bps: u32,
    pos: u32,
    lpc_stage: LpcStage,
    precision: u32,
    shift: u32,
    next_coeff: u32,
    coeffs: [i32; 32],
    residual: Residual,
}

impl Default for Subframe {
    fn default() -> Self {
        Subframe {
            state: SubframeState::Header,
            header: Default::default(),
            bps: 0,
            pos: 0,
            lpc_stage: LpcStage::Precision,
            precision: 0,
            shift: 0,
            next_coeff: 0,
            coeffs: [0; 32],
            residual: Residual::new(),
        }
    }
}

impl Subframe {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reinit(&mut self) {
        *self = Default::default();
    }

    /// Decodes one subframe of `block_size` samples at `bps` bits into
    /// `out`, or parses past it when `out` is `None`. On success the
    /// subframe state is re-armed for the next channel.
    pub fn decode(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        mut out: Option<&mut [i32]>,
        block_size: u32,
        bps: u32,
    ) -> Result<()> {
        if self.state == SubframeState::Header {
            self.header.decode(br, feed)?;
            self.bps = bps.saturating_sub(self.header.wasted_bits);
            self.state = match self.header.kind {
                SubframeKind::Constant => SubframeState::Constant,
                SubframeKind::Verbatim => SubframeState::Verbatim,
                SubframeKind::Fixed => SubframeState::Fixed,
                SubframeKind::Lpc => SubframeState::Lpc,
            };
        }

        match self.state {
            SubframeState::Constant => {
                self.decode_constant(br, feed, out.as_deref_mut(), block_size)?
            }
            SubframeState::Verbatim => {
                self.decode_verbatim(br, feed, out.as_deref_mut(), block_size)?
            }
            SubframeState::Fixed => self.decode_fixed(br, feed, out.as_deref_mut(), block_size)?,
            SubframeState::Lpc => self.decode_lpc(br, feed, out.as_deref_mut(), block_size)?,
            SubframeState::Header => return Err(Error::InvalidState),
        }

        // Reinstate the wasted bits stripped before coding.
        if self.header.wasted_bits > 0 {
            if let Some(buf) = out {
                let wasted = self.header.wasted_bits;
                for sample in buf[..block_size as usize].iter_mut() {
                    *sample = sample.wrapping_shl(wasted);
                }
            }
        }

        self.reinit();
        Ok(())
    }

    fn decode_constant(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        out: Option<&mut [i32]>,
        block_size: u32,
    ) -> Result<()> {
        br.fill(feed, self.bps)?;
        let sample = br.read_signed(self.bps) as i32;
        if let Some(buf) = out {
            buf[..block_size as usize].fill(sample);
        }
        Ok(())
    }

    fn decode_verbatim(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        mut out: Option<&mut [i32]>,
        block_size: u32,
    ) -> Result<()> {
        while self.pos < block_size {
            br.fill(feed, self.bps)?;
            let sample = br.read_signed(self.bps) as i32;
            if let Some(buf) = out.as_deref_mut() {
                buf[self.pos as usize] = sample;
            }
            self.pos += 1;
        }
        Ok(())
    }

    /// Reads `order` warmup samples at the effective bps, leaving `pos` at
    /// the first predicted sample.
    fn decode_warmup(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        mut out: Option<&mut [i32]>,
        order: u32,
    ) -> Result<()> {
        while self.pos < order {
            br.fill(feed, self.bps)?;
            let sample = br.read_signed(self.bps) as i32;
            if let Some(buf) = out.as_deref_mut() {
                buf[self.pos as usize] = sample;
            }
            self.pos += 1;
        }
        Ok(())
    }

    fn decode_fixed(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        mut out: Option<&mut [i32]>,
        block_size: u32,
    ) -> Result<()> {
        let order = self.header.order;
        self.decode_warmup(br, feed, out.as_deref_mut(), order)?;
        self.residual.decode(br, feed, &mut self.pos, block_size, order, out.as_deref_mut())?;

        if let Some(buf) = out {
            fixed_predict(order, &mut buf[..block_size as usize]);
        }
        Ok(())
    }

    fn decode_lpc(
        &mut self,
        br: &mut BitReader,
        feed: &mut Feed<'_>,
        mut out: Option<&mut [i32]>,
        block_size: u32,
    ) -> Result<()> {
        let order = self.header.order;
        self.decode_warmup(br, feed, out.as_deref_mut(), order)?;

        if self.lpc_stage == LpcStage::Precision {
            br.fill(feed, 4)?;
            self.precision = br.read(4) as u32 + 1;
            self.lpc_stage = LpcStage::Shift;
        }

        if self.lpc_stage == LpcStage::Shift {
            // The coefficient shift is nominally signed; negative values
            // clamp to zero.
            br.fill(feed, 5)?;
            let shift = br.read_signed(5);
            self.shift = if shift < 0 { 0 } else { shift as u32 };
            self.lpc_stage = LpcStage::Coeffs;
        }

        while self.next_coeff < order {
            br.fill(feed, self.precision)?;
            self.coeffs[self.next_coeff as usize] = br.read_signed(self.precision) as i32;
            self.next_coeff += 1;
        }

        self.residual.decode(br, feed, &mut self.pos, block_size, order, out.as_deref_mut())?;

        if let Some(buf) = out {
            let buf = &mut buf[..block_size as usize];
            for i in order as usize..buf.len() {
                let mut prediction = 0i64;
                for (j, &coeff) in self.coeffs[..order as usize].iter().enumerate() {
                    prediction += i64::from(coeff) * i64::from(buf[i - j - 1]);
                }
                buf[i] = ((prediction >> self.shift) + i64::from(buf[i])) as i32;
            }
        }
        Ok(())
    }
}

/// Runs the fixed predictor of the given order over the buffer in place,
/// adding the predicted value to each stored residual. Intermediates are
/// 64-bit; high sample widths overflow 32 bits readily.
fn fixed_predict(order: u32, buf: &mut [i32]) {
    match order {
        // A 0th order predictor predicts 0; the residuals are the samples.
        0 => (),
        1 => {
            for i in 1..buf.len() {
                let prediction = i64::from(buf[i - 1]);
                buf[i] = (prediction + i64::from(buf[i])) as i32;
            }
        }
        2 => {
            for i in 2..buf.len() {
                let prediction = 2 * i64::from(buf[i - 1]) - i64::from(buf[i - 2]);
                buf[i] = (prediction + i64::from(buf[i])) as i32;
            }
        }
        3 => {
            for i in 3..buf.len() {
                let prediction = 3 * i64::from(buf[i - 1]) - 3 * i64::from(buf[i - 2])
                    + i64::from(buf[i - 3]);
                buf[i] = (prediction + i64::from(buf[i])) as i32;
            }
        }
        4 => {
            for i in 4..buf.len() {
                let prediction = 4 * i64::from(buf[i - 1]) - 6 * i64::from(buf[i - 2])
                    + 4 * i64::from(buf[i - 3])
                    - i64::from(buf[i - 4]);
                buf[i] = (prediction + i64::from(buf[i])) as i32;
            }
        }
        _ => unreachable!(),
    }
}
