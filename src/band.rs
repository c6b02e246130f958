/*
 *  band.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Band buffer and stream reassembly: packs a byte stream of unknown
 *  arrival rate into fixed-size display bands
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fmt;

use log::warn;

use crate::config::Geometry;
use crate::display::{DisplayError, DisplaySink};

/// Result of one image transfer attempt. Produced once per fetch and
/// consumed immediately by the scheduler; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Stream delivered exactly the expected band count
    Success(u32),
    /// Stream closed short of the expected band count
    Truncated(u32),
    /// Stream delivered more bytes than one full image
    Oversized(u32),
    /// Non-OK response status, or transport failure before one (code 0)
    HttpError(u16),
    /// No data arrived within the configured read bound
    Timeout,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success(_))
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Success(n) => write!(f, "complete ({} bands)", n),
            TransferOutcome::Truncated(n) => write!(f, "truncated after {} bands", n),
            TransferOutcome::Oversized(n) => write!(f, "oversized ({} bands plus trailing data)", n),
            TransferOutcome::HttpError(0) => write!(f, "transport failure"),
            TransferOutcome::HttpError(code) => write!(f, "HTTP error {}", code),
            TransferOutcome::Timeout => write!(f, "read timeout"),
        }
    }
}

/// The one dynamically filled memory region of the node: holds exactly one
/// band of packed pixels while it is being reassembled.
#[derive(Debug)]
pub struct BandBuffer {
    data: Vec<u8>,
    filled: usize,
}

impl BandBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { data: vec![0u8; capacity], filled: 0 }
    }

    pub fn capacity(&self) -> usize { self.data.len() }
    pub fn filled(&self) -> usize { self.filled }

    fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    /// Copy in as much of `src` as fits; returns the number of bytes taken.
    fn fill_from(&mut self, src: &[u8]) -> usize {
        let take = src.len().min(self.data.len() - self.filled);
        self.data[self.filled..self.filled + take].copy_from_slice(&src[..take]);
        self.filled += take;
        take
    }

    fn reset(&mut self) {
        self.filled = 0;
    }

    fn as_slice(&self) -> &[u8] {
        &self.data[..self.filled]
    }
}

/// Packs incoming chunks into the band buffer and hands each completed
/// band to the sink at its fixed row offset. `finish()` is the transfer
/// verifier: band-count accounting decides the outcome.
pub struct BandAssembler<'a> {
    buf: &'a mut BandBuffer,
    geom: Geometry,
    bands_pushed: u32,
    excess_bytes: usize,
}

impl<'a> BandAssembler<'a> {
    pub fn new(buf: &'a mut BandBuffer, geom: Geometry) -> Self {
        debug_assert_eq!(buf.capacity(), geom.band_bytes());
        buf.reset();
        Self { buf, geom, bands_pushed: 0, excess_bytes: 0 }
    }

    pub fn bands_pushed(&self) -> u32 {
        self.bands_pushed
    }

    /// Consume one chunk of arbitrary size. Only the prefix that fits the
    /// buffer is taken per step; the remainder is consumed on the next
    /// step, so no byte is ever dropped or written past capacity. Once the
    /// expected band count is reached, further bytes are counted but not
    /// pushed.
    pub fn feed(&mut self, chunk: &[u8], sink: &mut dyn DisplaySink) -> Result<(), DisplayError> {
        let mut rest = chunk;
        while !rest.is_empty() {
            if self.bands_pushed >= self.geom.expected_bands() {
                self.excess_bytes += rest.len();
                return Ok(());
            }
            let taken = self.buf.fill_from(rest);
            rest = &rest[taken..];
            if self.buf.is_full() {
                let dest_row = self.bands_pushed * self.geom.band_height;
                sink.push_band(self.buf.as_slice(), dest_row, self.geom.band_height)?;
                self.bands_pushed += 1;
                self.buf.reset();
            }
        }
        Ok(())
    }

    /// Account the transfer after the stream has ended. A partially filled
    /// buffer is never pushed; it is evidence of truncation.
    pub fn finish(self) -> TransferOutcome {
        let expected = self.geom.expected_bands();
        if self.bands_pushed < expected {
            if self.buf.filled() > 0 {
                warn!("stream ended mid-band with {} leftover bytes", self.buf.filled());
            }
            TransferOutcome::Truncated(self.bands_pushed)
        } else if self.excess_bytes > 0 || self.buf.filled() > 0 {
            warn!("transfer overran the image by {} bytes", self.excess_bytes + self.buf.filled());
            TransferOutcome::Oversized(self.bands_pushed)
        } else {
            TransferOutcome::Success(self.bands_pushed)
        }
    }
}
