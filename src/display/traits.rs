/*
 *  display/traits.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Core trait definition for the panel-facing sink boundary
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

use crate::display::error::DisplayError;

/// Panel-facing boundary of the frame pipeline.
///
/// The sink owns the physical refresh protocol and its timing; the rest of
/// the crate only ever hands it packed 4bpp bands, a status string, and the
/// final present command. Implementations decide whether bands land in an
/// intermediate framebuffer or go straight to the controller.
pub trait DisplaySink: Send {
    /// Accept one complete band of `rows` rows, destined for row
    /// `dest_row` of the panel. `band` is packed two pixels per byte.
    fn push_band(&mut self, band: &[u8], dest_row: u32, rows: u32) -> Result<(), DisplayError>;

    /// Deep-clear the physical panel to amortize partial-refresh ghosting.
    ///
    /// This touches the glass only: band data already staged for the next
    /// present must survive the clear.
    fn clear_panel(&mut self) -> Result<(), DisplayError>;

    /// Draw the status label (battery state) over the staged frame.
    fn overlay(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Perform the physical refresh with everything staged so far.
    fn present(&mut self) -> Result<(), DisplayError>;
}
