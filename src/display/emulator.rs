/*
 *  display/emulator.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Bench sink: assembles bands into a frame and drops a PGM on present
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

use std::fs;
use std::path::PathBuf;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::pixelcolor::Gray4;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use log::{debug, info};

use crate::display::error::DisplayError;
use crate::display::frame::Frame4;
use crate::display::traits::DisplaySink;

/// Stand-in for the panel on a development host: behaves like the real
/// sink (full-frame staging, overlay, present) but the "refresh" writes a
/// PGM file instead of driving glass.
pub struct EmulatorSink {
    frame: Frame4,
    out_path: PathBuf,
}

impl EmulatorSink {
    pub fn new(width: u32, height: u32, out_path: impl Into<PathBuf>) -> Self {
        Self {
            frame: Frame4::new(width, height),
            out_path: out_path.into(),
        }
    }

    /// Read-only view of the staged frame (bench asserts)
    pub fn frame(&self) -> &Frame4 {
        &self.frame
    }
}

impl DisplaySink for EmulatorSink {
    fn push_band(&mut self, band: &[u8], dest_row: u32, rows: u32) -> Result<(), DisplayError> {
        debug!("band staged at row {} ({} rows)", dest_row, rows);
        self.frame.blit_rows(band, dest_row, rows)
    }

    fn clear_panel(&mut self) -> Result<(), DisplayError> {
        // glass-only operation; the staged frame must survive
        info!("panel deep clear");
        Ok(())
    }

    fn overlay(&mut self, text: &str) -> Result<(), DisplayError> {
        let style = MonoTextStyle::new(&FONT_10X20, Gray4::BLACK);
        let text_w = text.len() as i32 * 10;
        let origin = Point::new(
            self.frame.width() as i32 - text_w - 8,
            self.frame.height() as i32 - 8,
        );
        // white chip behind the label keeps it readable over the image
        Rectangle::new(
            Point::new(origin.x - 4, origin.y - 18),
            Size::new(text_w as u32 + 8, 24),
        )
        .into_styled(PrimitiveStyle::with_fill(Gray4::WHITE))
        .draw(&mut self.frame)
        .ok();
        Text::new(text, origin, style).draw(&mut self.frame).ok();
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        fs::write(&self.out_path, self.frame.to_pgm())?;
        info!("frame presented to {}", self.out_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_out(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("paperframe-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_present_writes_pgm() {
        let out = temp_out("present.pgm");
        let mut sink = EmulatorSink::new(8, 4, &out);
        sink.push_band(&[0x11; 8], 0, 2).unwrap();
        sink.present().unwrap();
        let written = fs::read(&out).unwrap();
        assert!(written.starts_with(b"P5\n8 4\n255\n"));
        fs::remove_file(&out).ok();
    }

    #[test]
    fn test_clear_panel_keeps_staged_frame() {
        let out = temp_out("clear.pgm");
        let mut sink = EmulatorSink::new(8, 4, &out);
        sink.push_band(&[0xFF; 8], 2, 2).unwrap();
        sink.clear_panel().unwrap();
        assert_eq!(&sink.frame().as_slice()[8..16], &[0xFF; 8]);
    }

    #[test]
    fn test_overlay_inks_the_corner() {
        let out = temp_out("overlay.pgm");
        let mut sink = EmulatorSink::new(120, 40, &out);
        sink.overlay("1%").unwrap();
        // something must have been drawn near the bottom-right corner
        let frame = sink.frame();
        let inked = frame
            .as_slice()
            .iter()
            .skip(frame.row_bytes() * 20)
            .any(|&b| b != 0);
        assert!(inked);
    }
}
