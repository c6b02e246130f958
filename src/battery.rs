/*
 *  battery.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Pack voltage to display percentage, plus the sysfs probe used on a
 *  hosted bench
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
use std::io;

/// Maps a raw pack voltage to the percentage shown on the frame.
///
/// Stateless: recomputed from the raw reading every cycle, never cached.
#[derive(Debug, Clone, Copy)]
pub struct BatteryGauge {
    min_mv: u32,
    max_mv: u32,
}

impl BatteryGauge {
    pub const fn new(min_mv: u32, max_mv: u32) -> Self {
        Self { min_mv, max_mv }
    }

    /// Clamp into the measured voltage window, normalize, and round.
    /// The rate floor keeps the display at 1% even at the bottom of the
    /// window - a frame that still wakes is not at 0%.
    pub fn percent(&self, raw_mv: u32) -> u8 {
        let clamped = raw_mv.clamp(self.min_mv, self.max_mv);
        let rate = (clamped - self.min_mv) as f32 / (self.max_mv - self.min_mv) as f32;
        let rate = rate.clamp(0.01, 1.0);
        (rate * 100.0).round() as u8
    }

    /// Fixed-precision status label for the overlay.
    pub fn label(&self, raw_mv: u32) -> String {
        format!("{}% {:.2}V", self.percent(raw_mv), raw_mv as f32 / 1000.0)
    }
}

/// Raw pack voltage in millivolts from the first power-supply node that
/// exposes one. `voltage_now` is microvolts on Linux.
pub fn read_millivolts() -> io::Result<u32> {
    for entry in fs::read_dir("/sys/class/power_supply")? {
        let path = entry?.path().join("voltage_now");
        if !path.exists() {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        let microvolts: u64 = content
            .trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        return Ok((microvolts / 1000) as u32);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "no power supply exposes voltage_now",
    ))
}
