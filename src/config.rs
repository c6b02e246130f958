/*
 *  config.rs
 *
 *  paperframe - battery e-paper picture frame node
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

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error type for config validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
}

// The frame is a fixed installation: everything it needs to know is a
// compile-time constant. Adjust here and reflash.

/// Image endpoint serving the raw 4bpp frame.
pub const IMAGE_URL: &str = "http://192.168.0.10:5555/aqua-monitor/raw4";
/// Server consulted for the time-base recalibration (Date header).
pub const TIME_URL: &str = "http://192.168.0.10:5555/";
/// Wall-clock offset applied to network time (JST).
pub const UTC_OFFSET_HOURS: i32 = 9;

/// Panel geometry, portrait mounted.
pub const DISP_WIDTH: u32 = 540;
pub const DISP_HEIGHT: u32 = 960;
/// Rows transferred and rendered as one atomic unit.
pub const BAND_HEIGHT: u32 = 20;

/// Pack voltage window, measured on the device.
pub const BATT_MIN_MV: u32 = 3200;
pub const BATT_MAX_MV: u32 = 4350;

/// Sleep after a verified render.
pub const SLEEP_NORMAL: Duration = Duration::from_secs(30 * 60);
/// Sleep after any failed cycle.
pub const SLEEP_RETRY: Duration = Duration::from_secs(60);

/// Recalibrate the time base every Nth cycle.
pub const TIME_SYNC_EVERY: u32 = 24;
/// Deep-clear the panel every Mth cycle to amortize ghosting.
pub const FULL_CLEAR_EVERY: u32 = 12;

/// Association retry bound and poll interval.
pub const ASSOC_MAX_ATTEMPTS: u32 = 20;
pub const ASSOC_POLL: Duration = Duration::from_millis(500);

pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Server-side rendering can take a while; only a genuinely stalled
/// stream should trip this.
pub const HTTP_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Panel settle time after a refresh, before the rails may drop.
pub const PANEL_SETTLE: Duration = Duration::from_secs(2);

/// Retained region for the cycle counter: survives sleep, resets on
/// full power loss.
pub const CYCLE_COUNTER_PATH: &str = "/dev/shm/paperframe-cycles";
/// Where the bench sink drops the assembled frame.
pub const FRAME_OUT_PATH: &str = "/dev/shm/paperframe-frame.pgm";

/// Fixed image geometry. Pixels are packed two per byte, so a row is
/// `width / 2` bytes and `width` must be even.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub band_height: u32,
}

impl Geometry {
    pub const fn row_bytes(&self) -> usize {
        (self.width / 2) as usize
    }

    pub const fn band_bytes(&self) -> usize {
        self.row_bytes() * self.band_height as usize
    }

    pub const fn expected_bands(&self) -> u32 {
        self.height / self.band_height
    }

    pub const fn image_bytes(&self) -> usize {
        self.row_bytes() * self.height as usize
    }
}

/// Effective node configuration, aggregated from the constants above so
/// the rest of the crate never reaches for a bare constant.
#[derive(Debug, Clone)]
pub struct Config {
    pub image_url: String,
    pub time_url: String,
    pub utc_offset_hours: i32,
    pub geometry: Geometry,
    pub batt_min_mv: u32,
    pub batt_max_mv: u32,
    pub sleep_normal: Duration,
    pub sleep_retry: Duration,
    pub time_sync_every: u32,
    pub full_clear_every: u32,
    pub assoc_max_attempts: u32,
    pub assoc_poll: Duration,
    pub http_connect_timeout: Duration,
    pub http_read_timeout: Duration,
    pub panel_settle: Duration,
    pub cycle_counter_path: PathBuf,
    pub frame_out_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_url: IMAGE_URL.to_string(),
            time_url: TIME_URL.to_string(),
            utc_offset_hours: UTC_OFFSET_HOURS,
            geometry: Geometry {
                width: DISP_WIDTH,
                height: DISP_HEIGHT,
                band_height: BAND_HEIGHT,
            },
            batt_min_mv: BATT_MIN_MV,
            batt_max_mv: BATT_MAX_MV,
            sleep_normal: SLEEP_NORMAL,
            sleep_retry: SLEEP_RETRY,
            time_sync_every: TIME_SYNC_EVERY,
            full_clear_every: FULL_CLEAR_EVERY,
            assoc_max_attempts: ASSOC_MAX_ATTEMPTS,
            assoc_poll: ASSOC_POLL,
            http_connect_timeout: HTTP_CONNECT_TIMEOUT,
            http_read_timeout: HTTP_READ_TIMEOUT,
            panel_settle: PANEL_SETTLE,
            cycle_counter_path: PathBuf::from(CYCLE_COUNTER_PATH),
            frame_out_path: PathBuf::from(FRAME_OUT_PATH),
        }
    }
}

impl Config {
    /// Put any invariants here (geometry packing, ranges, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        if g.width == 0 || g.height == 0 {
            return Err(ConfigError::Validation("geometry must be non-zero".into()));
        }
        if g.width % 2 != 0 {
            return Err(ConfigError::Validation(
                "width must be even (two pixels per byte)".into(),
            ));
        }
        if g.band_height == 0 || g.height % g.band_height != 0 {
            return Err(ConfigError::Validation(format!(
                "height {} must be an exact multiple of band height {}",
                g.height, g.band_height
            )));
        }
        if self.batt_max_mv <= self.batt_min_mv {
            return Err(ConfigError::Validation(
                "battery voltage window is empty".into(),
            ));
        }
        if self.assoc_max_attempts == 0 {
            return Err(ConfigError::Validation(
                "association needs at least one attempt".into(),
            ));
        }
        Ok(())
    }
}
