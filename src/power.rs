/*
 *  power.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Power-domain collaborator boundary and the durable cycle counter
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
use std::time::Duration;

use log::{debug, info, warn};

use crate::battery;

/// Power-domain control: rails, pin latching, the battery gauge, and the
/// timed low-power state itself.
#[allow(async_fn_in_trait)]
pub trait PowerControl {
    /// De-energize the rails feeding the panel and the expansion bus.
    fn rails_off(&mut self);

    /// Hold the power-control pins at their current level through the
    /// low-power state, so the rails stay deterministically off.
    fn latch(&mut self);

    /// Raw pack voltage in millivolts, if the gauge is readable.
    fn battery_millivolts(&mut self) -> Option<u32>;

    /// Timed low-power state; returns when the interval expires.
    async fn sleep(&mut self, duration: Duration);
}

/// Hosted power control: rails and latches are log-only, the low-power
/// state is a timed task sleep, and the gauge reads sysfs.
pub struct HostPower;

impl PowerControl for HostPower {
    fn rails_off(&mut self) {
        info!("panel and expansion rails de-energized");
    }

    fn latch(&mut self) {
        debug!("power-control pins latched");
    }

    fn battery_millivolts(&mut self) -> Option<u32> {
        match battery::read_millivolts() {
            Ok(mv) => Some(mv),
            Err(e) => {
                warn!("battery gauge unreadable: {}", e);
                None
            }
        }
    }

    async fn sleep(&mut self, duration: Duration) {
        info!("entering low-power state for {:?}", duration);
        tokio::time::sleep(duration).await;
    }
}

/// The one value that survives sleep: the wake-cycle counter. Explicit
/// load/store against a retained region, not an in-memory variable.
pub trait CycleStore {
    /// Counter value, or zero on the first boot after power loss.
    fn load(&mut self) -> u32;

    fn store(&mut self, cycles: u32);
}

/// Counter kept as a one-integer text file in a retained tmpfs region:
/// survives process sleep, resets on full power loss.
pub struct ShmCycleStore {
    path: PathBuf,
}

impl ShmCycleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CycleStore for ShmCycleStore {
    fn load(&mut self) -> u32 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    fn store(&mut self, cycles: u32) {
        if let Err(e) = fs::write(&self.path, cycles.to_string()) {
            warn!("cycle counter not persisted: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> ShmCycleStore {
        let path = std::env::temp_dir().join(format!(
            "paperframe-test-{}-{}",
            std::process::id(),
            name
        ));
        fs::remove_file(&path).ok();
        ShmCycleStore::new(path)
    }

    #[test]
    fn test_first_boot_loads_zero() {
        let mut store = temp_store("fresh");
        assert_eq!(store.load(), 0);
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let mut store = temp_store("roundtrip");
        store.store(41);
        assert_eq!(store.load(), 41);
        store.store(42);
        assert_eq!(store.load(), 42);
        fs::remove_file(&store.path).ok();
    }

    #[test]
    fn test_garbage_content_resets_to_zero() {
        let mut store = temp_store("garbage");
        fs::write(&store.path, "not a number").unwrap();
        assert_eq!(store.load(), 0);
        fs::remove_file(&store.path).ok();
    }
}
