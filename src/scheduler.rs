/*
 *  scheduler.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Power/retry scheduler: one wake cycle as an explicit state machine
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

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::band::{BandBuffer, TransferOutcome};
use crate::battery::BatteryGauge;
use crate::config::Config;
use crate::display::DisplaySink;
use crate::fetch::FetchClient;
use crate::net::NetworkLink;
use crate::power::{CycleStore, PowerControl};
use crate::timesync::TimeSource;

/// States of one wake cycle. Every cycle runs Boot to Sleeping and the
/// device restarts cold from Boot when the low-power state expires; the
/// cycle counter is the only value that crosses that edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Boot,
    Associating,
    Fetching,
    Rendering,
    Sleeping(Duration),
}

/// Everything a cycle can end with, collapsed to what the sleep rule
/// needs to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    AssociationFailure,
    Transfer(TransferOutcome),
}

/// The single sleep rule: only a verified transfer earns the long sleep,
/// every failure of any kind gets the short retry interval. The device
/// never busy-retries; it always powers down between attempts.
pub fn sleep_after(outcome: CycleOutcome, cfg: &Config) -> Duration {
    match outcome {
        CycleOutcome::Transfer(t) if t.is_success() => cfg.sleep_normal,
        _ => cfg.sleep_retry,
    }
}

/// True when a once-every-`every`-cycles task is due this cycle.
fn due(cycles: u32, every: u32) -> bool {
    every > 0 && cycles % every == 0
}

/// Drives the collaborators through one wake cycle at a time.
pub struct Scheduler<L, P, C, T, S>
where
    L: NetworkLink,
    P: PowerControl,
    C: CycleStore,
    T: TimeSource,
    S: DisplaySink,
{
    cfg: Config,
    fetch: FetchClient,
    gauge: BatteryGauge,
    link: L,
    power: P,
    store: C,
    time: T,
    sink: S,
}

impl<L, P, C, T, S> Scheduler<L, P, C, T, S>
where
    L: NetworkLink,
    P: PowerControl,
    C: CycleStore,
    T: TimeSource,
    S: DisplaySink,
{
    pub fn new(cfg: Config, link: L, power: P, store: C, time: T, sink: S) -> Self {
        let fetch = FetchClient::new(cfg.http_connect_timeout, cfg.http_read_timeout);
        let gauge = BatteryGauge::new(cfg.batt_min_mv, cfg.batt_max_mv);
        Self { cfg, fetch, gauge, link, power, store, time, sink }
    }

    /// Run one full cycle and return the chosen sleep duration. Never
    /// fails at the device level: every error path is a short-retry
    /// sleep, reported through the log only.
    pub async fn run_cycle(&mut self) -> Duration {
        let cycles = self.store.load();
        let mut buf = BandBuffer::new(self.cfg.geometry.band_bytes());

        // overwritten on every path that reaches Sleeping via a fetch
        let mut outcome = CycleOutcome::AssociationFailure;

        let mut state = CycleState::Boot;
        loop {
            debug!("state: {:?}", state);
            state = match state {
                CycleState::Boot => {
                    info!("cycle {} starting", cycles);
                    CycleState::Associating
                }

                CycleState::Associating => {
                    if self.associate().await {
                        CycleState::Fetching
                    } else {
                        outcome = CycleOutcome::AssociationFailure;
                        CycleState::Sleeping(sleep_after(outcome, &self.cfg))
                    }
                }

                CycleState::Fetching => {
                    if due(cycles, self.cfg.time_sync_every) {
                        self.recalibrate().await;
                    }
                    let t = self
                        .fetch
                        .fetch_image(
                            &self.cfg.image_url,
                            self.cfg.geometry,
                            &mut buf,
                            &mut self.sink,
                        )
                        .await;
                    info!("transfer: {}", t);
                    outcome = CycleOutcome::Transfer(t);
                    if t.is_success() {
                        CycleState::Rendering
                    } else {
                        CycleState::Sleeping(sleep_after(outcome, &self.cfg))
                    }
                }

                CycleState::Rendering => {
                    self.render(cycles).await;
                    CycleState::Sleeping(sleep_after(outcome, &self.cfg))
                }

                CycleState::Sleeping(duration) => {
                    self.power_down(cycles);
                    info!("cycle {} done, sleeping {:?}", cycles, duration);
                    return duration;
                }
            };
        }
    }

    /// The timed low-power state between cycles.
    pub async fn enter_low_power(&mut self, duration: Duration) {
        self.power.sleep(duration).await;
    }

    /// Bounded association poll. Exhausting the retry bound fails the
    /// cycle without touching the fetch path.
    async fn associate(&mut self) -> bool {
        for attempt in 1..=self.cfg.assoc_max_attempts {
            if self.link.connect() {
                debug!("network associated (attempt {})", attempt);
                return true;
            }
            tokio::time::sleep(self.cfg.assoc_poll).await;
        }
        error!(
            "association failed after {} attempts",
            self.cfg.assoc_max_attempts
        );
        false
    }

    /// Best-effort time-base recalibration; a failure must not cost the
    /// cycle anything but a log line.
    async fn recalibrate(&mut self) {
        match self.time.sync().await {
            Ok(now) => info!(
                "time base recalibrated: {}",
                now.format("%Y-%m-%d %H:%M:%S %z")
            ),
            Err(e) => warn!("time sync skipped: {}", e),
        }
    }

    async fn render(&mut self, cycles: u32) {
        if due(cycles, self.cfg.full_clear_every) {
            if let Err(e) = self.sink.clear_panel() {
                warn!("panel clear failed: {}", e);
            }
        }
        match self.power.battery_millivolts() {
            Some(mv) => {
                let label = self.gauge.label(mv);
                debug!("battery: {}", label);
                if let Err(e) = self.sink.overlay(&label) {
                    warn!("battery overlay failed: {}", e);
                }
            }
            None => warn!("battery reading unavailable, overlay skipped"),
        }
        if let Err(e) = self.sink.present() {
            error!("panel refresh failed: {}", e);
        }
        // the panel needs its settle time before the rails can safely drop
        tokio::time::sleep(self.cfg.panel_settle).await;
    }

    /// Power-down sequencing shared by every exit path.
    fn power_down(&mut self, cycles: u32) {
        if self.link.is_up() {
            self.link.disconnect();
        }
        self.power.rails_off();
        self.power.latch();
        self.store.store(cycles.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayError;
    use crate::timesync::TimeSyncError;
    use chrono::{DateTime, FixedOffset};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    fn test_config() -> Config {
        let mut cfg = Config::default();
        cfg.assoc_max_attempts = 3;
        cfg.assoc_poll = Duration::from_millis(1);
        cfg.panel_settle = Duration::from_millis(0);
        cfg.http_connect_timeout = Duration::from_secs(1);
        cfg.http_read_timeout = Duration::from_secs(1);
        // nothing listens on the discard port of localhost
        cfg.image_url = "http://127.0.0.1:9/raw4".to_string();
        cfg
    }

    struct DownLink;
    impl NetworkLink for DownLink {
        fn connect(&mut self) -> bool { false }
        fn is_up(&self) -> bool { false }
        fn disconnect(&mut self) {}
    }

    struct UpLink;
    impl NetworkLink for UpLink {
        fn connect(&mut self) -> bool { true }
        fn is_up(&self) -> bool { true }
        fn disconnect(&mut self) {}
    }

    struct MockPower;
    impl PowerControl for MockPower {
        fn rails_off(&mut self) {}
        fn latch(&mut self) {}
        fn battery_millivolts(&mut self) -> Option<u32> { Some(3775) }
        async fn sleep(&mut self, _duration: Duration) {}
    }

    struct MemStore {
        cell: Arc<AtomicU32>,
    }
    impl CycleStore for MemStore {
        fn load(&mut self) -> u32 {
            self.cell.load(Ordering::SeqCst)
        }
        fn store(&mut self, cycles: u32) {
            self.cell.store(cycles, Ordering::SeqCst);
        }
    }

    struct StubTime {
        called: Arc<AtomicBool>,
    }
    impl TimeSource for StubTime {
        async fn sync(&mut self) -> Result<DateTime<FixedOffset>, TimeSyncError> {
            self.called.store(true, Ordering::SeqCst);
            Err(TimeSyncError::MissingDate)
        }
    }

    struct CountingSink {
        pushes: Arc<AtomicU32>,
    }
    impl DisplaySink for CountingSink {
        fn push_band(&mut self, _band: &[u8], _dest_row: u32, _rows: u32) -> Result<(), DisplayError> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn clear_panel(&mut self) -> Result<(), DisplayError> { Ok(()) }
        fn overlay(&mut self, _text: &str) -> Result<(), DisplayError> { Ok(()) }
        fn present(&mut self) -> Result<(), DisplayError> { Ok(()) }
    }

    #[test]
    fn test_only_success_earns_the_long_sleep() {
        let cfg = Config::default();
        let failures = [
            CycleOutcome::AssociationFailure,
            CycleOutcome::Transfer(TransferOutcome::Truncated(3)),
            CycleOutcome::Transfer(TransferOutcome::Oversized(48)),
            CycleOutcome::Transfer(TransferOutcome::HttpError(500)),
            CycleOutcome::Transfer(TransferOutcome::HttpError(0)),
            CycleOutcome::Transfer(TransferOutcome::Timeout),
        ];
        for outcome in failures {
            assert_eq!(sleep_after(outcome, &cfg), cfg.sleep_retry, "{:?}", outcome);
        }
        assert_eq!(
            sleep_after(CycleOutcome::Transfer(TransferOutcome::Success(48)), &cfg),
            cfg.sleep_normal
        );
    }

    #[test]
    fn test_cadence_gate() {
        assert!(due(0, 12));
        assert!(!due(1, 12));
        assert!(due(12, 12));
        assert!(due(24, 12));
        // zero cadence disables the task entirely
        assert!(!due(0, 0));
    }

    #[tokio::test]
    async fn test_association_exhaustion_sleeps_short_and_skips_fetch() {
        let pushes = Arc::new(AtomicU32::new(0));
        let cell = Arc::new(AtomicU32::new(0));
        let cfg = test_config();
        let retry = cfg.sleep_retry;
        let mut sched = Scheduler::new(
            cfg,
            DownLink,
            MockPower,
            MemStore { cell: cell.clone() },
            StubTime { called: Arc::new(AtomicBool::new(false)) },
            CountingSink { pushes: pushes.clone() },
        );

        let duration = sched.run_cycle().await;

        assert_eq!(duration, retry);
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
        // the cycle still counts, even when it failed
        assert_eq!(cell.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_sleeps_short_after_time_sync() {
        let pushes = Arc::new(AtomicU32::new(0));
        let cell = Arc::new(AtomicU32::new(0));
        let synced = Arc::new(AtomicBool::new(false));
        let cfg = test_config();
        let retry = cfg.sleep_retry;
        let mut sched = Scheduler::new(
            cfg,
            UpLink,
            MockPower,
            MemStore { cell: cell.clone() },
            StubTime { called: synced.clone() },
            CountingSink { pushes: pushes.clone() },
        );

        let duration = sched.run_cycle().await;

        assert_eq!(duration, retry);
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
        // cycle 0 is a recalibration cycle, and its failure is non-fatal
        assert!(synced.load(Ordering::SeqCst));
        assert_eq!(cell.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recalibration_not_due_off_cadence() {
        let cell = Arc::new(AtomicU32::new(5));
        let synced = Arc::new(AtomicBool::new(false));
        let mut sched = Scheduler::new(
            test_config(),
            UpLink,
            MockPower,
            MemStore { cell: cell.clone() },
            StubTime { called: synced.clone() },
            CountingSink { pushes: Arc::new(AtomicU32::new(0)) },
        );

        sched.run_cycle().await;

        assert!(!synced.load(Ordering::SeqCst));
        assert_eq!(cell.load(Ordering::SeqCst), 6);
    }
}
