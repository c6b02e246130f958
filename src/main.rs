/*
 *  main.rs
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

use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use log::info;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use paperframe::config::Config;
use paperframe::display::EmulatorSink;
use paperframe::net::HostLink;
use paperframe::power::{HostPower, ShmCycleStore};
use paperframe::scheduler::Scheduler;
use paperframe::timesync::HttpTimeSource;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM, or SIGHUP so the bench process can be
/// stopped cleanly mid-sleep.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Battery e-paper picture frame node")
        .arg(Arg::new("debug")
        .action(ArgAction::SetTrue)
        .long("debug")
        .short('v')
        .alias("verbose")
        .help("Enable debug log level")
        .required(false))
        .arg(Arg::new("once")
        .action(ArgAction::SetTrue)
        .long("once")
        .help("Run a single wake cycle and exit (bench use)")
        .required(false))
        .get_matches();

    let debug_enabled = matches.get_flag("debug");
    let once = matches.get_flag("once");

    env_logger::Builder::from_env(Env::default().default_filter_or(if debug_enabled {"debug"} else {"info"}))
        .format_timestamp_secs()
        .init();

    info!("{} v{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let cfg = Config::default();
    cfg.validate()?;
    info!(
        "image {} ({}x{}, {} bands of {} rows)",
        cfg.image_url,
        cfg.geometry.width,
        cfg.geometry.height,
        cfg.geometry.expected_bands(),
        cfg.geometry.band_height
    );

    let sink = EmulatorSink::new(cfg.geometry.width, cfg.geometry.height, &cfg.frame_out_path);
    let time = HttpTimeSource::new(&cfg.time_url, cfg.utc_offset_hours);
    let store = ShmCycleStore::new(&cfg.cycle_counter_path);
    let mut sched = Scheduler::new(cfg, HostLink, HostPower, store, time, sink);

    tokio::select! {
        _ = signal_handler() => {
            // fall through to exit; the panel keeps its last frame
        }
        _ = async {
            loop {
                let duration = sched.run_cycle().await;
                if once {
                    info!("single cycle complete");
                    break;
                }
                sched.enter_low_power(duration).await;
            }
        } => {
            info!("cycle loop ended");
        }
    }

    info!("exiting");
    Ok(())
}
