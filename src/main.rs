//! Host simulation of the event framework.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  StaticStack   SystemClock   SimWatchdog  (adapters) │
//! │  ──────────────── Port Trait Boundary ─────────────  │
//! │  Framework ─▶ Scheduler ─▶ run loop ─▶ SimApp        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Declares one global, one per-network and one per-endpoint event, then
//! ticks for a few seconds.  Run with `RUST_LOG=debug` to see dispatches.

#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::info;

use af_events::adapters::stack::StaticStack;
use af_events::adapters::time::SystemClock;
use af_events::adapters::watchdog::SimWatchdog;
use af_events::app::ports::Application;
use af_events::config::SchedulerConfig;
use af_events::error::or_halt;
use af_events::{EventControl, EventId, Fault, Fired, Framework, Handler, Registry};

const RUN_FOR_MS: u64 = 3_000;

// ── Simulated application ─────────────────────────────────────

#[derive(Default)]
struct SimApp {
    heartbeat: Option<EventId>,
    rejoin: Option<EventId>,
    report: Option<EventId>,
    beats: u32,
}

fn on_heartbeat(app: &mut SimApp, events: &dyn EventControl, fired: Fired) -> af_events::Result<()> {
    app.beats += 1;
    info!("Heartbeat #{}", app.beats);
    if app.beats % 4 == 0 {
        if let Some(rejoin) = app.rejoin {
            events.activate(rejoin, None)?;
        }
    }
    events.arm_after(fired.event, None, 500)
}

fn on_rejoin(_: &mut SimApp, events: &dyn EventControl, fired: Fired) -> af_events::Result<()> {
    info!(
        "Rejoin check on network {:?} (current {})",
        fired.network,
        events.current_network()?
    );
    Ok(())
}

fn on_report(app: &mut SimApp, events: &dyn EventControl, endpoint: u8) -> af_events::Result<()> {
    info!("Report from endpoint {}", endpoint);
    let report = app.report.ok_or(Fault::UnknownEvent)?;
    events.arm_after(report, Some(endpoint), 750 + u32::from(endpoint) * 100)
}

impl Application for SimApp {
    fn register(&mut self, events: &dyn Registry<Self>) -> af_events::Result<()> {
        self.heartbeat = Some(events.register("heartbeat", Handler::Plain(on_heartbeat), None, None)?);
        self.rejoin = Some(events.register_network("rejoin", on_rejoin)?);
        self.report = Some(events.register_endpoint("report", on_report)?);
        Ok(())
    }

    fn init(&mut self, events: &dyn EventControl) -> af_events::Result<()> {
        let heartbeat = self.heartbeat.ok_or(Fault::UnknownEvent)?;
        let report = self.report.ok_or(Fault::UnknownEvent)?;
        events.activate(heartbeat, None)?;
        for endpoint in [1, 2, 3] {
            events.arm_after(report, Some(endpoint), 250)?;
        }
        Ok(())
    }
}

// ── Entry point ───────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("af-sim v{}", env!("CARGO_PKG_VERSION"));

    let config = SchedulerConfig {
        supported_networks: 2,
        ..SchedulerConfig::default()
    };
    let stack = StaticStack::new()
        .with_endpoint(1, 0)
        .with_endpoint(2, 0)
        .with_endpoint(3, 1);
    let tick = u64::from(config.tick_interval_ms);
    let framework = Framework::new(config, stack, SystemClock::new(), SimWatchdog::new())?;

    let mut app = SimApp::default();
    framework.init(&mut app)?;
    info!("System ready. Entering event loop.");

    let mut elapsed = 0;
    while elapsed < RUN_FOR_MS {
        // A handler fault is a defect: halt like the firmware would.
        or_halt(framework.tick(&mut app));
        let nap = u64::from(framework.sleep_budget_ms()?).clamp(1, tick);
        std::thread::sleep(Duration::from_millis(nap));
        elapsed += nap;
    }

    info!(
        "Done: {} ticks, {} heartbeats, {} watchdog feeds",
        framework.tick_count(),
        app.beats,
        framework.watchdog().feeds()
    );
    Ok(())
}
