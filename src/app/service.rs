//! Framework service: start-up and per-tick entry points.
//!
//! [`Framework`] owns the [`Scheduler`] and the watchdog.  It exposes the
//! two calls the platform main loop makes: [`init`](Framework::init) once
//! at start-up and [`tick`](Framework::tick) on every pass.  All I/O flows
//! through the port traits, so the whole service runs against mocks.
//!
//! ```text
//!  StackPort ──▶ ┌──────────────────────────┐
//!      Clock ──▶ │        Framework         │ ──▶ Application handlers
//!   Watchdog ◀── │  Scheduler · run loop    │
//!                └──────────────────────────┘
//! ```

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::{Fault, Result};
use crate::scheduler::{EventControl, Scheduler};

use super::ports::{Application, Clock, StackPort, Watchdog};

// ───────────────────────────────────────────────────────────────
// Framework
// ───────────────────────────────────────────────────────────────

/// Hosts one [`Application`] on top of the event scheduler.
pub struct Framework<A, S, C, W> {
    scheduler: Scheduler<A, S, C>,
    watchdog: W,
    started: AtomicBool,
    initialized: AtomicBool,
    tick_count: AtomicU64,
}

impl<A, S, C, W> Framework<A, S, C, W>
where
    A: Application,
    S: StackPort,
    C: Clock,
    W: Watchdog,
{
    /// Create the scheduler with an empty run queue.
    ///
    /// Does **not** register anything; call [`init`](Self::init) next.
    pub fn new(config: SchedulerConfig, stack: S, clock: C, watchdog: W) -> Result<Self> {
        let scheduler = Scheduler::new(config, stack, clock)?;
        Ok(Self {
            scheduler,
            watchdog,
            started: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            tick_count: AtomicU64::new(0),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Declare the application's events, then run its start-up hooks.
    ///
    /// Runs at most once.  If any hook fails the framework stays
    /// uninitialised and `tick` keeps returning `NotInitialized`; the
    /// caller is expected to `halt` on the returned fault.
    pub fn init(&self, app: &mut A) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("Framework: init called twice");
            return Err(Fault::AlreadyInitialized);
        }
        app.register(&self.scheduler)?;
        app.init(&self.scheduler)?;
        app.init_done(&self.scheduler)?;
        self.initialized.store(true, Ordering::Release);
        info!(
            "Framework: initialised with {} event(s)",
            self.scheduler.event_count()?
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One pass: feed the watchdog, tick the application, run due events.
    /// Returns how many event handlers ran.
    pub fn tick(&self, app: &mut A) -> Result<usize> {
        if !self.is_initialized() {
            return Err(Fault::NotInitialized);
        }
        let tick = self.tick_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.watchdog.feed();
        app.tick(&self.scheduler)?;
        let ran = self.scheduler.run_due_events(app)?;
        if ran > 0 {
            debug!("Framework: tick {} ran {} event(s)", tick, ran);
        }
        Ok(ran)
    }

    /// How long the platform may sleep before the next tick is needed.
    pub fn sleep_budget_ms(&self) -> Result<u32> {
        let max = self.scheduler.config().max_sleep_ms;
        Ok(self
            .scheduler
            .time_to_next_event()?
            .map_or(max, |ms| ms.min(max)))
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn scheduler(&self) -> &Scheduler<A, S, C> {
        &self.scheduler
    }

    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }
}
