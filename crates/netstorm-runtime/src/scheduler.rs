//! Fixed-interval wake-ups.
//!
//! The scheduler fires on a fixed wall-clock period, but a cycle's rule
//! mutations have unbounded latency. [`WakeupGuard`] is the only thing standing
//! between two ticks' directive queues: while a cycle is in flight the guard
//! is `Busy` and every tick that lands in that window is skipped whole. The
//! first skip since startup prints a warning; later skips are silent.
//!
//! Cycles run on a dedicated worker thread. The scheduler thread owns the
//! timer and the guard, hands tick timestamps to the worker over a channel,
//! and moves the guard back to `Idle` when the worker reports completion.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::cycle::{Cycle, CycleError, CycleReport};
use crate::diagnostics::Diagnostics;

/// Printed once, on the first skipped tick.
pub const OVERLAP_WARNING: &str = "\n\
the previous interval's calculation did not complete before the current interval's calculations needed to start\n\
possible causes:\n \
- your chosen interval is too short\n \
- system load too high\n \
- something causing iptables(1) to take a long time\n \
- sudo(1) waiting for user input\n\
\n\
this warning will not be issued a second time\n";

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("cycle worker exited unexpectedly")]
    WorkerLost,
    #[error("cannot start cycle worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("wake-up interval must be greater than zero")]
    InvalidInterval,
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Busy,
}

/// Outcome of a tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// The guard moved to `Busy`; run the cycle.
    Run,
    /// A cycle is still in flight. `warn` is true only for the first skip.
    Skip { warn: bool },
}

#[derive(Debug)]
struct GuardState {
    phase: Phase,
    warned: bool,
}

/// Idle/busy state machine shared between the timer and its observers.
#[derive(Debug, Clone)]
pub struct WakeupGuard {
    inner: Arc<Mutex<GuardState>>,
}

impl Default for WakeupGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeupGuard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(GuardState {
                phase: Phase::Idle,
                warned: false,
            })),
        }
    }

    /// Called at every tick boundary.
    pub fn try_begin(&self) -> TickDecision {
        let mut state = self.inner.lock();
        match state.phase {
            Phase::Idle => {
                state.phase = Phase::Busy;
                TickDecision::Run
            }
            Phase::Busy => {
                let warn = !state.warned;
                state.warned = true;
                TickDecision::Skip { warn }
            }
        }
    }

    /// Called when the in-flight cycle completed successfully.
    pub fn finish(&self) {
        self.inner.lock().phase = Phase::Idle;
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Stop after this many tick boundaries (run or skipped). `None` runs until
    /// a fatal error.
    pub max_ticks: Option<u64>,
}

impl SchedulerConfig {
    #[must_use]
    pub fn every_ms(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            max_ticks: None,
        }
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub cycles: u64,
    pub skipped: u64,
    pub warnings: u64,
}

#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    guard: WakeupGuard,
    diag: Diagnostics,
}

type Completion = Result<CycleReport, CycleError>;

impl Scheduler {
    pub fn new(config: SchedulerConfig, diag: Diagnostics) -> Result<Self, SchedulerError> {
        if config.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }
        Ok(Self {
            config,
            guard: WakeupGuard::new(),
            diag,
        })
    }

    #[must_use]
    pub fn guard(&self) -> &WakeupGuard {
        &self.guard
    }

    /// Drive `cycle` until `max_ticks` is reached or a cycle fails.
    ///
    /// A failed cycle is returned immediately; the guard stays `Busy` and no
    /// further tick is started.
    pub fn run<C: Cycle>(&self, mut cycle: C) -> Result<RunSummary, SchedulerError> {
        let (job_tx, job_rx) = mpsc::channel::<u64>();
        let (done_tx, done_rx) = mpsc::channel::<Completion>();

        let worker = thread::Builder::new()
            .name("netstorm-cycle".to_string())
            .spawn(move || {
                for t_ms in job_rx {
                    let result = cycle.run_cycle(t_ms);
                    let failed = result.is_err();
                    if done_tx.send(result).is_err() || failed {
                        break;
                    }
                }
            })?;

        self.diag.verbose("starting...");
        let mut summary = RunSummary::default();
        let mut deadline = Instant::now();

        loop {
            deadline += self.config.interval;
            self.wait_until(deadline, &done_rx, &mut summary)?;

            summary.ticks += 1;
            match self.guard.try_begin() {
                TickDecision::Run => {
                    self.diag.verbose("woke up");
                    if job_tx.send(now_ms()).is_err() {
                        return Err(SchedulerError::WorkerLost);
                    }
                }
                TickDecision::Skip { warn } => {
                    summary.skipped += 1;
                    if warn {
                        summary.warnings += 1;
                        self.diag.warn(OVERLAP_WARNING);
                    }
                    self.diag.verbose("wake up taking too long for interval");
                }
            }

            if self.config.max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }
        }

        drop(job_tx);
        while self.guard.phase() == Phase::Busy {
            match done_rx.recv() {
                Ok(result) => self.complete(result, &mut summary)?,
                Err(_) => return Err(SchedulerError::WorkerLost),
            }
        }
        worker.join().map_err(|_| SchedulerError::WorkerLost)?;
        Ok(summary)
    }

    /// Sleep until `deadline`, handling any cycle completions that arrive.
    ///
    /// Completions already queued when the deadline passes are handled too, so
    /// a late wake-up never sees a finished cycle as still running.
    fn wait_until(
        &self,
        deadline: Instant,
        done_rx: &mpsc::Receiver<Completion>,
        summary: &mut RunSummary,
    ) -> Result<(), SchedulerError> {
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match done_rx.recv_timeout(deadline - now) {
                Ok(result) => self.complete(result, summary)?,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return Err(SchedulerError::WorkerLost),
            }
        }
        loop {
            match done_rx.try_recv() {
                Ok(result) => self.complete(result, summary)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(SchedulerError::WorkerLost),
            }
        }
    }

    fn complete(&self, result: Completion, summary: &mut RunSummary) -> Result<(), SchedulerError> {
        let report = result?;
        summary.cycles += 1;
        self.diag.debug(|| {
            format!(
                "cycle {} done: {} directives, {} records",
                summary.cycles, report.directives, report.records
            )
        });
        self.guard.finish();
        Ok(())
    }
}

/// Wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
