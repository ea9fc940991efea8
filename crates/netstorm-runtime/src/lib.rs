//! Side-effecting half of netstorm.
//!
//! This crate provides:
//! - [`executor`]: applies rule directives one at a time through a [`executor::RuleBackend`]
//!   (iptables or dry run).
//! - [`structured_log`]: NDJSON sink for storm log records.
//! - [`diagnostics`]: verbosity-gated human output on stderr.
//! - [`graphics`]: text gauges of current drop rates.
//! - [`cycle`]: one tick of work (reconcile, log, execute).
//! - [`scheduler`]: fixed-interval wake-ups with the idle/busy overlap guard.

#![forbid(unsafe_code)]

pub mod cycle;
pub mod diagnostics;
pub mod executor;
pub mod graphics;
pub mod scheduler;
pub mod structured_log;

pub use cycle::{Cycle, CycleError, CycleReport, StormCycle};
pub use diagnostics::{Diagnostics, Verbosity};
pub use executor::{
    BackendError, CommandExecutor, DryRunBackend, ExecutionError, IptablesBackend, RuleBackend,
};
pub use scheduler::{RunSummary, Scheduler, SchedulerConfig, SchedulerError, TickDecision, WakeupGuard};
pub use structured_log::RecordEmitter;
