//! One tick of work: reconcile, log, execute.

use netstorm_core::{ConfigurationError, NoiseField2D, Reconciler};
use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::executor::{CommandExecutor, ExecutionError, RuleBackend};
use crate::graphics::render_gauges;
use crate::structured_log::RecordEmitter;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("writing storm log: {0}")]
    Log(#[from] std::io::Error),
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub directives: usize,
    pub records: usize,
    pub applied: usize,
}

/// Work run by the scheduler on every tick it does not skip.
pub trait Cycle: Send + 'static {
    fn run_cycle(&mut self, t_ms: u64) -> Result<CycleReport, CycleError>;
}

/// The storm pipeline.
#[derive(Debug)]
pub struct StormCycle<N, B> {
    reconciler: Reconciler<N>,
    executor: CommandExecutor<B>,
    emitter: RecordEmitter,
    diag: Diagnostics,
    graphics: bool,
}

impl<N, B> StormCycle<N, B>
where
    N: NoiseField2D,
    B: RuleBackend,
{
    #[must_use]
    pub fn new(
        reconciler: Reconciler<N>,
        executor: CommandExecutor<B>,
        emitter: RecordEmitter,
        diag: Diagnostics,
    ) -> Self {
        Self {
            reconciler,
            executor,
            emitter,
            diag,
            graphics: false,
        }
    }

    /// Print rate gauges to diagnostics after every reconciliation.
    #[must_use]
    pub fn with_graphics(mut self, graphics: bool) -> Self {
        self.graphics = graphics;
        self
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler<N> {
        &self.reconciler
    }

    #[must_use]
    pub fn executor(&self) -> &CommandExecutor<B> {
        &self.executor
    }
}

impl<N, B> Cycle for StormCycle<N, B>
where
    N: NoiseField2D + Send + 'static,
    B: RuleBackend + 'static,
{
    fn run_cycle(&mut self, t_ms: u64) -> Result<CycleReport, CycleError> {
        let plan = self.reconciler.reconcile(t_ms)?;
        self.emitter.emit(&plan.records)?;

        if self.graphics {
            for line in render_gauges(self.reconciler.storms(), self.reconciler.state()) {
                self.diag.warn(&line);
            }
        }

        self.diag
            .verbose(format!("queued {} commands this interval", plan.directives.len()));
        for directive in &plan.directives {
            self.diag
                .debug(|| self.executor.backend().describe(directive));
        }

        let applied = self.executor.drain(&plan.directives)?;
        self.diag.verbose("command queue drained; sleeping");
        Ok(CycleReport {
            directives: plan.directives.len(),
            records: plan.records.len(),
            applied,
        })
    }
}
