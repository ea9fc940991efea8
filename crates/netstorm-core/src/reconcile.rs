//! Reconciliation: desired drop rate versus applied drop rate.
//!
//! For every storm whose rate changed since the last tick the reconciler emits,
//! per target and in configuration order, a DELETE of the old rule (when one
//! is installed) immediately followed by an ADD of the new one. The executor
//! applies directives strictly in this order, so a target never carries two of
//! this storm's drop rules at once.

use serde::Serialize;

use crate::directive::RuleDirective;
use crate::error::ConfigurationError;
use crate::noise::NoiseField2D;
use crate::rate::drop_rate;
use crate::state::StormStateStore;
use crate::storm::StormDefinition;

/// One NDJSON record per (storm, target) whose rate changed this tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub name: String,
    pub rate: f64,
    /// Previous rate minus new rate; `null` on a storm's first activation.
    #[serde(rename = "rateDelta")]
    pub rate_delta: Option<f64>,
    /// Tick time in epoch milliseconds.
    #[serde(rename = "@timestamp")]
    pub timestamp: u64,
}

impl LogRecord {
    /// Serialize to a single NDJSON line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Output of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub directives: Vec<RuleDirective>,
    pub records: Vec<LogRecord>,
}

impl Reconciliation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty() && self.records.is_empty()
    }
}

/// Owns the storm definitions, their applied state and the noise field.
#[derive(Debug)]
pub struct Reconciler<N> {
    storms: Vec<StormDefinition>,
    state: StormStateStore,
    noise: N,
}

impl<N: NoiseField2D> Reconciler<N> {
    /// Every storm starts with no rule applied.
    #[must_use]
    pub fn new(storms: Vec<StormDefinition>, noise: N) -> Self {
        let state = StormStateStore::new(storms.len());
        Self {
            storms,
            state,
            noise,
        }
    }

    #[must_use]
    pub fn storms(&self) -> &[StormDefinition] {
        &self.storms
    }

    #[must_use]
    pub fn state(&self) -> &StormStateStore {
        &self.state
    }

    /// Compute directives and log records for tick `t_ms`, then record the new
    /// rates as applied.
    ///
    /// Rates for all storms are computed before any state changes, so an error
    /// leaves the store exactly as it was.
    pub fn reconcile(&mut self, t_ms: u64) -> Result<Reconciliation, ConfigurationError> {
        let rates = self
            .storms
            .iter()
            .map(|storm| drop_rate(&self.noise, t_ms, storm))
            .collect::<Result<Vec<f64>, _>>()?;

        let mut out = Reconciliation::default();
        for (index, (storm, rate)) in self.storms.iter().zip(rates).enumerate() {
            let previous = self.state.rate(index);
            // Exact comparison: thresholded storms settle on repeated 0/1 values.
            if previous == Some(rate) {
                continue;
            }
            for target in &storm.iptables {
                if let Some(old) = previous {
                    out.directives.push(RuleDirective::delete(target.as_str(), old));
                }
                out.directives.push(RuleDirective::add(target.as_str(), rate));
                out.records.push(LogRecord {
                    name: storm.name.clone(),
                    rate,
                    rate_delta: previous.map(|old| old - rate),
                    timestamp: t_ms,
                });
            }
            self.state.commit(index, rate);
        }
        Ok(out)
    }
}
