//! From parsed options to a running scheduler.

use std::num::ParseIntError;
use std::path::PathBuf;

use netstorm_core::{ConfigurationError, Reconciler, SimplexNoise, StormConfig};
use netstorm_runtime::{
    CommandExecutor, Diagnostics, DryRunBackend, IptablesBackend, RecordEmitter, RuleBackend,
    RunSummary, Scheduler, SchedulerConfig, SchedulerError, StormCycle,
};
use thiserror::Error;

use crate::seed::{parse_seed, seed_from_fingerprint};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigurationError),
    #[error("invalid seed \"{raw}\": {source}")]
    Seed {
        raw: String,
        #[source]
        source: ParseIntError,
    },
    #[error("cannot open output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Everything the command line controls.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub config: PathBuf,
    /// NDJSON destination; stdout when `None`.
    pub output: Option<PathBuf>,
    pub graphics: bool,
    pub dry_run: bool,
    pub interval_ms: u64,
    pub root: bool,
    pub seed: Option<String>,
    pub protocol: String,
    pub iptables: String,
    pub max_ticks: Option<u64>,
}

impl LaunchOptions {
    #[must_use]
    pub fn new(config: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            output: None,
            graphics: false,
            dry_run: false,
            interval_ms: 1000,
            root: false,
            seed: None,
            protocol: "tcp".to_string(),
            iptables: "iptables".to_string(),
            max_ticks: None,
        }
    }
}

/// Load the configuration, build the storm pipeline and run it.
///
/// Returns only when `max_ticks` is reached or something fails; every error
/// is fatal to the caller.
pub fn launch(opts: &LaunchOptions, diag: &Diagnostics) -> Result<RunSummary, LaunchError> {
    let config = StormConfig::from_file(&opts.config)?;
    let fingerprint = config.fingerprint();
    let seed = match &opts.seed {
        Some(raw) => parse_seed(raw).map_err(|source| LaunchError::Seed {
            raw: raw.clone(),
            source,
        })?,
        None => seed_from_fingerprint(&fingerprint),
    };
    diag.verbose(format!(
        "loaded {} storm(s) from {} (sha256 {}), seed 0x{seed:016X}",
        config.storms.len(),
        opts.config.display(),
        config.fingerprint_hex(),
    ));
    for (index, storm) in config.storms.iter().enumerate() {
        diag.debug(|| {
            format!(
                "storm {index}: {}",
                serde_json::to_string(storm).unwrap_or_else(|_| storm.name.clone())
            )
        });
    }

    // Reject a bad interval before the output file is truncated.
    let scheduler = Scheduler::new(
        SchedulerConfig::every_ms(opts.interval_ms).with_max_ticks(opts.max_ticks),
        diag.clone(),
    )?;

    let emitter = match &opts.output {
        Some(path) => RecordEmitter::to_file(path).map_err(|source| LaunchError::Output {
            path: path.clone(),
            source,
        })?,
        None => RecordEmitter::to_stdout(),
    };

    let iptables = IptablesBackend::new(diag.clone())
        .with_program(opts.iptables.clone())
        .with_protocol(opts.protocol.clone())
        .with_sudo(opts.root);
    let backend: Box<dyn RuleBackend> = if opts.dry_run {
        diag.verbose("dry run: iptables will not be modified");
        Box::new(DryRunBackend::new(iptables))
    } else {
        Box::new(iptables)
    };

    let cycle = StormCycle::new(
        Reconciler::new(config.storms, SimplexNoise::with_seed(seed)),
        CommandExecutor::new(backend),
        emitter,
        diag.clone(),
    )
    .with_graphics(opts.graphics);

    Ok(scheduler.run(cycle)?)
}
