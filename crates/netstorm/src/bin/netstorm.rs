//! CLI entrypoint for netstorm.

use std::path::PathBuf;

use clap::Parser;
use netstorm::{LaunchOptions, launch};
use netstorm_runtime::{Diagnostics, Verbosity};

/// Simulate network storms by reconciling probabilistic iptables DROP rules.
#[derive(Debug, Parser)]
#[command(name = "netstorm", version)]
#[command(about = "Simulate network storms with time-varying iptables DROP rules")]
struct Cli {
    /// Storm configuration file (JSON).
    #[arg(short, long)]
    config: PathBuf,
    /// NDJSON log file (defaults to stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Extra output on stderr.
    #[arg(short, long)]
    verbose: bool,
    /// Draw a gauge of each storm's drop rate on stderr every tick.
    #[arg(short, long)]
    graphics: bool,
    /// Run the full pipeline without manipulating iptables.
    #[arg(short, long)]
    dry_run: bool,
    /// How often to wake up and manipulate iptables, in milliseconds.
    #[arg(short, long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
    /// Run iptables through sudo(1).
    #[arg(short, long)]
    root: bool,
    /// Noise seed, decimal or 0x hex (defaults to a digest of the configuration).
    #[arg(short, long)]
    seed: Option<String>,
    /// Debugging output on stderr (implies --verbose).
    #[arg(long)]
    debug: bool,
    /// Protocol passed to `iptables -p`.
    #[arg(long, default_value = "tcp")]
    protocol: String,
    /// iptables binary to invoke.
    #[arg(long, default_value = "iptables")]
    iptables: String,
    /// Stop after this many ticks instead of running forever.
    #[arg(long)]
    ticks: Option<u64>,
}

impl Cli {
    fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    fn into_options(self) -> LaunchOptions {
        LaunchOptions {
            config: self.config,
            output: self.output,
            graphics: self.graphics,
            dry_run: self.dry_run,
            interval_ms: self.interval,
            root: self.root,
            seed: self.seed,
            protocol: self.protocol,
            iptables: self.iptables,
            max_ticks: self.ticks,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let diag = Diagnostics::stderr(cli.verbosity());
    let opts = cli.into_options();

    match launch(&opts, &diag) {
        Ok(summary) => {
            diag.verbose(format!(
                "finished: {}",
                serde_json::to_string(&summary).unwrap_or_default()
            ));
        }
        Err(err) => {
            eprintln!("fatal error: {err}");
            std::process::exit(1);
        }
    }
}
