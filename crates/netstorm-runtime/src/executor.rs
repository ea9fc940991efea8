//! Rule execution.
//!
//! The firewall ruleset is one ordered, shared resource, so directives are
//! applied strictly one at a time in the order the reconciler produced them.
//! The first failure aborts the rest of the queue: the live ruleset may then
//! differ from the recorded state, and nothing here tries to repair that.

use std::process::Command;

use netstorm_core::{RuleAction, RuleDirective};
use thiserror::Error;

use crate::diagnostics::Diagnostics;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Error)]
#[error("directive #{index} ({directive}) failed: {source}")]
pub struct ExecutionError {
    pub index: usize,
    pub directive: RuleDirective,
    #[source]
    pub source: BackendError,
}

/// Something that can apply a single rule directive.
pub trait RuleBackend: Send {
    fn apply(&mut self, directive: &RuleDirective) -> Result<(), BackendError>;

    /// Human-readable form of what `apply` does for `directive`.
    fn describe(&self, directive: &RuleDirective) -> String {
        directive.to_string()
    }
}

impl<B: RuleBackend + ?Sized> RuleBackend for Box<B> {
    fn apply(&mut self, directive: &RuleDirective) -> Result<(), BackendError> {
        (**self).apply(directive)
    }

    fn describe(&self, directive: &RuleDirective) -> String {
        (**self).describe(directive)
    }
}

// ---------------------------------------------------------------------------
// iptables
// ---------------------------------------------------------------------------

/// Applies directives with `iptables`, optionally through `sudo`.
#[derive(Debug, Clone)]
pub struct IptablesBackend {
    program: String,
    protocol: String,
    sudo: bool,
    diag: Diagnostics,
}

impl IptablesBackend {
    #[must_use]
    pub fn new(diag: Diagnostics) -> Self {
        Self {
            program: "iptables".to_string(),
            protocol: "tcp".to_string(),
            sudo: false,
            diag,
        }
    }

    /// Binary to invoke instead of `iptables`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Value for `-p`.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Prefix every invocation with `sudo`.
    #[must_use]
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Full argv for `directive`, program first.
    #[must_use]
    pub fn argv(&self, directive: &RuleDirective) -> Vec<String> {
        let mut argv = Vec::with_capacity(16);
        if self.sudo {
            argv.push("sudo".to_string());
        }
        argv.push(self.program.clone());
        argv.extend(["-p".to_string(), self.protocol.clone()]);
        argv.push(
            match directive.action {
                RuleAction::Add => "-A",
                RuleAction::Delete => "-D",
            }
            .to_string(),
        );
        argv.extend(directive.target.split_whitespace().map(str::to_string));
        argv.extend(
            ["-m", "statistic", "--mode", "random", "--probability"]
                .into_iter()
                .map(str::to_string),
        );
        argv.push(directive.probability_arg());
        argv.extend(["-j".to_string(), "DROP".to_string()]);
        argv
    }
}

impl RuleBackend for IptablesBackend {
    fn apply(&mut self, directive: &RuleDirective) -> Result<(), BackendError> {
        let argv = self.argv(directive);
        let command = argv.join(" ");
        self.diag.verbose(format!("executing command: {command}"));

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|source| BackendError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        self.diag.verbose(format!("command output for: {command}"));
        self.diag.verbose(format!("stdout: {}", stdout.trim_end()));
        self.diag.verbose(format!("stderr: {}", stderr.trim_end()));

        if !output.status.success() {
            return Err(BackendError::Failed {
                command,
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }
        Ok(())
    }

    fn describe(&self, directive: &RuleDirective) -> String {
        self.argv(directive).join(" ")
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Accepts every directive without touching the firewall.
#[derive(Debug, Clone)]
pub struct DryRunBackend {
    preview: IptablesBackend,
    applied: u64,
}

impl DryRunBackend {
    /// `preview` renders the command that would have run.
    #[must_use]
    pub fn new(preview: IptablesBackend) -> Self {
        Self {
            preview,
            applied: 0,
        }
    }

    #[must_use]
    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl RuleBackend for DryRunBackend {
    fn apply(&mut self, directive: &RuleDirective) -> Result<(), BackendError> {
        self.applied += 1;
        self.preview
            .diag
            .verbose(format!("dry run, skipping: {}", self.preview.describe(directive)));
        Ok(())
    }

    fn describe(&self, directive: &RuleDirective) -> String {
        self.preview.describe(directive)
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Drains directive queues through a backend, one directive at a time.
#[derive(Debug)]
pub struct CommandExecutor<B> {
    backend: B,
}

impl<B: RuleBackend> CommandExecutor<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Apply `directives` in order. Returns how many were applied.
    ///
    /// Stops at the first failure; later directives are not attempted.
    pub fn drain(&mut self, directives: &[RuleDirective]) -> Result<usize, ExecutionError> {
        for (index, directive) in directives.iter().enumerate() {
            self.backend
                .apply(directive)
                .map_err(|source| ExecutionError {
                    index,
                    directive: directive.clone(),
                    source,
                })?;
        }
        Ok(directives.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Verbosity;

    struct Recording {
        seen: Vec<RuleDirective>,
        fail_at: Option<usize>,
    }

    impl RuleBackend for Recording {
        fn apply(&mut self, directive: &RuleDirective) -> Result<(), BackendError> {
            if self.fail_at == Some(self.seen.len()) {
                return Err(BackendError::Failed {
                    command: directive.to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "iptables: Bad rule".to_string(),
                });
            }
            self.seen.push(directive.clone());
            Ok(())
        }
    }

    fn queue() -> Vec<RuleDirective> {
        vec![
            RuleDirective::delete("INPUT", 1.0),
            RuleDirective::add("INPUT", 0.0),
            RuleDirective::delete("FORWARD", 1.0),
            RuleDirective::add("FORWARD", 0.0),
        ]
    }

    #[test]
    fn drains_in_order() {
        let mut exec = CommandExecutor::new(Recording {
            seen: Vec::new(),
            fail_at: None,
        });
        assert_eq!(exec.drain(&queue()).unwrap(), 4);
        assert_eq!(exec.backend().seen, queue());
    }

    #[test]
    fn first_failure_aborts_the_rest() {
        let mut exec = CommandExecutor::new(Recording {
            seen: Vec::new(),
            fail_at: Some(1),
        });
        let err = exec.drain(&queue()).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.directive, RuleDirective::add("INPUT", 0.0));
        assert_eq!(exec.backend().seen, vec![RuleDirective::delete("INPUT", 1.0)]);
        assert!(err.to_string().contains("directive #1 (ADD INPUT p=0)"));
    }

    #[test]
    fn iptables_argv_matches_rule_shape() {
        let backend = IptablesBackend::new(Diagnostics::capture(Verbosity::Quiet));
        assert_eq!(
            backend.argv(&RuleDirective::add("INPUT", 0.25)),
            [
                "iptables", "-p", "tcp", "-A", "INPUT", "-m", "statistic", "--mode", "random",
                "--probability", "0.25", "-j", "DROP"
            ]
        );
    }

    #[test]
    fn sudo_protocol_and_target_options() {
        let backend = IptablesBackend::new(Diagnostics::capture(Verbosity::Quiet))
            .with_sudo(true)
            .with_protocol("udp")
            .with_program("/sbin/iptables");
        assert_eq!(
            backend.describe(&RuleDirective::delete("FORWARD  -s 10.0.0.2", 1.0)),
            "sudo /sbin/iptables -p udp -D FORWARD -s 10.0.0.2 -m statistic --mode random \
             --probability 1 -j DROP"
        );
    }

    #[test]
    fn delete_renders_same_probability_as_add() {
        let backend = IptablesBackend::new(Diagnostics::capture(Verbosity::Quiet));
        let p = 0.1 + 0.2;
        let add = backend.argv(&RuleDirective::add("INPUT", p));
        let del = backend.argv(&RuleDirective::delete("INPUT", p));
        assert_eq!(add[10], del[10]);
        assert_eq!(add[10].parse::<f64>().unwrap(), p);
    }

    #[test]
    fn dry_run_counts_and_echoes() {
        let diag = Diagnostics::capture(Verbosity::Verbose);
        let mut exec = CommandExecutor::new(DryRunBackend::new(IptablesBackend::new(diag.clone())));
        exec.drain(&queue()).unwrap();
        assert_eq!(exec.backend().applied(), 4);
        let text = diag.captured();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("dry run, skipping: iptables -p tcp -D INPUT"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let mut backend = IptablesBackend::new(Diagnostics::capture(Verbosity::Quiet))
            .with_program("/nonexistent/netstorm-iptables");
        let err = backend.apply(&RuleDirective::add("INPUT", 0.5)).unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }
}
