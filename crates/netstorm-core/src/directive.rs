//! Structured rule mutations produced by the reconciler.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    /// Insert a random-probability DROP rule.
    Add,
    /// Remove the DROP rule previously inserted with the same probability.
    Delete,
}

impl RuleAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Delete => "DELETE",
        }
    }
}

/// One rule mutation against one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDirective {
    pub action: RuleAction,
    /// Chain plus optional match options, e.g. `"INPUT"` or `"FORWARD -s 10.0.0.2"`.
    pub target: String,
    pub probability: f64,
}

impl RuleDirective {
    #[must_use]
    pub fn add(target: impl Into<String>, probability: f64) -> Self {
        Self {
            action: RuleAction::Add,
            target: target.into(),
            probability,
        }
    }

    #[must_use]
    pub fn delete(target: impl Into<String>, probability: f64) -> Self {
        Self {
            action: RuleAction::Delete,
            target: target.into(),
            probability,
        }
    }

    /// Probability rendered for the firewall: shortest decimal that round-trips,
    /// so the DELETE for a rule always matches the text of its ADD.
    #[must_use]
    pub fn probability_arg(&self) -> String {
        format!("{}", self.probability)
    }
}

impl fmt::Display for RuleDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} p={}",
            self.action.as_str(),
            self.target,
            self.probability_arg()
        )
    }
}
