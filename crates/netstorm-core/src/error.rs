//! Configuration errors.
//!
//! Every variant is fatal: the process cannot pick a safe drop rate for a
//! storm it does not understand.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("error reading configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("configuration defines no storms")]
    NoStorms,
    #[error("storm #{index} has an empty name")]
    UnnamedStorm { index: usize },
    #[error("unknown storm type \"{kind}\" (storm \"{storm}\")")]
    UnknownStormType { storm: String, kind: String },
    #[error("storm \"{storm}\" is missing parameter `{param}`")]
    MissingParameter { storm: String, param: &'static str },
    #[error("storm \"{storm}\" has invalid `{param}`: {reason}")]
    InvalidParameter {
        storm: String,
        param: &'static str,
        reason: String,
    },
    #[error("storm \"{storm}\" has a blank iptables target at position {position}")]
    BlankTarget { storm: String, position: usize },
}
