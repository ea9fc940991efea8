//! Storm definitions and the configuration document that carries them.
//!
//! A configuration file looks like:
//!
//! ```json
//! {
//!   "storms": [
//!     {
//!       "name": "flaky-uplink",
//!       "type": "simplex",
//!       "simplex_time_coef": 0.0001,
//!       "simplex_y": 0,
//!       "simplex_threshold": 0.3,
//!       "iptables": ["INPUT", "FORWARD -s 10.0.0.2"]
//!     }
//!   ]
//! }
//! ```
//!
//! Definitions are immutable once loaded. [`StormConfig::validate`] rejects
//! anything the rate function could not evaluate, so the scheduler never
//! starts with a storm it cannot drive.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest;

use crate::error::ConfigurationError;

/// Type tag for the simplex-noise storm.
pub const SIMPLEX: &str = "simplex";

/// One configured storm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormDefinition {
    /// Identifier used in log records.
    pub name: String,
    /// Rate function variant. Only `"simplex"` is defined.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplex_time_coef: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplex_y: Option<f64>,
    /// When set, the storm is either fully on (rate 1) or off (rate 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplex_threshold: Option<f64>,
    /// Targets (chain plus optional match options) the drop rule is applied to,
    /// in application order.
    #[serde(default)]
    pub iptables: Vec<String>,
}

/// Parameters of a simplex storm, resolved from a [`StormDefinition`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexParams {
    pub time_coef: f64,
    pub y: f64,
    pub threshold: Option<f64>,
}

/// Resolved rate function variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StormKind {
    Simplex(SimplexParams),
}

impl StormDefinition {
    /// Resolve the type tag and its parameters.
    pub fn resolve(&self) -> Result<StormKind, ConfigurationError> {
        match self.kind.as_str() {
            SIMPLEX => {
                let time_coef = self.finite_param("simplex_time_coef", self.simplex_time_coef)?;
                let y = self.finite_param("simplex_y", self.simplex_y)?;
                Ok(StormKind::Simplex(SimplexParams {
                    time_coef,
                    y,
                    threshold: self.simplex_threshold,
                }))
            }
            other => Err(ConfigurationError::UnknownStormType {
                storm: self.name.clone(),
                kind: other.to_string(),
            }),
        }
    }

    fn finite_param(&self, param: &'static str, value: Option<f64>) -> Result<f64, ConfigurationError> {
        let value = value.ok_or_else(|| ConfigurationError::MissingParameter {
            storm: self.name.clone(),
            param,
        })?;
        if !value.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                storm: self.name.clone(),
                param,
                reason: format!("expected a finite number, got {value}"),
            });
        }
        Ok(value)
    }

    fn validate(&self, index: usize) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::UnnamedStorm { index });
        }
        let StormKind::Simplex(params) = self.resolve()?;
        if let Some(threshold) = params.threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            return Err(ConfigurationError::InvalidParameter {
                storm: self.name.clone(),
                param: "simplex_threshold",
                reason: format!("{threshold} is outside [0, 1]"),
            });
        }
        if let Some(position) = self.iptables.iter().position(|t| t.trim().is_empty()) {
            return Err(ConfigurationError::BlankTarget {
                storm: self.name.clone(),
                position,
            });
        }
        Ok(())
    }
}

/// The configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormConfig {
    pub storms: Vec<StormDefinition>,
}

impl StormConfig {
    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Check every storm; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.storms.is_empty() {
            return Err(ConfigurationError::NoStorms);
        }
        for (index, storm) in self.storms.iter().enumerate() {
            storm.validate(index)?;
        }
        Ok(())
    }

    /// SHA-256 over the canonical serialization of the document.
    ///
    /// Whitespace and key order in the source file do not affect the digest.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        // Serializing plain structs of strings and floats cannot fail.
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = sha2::Sha256::digest(&canonical);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    /// Lowercase hex form of [`StormConfig::fingerprint`].
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        use std::fmt::Write;
        let digest = self.fingerprint();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            let _ = write!(&mut out, "{b:02x}");
        }
        out
    }
}
