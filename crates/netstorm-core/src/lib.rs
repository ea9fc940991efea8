//! # netstorm-core
//!
//! Pure logic for simulating network storms: storm definitions, the seeded
//! noise field, the drop-rate signal, and the reconciler that turns a change
//! in drop rate into an ordered list of firewall rule directives.
//!
//! Nothing in this crate touches the operating system. Executing directives
//! and scheduling ticks live in `netstorm-runtime`.

#![forbid(unsafe_code)]

pub mod directive;
pub mod error;
pub mod noise;
pub mod rate;
pub mod reconcile;
pub mod state;
pub mod storm;

pub use directive::{RuleAction, RuleDirective};
pub use error::ConfigurationError;
pub use noise::{NoiseField2D, SimplexNoise};
pub use rate::drop_rate;
pub use reconcile::{LogRecord, Reconciler, Reconciliation};
pub use state::{StormState, StormStateStore};
pub use storm::{StormConfig, StormDefinition, StormKind};
