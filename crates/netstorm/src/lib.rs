//! Wiring for the `netstorm` binary.
//!
//! The binary parses flags into [`launch::LaunchOptions`]; everything after
//! that (config loading, seed resolution, backend selection, running the
//! scheduler) lives here so it can be exercised without a process boundary.

#![forbid(unsafe_code)]

pub mod launch;
pub mod seed;

pub use launch::{LaunchError, LaunchOptions, launch};
pub use seed::{parse_seed, seed_from_fingerprint};
