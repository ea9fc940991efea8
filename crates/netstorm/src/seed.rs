//! Noise seed resolution.

use std::num::ParseIntError;

/// Parse a seed given as decimal or `0x` hex, with optional `_` separators.
pub fn parse_seed(raw: &str) -> Result<u64, ParseIntError> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(&hex.replace('_', ""), 16)
    } else {
        s.replace('_', "").parse::<u64>()
    }
}

/// Default seed: the leading eight bytes of the configuration fingerprint, so
/// an unchanged configuration replays the same storm.
#[must_use]
pub fn seed_from_fingerprint(fingerprint: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&fingerprint[..8]);
    u64::from_be_bytes(head)
}
