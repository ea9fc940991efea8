//! Drop-rate signal: elapsed time to a packet drop probability.

use crate::error::ConfigurationError;
use crate::noise::NoiseField2D;
use crate::storm::{SimplexParams, StormDefinition, StormKind};

/// Drop probability in `[0, 1]` for `storm` at `t_ms` (epoch milliseconds).
pub fn drop_rate<N: NoiseField2D + ?Sized>(
    noise: &N,
    t_ms: u64,
    storm: &StormDefinition,
) -> Result<f64, ConfigurationError> {
    match storm.resolve()? {
        StormKind::Simplex(params) => Ok(simplex_rate(noise, t_ms, &params)),
    }
}

fn simplex_rate<N: NoiseField2D + ?Sized>(noise: &N, t_ms: u64, params: &SimplexParams) -> f64 {
    let raw = noise.sample(t_ms as f64 * params.time_coef, params.y);
    let normalized = normalize(raw);
    match params.threshold {
        Some(threshold) => {
            if normalized < threshold {
                1.0
            } else {
                0.0
            }
        }
        None => normalized,
    }
}

/// Map a `[-1, 1]` sample into `[0, 1]`, clamping anything outside.
///
/// NaN maps to 0 so a broken field never produces a drop rule.
#[must_use]
pub fn normalize(raw: f64) -> f64 {
    let value = raw / 2.0 + 0.5;
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
