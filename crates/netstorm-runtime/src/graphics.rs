//! Text gauges showing each storm's current drop rate.

use netstorm_core::{StormDefinition, StormStateStore};

/// Cells in a full-width gauge.
pub const GAUGE_WIDTH: usize = 40;

/// One line per storm: padded name, a bar filled in proportion to the drop
/// rate, and the rate itself. Storms with no rule applied show an empty bar
/// and `-`.
#[must_use]
pub fn render_gauges(storms: &[StormDefinition], state: &StormStateStore) -> Vec<String> {
    let name_width = storms.iter().map(|s| s.name.chars().count()).max().unwrap_or(0);
    storms
        .iter()
        .enumerate()
        .map(|(index, storm)| {
            let rate = state.rate(index);
            let filled = rate.map_or(0, |r| (r.clamp(0.0, 1.0) * GAUGE_WIDTH as f64).round() as usize);
            let label = rate.map_or_else(|| "-".to_string(), |r| format!("{r:.3}"));
            format!(
                "{:<name_width$} [{}{}] {label}",
                storm.name,
                "#".repeat(filled),
                ".".repeat(GAUGE_WIDTH - filled),
            )
        })
        .collect()
}
