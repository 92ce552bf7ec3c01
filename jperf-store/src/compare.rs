use jperf_core::round3;

use crate::summary::RunSummary;

/// Delta between the previous and current run of a session, as one
/// human-readable line. `None` when no signal is comparable.
pub fn compare_runs(previous: &RunSummary, current: &RunSummary) -> Option<String> {
    let mut parts = Vec::new();

    if let (Some(prev), Some(curr)) = (&previous.overall_stats, &current.overall_stats) {
        let delta = curr.p95_ms - prev.p95_ms;
        let sign = if delta >= 0.0 { "+" } else { "" };
        parts.push(format!(
            "p95 change: {sign}{} ms (prev {} -> now {})",
            round3(delta),
            round3(prev.p95_ms),
            round3(curr.p95_ms)
        ));
    }

    if previous.diagnosis.classification != current.diagnosis.classification {
        parts.push(format!(
            "classification changed: {} -> {}",
            previous.diagnosis.classification, current.diagnosis.classification
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
