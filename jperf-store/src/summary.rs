use jperf_core::{Diagnosis, GcSummary, OverallStats};
use serde::{Deserialize, Serialize};

/// What a session remembers about its most recent run. Exactly one instance
/// lives per session id; every save overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub diagnosis: Diagnosis,
    pub overall_stats: Option<OverallStats>,
    pub gc_summary: Option<GcSummary>,
}
