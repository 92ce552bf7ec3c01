use serde::{Deserialize, Serialize};

use crate::loadstats::round3;
use crate::telemetry::TelemetrySnapshot;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcSummary {
    pub total_gc_count: u64,
    pub total_pause_ms: f64,
    pub max_pause_ms: f64,
    pub gc_overhead_pct: f64,
    pub test_duration_s: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeapTrend {
    pub start_heap_mb: f64,
    pub end_heap_mb: f64,
    pub max_heap_mb: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuFlag {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl CpuFlag {
    pub fn from_pct(pct: Option<f64>) -> Self {
        match pct {
            None => CpuFlag::Unknown,
            Some(v) if v < 30.0 => CpuFlag::Low,
            Some(v) if v < 70.0 => CpuFlag::Medium,
            Some(_) => CpuFlag::High,
        }
    }
}

impl std::fmt::Display for CpuFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CpuFlag::Low => "low",
            CpuFlag::Medium => "medium",
            CpuFlag::High => "high",
            CpuFlag::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeReport {
    pub gc_summary: GcSummary,
    pub heap_trend: HeapTrend,
    pub cpu_flag: CpuFlag,
}

impl RuntimeReport {
    /// The degraded result for unusable telemetry: zeroed summaries and an
    /// unknown CPU flag.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &TelemetrySnapshot) -> Self {
        let duration_s = test_duration_s(snapshot);

        let total_pause_ms: f64 = snapshot.gc_events.iter().map(|e| e.pause_ms).sum();
        let max_pause_ms = snapshot
            .gc_events
            .iter()
            .map(|e| e.pause_ms)
            .fold(0.0, f64::max);
        let total_gc_count = snapshot
            .declared_gc_count
            .unwrap_or(snapshot.gc_events.len() as u64);
        let gc_overhead_pct = if duration_s > 0.0 {
            round3(total_pause_ms / (duration_s * 1000.0) * 100.0)
        } else {
            0.0
        };
        let gc_summary = GcSummary {
            total_gc_count,
            total_pause_ms: round3(total_pause_ms),
            max_pause_ms: round3(max_pause_ms),
            gc_overhead_pct,
            test_duration_s: round3(duration_s),
        };

        let heap_trend = if snapshot.heap_samples.is_empty() {
            HeapTrend {
                start_heap_mb: round3(snapshot.heap_start_mb.unwrap_or(0.0)),
                end_heap_mb: round3(snapshot.heap_end_mb.unwrap_or(0.0)),
                max_heap_mb: round3(snapshot.heap_max_mb.unwrap_or(0.0)),
            }
        } else {
            let mut samples = snapshot.heap_samples.clone();
            // stable sort keeps input order for equal timestamps
            samples.sort_by_key(|s| s.timestamp_ms.unwrap_or(0));
            HeapTrend {
                start_heap_mb: round3(samples.first().map(|s| s.used_mb).unwrap_or(0.0)),
                end_heap_mb: round3(samples.last().map(|s| s.used_mb).unwrap_or(0.0)),
                max_heap_mb: round3(samples.iter().map(|s| s.used_mb).fold(0.0, f64::max)),
            }
        };

        Self {
            gc_summary,
            heap_trend,
            cpu_flag: CpuFlag::from_pct(snapshot.cpu_pct),
        }
    }
}

fn test_duration_s(snapshot: &TelemetrySnapshot) -> f64 {
    if let (Some(start), Some(end)) = (snapshot.start_ms, snapshot.end_ms) {
        if end > start {
            return (end - start) as f64 / 1000.0;
        }
    }
    let mut min_ts: Option<i64> = None;
    let mut max_ts: Option<i64> = None;
    let timestamps = snapshot
        .gc_events
        .iter()
        .filter_map(|e| e.timestamp_ms)
        .chain(snapshot.heap_samples.iter().filter_map(|s| s.timestamp_ms));
    for ts in timestamps {
        min_ts = Some(min_ts.map_or(ts, |m| m.min(ts)));
        max_ts = Some(max_ts.map_or(ts, |m| m.max(ts)));
    }
    match (min_ts, max_ts) {
        (Some(min), Some(max)) if max > min => (max - min) as f64 / 1000.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{parse_telemetry, GcEvent, HeapSample};

    #[test]
    fn gc_summary_from_declared_window() {
        let text = r#"{
            "test_start_ms": 0,
            "test_end_ms": 1000,
            "gc": {"events": [{"pause_ms": 150}, {"pause_ms": 200}]}
        }"#;
        let report = RuntimeReport::from_snapshot(&parse_telemetry(text).unwrap());
        assert_eq!(report.gc_summary.total_gc_count, 2);
        assert_eq!(report.gc_summary.total_pause_ms, 350.0);
        assert_eq!(report.gc_summary.max_pause_ms, 200.0);
        assert_eq!(report.gc_summary.test_duration_s, 1.0);
        assert_eq!(report.gc_summary.gc_overhead_pct, 35.0);
    }

    #[test]
    fn duration_is_inferred_from_event_and_sample_timestamps() {
        let snapshot = TelemetrySnapshot {
            gc_events: vec![GcEvent { timestamp_ms: Some(2_000), pause_ms: 10.0 }],
            heap_samples: vec![
                HeapSample { timestamp_ms: Some(500), used_mb: 100.0 },
                HeapSample { timestamp_ms: Some(5_500), used_mb: 200.0 },
            ],
            ..TelemetrySnapshot::default()
        };
        let report = RuntimeReport::from_snapshot(&snapshot);
        assert_eq!(report.gc_summary.test_duration_s, 5.0);
    }

    #[test]
    fn zero_duration_never_divides() {
        let snapshot = TelemetrySnapshot {
            gc_events: vec![GcEvent { timestamp_ms: None, pause_ms: 500.0 }],
            ..TelemetrySnapshot::default()
        };
        let report = RuntimeReport::from_snapshot(&snapshot);
        assert_eq!(report.gc_summary.test_duration_s, 0.0);
        assert_eq!(report.gc_summary.gc_overhead_pct, 0.0);
        assert_eq!(report.gc_summary.total_pause_ms, 500.0);
    }

    #[test]
    fn declared_window_must_be_positive() {
        let snapshot = TelemetrySnapshot {
            start_ms: Some(1_000),
            end_ms: Some(1_000),
            gc_events: vec![GcEvent { timestamp_ms: Some(0), pause_ms: 1.0 },
                            GcEvent { timestamp_ms: Some(2_000), pause_ms: 1.0 }],
            ..TelemetrySnapshot::default()
        };
        // falls back to inference across event timestamps
        let report = RuntimeReport::from_snapshot(&snapshot);
        assert_eq!(report.gc_summary.test_duration_s, 2.0);
    }

    #[test]
    fn heap_trend_sorts_samples_stably() {
        let snapshot = TelemetrySnapshot {
            heap_samples: vec![
                HeapSample { timestamp_ms: Some(100), used_mb: 300.0 },
                HeapSample { timestamp_ms: Some(50), used_mb: 100.0 },
                HeapSample { timestamp_ms: Some(100), used_mb: 400.0 },
            ],
            ..TelemetrySnapshot::default()
        };
        let trend = RuntimeReport::from_snapshot(&snapshot).heap_trend;
        assert_eq!(trend.start_heap_mb, 100.0);
        // the second ts=100 sample keeps its input position and ends the run
        assert_eq!(trend.end_heap_mb, 400.0);
        assert_eq!(trend.max_heap_mb, 400.0);
    }

    #[test]
    fn heap_trend_falls_back_to_declared_totals() {
        let snapshot = TelemetrySnapshot {
            heap_start_mb: Some(128.0),
            heap_end_mb: Some(512.0),
            heap_max_mb: Some(640.0),
            ..TelemetrySnapshot::default()
        };
        let trend = RuntimeReport::from_snapshot(&snapshot).heap_trend;
        assert_eq!(trend.start_heap_mb, 128.0);
        assert_eq!(trend.end_heap_mb, 512.0);
        assert_eq!(trend.max_heap_mb, 640.0);
        let empty = RuntimeReport::from_snapshot(&TelemetrySnapshot::default()).heap_trend;
        assert_eq!(empty, HeapTrend::default());
    }

    #[test]
    fn cpu_flag_thresholds() {
        assert_eq!(CpuFlag::from_pct(None), CpuFlag::Unknown);
        assert_eq!(CpuFlag::from_pct(Some(0.0)), CpuFlag::Low);
        assert_eq!(CpuFlag::from_pct(Some(29.999)), CpuFlag::Low);
        assert_eq!(CpuFlag::from_pct(Some(30.0)), CpuFlag::Medium);
        assert_eq!(CpuFlag::from_pct(Some(69.9)), CpuFlag::Medium);
        assert_eq!(CpuFlag::from_pct(Some(70.0)), CpuFlag::High);
        assert_eq!(CpuFlag::from_pct(Some(100.0)), CpuFlag::High);
    }
}
