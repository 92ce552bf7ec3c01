use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::diagnosis::Classification;
use crate::loadstats::round3;

/// Append-only run counters, constructed once per process and passed to the
/// orchestrator. `reset` exists for tests only.
#[derive(Debug)]
pub struct RunMetrics {
    runs_total: AtomicU64,
    cpu_bound_total: AtomicU64,
    gc_heavy_total: AtomicU64,
    latency_other_total: AtomicU64,
    inconclusive_total: AtomicU64,
    analysis_time_us: AtomicU64,
    // f64 bits; NaN marks "no run recorded yet"
    last_p95_bits: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub runs_total: u64,
    pub cpu_bound_total: u64,
    pub gc_heavy_total: u64,
    pub latency_other_total: u64,
    pub inconclusive_total: u64,
    pub analysis_time_total_seconds: f64,
    pub avg_analysis_time_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_p95_ms: Option<f64>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            runs_total: AtomicU64::new(0),
            cpu_bound_total: AtomicU64::new(0),
            gc_heavy_total: AtomicU64::new(0),
            latency_other_total: AtomicU64::new(0),
            inconclusive_total: AtomicU64::new(0),
            analysis_time_us: AtomicU64::new(0),
            last_p95_bits: AtomicU64::new(f64::NAN.to_bits()),
        }
    }

    pub fn record_run_start(&self) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_end(&self, classification: Classification, p95_ms: Option<f64>) {
        let counter = match classification {
            Classification::CpuBound => &self.cpu_bound_total,
            Classification::GcHeavy => &self.gc_heavy_total,
            Classification::LatencyOther => &self.latency_other_total,
            Classification::Inconclusive => &self.inconclusive_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if let Some(p95) = p95_ms {
            self.last_p95_bits
                .store(round3(p95).to_bits(), Ordering::Relaxed);
        }
    }

    pub fn record_analysis_time(&self, elapsed: Duration) {
        self.analysis_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs_total = self.runs_total.load(Ordering::Relaxed);
        let total_seconds = self.analysis_time_us.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let last_p95 = f64::from_bits(self.last_p95_bits.load(Ordering::Relaxed));
        MetricsSnapshot {
            runs_total,
            cpu_bound_total: self.cpu_bound_total.load(Ordering::Relaxed),
            gc_heavy_total: self.gc_heavy_total.load(Ordering::Relaxed),
            latency_other_total: self.latency_other_total.load(Ordering::Relaxed),
            inconclusive_total: self.inconclusive_total.load(Ordering::Relaxed),
            analysis_time_total_seconds: round3(total_seconds),
            avg_analysis_time_s: if runs_total > 0 {
                round3(total_seconds / runs_total as f64)
            } else {
                0.0
            },
            last_p95_ms: (!last_p95.is_nan()).then_some(last_p95),
        }
    }

    pub fn reset(&self) {
        self.runs_total.store(0, Ordering::Relaxed);
        self.cpu_bound_total.store(0, Ordering::Relaxed);
        self.gc_heavy_total.store(0, Ordering::Relaxed);
        self.latency_other_total.store(0, Ordering::Relaxed);
        self.inconclusive_total.store(0, Ordering::Relaxed);
        self.analysis_time_us.store(0, Ordering::Relaxed);
        self.last_p95_bits
            .store(f64::NAN.to_bits(), Ordering::Relaxed);
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
