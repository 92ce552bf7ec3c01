use serde::{Deserialize, Serialize};

use crate::loadstats::{round3, OverallStats, TimeBucket};
use crate::runtime::{CpuFlag, GcSummary, HeapTrend};

pub const DEFAULT_SLA_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    CpuBound,
    GcHeavy,
    LatencyOther,
    Inconclusive,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::CpuBound => "CPU_BOUND",
            Classification::GcHeavy => "GC_HEAVY",
            Classification::LatencyOther => "LATENCY_OTHER",
            Classification::Inconclusive => "INCONCLUSIVE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisContext {
    pub sla_ms: f64,
    pub framework: Option<String>,
    pub jdk: Option<String>,
}

impl Default for DiagnosisContext {
    fn default() -> Self {
        Self {
            sla_ms: DEFAULT_SLA_MS,
            framework: None,
            jdk: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub classification: Classification,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Apply the ordered rule set to one run's summaries. Total: missing signals
/// are zeros and unknowns, and the first matching rule decides the
/// classification. Platform hints only ever add recommendation strings.
pub fn diagnose(
    overall: &OverallStats,
    buckets: &[TimeBucket],
    gc: &GcSummary,
    heap: &HeapTrend,
    cpu_flag: CpuFlag,
    context: &DiagnosisContext,
) -> Diagnosis {
    let sla_ms = context.sla_ms;
    let framework = context
        .framework
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();
    let jdk = context
        .jdk
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let p95 = overall.p95_ms;
    let error_rate = overall.error_rate_pct;
    let gc_overhead = gc.gc_overhead_pct;
    let max_pause = gc.max_pause_ms;

    let mut findings = Vec::new();

    if error_rate > 0.5 {
        findings.push(format!("Elevated error rate: {error_rate}%"));
    }
    if p95 > sla_ms {
        findings.push(format!("p95 latency {p95} ms exceeds SLA {sla_ms} ms"));
    } else {
        findings.push(format!("p95 latency {p95} ms within SLA {sla_ms} ms"));
    }

    let max_tps = buckets.iter().map(|b| b.tps).fold(0.0, f64::max);
    let mut plateau = false;
    if max_tps > 0.0 {
        let near_max = buckets.iter().filter(|b| b.tps >= 0.9 * max_tps).count();
        if near_max >= 3 {
            plateau = true;
            findings.push(format!(
                "Throughput plateau detected: max_tps={} tps, sustained across {} buckets",
                round3(max_tps),
                near_max
            ));
        }
    }

    if gc_overhead >= 10.0 {
        findings.push(format!(
            "High GC overhead: {gc_overhead}% of test time spent in GC"
        ));
    }
    if max_pause >= 200.0 {
        findings.push(format!("GC pause spikes observed: max pause {max_pause} ms"));
    }
    if heap.max_heap_mb > 0.0
        && heap.end_heap_mb >= heap.max_heap_mb * 0.9
        && heap.end_heap_mb > heap.start_heap_mb
    {
        findings.push(format!(
            "Heap trending upward: start={}MB end={}MB max={}MB",
            heap.start_heap_mb, heap.end_heap_mb, heap.max_heap_mb
        ));
    }
    findings.push(format!("CPU flag: {cpu_flag}"));

    let sla_breached = p95 > sla_ms;
    let cpu_high = cpu_flag == CpuFlag::High;

    // Ordered decision list; the first matching rule wins.
    let classification = if gc_overhead >= 12.0 || max_pause >= 300.0 {
        Classification::GcHeavy
    } else if cpu_high && (plateau || sla_breached) {
        Classification::CpuBound
    } else if sla_breached || error_rate > 1.0 {
        if gc_overhead >= 8.0 || max_pause >= 150.0 {
            Classification::GcHeavy
        } else if cpu_high {
            Classification::CpuBound
        } else {
            Classification::LatencyOther
        }
    } else if error_rate > 1.0 {
        Classification::LatencyOther
    } else {
        Classification::Inconclusive
    };

    let mut recommendations = base_recommendations(classification);
    match classification {
        Classification::GcHeavy => {
            if framework.contains("vert") {
                recommendations.push(
                    "For Vert.x, ensure worker threads and event-loop blocking operations are minimized."
                        .to_string(),
                );
            }
            if framework.contains("tomcat") {
                recommendations.push(
                    "For Tomcat, tune connector thread pools and check request queuing/backpressure."
                        .to_string(),
                );
            }
            if jdk == "8" || jdk == "8u" {
                recommendations.push(
                    "On JDK 8, prefer G1 tuning or consider CMS-to-G1 migration patterns."
                        .to_string(),
                );
            } else if jdk == "21" || jdk == "21u" {
                recommendations.push(
                    "On JDK 21, consider ZGC/CRaC options and review ergonomic defaults."
                        .to_string(),
                );
            }
        }
        Classification::CpuBound => {
            if framework.contains("vert") {
                recommendations.push(
                    "For Vert.x: ensure event-loop handlers are non-blocking and use worker verticles for blocking tasks."
                        .to_string(),
                );
            }
            if framework.contains("tomcat") {
                recommendations.push(
                    "For Tomcat: tune maxThreads and ensure request handling is efficient."
                        .to_string(),
                );
            }
        }
        Classification::LatencyOther => {
            if error_rate > 1.0 {
                recommendations.push(
                    "Correlate errors with slow requests -- fix application-level exceptions first."
                        .to_string(),
                );
            }
        }
        Classification::Inconclusive => {}
    }
    recommendations.truncate(5);

    Diagnosis {
        classification,
        findings,
        recommendations,
    }
}

fn base_recommendations(classification: Classification) -> Vec<String> {
    let base: [&str; 3] = match classification {
        Classification::GcHeavy => [
            "Investigate allocation hotspots and reduce short-lived object churn.",
            "Consider tuning GC settings (collector choice, heap sizing, survivor ratios).",
            "Increase heap (if safe) to reduce GC frequency and monitor pause distribution.",
        ],
        Classification::CpuBound => [
            "Profile the application to find CPU hotspots (async traces, flamegraphs).",
            "Offload expensive work to background workers or increase CPU cores/instances.",
            "Review native or JNI calls that may be consuming CPU.",
        ],
        Classification::LatencyOther => [
            "Collect traces (distributed tracing) for slow transactions to find hotspots.",
            "Examine downstream dependencies (DB, HTTP calls) and network latencies.",
            "Add per-request timing to identify slow endpoints and payloads.",
        ],
        Classification::Inconclusive => [
            "Collect longer-duration runs with full metrics (heap profiles, CPU samples, traces).",
            "Increase sampling frequency for heap and GC events to provide signals.",
            "If possible, run a controlled load test gradually increasing load to observe saturation characteristics.",
        ],
    };
    base.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(p95: f64, error_rate: f64) -> OverallStats {
        OverallStats {
            count: 100,
            avg_ms: p95 / 2.0,
            p95_ms: p95,
            p99_ms: p95 * 1.2,
            error_rate_pct: error_rate,
            throughput_tps: 50.0,
        }
    }

    fn gc(overhead: f64, max_pause: f64) -> GcSummary {
        GcSummary {
            total_gc_count: 10,
            total_pause_ms: 100.0,
            max_pause_ms: max_pause,
            gc_overhead_pct: overhead,
            test_duration_s: 60.0,
        }
    }

    fn plateau_buckets() -> Vec<TimeBucket> {
        (0..4)
            .map(|i| TimeBucket {
                bucket_start_ms: i * 10_000,
                tps: 100.0,
                p95_ms: 50.0,
                count: 1000,
            })
            .collect()
    }

    #[test]
    fn gc_rule_outranks_cpu_rule() {
        let diagnosis = diagnose(
            &stats(600.0, 0.0),
            &[],
            &gc(15.0, 50.0),
            &HeapTrend::default(),
            CpuFlag::High,
            &DiagnosisContext::default(),
        );
        assert_eq!(diagnosis.classification, Classification::GcHeavy);
    }

    #[test]
    fn heavy_gc_overrides_an_sla_compliant_run() {
        let diagnosis = diagnose(
            &stats(100.0, 0.0),
            &[],
            &gc(35.0, 200.0),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext::default(),
        );
        assert_eq!(diagnosis.classification, Classification::GcHeavy);
    }

    #[test]
    fn high_cpu_with_plateau_is_cpu_bound() {
        let diagnosis = diagnose(
            &stats(100.0, 0.0),
            &plateau_buckets(),
            &GcSummary::default(),
            &HeapTrend::default(),
            CpuFlag::High,
            &DiagnosisContext::default(),
        );
        assert_eq!(diagnosis.classification, Classification::CpuBound);
        assert!(diagnosis
            .findings
            .iter()
            .any(|f| f.starts_with("Throughput plateau detected")));
    }

    #[test]
    fn sla_breach_with_minor_gc_signal_is_gc_heavy() {
        let diagnosis = diagnose(
            &stats(600.0, 0.0),
            &[],
            &gc(9.0, 50.0),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext::default(),
        );
        assert_eq!(diagnosis.classification, Classification::GcHeavy);
    }

    #[test]
    fn sla_breach_without_runtime_signals_is_latency_other() {
        let diagnosis = diagnose(
            &stats(600.0, 0.0),
            &[],
            &GcSummary::default(),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext::default(),
        );
        assert_eq!(diagnosis.classification, Classification::LatencyOther);
    }

    #[test]
    fn elevated_errors_alone_are_latency_other() {
        let diagnosis = diagnose(
            &stats(100.0, 5.0),
            &[],
            &GcSummary::default(),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext::default(),
        );
        assert_eq!(diagnosis.classification, Classification::LatencyOther);
        assert_eq!(diagnosis.recommendations.len(), 4);
    }

    #[test]
    fn nominal_run_is_inconclusive_with_three_recommendations() {
        let diagnosis = diagnose(
            &stats(100.0, 0.0),
            &[],
            &GcSummary::default(),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext::default(),
        );
        assert_eq!(diagnosis.classification, Classification::Inconclusive);
        assert_eq!(diagnosis.recommendations.len(), 3);
    }

    #[test]
    fn diagnosis_is_deterministic() {
        let context = DiagnosisContext {
            sla_ms: 200.0,
            framework: Some("Vert.x".to_string()),
            jdk: Some("21".to_string()),
        };
        let overall = stats(600.0, 2.0);
        let gc = gc(9.0, 180.0);
        let a = diagnose(&overall, &[], &gc, &HeapTrend::default(), CpuFlag::Medium, &context);
        let b = diagnose(&overall, &[], &gc, &HeapTrend::default(), CpuFlag::Medium, &context);
        assert_eq!(a, b);
    }

    #[test]
    fn platform_hints_only_extend_recommendations() {
        let bare = diagnose(
            &stats(100.0, 0.0),
            &[],
            &gc(35.0, 200.0),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext::default(),
        );
        let hinted = diagnose(
            &stats(100.0, 0.0),
            &[],
            &gc(35.0, 200.0),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext {
                sla_ms: DEFAULT_SLA_MS,
                framework: Some("Apache Tomcat".to_string()),
                jdk: Some("8".to_string()),
            },
        );
        assert_eq!(bare.classification, hinted.classification);
        assert_eq!(bare.recommendations.len(), 3);
        assert_eq!(hinted.recommendations.len(), 5);
        assert_eq!(hinted.recommendations[..3], bare.recommendations[..3]);
    }

    #[test]
    fn recommendations_are_capped_at_five() {
        let diagnosis = diagnose(
            &stats(100.0, 0.0),
            &[],
            &gc(35.0, 200.0),
            &HeapTrend::default(),
            CpuFlag::Low,
            &DiagnosisContext {
                sla_ms: DEFAULT_SLA_MS,
                // both framework hints match, plus a jdk hint
                framework: Some("vertx-on-tomcat".to_string()),
                jdk: Some("21u".to_string()),
            },
        );
        assert_eq!(diagnosis.recommendations.len(), 5);
    }

    #[test]
    fn findings_keep_a_fixed_order() {
        let heap = HeapTrend {
            start_heap_mb: 100.0,
            end_heap_mb: 580.0,
            max_heap_mb: 600.0,
        };
        let diagnosis = diagnose(
            &stats(600.0, 2.0),
            &plateau_buckets(),
            &gc(15.0, 250.0),
            &heap,
            CpuFlag::High,
            &DiagnosisContext::default(),
        );
        let prefixes = [
            "Elevated error rate",
            "p95 latency",
            "Throughput plateau detected",
            "High GC overhead",
            "GC pause spikes observed",
            "Heap trending upward",
            "CPU flag",
        ];
        assert_eq!(diagnosis.findings.len(), prefixes.len());
        for (finding, prefix) in diagnosis.findings.iter().zip(prefixes) {
            assert!(finding.starts_with(prefix), "{finding} !~ {prefix}");
        }
    }

    #[test]
    fn sla_note_is_always_present() {
        let diagnosis = diagnose(
            &stats(100.0, 0.0),
            &[],
            &GcSummary::default(),
            &HeapTrend::default(),
            CpuFlag::Unknown,
            &DiagnosisContext::default(),
        );
        assert!(diagnosis.findings[0].contains("within SLA"));
        assert!(diagnosis.findings.last().is_some_and(|f| f == "CPU flag: unknown"));
    }
}
