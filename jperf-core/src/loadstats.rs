use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sample::Observation;

pub const BUCKET_WIDTH_MS: i64 = 10_000;

/// Round to three decimals, the precision used in reports.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Linear-interpolation percentile over an ascending-sorted slice.
///
/// For `k = (n-1) * q / 100`, the result is `v[f] + (v[c] - v[f]) * (k - f)`
/// with `f = floor(k)`, `c = ceil(k)`. Empty input yields 0.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let k = (sorted.len() - 1) as f64 * (q / 100.0);
    let f = k.floor() as usize;
    let c = k.ceil() as usize;
    if f == c {
        return sorted[f];
    }
    sorted[f] + (sorted[c] - sorted[f]) * (k - f as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub count: u64,
    pub avg_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub error_rate_pct: f64,
    pub throughput_tps: f64,
}

impl OverallStats {
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut elapsed: Vec<f64> = observations.iter().map(|o| o.elapsed).collect();
        elapsed.sort_by(|a, b| a.total_cmp(b));
        let count = elapsed.len() as u64;
        if count == 0 {
            return Self::default();
        }

        let avg = elapsed.iter().sum::<f64>() / count as f64;
        let failures = observations
            .iter()
            .filter(|o| o.success == Some(false))
            .count();
        let error_rate = failures as f64 / count as f64 * 100.0;

        // Throughput only when at least two timestamped observations span a
        // positive interval; a duration is never fabricated.
        let timestamps: Vec<i64> = observations.iter().filter_map(|o| o.timestamp).collect();
        let mut throughput = 0.0;
        if timestamps.len() >= 2 {
            if let (Some(&min_ts), Some(&max_ts)) =
                (timestamps.iter().min(), timestamps.iter().max())
            {
                let duration_s = (max_ts - min_ts) as f64 / 1000.0;
                if duration_s > 0.0 {
                    throughput = count as f64 / duration_s;
                }
            }
        }

        Self {
            count,
            avg_ms: round3(avg),
            p95_ms: round3(percentile(&elapsed, 95.0)),
            p99_ms: round3(percentile(&elapsed, 99.0)),
            error_rate_pct: round3(error_rate),
            throughput_tps: round3(throughput),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub bucket_start_ms: i64,
    pub tps: f64,
    pub p95_ms: f64,
    pub count: u64,
}

/// Partition timestamped observations into absolute 10-second windows.
/// Windows with no observations are omitted.
pub fn time_buckets(observations: &[Observation]) -> Vec<TimeBucket> {
    let mut windows: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        if let Some(ts) = obs.timestamp {
            let bucket = ts.div_euclid(BUCKET_WIDTH_MS) * BUCKET_WIDTH_MS;
            windows.entry(bucket).or_default().push(obs.elapsed);
        }
    }
    windows
        .into_iter()
        .map(|(start, mut values)| {
            values.sort_by(|a, b| a.total_cmp(b));
            let count = values.len() as u64;
            TimeBucket {
                bucket_start_ms: start,
                tps: round3(count as f64 / 10.0),
                p95_ms: round3(percentile(&values, 95.0)),
                count,
            }
        })
        .collect()
}
