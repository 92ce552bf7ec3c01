use serde_json::Value;

use crate::error::{Error, Result};

pub const START_ALIASES: &[&str] = &["test_start_ms", "start_ms"];
pub const END_ALIASES: &[&str] = &["test_end_ms", "end_ms"];
pub const PAUSE_ALIASES: &[&str] = &["pause_ms", "duration_ms", "pause"];
pub const EVENT_TS_ALIASES: &[&str] = &["timestamp_ms", "ts_ms"];
pub const HEAP_USED_ALIASES: &[&str] = &["used_mb", "heap_used_mb", "used"];
pub const HEAP_START_ALIASES: &[&str] = &["start_mb", "start_heap_mb"];
pub const HEAP_END_ALIASES: &[&str] = &["end_mb", "end_heap_mb"];
pub const HEAP_MAX_ALIASES: &[&str] = &["max_mb", "max_heap_mb"];
pub const CPU_ALIASES: &[&str] = &["system_pct", "process_pct", "cpu_pct"];

#[derive(Debug, Clone, PartialEq)]
pub struct GcEvent {
    pub timestamp_ms: Option<i64>,
    pub pause_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeapSample {
    pub timestamp_ms: Option<i64>,
    pub used_mb: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub gc_events: Vec<GcEvent>,
    pub declared_gc_count: Option<u64>,
    pub heap_samples: Vec<HeapSample>,
    pub heap_start_mb: Option<f64>,
    pub heap_end_mb: Option<f64>,
    pub heap_max_mb: Option<f64>,
    pub cpu_pct: Option<f64>,
}

/// First *present* key wins; a present-but-null or zero value still wins its
/// slot, keeping the lookup order enumerable.
fn field<'a>(value: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    let map = value.as_object()?;
    aliases.iter().find_map(|key| map.get(*key))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_ms(value: &Value) -> Option<i64> {
    as_f64(value).map(|v| v as i64)
}

pub fn parse_telemetry(text: &str) -> Result<TelemetrySnapshot> {
    let data: Value =
        serde_json::from_str(text).map_err(|e| Error::MalformedInput(e.to_string()))?;
    if !data.is_object() {
        return Err(Error::MalformedInput("expected a JSON object".to_string()));
    }

    let mut snapshot = TelemetrySnapshot {
        start_ms: field(&data, START_ALIASES).and_then(as_ms),
        end_ms: field(&data, END_ALIASES).and_then(as_ms),
        ..TelemetrySnapshot::default()
    };

    if let Some(gc) = data.get("gc") {
        snapshot.declared_gc_count = field(gc, &["total_gc_count"])
            .and_then(as_f64)
            .map(|v| v as u64);
        if let Some(events) = field(gc, &["events"]).and_then(Value::as_array) {
            for event in events {
                // an event with no usable pause value carries no signal
                let Some(pause_ms) = field(event, PAUSE_ALIASES).and_then(as_f64) else {
                    continue;
                };
                snapshot.gc_events.push(GcEvent {
                    timestamp_ms: field(event, EVENT_TS_ALIASES).and_then(as_ms),
                    pause_ms,
                });
            }
        }
    }

    if let Some(heap) = data.get("heap") {
        if let Some(samples) = field(heap, &["samples"]).and_then(Value::as_array) {
            for sample in samples {
                snapshot.heap_samples.push(HeapSample {
                    timestamp_ms: field(sample, EVENT_TS_ALIASES).and_then(as_ms),
                    used_mb: field(sample, HEAP_USED_ALIASES)
                        .and_then(as_f64)
                        .unwrap_or(0.0),
                });
            }
        }
        snapshot.heap_start_mb = field(heap, HEAP_START_ALIASES).and_then(as_f64);
        snapshot.heap_end_mb = field(heap, HEAP_END_ALIASES).and_then(as_f64);
        snapshot.heap_max_mb = field(heap, HEAP_MAX_ALIASES).and_then(as_f64);
    }

    match data.get("cpu") {
        Some(cpu @ Value::Object(_)) => snapshot.cpu_pct = field(cpu, CPU_ALIASES).and_then(as_f64),
        Some(scalar) => snapshot.cpu_pct = as_f64(scalar),
        None => {}
    }

    Ok(snapshot)
}
