use std::time::Instant;

use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use jperf_core::{
    default_reader, diagnose, parse_samples, parse_telemetry, time_buckets, Diagnosis,
    DiagnosisContext, OverallStats, RunMetrics, RuntimeReport, TimeBucket,
};
use jperf_store::{compare_runs, RunSummary, SessionStore};

use crate::config::Config;
use crate::prelude::*;

#[derive(Debug)]
pub struct RunInputs<'a> {
    pub samples_text: &'a str,
    pub telemetry_text: Option<&'a str>,
    pub context: DiagnosisContext,
    pub session_id: Option<&'a str>,
    pub annotate: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub diagnosis: Option<Diagnosis>,
    pub overall_stats: Option<OverallStats>,
    pub time_series: Vec<TimeBucket>,
    #[serde(flatten)]
    pub runtime: RuntimeReport,
    pub comparison: Option<String>,
    pub annotation: Option<String>,
    pub error: Option<String>,
}

/// One full run: parse, aggregate, diagnose, compare against the session's
/// previous run, persist, and optionally annotate. A sample schema failure is
/// fatal and surfaces through `error`; unusable telemetry only degrades the
/// runtime summaries.
pub async fn run_analysis(
    inputs: RunInputs<'_>,
    store: &dyn SessionStore,
    metrics: &RunMetrics,
    config: &Config,
) -> AnalysisReport {
    let started = Instant::now();
    metrics.record_run_start();

    let runtime = match inputs.telemetry_text {
        Some(text) => parse_runtime(text),
        None => RuntimeReport::empty(),
    };

    let reader = default_reader();
    let observations = match parse_samples(inputs.samples_text, reader.as_ref()) {
        Ok(observations) => observations,
        Err(e) => {
            error!("Failed to parse load-test samples: {e}");
            metrics.record_analysis_time(started.elapsed());
            return AnalysisReport {
                summary: String::new(),
                diagnosis: None,
                overall_stats: None,
                time_series: Vec::new(),
                runtime,
                comparison: None,
                annotation: None,
                error: Some(e.to_string()),
            };
        }
    };

    let overall = OverallStats::from_observations(&observations);
    let buckets = time_buckets(&observations);
    info!(
        "Parsed {} samples, {} time buckets, {} GC events counted",
        overall.count,
        buckets.len(),
        runtime.gc_summary.total_gc_count
    );

    let diagnosis = diagnose(
        &overall,
        &buckets,
        &runtime.gc_summary,
        &runtime.heap_trend,
        runtime.cpu_flag,
        &inputs.context,
    );
    let mut summary = summarize(&diagnosis);

    let mut comparison = None;
    let mut annotation = None;
    if let Some(session_id) = inputs.session_id {
        let current = RunSummary {
            diagnosis: diagnosis.clone(),
            overall_stats: Some(overall.clone()),
            gc_summary: Some(runtime.gc_summary.clone()),
        };
        match store.load(session_id) {
            Ok(Some(previous)) => {
                if let Some(text) = compare_runs(&previous, &current) {
                    summary.push_str("\n\nComparison with previous run:\n");
                    summary.push_str(&text);
                    comparison = Some(text);
                }
            }
            Ok(None) => debug!("No previous summary for session {session_id}"),
            Err(e) => warn!("Failed to load previous summary for session {session_id}: {e}"),
        }
        match store.save(session_id, &current) {
            Ok(()) => {
                if inputs.annotate {
                    annotation = annotate_diagnosis(config, &diagnosis).await;
                }
            }
            Err(e) => warn!("Failed to save summary for session {session_id}: {e}"),
        }
    }

    metrics.record_run_end(diagnosis.classification, Some(overall.p95_ms));
    metrics.record_analysis_time(started.elapsed());

    AnalysisReport {
        summary,
        diagnosis: Some(diagnosis),
        overall_stats: Some(overall),
        time_series: buckets,
        runtime,
        comparison,
        annotation,
        error: None,
    }
}

fn parse_runtime(text: &str) -> RuntimeReport {
    match parse_telemetry(text) {
        Ok(snapshot) => RuntimeReport::from_snapshot(&snapshot),
        Err(e) => {
            warn!("Telemetry not parseable ({e}), continuing with empty runtime summaries");
            RuntimeReport::empty()
        }
    }
}

fn summarize(diagnosis: &Diagnosis) -> String {
    let mut lines = vec![format!("Classification: {}", diagnosis.classification)];
    if !diagnosis.findings.is_empty() {
        lines.push("Top findings:".to_string());
        for finding in diagnosis.findings.iter().take(3) {
            lines.push(format!(" - {finding}"));
        }
    }
    if !diagnosis.recommendations.is_empty() {
        lines.push("Top recommendations:".to_string());
        for recommendation in diagnosis.recommendations.iter().take(3) {
            lines.push(format!(" - {recommendation}"));
        }
    }
    lines.join("\n")
}

/// Best-effort free-text annotation. Never fails the run; a missing key or a
/// refused request only leaves the annotation absent.
async fn annotate_diagnosis(config: &Config, diagnosis: &Diagnosis) -> Option<String> {
    if config.api_key.is_none() {
        debug!("Annotation requested but no API key is configured, skipping");
        return None;
    }
    match call_model(config, diagnosis).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Annotation skipped: {e}");
            None
        }
    }
}

async fn call_model(config: &Config, diagnosis: &Diagnosis) -> Result<String> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| Error::Annotation("no API key configured".to_string()))?;
    let diagnosis_json = serde_json::to_string(diagnosis)?;
    let request_body = json!({
        "model": config.model(),
        "messages": [
            {
                "role": "system",
                "content": "You are an expert JVM performance analyst. The audience already sees \
                            the structured diagnosis. Write a concise technical note on the likely \
                            bottleneck and the most valuable next step. Keep it short. Format as Markdown."
            },
            {
                "role": "user",
                "content": format!(
                    "Annotate this load-test diagnosis. Interpret the findings, do not repeat them \
                     verbatim.\n\n```json\n{}\n```",
                    diagnosis_json
                )
            }
        ],
        "stream": false
    });

    let client = Client::new();
    let response = client
        .post(format!("{}/chat/completions", config.api_url()))
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&request_body)
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(Error::Annotation(error_text));
    }

    let response_json: serde_json::Value = response.json().await?;
    let content = response_json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| Error::Annotation("invalid response format".to_string()))?;
    Ok(content.to_string())
}
