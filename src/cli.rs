use std::path::PathBuf;

use clap::{Parser, Subcommand};

use jperf_core::DEFAULT_SLA_MS;

#[derive(Debug, Parser)]
#[command(name = "jperf")]
#[command(about = "Load-test run diagnosis tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze one load-test run and print a diagnosis report as JSON
    #[command(arg_required_else_help = true)]
    Analyze {
        /// Load-test samples (CSV with elapsed/timestamp/success columns)
        samples: PathBuf,
        /// Runtime telemetry snapshot (JSON); optional, best-effort
        telemetry: Option<PathBuf>,
        /// p95 latency threshold in milliseconds
        #[arg(long, default_value_t = DEFAULT_SLA_MS)]
        sla_ms: f64,
        /// Framework hint (e.g. Vert.x, Tomcat), only affects recommendations
        #[arg(long)]
        framework: Option<String>,
        /// JDK version hint (e.g. 8, 21), only affects recommendations
        #[arg(long)]
        jdk: Option<String>,
        /// Session id; enables comparison against the previous run
        #[arg(long)]
        session: Option<String>,
        /// Directory for persisted session summaries
        #[arg(long, default_value = "data/sessions")]
        state_dir: PathBuf,
        /// Request a free-text annotation from the configured model
        #[arg(long)]
        annotate: bool,
        /// Explicit config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
