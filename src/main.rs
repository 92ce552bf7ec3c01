mod analyze;
mod cli;
mod config;
mod error;

pub mod prelude {
    pub use crate::error::*;
    pub use tracing::{debug, error, info, warn};
}

use std::fs;

use clap::Parser;
use dotenvy::dotenv;

use jperf_core::{DiagnosisContext, RunMetrics};
use prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();
    info!(
        "{} v{}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION")
    );

    let cli = cli::Cli::parse();
    match cli.command {
        cli::Commands::Analyze {
            samples,
            telemetry,
            sla_ms,
            framework,
            jdk,
            session,
            state_dir,
            annotate,
            config,
        } => {
            let config = config::Config::load(config.as_deref());
            let metrics = RunMetrics::new();
            let store = jperf_store::open_default(&state_dir);

            let samples_text = fs::read_to_string(&samples)?;
            let telemetry_text = match &telemetry {
                Some(path) => Some(fs::read_to_string(path)?),
                None => None,
            };

            let report = analyze::run_analysis(
                analyze::RunInputs {
                    samples_text: &samples_text,
                    telemetry_text: telemetry_text.as_deref(),
                    context: DiagnosisContext {
                        sla_ms,
                        framework,
                        jdk,
                    },
                    session_id: session.as_deref(),
                    annotate,
                },
                store.as_ref(),
                &metrics,
                &config,
            )
            .await;

            println!("{}", serde_json::to_string_pretty(&report)?);
            debug!("Run metrics: {:?}", metrics.snapshot());

            if let Some(error) = &report.error {
                error!("Analysis failed: {error}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
