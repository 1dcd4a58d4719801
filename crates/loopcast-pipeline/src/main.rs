//! Loopcast pipeline binary.
//!
//! Reads a job spec (JSON) from the path given on the command line, runs
//! it to completion, and prints the artifact path. The library surface is
//! asynchronous submit-then-poll; this binary is the wait-for-completion
//! convenience wrapper around it.

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use loopcast_models::JobSpec;
use loopcast_pipeline::{Pipeline, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("loopcast=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let Some(spec_path) = std::env::args().nth(1) else {
        bail!("usage: loopcastd <job-spec.json>");
    };

    let spec_json = tokio::fs::read_to_string(&spec_path)
        .await
        .with_context(|| format!("reading job spec {spec_path}"))?;
    let spec: JobSpec =
        serde_json::from_str(&spec_json).with_context(|| format!("parsing job spec {spec_path}"))?;

    let config = PipelineConfig::from_env();
    info!(?config, "Starting loopcastd");

    let pipeline = Arc::new(Pipeline::new(config));
    let job = pipeline.run_to_completion(spec).await?;

    match job.output_path {
        Some(path) => {
            info!(job_id = %job.id, "Job completed");
            println!("{}", path.display());
            Ok(())
        }
        None => {
            bail!(
                "job {} failed: {}",
                job.id,
                job.error_message.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}
