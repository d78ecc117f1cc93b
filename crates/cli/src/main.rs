//! Digger orchestrator CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments** with `clap`, falling back to the GitHub Actions
//!    environment (`GITHUB_CONTEXT`, `GITHUB_TOKEN`).
//! 2. **Wire observability**: `tracing-subscriber` with a human or JSON
//!    formatter, plus an optional OpenTelemetry OTLP exporter.
//! 3. **Load inputs**: `digger.yml` and the Actions `github` context.
//! 4. **Construct infrastructure**: a [`github::GithubService`] for the
//!    event's repository, injected into the run.
//! 5. **Emit** the job document as pretty JSON on stdout or to `--output`.

mod run;
mod telemetry;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use github::GithubService;
use orchestrator::{DiggerConfig, EventPackage, RunId};
use tracing::{info, info_span, Instrument};

use crate::run::{run_event, Outcome};

#[derive(Parser)]
#[command(name = "digger-orchestrator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turns a GitHub event into Digger jobs", long_about = None)]
struct Args {
    /// Path to the Digger configuration file
    #[arg(long, default_value = "digger.yml")]
    config: PathBuf,

    /// Path to a file holding the GitHub Actions context (default: $GITHUB_CONTEXT)
    #[arg(long)]
    github_context: Option<PathBuf>,

    /// GitHub token used for API calls
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Write the job document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit logs as newline-delimited JSON
    #[arg(long)]
    json_logs: bool,

    /// OTLP/gRPC endpoint for span export
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = telemetry::init(args.json_logs, args.otlp_endpoint.as_deref())?;

    let run_id = RunId::new_random();
    execute(args, run_id)
        .instrument(info_span!("run", run_id = %run_id))
        .await
}

async fn execute(args: Args, run_id: RunId) -> Result<()> {
    let config_text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    let config = DiggerConfig::from_yaml_str(&config_text)
        .with_context(|| format!("invalid configuration in {}", args.config.display()))?;

    let context = match &args.github_context {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => std::env::var("GITHUB_CONTEXT")
            .context("GITHUB_CONTEXT is not set and --github-context was not given")?,
    };
    let package = EventPackage::from_github_context(&context)?;
    info!(
        event = %package.event_name,
        repository = %package.repository,
        actor = %package.actor,
        "classified event"
    );

    let service = GithubService::from_token(args.token, &package.repository)?;

    let document = match run_event(run_id, &config, &package, &service).await? {
        Outcome::Help => return Ok(()),
        Outcome::Jobs(document) => document,
    };

    let json = serde_json::to_string_pretty(&document)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
