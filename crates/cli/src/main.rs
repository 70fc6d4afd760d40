//! CI signal report CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: read flags and environment with `clap`, then
//!    validate everything before a single request is issued.
//! 2. **Wire observability**: install `tracing-subscriber` (text or JSON on
//!    stderr) and, when configured, an OpenTelemetry OTLP exporter. All
//!    `tracing` spans and events emitted by the workspace crates flow through
//!    it.
//! 3. **Construct infrastructure**: create the `GithubClient` and
//!    `TestgridClient` adapters and inject them into the report sources.
//! 4. **Run and render**: generate the report and print it to stdout as text
//!    or JSON.
//!
//! Fetch failures never abort the run; they are shown inline as unavailable
//! sections and the exit status stays zero.

mod args;
mod render;
mod telemetry;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use collectors::{generate_report, GithubSource, ReportSource, TestgridSource};
use github::GithubClient;
use testgrid::TestgridClient;

use crate::args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.log_format)?;
    let result = run(cli).await;
    if let Err(error) = &result {
        tracing::error!(error = %format!("{error:#}"), "Report run failed");
    }
    telemetry.shutdown();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Arc::new(cli.report_config()?);
    let settings = cli.run_settings()?;

    let github = Arc::new(GithubClient::new(
        config.github_api_url.as_str(),
        cli.github_token.as_str(),
        config.retry,
    )?);
    let testgrid = Arc::new(TestgridClient::new(
        config.testgrid_url.as_str(),
        config.retry,
    )?);
    let sources: Vec<Arc<dyn ReportSource>> = vec![
        Arc::new(GithubSource::new(Arc::clone(&config), github.clone(), github)),
        Arc::new(TestgridSource::new(Arc::clone(&config), testgrid)),
    ];

    let report = generate_report(&sources, &settings).await;
    if !report.is_complete() {
        tracing::warn!(
            failures = report.failures.len(),
            "Report is partial; unavailable sections are marked inline"
        );
    }

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        render::write_json(&report, settings.run_id, &mut stdout)
    } else {
        render::write_text(&report, settings.emojis_off, &mut stdout)
    }
    .context("failed to write report")?;
    stdout.flush().context("failed to write report")?;
    Ok(())
}
