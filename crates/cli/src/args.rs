//! Command-line arguments and their translation into run configuration.

use clap::{Parser, ValueEnum};
use signal::{ReportConfig, ReportError, RunSettings, Timestamp};

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Summarise the Kubernetes CI signal from the GitHub project board, the
/// failing/flaky issue listings and the TestGrid release dashboards.
#[derive(Parser)]
#[command(name = "ci-signal-report", version, about, long_about = None)]
pub struct Cli {
    /// GitHub access token used for every API request
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Omit the Observing and Resolved buckets and the per-job details
    #[arg(long)]
    pub short: bool,

    /// Print without emojis
    #[arg(long)]
    pub emoji_off: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Add the blocking and informing dashboards of a release (e.g. 1.31);
    /// repeatable or comma-separated
    #[arg(long = "release-version", value_delimiter = ',')]
    pub release_versions: Vec<String>,

    /// Only list issues updated at or after this RFC 3339 timestamp
    #[arg(long, value_parser = parse_since)]
    pub since: Option<Timestamp>,

    /// Maximum concurrent requests per upstream service
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Attempts per request, including the first one
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn parse_since(value: &str) -> Result<Timestamp, String> {
    Timestamp::parse_rfc3339(value)
        .ok_or_else(|| format!("'{value}' is not an RFC 3339 timestamp"))
}

impl Cli {
    /// Builds the validated report configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Configuration`] for an empty token or any
    /// setting [`ReportConfig::validate`] rejects.
    pub fn report_config(&self) -> Result<ReportConfig, ReportError> {
        if self.github_token.trim().is_empty() {
            return Err(ReportError::Configuration {
                message: "GITHUB_TOKEN (or --github-token) must not be empty".into(),
            });
        }
        let mut config = ReportConfig::default();
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(attempts) = self.max_attempts {
            config.retry.max_attempts = attempts;
        }
        config.set_since(self.since);
        config.validate()?;
        Ok(config)
    }

    /// Builds the validated settings of this run.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Configuration`] for a malformed release version.
    pub fn run_settings(&self) -> Result<RunSettings, ReportError> {
        let versions = self
            .release_versions
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        let settings = RunSettings::new(self.short, self.emoji_off, versions);
        settings.validate()?;
        Ok(settings)
    }
}
