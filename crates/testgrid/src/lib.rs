//! CI signal report TestGrid infrastructure adapter.
//!
//! Implements [`signal::DashboardSource`] against TestGrid's public summary
//! documents (`<base>/<dashboard>/summary`).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, status mapping, bounded retries and
//! document decoding live here. Scoring and aggregation stay in [`signal`]
//! and `collectors`.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use signal::{Dashboard, DashboardJob, DashboardSource, FetchError, ReportError, RetrySchedule};

const USER_AGENT: &str = concat!("ci-signal-report/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TestGrid HTTP client.
#[derive(Debug, Clone)]
pub struct TestgridClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetrySchedule,
}

impl TestgridClient {
    /// Creates a client for the TestGrid instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Configuration`] if the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, retry: RetrySchedule) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReportError::Configuration {
                message: format!("cannot build TestGrid HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    fn summary_url(&self, dashboard: &Dashboard) -> String {
        format!("{}/{}/summary", self.base_url, dashboard.name)
    }

    async fn fetch_summary(&self, url: &str) -> Result<Vec<DashboardJob>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::connection(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(wire::status_error(url, status, response.headers()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::connection(url, e.to_string()))?;
        wire::decode_summary(url, &body)
    }
}

#[async_trait]
impl DashboardSource for TestgridClient {
    async fn summary(&self, dashboard: &Dashboard) -> Result<Vec<DashboardJob>, FetchError> {
        let url = self.summary_url(dashboard);
        tracing::debug!(%url, "Fetching dashboard summary");
        self.retry
            .run(|| self.fetch_summary(&url), tokio::time::sleep)
            .await
    }

    fn job_url(&self, dashboard: &Dashboard, job: &str) -> String {
        format!("{}/{}#{job}", self.base_url, dashboard.name)
    }
}
