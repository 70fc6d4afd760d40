//! Shape of the TestGrid `/<dashboard>/summary` document.
//!
//! The document is a JSON object keyed by job name. Only the fields the
//! report reads are modelled; everything else is ignored.

use std::collections::BTreeMap;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use signal::{DashboardJob, FailingTest, FetchError, OverallStatus};

#[derive(Debug, Deserialize)]
struct JobSummary {
    overall_status: OverallStatus,
    #[serde(default)]
    status: String,
    #[serde(default)]
    tests: Option<Vec<FailingTest>>,
}

/// Decodes a summary document into jobs ordered by name.
pub(crate) fn decode_summary(url: &str, body: &str) -> Result<Vec<DashboardJob>, FetchError> {
    let jobs: BTreeMap<String, JobSummary> =
        serde_json::from_str(body).map_err(|e| FetchError::decode(url, e.to_string()))?;
    Ok(jobs
        .into_iter()
        .map(|(name, job)| DashboardJob {
            name,
            overall_status: job.overall_status,
            status_text: job.status,
            tests: job.tests.unwrap_or_default(),
        })
        .collect())
}

/// Maps a non-success response status to a [`FetchError`], keeping the
/// server's `Retry-After` hint.
pub(crate) fn status_error(url: &str, status: StatusCode, headers: &HeaderMap) -> FetchError {
    let retry_after = headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok());
    FetchError::status(
        url,
        status.as_u16(),
        status.canonical_reason().unwrap_or("unexpected status"),
        retry_after,
    )
}
