//! TestGrid dashboard jobs: health buckets, severity scoring and records.
//!
//! Severity is a pure function of the job's overall status and its recent
//! run history, which TestGrid only exposes as human-readable text such as
//! `"8 of 9 (88.9%) recent columns passed (19455 of 19458 or 100.0% cells)"`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{EmojiSet, FetchError, JobDetailRecord, JobSummaryRecord, Severity, StatusCounts};

static RECENT_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<passes>\d+)\s+of\s+(?P<runs>\d+)").expect("valid regex literal")
});

static TEST_SIG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sig-[a-zA-Z]+(?:-[a-zA-Z]+)*").expect("valid regex literal")
});

/// Jobs with at most this many recent runs are too new to judge.
pub const NEW_TEST_MAX_RUNS: u32 = 5;
/// Pass rates at or below this are [`Severity::High`].
pub const HIGH_SEVERITY_MAX_RATE: f64 = 0.5;
/// Pass rates at or below this (and above the high bound) are
/// [`Severity::Medium`].
pub const MEDIUM_SEVERITY_MAX_RATE: f64 = 0.8;

/// Health of a job as reported by TestGrid.
///
/// Any status other than passing, failing or flaky decodes as
/// [`OverallStatus::Stale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Passing,
    Failing,
    Flaky,
    #[serde(other)]
    Stale,
}

impl OverallStatus {
    /// Returns the upper-case TestGrid spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passing => "PASSING",
            Self::Failing => "FAILING",
            Self::Flaky => "FLAKY",
            Self::Stale => "STALE",
        }
    }
}

/// A currently failing test of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailingTest {
    pub test_name: String,
}

/// One job of a dashboard summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardJob {
    pub name: String,
    pub overall_status: OverallStatus,
    /// Free-text status line containing the recent run history.
    pub status_text: String,
    pub tests: Vec<FailingTest>,
}

impl DashboardJob {
    /// Returns the distinct `sig-*` names mentioned by the job's failing
    /// tests, in lexical order.
    pub fn involved_sigs(&self) -> Vec<String> {
        self.tests
            .iter()
            .flat_map(|t| TEST_SIG.find_iter(&t.test_name))
            .map(|m| m.as_str().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Passes out of recent runs, as parsed from the status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentRuns {
    pub passes: u32,
    pub runs: u32,
}

impl RecentRuns {
    /// Extracts the first `"<passes> of <runs>"` pair from `status_text`.
    pub fn parse(status_text: &str) -> Option<Self> {
        let caps = RECENT_RUNS.captures(status_text)?;
        Some(Self {
            passes: caps["passes"].parse().ok()?,
            runs: caps["runs"].parse().ok()?,
        })
    }
}

/// Outcome of scoring one failing or flaky job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub severity: Severity,
    /// The job has too few runs for rate-based scoring.
    pub new_test: bool,
    pub recent: RecentRuns,
}

/// Scores a job from its recent run history.
///
/// A job with at most [`NEW_TEST_MAX_RUNS`] runs is always
/// [`Severity::Light`] and flagged as new, whatever its pass rate.
pub fn score(recent: RecentRuns) -> Score {
    if recent.runs <= NEW_TEST_MAX_RUNS {
        return Score {
            severity: Severity::Light,
            new_test: true,
            recent,
        };
    }
    let rate = f64::from(recent.passes) / f64::from(recent.runs);
    let severity = if rate <= HIGH_SEVERITY_MAX_RATE {
        Severity::High
    } else if rate <= MEDIUM_SEVERITY_MAX_RATE {
        Severity::Medium
    } else {
        Severity::Light
    };
    Score {
        severity,
        new_test: false,
        recent,
    }
}

/// Scores `job` from its status text.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] when the status text carries no
/// `"<passes> of <runs>"` pattern.
pub fn score_job(job: &DashboardJob) -> Result<Score, FetchError> {
    RecentRuns::parse(&job.status_text)
        .map(score)
        .ok_or_else(|| {
            FetchError::decode(
                job.name.as_str(),
                format!("no recent run history in status '{}'", job.status_text),
            )
        })
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Counts `jobs` by status and renders the summary notes.
pub fn summarize(jobs: &[DashboardJob]) -> JobSummaryRecord {
    let mut counts = StatusCounts {
        total: jobs.len(),
        ..StatusCounts::default()
    };
    for job in jobs {
        match job.overall_status {
            OverallStatus::Passing => counts.passing += 1,
            OverallStatus::Failing => counts.failing += 1,
            OverallStatus::Flaky => counts.flaky += 1,
            OverallStatus::Stale => counts.stale += 1,
        }
    }

    let mut notes = vec![
        format!("{} jobs total", counts.total),
        format!("{} jobs passing", counts.passing),
        format!("{} jobs flaky", counts.flaky),
        format!("{} jobs failing", counts.failing),
    ];
    if counts.stale != 0 {
        notes.push(format!("{} jobs stale", counts.stale));
    }
    JobSummaryRecord { counts, notes }
}

/// Builds the detail record of a non-passing job.
///
/// Stale jobs are not scored. A failing or flaky job whose status text cannot
/// be parsed keeps [`Severity::None`] and says so in its notes.
pub fn detail_record(job: &DashboardJob, url: String, emojis: &EmojiSet) -> JobDetailRecord {
    let mut record = JobDetailRecord {
        title: job.name.clone(),
        status: job.overall_status.as_str().to_string(),
        severity: Severity::None,
        highlight: String::new(),
        new_test: false,
        url,
        sigs: Vec::new(),
        notes: Vec::new(),
    };

    if job.overall_status == OverallStatus::Failing {
        record.sigs = job.involved_sigs();
        record.notes.push(format!("SIGs involved: {}", record.sigs.join(", ")));
        record
            .notes
            .push(format!("Currently {} tests are failing", job.tests.len()));
    }

    let marker = match job.overall_status {
        OverallStatus::Failing => &emojis.status_failing,
        OverallStatus::Flaky => &emojis.status_flaky,
        OverallStatus::Passing | OverallStatus::Stale => return record,
    };

    match score_job(job) {
        Ok(score) => {
            let marker = if score.new_test {
                &emojis.status_new_test
            } else {
                marker
            };
            record.severity = score.severity;
            record.new_test = score.new_test;
            record.highlight = marker.repeat(score.severity.intensity());
            record.notes.push(format!(
                "{} of {} passed recently",
                score.recent.passes, score.recent.runs
            ));
        }
        Err(err) => {
            tracing::warn!(job = %job.name, error = %err, "Job severity could not be scored");
            record.notes.push("recent run history unavailable".into());
        }
    }
    record
}
