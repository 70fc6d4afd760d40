//! Configuration values passed to every component at construction.
//!
//! [`ReportConfig`] holds the long-lived settings (board and column ids, issue
//! queries, emoji tokens, concurrency limits). Its [`Default`] reproduces the
//! production values of the Kubernetes CI signal board. [`RunSettings`] holds
//! the per-invocation inputs.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    ColumnId, DashboardName, LabelName, ProjectId, ReportError, ReportField, ReportRunId,
    RepositoryId, RetrySchedule, Timestamp,
};

static RELEASE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("valid regex literal"));

// ---------------------------------------------------------------------------
// Emoji tokens
// ---------------------------------------------------------------------------

/// Visual markers used for section headers, highlights and label notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiSet {
    pub not_yet_started: String,
    pub in_flight: String,
    pub observing: String,
    pub resolved: String,
    pub failing_issues: String,
    pub flaky_issues: String,
    pub master_blocking: String,
    pub master_informing: String,
    /// Highlight marker for a failing job.
    pub status_failing: String,
    /// Highlight marker for a flaky job.
    pub status_flaky: String,
    /// Highlight marker for a job with too few runs to judge.
    pub status_new_test: String,
    /// Issue created more than three months ago.
    pub issue_old: String,
    /// Issue created within the last five days.
    pub issue_fresh: String,
    /// Prefix for `priority/*` labels in issue notes.
    pub priority_label: String,
    /// Prefix for `kind/*` labels in issue notes.
    pub kind_label: String,
}

impl Default for EmojiSet {
    fn default() -> Self {
        Self {
            not_yet_started: "\u{1F914}".into(),
            in_flight: "\u{1F6EB}".into(),
            observing: "\u{1F440}".into(),
            resolved: "\u{1F389}".into(),
            failing_issues: "\u{1F6A8}".into(),
            flaky_issues: "\u{1F300}".into(),
            master_blocking: "\u{26D4}".into(),
            master_informing: "\u{1F4A1}".into(),
            status_failing: "\u{1F534}".into(),
            status_flaky: "\u{1F7E3}".into(),
            status_new_test: "\u{1F195}".into(),
            issue_old: "\u{1F578}".into(),
            issue_fresh: "\u{2728}".into(),
            priority_label: "\u{1F525}".into(),
            kind_label: "\u{1F3F7}".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Board buckets
// ---------------------------------------------------------------------------

/// How a bucket's board column is located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnLocator {
    /// A fixed, known column id.
    Id(ColumnId),
    /// Resolve by exact column name; the lowest id wins on duplicates.
    Named(String),
}

/// One logical triage bucket of the CI signal board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub field: ReportField,
    pub column: ColumnLocator,
    /// Skip this bucket entirely (no request issued) in short mode.
    pub omit_when_short: bool,
}

// ---------------------------------------------------------------------------
// Issue listings
// ---------------------------------------------------------------------------

/// A filtered, paginated issue listing that becomes one report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueQuery {
    pub field: ReportField,
    pub repository: RepositoryId,
    pub labels: Vec<LabelName>,
    /// Only issues updated at or after this time.
    pub since: Option<Timestamp>,
    pub per_page: u32,
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

/// A TestGrid dashboard to summarise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub field: ReportField,
    pub name: DashboardName,
}

// ---------------------------------------------------------------------------
// Report configuration
// ---------------------------------------------------------------------------

/// Long-lived configuration of the report sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub github_api_url: String,
    pub project: ProjectId,
    pub buckets: Vec<BucketConfig>,
    pub issue_queries: Vec<IssueQuery>,
    pub testgrid_url: String,
    /// Prefix joined to `master-blocking` etc. to form the dashboard path.
    pub dashboard_prefix: String,
    pub emojis: EmojiSet,
    /// Maximum number of upstream requests in flight per source.
    pub concurrency: usize,
    /// Number of fetched pages allowed to wait for classification.
    pub prefetch: usize,
    pub retry: RetrySchedule,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let emojis = EmojiSet::default();
        let repository = RepositoryId::kubernetes();
        let bucket = |emoji: &str, title: &str, column: ColumnLocator, omit_when_short: bool| {
            BucketConfig {
                field: ReportField::new(emoji, title),
                column,
                omit_when_short,
            }
        };
        let query = |emoji: &str, title: &str, label: &str| IssueQuery {
            field: ReportField::new(emoji, title),
            repository: repository.clone(),
            labels: LabelName::new(label).into_iter().collect(),
            since: None,
            per_page: 100,
        };

        Self {
            github_api_url: "https://api.github.com".into(),
            project: ProjectId::new(2_093_513),
            buckets: vec![
                bucket(
                    &emojis.not_yet_started,
                    "New/Not Yet Started",
                    ColumnLocator::Id(ColumnId::new(4_212_817)),
                    false,
                ),
                bucket(
                    &emojis.in_flight,
                    "In flight",
                    ColumnLocator::Id(ColumnId::new(4_212_819)),
                    false,
                ),
                bucket(
                    &emojis.observing,
                    "Observing",
                    ColumnLocator::Id(ColumnId::new(4_212_821)),
                    true,
                ),
                bucket(
                    &emojis.resolved,
                    "Resolved",
                    ColumnLocator::Named("Resolved".into()),
                    true,
                ),
            ],
            issue_queries: vec![
                query(&emojis.failing_issues, "Failing Test Issues", "kind/failing-test"),
                query(&emojis.flaky_issues, "Flaky Test Issues", "kind/flake"),
            ],
            testgrid_url: "https://testgrid.k8s.io".into(),
            dashboard_prefix: "sig-release-".into(),
            emojis,
            concurrency: 8,
            prefetch: 2,
            retry: RetrySchedule::default(),
        }
    }
}

impl ReportConfig {
    /// Checks the invariants every component relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Configuration`] for a zero concurrency limit, a
    /// zero attempt budget, a zero page size, or a malformed repository.
    pub fn validate(&self) -> Result<(), ReportError> {
        let fail = |message: String| Err(ReportError::Configuration { message });
        if self.concurrency == 0 {
            return fail("concurrency limit must be at least 1".into());
        }
        if self.prefetch == 0 {
            return fail("prefetch depth must be at least 1".into());
        }
        if self.retry.max_attempts == 0 {
            return fail("retry attempts must be at least 1".into());
        }
        for query in &self.issue_queries {
            if query.per_page == 0 {
                return fail(format!("page size of '{}' must be at least 1", query.field));
            }
            if query.repository.split().is_none() {
                return fail(format!(
                    "repository '{}' is not in owner/repo format",
                    query.repository
                ));
            }
        }
        Ok(())
    }

    /// Applies a `since` filter to every issue query.
    pub fn set_since(&mut self, since: Option<Timestamp>) {
        for query in &mut self.issue_queries {
            query.since = since;
        }
    }

    /// Lists the dashboards to summarise: master-blocking and
    /// master-informing, then a blocking/informing pair per release version.
    pub fn dashboards(&self, release_versions: &[String]) -> Vec<Dashboard> {
        let mut names = vec![
            (
                "Master-Blocking".to_string(),
                "master-blocking".to_string(),
                &self.emojis.master_blocking,
            ),
            (
                "Master-Informing".to_string(),
                "master-informing".to_string(),
                &self.emojis.master_informing,
            ),
        ];
        for version in release_versions {
            names.push((
                format!("{version}-blocking"),
                format!("{version}-blocking"),
                &self.emojis.master_blocking,
            ));
            names.push((
                format!("{version}-informing"),
                format!("{version}-informing"),
                &self.emojis.master_informing,
            ));
        }

        names
            .into_iter()
            .filter_map(|(title, suffix, emoji)| {
                DashboardName::new(format!("{}{suffix}", self.dashboard_prefix)).map(|name| {
                    Dashboard {
                        field: ReportField::new(emoji.as_str(), title),
                        name,
                    }
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Per-run settings
// ---------------------------------------------------------------------------

/// Inputs that vary per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub run_id: ReportRunId,
    /// Summary mode: omit Observing/Resolved buckets and job details.
    pub short: bool,
    /// Emoji-free mode: only changes note markers and presentation.
    pub emojis_off: bool,
    /// Release versions (`"1.31"`) whose dashboards are added to the report.
    pub release_versions: Vec<String>,
    /// Reference time for issue age highlighting.
    pub now: Timestamp,
}

impl RunSettings {
    /// Creates settings for a fresh run at the current time.
    pub fn new(short: bool, emojis_off: bool, release_versions: Vec<String>) -> Self {
        Self {
            run_id: ReportRunId::new_random(),
            short,
            emojis_off,
            release_versions,
            now: Timestamp::now(),
        }
    }

    /// Checks that every release version looks like `<major>.<minor>`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Configuration`] naming the first bad version.
    pub fn validate(&self) -> Result<(), ReportError> {
        match self
            .release_versions
            .iter()
            .find(|v| !RELEASE_VERSION.is_match(v))
        {
            Some(bad) => Err(ReportError::Configuration {
                message: format!("release version '{bad}' must look like 1.31"),
            }),
            None => Ok(()),
        }
    }
}
