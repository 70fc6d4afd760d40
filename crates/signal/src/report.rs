//! The in-memory report handed to the presentation layer.
//!
//! A [`Report`] maps each [`ReportField`] (one section) to the records
//! collected for it. Records arrive in network-completion order, so the
//! mapping's iteration order and each section's insertion order carry no
//! meaning; [`Report::sorted_sections`] is the only ordering presentation may
//! rely on.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{FetchError, IssueNumber, Severity};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Identifies one report section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportField {
    pub emoji: String,
    pub title: String,
}

impl ReportField {
    /// Creates a [`ReportField`].
    pub fn new(emoji: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            title: title.into(),
        }
    }
}

impl std::fmt::Display for ReportField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Identity of a record within its section.
///
/// [`RecordKey::DashboardSummary`] is the reserved key of the one aggregate
/// record per dashboard section; it sorts before every other key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKey {
    DashboardSummary,
    Issue(IssueNumber),
    Job(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A record derived from a GitHub issue (board card or issue listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: IssueNumber,
    pub url: String,
    pub title: String,
    /// Owning SIG, empty when the issue carries no `sig/*` label.
    pub sig: String,
    /// Age markers (issue listings only).
    pub highlight: String,
    pub notes: Vec<String>,
}

/// Job counts of one dashboard, by overall status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub passing: usize,
    pub flaky: usize,
    pub failing: usize,
    pub stale: usize,
}

/// The aggregate record of a dashboard section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummaryRecord {
    pub counts: StatusCounts,
    pub notes: Vec<String>,
}

/// One non-passing job of a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetailRecord {
    /// Job name.
    pub title: String,
    /// Upper-case overall status (`FAILING`, `FLAKY`, `STALE`).
    pub status: String,
    pub severity: Severity,
    pub highlight: String,
    /// Set when the job has too few runs for rate-based scoring.
    pub new_test: bool,
    pub url: String,
    /// Distinct `sig-*` names found in failing test names (failing jobs only).
    pub sigs: Vec<String>,
    pub notes: Vec<String>,
}

/// One entry under a report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRecord {
    Issue(IssueRecord),
    JobSummary(JobSummaryRecord),
    JobDetail(JobDetailRecord),
}

impl ReportRecord {
    /// Returns the record's identity within its section.
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Issue(issue) => RecordKey::Issue(issue.id),
            Self::JobSummary(_) => RecordKey::DashboardSummary,
            Self::JobDetail(job) => RecordKey::Job(job.title.clone()),
        }
    }

    /// Returns the SIG used for grouping; empty for dashboard records.
    pub fn sig(&self) -> &str {
        match self {
            Self::Issue(issue) => &issue.sig,
            Self::JobSummary(_) | Self::JobDetail(_) => "",
        }
    }

    /// Returns the record's notes.
    pub fn notes(&self) -> &[String] {
        match self {
            Self::Issue(issue) => &issue.notes,
            Self::JobSummary(summary) => &summary.notes,
            Self::JobDetail(job) => &job.notes,
        }
    }

    /// Presentation order: summary first, then by SIG, then by key.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        let summary_first = |r: &Self| !matches!(r, Self::JobSummary(_));
        summary_first(self)
            .cmp(&summary_first(other))
            .then_with(|| self.sig().cmp(other.sig()))
            .then_with(|| self.key().cmp(&other.key()))
    }
}

// ---------------------------------------------------------------------------
// Producer messages
// ---------------------------------------------------------------------------

/// One message sent by a producer (page, card bucket, dashboard) to the merger.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A complete section's records.
    Section {
        field: ReportField,
        records: Vec<ReportRecord>,
    },
    /// A fetch that contributed to `field` failed.
    ///
    /// `partial` is `true` when some records for the field were still
    /// produced (e.g. one card of a bucket failed).
    Failed {
        field: ReportField,
        error: FetchError,
        partial: bool,
    },
}

/// A section, or part of one, that could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionFailure {
    pub field: ReportField,
    pub error: String,
    pub partial: bool,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A report section in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortedSection<'a> {
    pub field: &'a ReportField,
    pub records: Vec<&'a ReportRecord>,
    pub failures: Vec<&'a SectionFailure>,
}

/// Mapping from section to records, plus the failures and merge diagnostics
/// accumulated while building it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(with = "sections_as_list")]
    pub sections: HashMap<ReportField, Vec<ReportRecord>>,
    pub failures: Vec<SectionFailure>,
    /// Fields that were emitted more than once; the last emission won.
    pub collisions: Vec<ReportField>,
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the records of `field`, if the section exists.
    pub fn section(&self, field: &ReportField) -> Option<&[ReportRecord]> {
        self.sections.get(field).map(Vec::as_slice)
    }

    /// Finds a section by title.
    pub fn section_titled(&self, title: &str) -> Option<&[ReportRecord]> {
        self.sections
            .iter()
            .find(|(field, _)| field.title == title)
            .map(|(_, records)| records.as_slice())
    }

    /// Returns `true` when no section failed, even partially.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Appends another source's contribution. Colliding fields are recorded
    /// and resolved last-write-wins.
    pub fn extend(&mut self, other: Report) {
        for (field, records) in other.sections {
            if self.sections.contains_key(&field) {
                self.collisions.push(field.clone());
            }
            self.sections.insert(field, records);
        }
        self.failures.extend(other.failures);
        self.collisions.extend(other.collisions);
    }

    /// Returns every section (including sections that only failed) sorted
    /// by title, with records in presentation order.
    pub fn sorted_sections(&self) -> Vec<SortedSection<'_>> {
        let mut fields: Vec<&ReportField> = self.sections.keys().collect();
        for failure in &self.failures {
            if !fields.contains(&&failure.field) {
                fields.push(&failure.field);
            }
        }
        fields.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.emoji.cmp(&b.emoji)));

        fields
            .into_iter()
            .map(|field| {
                let mut records: Vec<&ReportRecord> = self
                    .sections
                    .get(field)
                    .map(|r| r.iter().collect())
                    .unwrap_or_default();
                records.sort_by(|a, b| a.display_cmp(b));
                SortedSection {
                    field,
                    records,
                    failures: self.failures.iter().filter(|f| &f.field == field).collect(),
                }
            })
            .collect()
    }
}

/// JSON object keys must be strings, so sections serialize as a list.
mod sections_as_list {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{ReportField, ReportRecord};

    #[derive(Serialize, Deserialize)]
    struct Entry {
        field: ReportField,
        records: Vec<ReportRecord>,
    }

    pub(super) fn serialize<S: Serializer>(
        sections: &HashMap<ReportField, Vec<ReportRecord>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<Entry> = sections
            .iter()
            .map(|(field, records)| Entry {
                field: field.clone(),
                records: records.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.field.cmp(&b.field));
        entries.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<ReportField, Vec<ReportRecord>>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|e| (e.field, e.records)).collect())
    }
}
