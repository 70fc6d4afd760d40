//! Core domain of the CI signal report.
//!
//! This crate contains every domain concept used to aggregate CI signal: the
//! report model, the issue and dashboard classification rules, configuration
//! values, the error taxonomy, and the port traits infrastructure crates
//! implement. It has no I/O dependencies.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`IssueNumber`, `ColumnId`, etc.) |
//! | [`types`] | Shared value types (`Severity`, `Timestamp`, `PageNumber`) |
//! | [`errors`] | `FetchError`, `ReportError`, retry policy and schedule |
//! | [`config`] | `ReportConfig`, `RunSettings` and their parts |
//! | [`report`] | `Report`, `ReportField`, `ReportRecord`, merger `Fragment`s |
//! | [`issue`] | `Issue` and the `IssueClassifier` |
//! | [`dashboard`] | `DashboardJob`, severity scoring, summary and detail records |
//! | [`ports`] | `IssueTracker`, `ProjectBoard`, `DashboardSource` |

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod identifiers;
pub mod issue;
pub mod ports;
pub mod report;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{
    BucketConfig, ColumnLocator, Dashboard, EmojiSet, IssueQuery, ReportConfig, RunSettings,
};
pub use dashboard::{DashboardJob, FailingTest, OverallStatus, RecentRuns, Score};
pub use errors::{FetchError, ReportError, RetryPolicy, RetrySchedule};
pub use identifiers::{
    CardId, ColumnId, DashboardName, IssueNumber, LabelName, ProjectId, ReportRunId, RepositoryId,
};
pub use issue::{Issue, IssueClassifier};
pub use ports::{BoardCard, BoardColumn, DashboardSource, IssueTracker, ProjectBoard};
pub use report::{
    Fragment, IssueRecord, JobDetailRecord, JobSummaryRecord, RecordKey, Report, ReportField,
    ReportRecord, SectionFailure, SortedSection, StatusCounts,
};
pub use types::{PageNumber, Severity, Timestamp};
