//! Port traits implemented by the infrastructure adapters.
//!
//! Collectors depend only on these traits. The `github` crate implements
//! [`IssueTracker`] and [`ProjectBoard`]; the `testgrid` crate implements
//! [`DashboardSource`]. Tests substitute in-memory fakes.
//!
//! Issue listings are read one page per call and paginated by the caller.
//! Board listings are returned whole. Fan-out and concurrency limits are the
//! caller's concern; retries are the adapter's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    CardId, ColumnId, Dashboard, DashboardJob, FetchError, Issue, IssueQuery, PageNumber,
    ProjectId,
};

/// A column of a project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub id: ColumnId,
    pub name: String,
}

/// A card of a board column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCard {
    pub id: CardId,
    /// API URL of the linked issue; `None` for note-only cards.
    pub content_url: Option<String>,
}

/// Read access to a GitHub-style issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Returns one raw page of the listing described by `query`.
    ///
    /// The page is returned unfiltered: an empty vector means the listing is
    /// exhausted.
    async fn list_issues(
        &self,
        query: &IssueQuery,
        page: PageNumber,
    ) -> Result<Vec<Issue>, FetchError>;

    /// Fetches the issue behind a board card's content URL.
    async fn issue_at(&self, content_url: &str) -> Result<Issue, FetchError>;
}

/// Read access to a classic project board.
#[async_trait]
pub trait ProjectBoard: Send + Sync {
    /// Lists every column of `project`.
    async fn list_columns(&self, project: ProjectId) -> Result<Vec<BoardColumn>, FetchError>;

    /// Lists the cards of `column`.
    async fn list_cards(&self, column: ColumnId) -> Result<Vec<BoardCard>, FetchError>;
}

/// Read access to CI dashboard summaries.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Fetches the job summaries of `dashboard`.
    async fn summary(&self, dashboard: &Dashboard) -> Result<Vec<DashboardJob>, FetchError>;

    /// Returns the human-facing URL of `job` on `dashboard`.
    fn job_url(&self, dashboard: &Dashboard, job: &str) -> String;
}
