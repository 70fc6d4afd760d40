//! In-memory port implementations shared by the collector tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use signal::{
    BoardCard, BoardColumn, CardId, ColumnId, Dashboard, DashboardJob, DashboardSource,
    FailingTest, FetchError, Issue, IssueNumber, IssueQuery, IssueTracker, OverallStatus,
    PageNumber, ProjectBoard, ProjectId, Timestamp,
};

pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse_rfc3339(s).unwrap()
}

pub fn issue(number: u64, labels: &[&str]) -> Issue {
    Issue {
        number: IssueNumber::new(number),
        html_url: format!("https://github.com/kubernetes/kubernetes/issues/{number}"),
        title: format!("[Failing Test] job-{number}"),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        milestone: None,
        comments: 0,
        created_at: ts("2021-05-01T00:00:00Z"),
        updated_at: ts("2021-05-02T00:00:00Z"),
    }
}

pub fn content_url(number: u64) -> String {
    format!("https://api.github.com/repos/kubernetes/kubernetes/issues/{number}")
}

pub fn transport_error(url: &str) -> FetchError {
    FetchError::Transport {
        url: url.into(),
        status: Some(502),
        message: "bad gateway".into(),
        retry_after: None,
    }
}

// ---------------------------------------------------------------------------
// Issue tracker
// ---------------------------------------------------------------------------

/// Serves explicit pages per listing title and issues per content URL.
#[derive(Default)]
pub struct FakeTracker {
    pages: Mutex<HashMap<(String, u32), Result<Vec<Issue>, FetchError>>>,
    issues: Mutex<HashMap<String, Result<Issue, FetchError>>>,
    page_requests: AtomicUsize,
    issue_requests: AtomicUsize,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `items` into pages of `per_page` for the listing titled `title`.
    pub fn with_listing(self, title: &str, items: Vec<Issue>, per_page: usize) -> Self {
        for (index, chunk) in items.chunks(per_page).enumerate() {
            self.set_page(title, index as u32 + 1, Ok(chunk.to_vec()));
        }
        self
    }

    pub fn set_page(&self, title: &str, page: u32, result: Result<Vec<Issue>, FetchError>) {
        self.pages
            .lock()
            .unwrap()
            .insert((title.to_string(), page), result);
    }

    pub fn with_issue(self, issue: Issue) -> Self {
        self.issues
            .lock()
            .unwrap()
            .insert(content_url(issue.number.as_u64()), Ok(issue));
        self
    }

    pub fn with_broken_issue(self, number: u64) -> Self {
        let url = content_url(number);
        let error = transport_error(&url);
        self.issues.lock().unwrap().insert(url, Err(error));
        self
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn issue_requests(&self) -> usize {
        self.issue_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn list_issues(
        &self,
        query: &IssueQuery,
        page: PageNumber,
    ) -> Result<Vec<Issue>, FetchError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.pages
            .lock()
            .unwrap()
            .get(&(query.field.title.clone(), page.as_u32()))
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn issue_at(&self, content_url: &str) -> Result<Issue, FetchError> {
        self.issue_requests.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.issues
            .lock()
            .unwrap()
            .get(content_url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    url: content_url.into(),
                    status: Some(404),
                    message: "not found".into(),
                    retry_after: None,
                })
            })
    }
}

// ---------------------------------------------------------------------------
// Project board
// ---------------------------------------------------------------------------

/// Serves a fixed column list and cards per column.
#[derive(Default)]
pub struct FakeBoard {
    columns: Vec<BoardColumn>,
    cards: HashMap<ColumnId, Vec<BoardCard>>,
    column_requests: AtomicUsize,
    card_requests: Mutex<Vec<ColumnId>>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, id: u64, name: &str) -> Self {
        self.columns.push(BoardColumn {
            id: ColumnId::new(id),
            name: name.into(),
        });
        self
    }

    /// Places one card per issue number in `column`; `None` adds a note card.
    pub fn with_cards(mut self, column: u64, issues: &[Option<u64>]) -> Self {
        let cards = self.cards.entry(ColumnId::new(column)).or_default();
        for (index, number) in issues.iter().enumerate() {
            cards.push(BoardCard {
                id: CardId::new(column * 1000 + index as u64),
                content_url: number.map(content_url),
            });
        }
        self
    }

    pub fn column_requests(&self) -> usize {
        self.column_requests.load(Ordering::SeqCst)
    }

    pub fn card_requests(&self) -> Vec<ColumnId> {
        let mut requested = self.card_requests.lock().unwrap().clone();
        requested.sort();
        requested
    }
}

#[async_trait]
impl ProjectBoard for FakeBoard {
    async fn list_columns(&self, _project: ProjectId) -> Result<Vec<BoardColumn>, FetchError> {
        self.column_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.columns.clone())
    }

    async fn list_cards(&self, column: ColumnId) -> Result<Vec<BoardCard>, FetchError> {
        self.card_requests.lock().unwrap().push(column);
        Ok(self.cards.get(&column).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

pub fn job(name: &str, status: OverallStatus, status_text: &str, tests: &[&str]) -> DashboardJob {
    DashboardJob {
        name: name.into(),
        overall_status: status,
        status_text: status_text.into(),
        tests: tests
            .iter()
            .map(|t| FailingTest {
                test_name: t.to_string(),
            })
            .collect(),
    }
}

/// Serves job lists per dashboard name.
#[derive(Default)]
pub struct FakeDashboards {
    summaries: HashMap<String, Result<Vec<DashboardJob>, FetchError>>,
}

impl FakeDashboards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dashboard(mut self, name: &str, jobs: Vec<DashboardJob>) -> Self {
        self.summaries.insert(name.into(), Ok(jobs));
        self
    }

    pub fn with_broken_dashboard(mut self, name: &str) -> Self {
        self.summaries
            .insert(name.into(), Err(transport_error(name)));
        self
    }
}

#[async_trait]
impl DashboardSource for FakeDashboards {
    async fn summary(&self, dashboard: &Dashboard) -> Result<Vec<DashboardJob>, FetchError> {
        tokio::task::yield_now().await;
        self.summaries
            .get(dashboard.name.as_str())
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Resolution {
                    what: format!("dashboard {}", dashboard.name),
                })
            })
    }

    fn job_url(&self, dashboard: &Dashboard, job: &str) -> String {
        format!("https://testgrid.example/{}#{job}", dashboard.name)
    }
}
