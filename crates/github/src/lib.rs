//! CI signal report GitHub infrastructure adapter.
//!
//! Implements the GitHub-facing traits defined in the [`signal`] crate
//! ([`signal::IssueTracker`], [`signal::ProjectBoard`]) on top of the REST
//! API with `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Every
//! request detail (authentication, query parameters, status mapping,
//! `Retry-After` handling, bounded retries) is handled here; the [`signal`]
//! crate never sees them. Issue listings are paginated by the caller, one
//! page per call; board columns and cards are read to the end here.

mod wire;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use signal::{
    BoardCard, BoardColumn, ColumnId, FetchError, Issue, IssueQuery, IssueTracker, PageNumber,
    ProjectBoard, ProjectId, ReportError, RetrySchedule,
};

use crate::wire::{CardDoc, ColumnDoc, IssueDoc};

const USER_AGENT: &str = concat!("ci-signal-report/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Board columns and cards are read in pages of this size.
const BOARD_PAGE_SIZE: u32 = 100;

/// Authenticated GitHub REST client.
///
/// Not `Debug`: holds the access token.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    retry: RetrySchedule,
}

impl GithubClient {
    /// Creates a client for the API at `api_url` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Configuration`] if `token` is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        retry: RetrySchedule,
    ) -> Result<Self, ReportError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ReportError::Configuration {
                message: "a GitHub access token is required".into(),
            });
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReportError::Configuration {
                message: format!("cannot build GitHub HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            retry,
        })
    }

    fn issues_url(&self, query: &IssueQuery) -> String {
        format!("{}/repos/{}/issues", self.api_url, query.repository)
    }

    fn columns_url(&self, project: ProjectId) -> String {
        format!("{}/projects/{}/columns", self.api_url, project)
    }

    fn cards_url(&self, column: ColumnId) -> String {
        format!("{}/projects/columns/{}/cards", self.api_url, column)
    }

    /// GETs `url` with `params`, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        self.retry
            .run(|| self.get_json_once(url, params), tokio::time::sleep)
            .await
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .bearer_auth(&self.token)
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
        serde_json::from_str(&body).map_err(|e| FetchError::decode(url, e.to_string()))
    }
}

/// Query parameters for one page of an open-issue listing, most recently
/// updated first.
fn issue_listing_params(query: &IssueQuery, page: PageNumber) -> Vec<(&'static str, String)> {
    let labels = query
        .labels
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let mut params = vec![
        ("labels", labels),
        ("state", "open".to_string()),
        ("sort", "updated".to_string()),
        ("direction", "desc".to_string()),
        ("per_page", query.per_page.to_string()),
        ("page", page.as_u32().to_string()),
    ];
    if let Some(since) = query.since {
        params.push((
            "since",
            since.as_datetime().to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }
    params
}

fn board_params(page: PageNumber) -> [(&'static str, String); 2] {
    [
        ("per_page", BOARD_PAGE_SIZE.to_string()),
        ("page", page.as_u32().to_string()),
    ]
}

/// Reads a board listing page by page; a page shorter than
/// [`BOARD_PAGE_SIZE`] is the last one.
async fn read_board_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, FetchError>
where
    F: FnMut(PageNumber) -> Fut,
    Fut: Future<Output = Result<Vec<T>, FetchError>>,
{
    let mut items = Vec::new();
    let mut page = PageNumber::FIRST;
    loop {
        let batch = fetch_page(page).await?;
        let last = batch.len() < BOARD_PAGE_SIZE as usize;
        items.extend(batch);
        if last {
            return Ok(items);
        }
        page = page.next();
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    async fn list_issues(
        &self,
        query: &IssueQuery,
        page: PageNumber,
    ) -> Result<Vec<Issue>, FetchError> {
        let url = self.issues_url(query);
        tracing::debug!(%url, page = page.as_u32(), "Listing issues");
        let docs: Vec<IssueDoc> = self
            .get_json(&url, &issue_listing_params(query, page))
            .await?;
        Ok(docs.into_iter().map(Issue::from).collect())
    }

    async fn issue_at(&self, content_url: &str) -> Result<Issue, FetchError> {
        let doc: IssueDoc = self.get_json(content_url, &[]).await?;
        Ok(doc.into())
    }
}

#[async_trait]
impl ProjectBoard for GithubClient {
    async fn list_columns(&self, project: ProjectId) -> Result<Vec<BoardColumn>, FetchError> {
        let url = self.columns_url(project);
        let url = url.as_str();
        let docs = read_board_pages(|page| async move {
            self.get_json::<Vec<ColumnDoc>>(url, &board_params(page))
                .await
        })
        .await?;
        Ok(docs.into_iter().map(BoardColumn::from).collect())
    }

    async fn list_cards(&self, column: ColumnId) -> Result<Vec<BoardCard>, FetchError> {
        let url = self.cards_url(column);
        let url = url.as_str();
        let docs = read_board_pages(|page| async move {
            self.get_json::<Vec<CardDoc>>(url, &board_params(page))
                .await
        })
        .await?;
        Ok(docs.into_iter().map(BoardCard::from).collect())
    }
}
