//! GitHub REST response shapes and their conversion into domain values.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use signal::{
    BoardCard, BoardColumn, CardId, ColumnId, FetchError, Issue, IssueNumber, Timestamp,
};

#[derive(Debug, Deserialize)]
pub(crate) struct Label {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Milestone {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueDoc {
    pub number: u64,
    pub html_url: String,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub comments: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<IssueDoc> for Issue {
    fn from(doc: IssueDoc) -> Self {
        Self {
            number: IssueNumber::new(doc.number),
            html_url: doc.html_url,
            title: doc.title,
            labels: doc.labels.into_iter().map(|l| l.name).collect(),
            milestone: doc.milestone.map(|m| m.title),
            comments: doc.comments,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ColumnDoc {
    pub id: u64,
    pub name: String,
}

impl From<ColumnDoc> for BoardColumn {
    fn from(doc: ColumnDoc) -> Self {
        Self {
            id: ColumnId::new(doc.id),
            name: doc.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CardDoc {
    pub id: u64,
    /// Absent for note-only cards.
    pub content_url: Option<String>,
}

impl From<CardDoc> for BoardCard {
    fn from(doc: CardDoc) -> Self {
        Self {
            id: CardId::new(doc.id),
            content_url: doc.content_url.filter(|url| !url.is_empty()),
        }
    }
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
