//! Speculative, backpressured pagination of issue listings.
//!
//! A single producer task walks the listing page by page and hands every raw
//! page to a bounded channel. While the consumer classifies page N the
//! producer is already fetching page N+1; once `prefetch` pages are waiting,
//! the producer blocks until the consumer catches up.
//!
//! The listing ends at the first page that comes back **empty before any
//! filtering**. A page whose items are all excluded by classification does
//! not end it.

use std::collections::HashMap;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use signal::{
    FetchError, Fragment, Issue, IssueClassifier, IssueNumber, IssueQuery, IssueRecord,
    IssueTracker, PageNumber, ReportRecord,
};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::RequestGate;

/// One raw page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: PageNumber,
    pub items: Vec<Issue>,
}

/// Fetches every page of an issue listing.
#[derive(Clone)]
pub struct PaginatedFetcher {
    tracker: Arc<dyn IssueTracker>,
    gate: RequestGate,
    prefetch: usize,
}

impl PaginatedFetcher {
    /// Creates a fetcher issuing requests through `gate` and buffering at
    /// most `prefetch` unconsumed pages.
    pub fn new(tracker: Arc<dyn IssueTracker>, gate: RequestGate, prefetch: usize) -> Self {
        Self {
            tracker,
            gate,
            prefetch: prefetch.max(1),
        }
    }

    /// Returns the pages of `query` as a lazy, finite stream.
    ///
    /// No request is issued until the stream is first polled; the producer
    /// task is spawned then. The stream yields each non-empty page in order
    /// and ends after the first empty page. A failed page is yielded as the
    /// final `Err` item; no later page is requested. Dropping the stream
    /// stops the producer.
    pub fn pages(&self, query: IssueQuery) -> impl Stream<Item = Result<Page, FetchError>> {
        let (tx, rx) = mpsc::channel(self.prefetch);
        let span = tracing::debug_span!("paginate", listing = %query.field);
        let producer = produce_pages(Arc::clone(&self.tracker), self.gate.clone(), query, tx)
            .instrument(span);

        futures::stream::unfold((Some(producer), rx), |(mut producer, mut rx)| async move {
            if let Some(task) = producer.take() {
                tokio::spawn(task);
            }
            rx.recv().await.map(|page| (page, (producer, rx)))
        })
    }

    /// Walks `query` to the end, classifies every page and sends the
    /// resulting section to `sink`.
    ///
    /// Duplicate issue numbers across pages resolve to the later page,
    /// including when the later copy is excluded. A failed page yields a
    /// [`Fragment::Failed`]; records classified before the failure are still
    /// sent, marked partial.
    pub async fn collect_listing(
        &self,
        query: IssueQuery,
        classifier: &IssueClassifier,
        sink: &mpsc::Sender<Fragment>,
    ) {
        let field = query.field.clone();
        let mut records: HashMap<IssueNumber, IssueRecord> = HashMap::new();
        let mut pages_seen = 0usize;
        let mut failure = None;

        let mut pages = std::pin::pin!(self.pages(query));
        while let Some(page) = pages.next().await {
            match page {
                Ok(page) => {
                    pages_seen += 1;
                    for issue in &page.items {
                        match classifier.listing_record(issue) {
                            Some(record) => {
                                records.insert(record.id, record);
                            }
                            None => {
                                records.remove(&issue.number);
                            }
                        }
                    }
                }
                Err(error) => failure = Some(error),
            }
        }

        tracing::info!(
            listing = %field,
            pages = pages_seen,
            records = records.len(),
            failed = failure.is_some(),
            "Issue listing collected"
        );

        let section_sent = failure.is_none() || pages_seen > 0;
        if section_sent {
            let records = records.into_values().map(ReportRecord::Issue).collect();
            let _ = sink
                .send(Fragment::Section {
                    field: field.clone(),
                    records,
                })
                .await;
        }
        if let Some(error) = failure {
            tracing::warn!(listing = %field, error = %error, "Issue listing failed");
            let _ = sink
                .send(Fragment::Failed {
                    field,
                    error,
                    partial: section_sent,
                })
                .await;
        }
    }
}

async fn produce_pages(
    tracker: Arc<dyn IssueTracker>,
    gate: RequestGate,
    query: IssueQuery,
    tx: mpsc::Sender<Result<Page, FetchError>>,
) {
    let mut number = PageNumber::FIRST;
    loop {
        let page = match gate.run(tracker.list_issues(&query, number)).await {
            Ok(items) if items.is_empty() => {
                tracing::debug!(page = %number, "Empty page; listing exhausted");
                break;
            }
            Ok(items) => {
                tracing::debug!(page = %number, items = items.len(), "Fetched page");
                Ok(Page { number, items })
            }
            Err(error) => Err(error),
        };
        let failed = page.is_err();
        if tx.send(page).await.is_err() {
            tracing::debug!("Page consumer dropped; stopping pagination");
            break;
        }
        if failed {
            break;
        }
        number = number.next();
    }
}
