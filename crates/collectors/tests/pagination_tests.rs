mod common;

use std::sync::Arc;

use collectors::{PaginatedFetcher, ReportMerger, RequestGate};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use signal::{
    EmojiSet, Fragment, IssueClassifier, IssueNumber, IssueQuery, LabelName, ReportField,
    ReportRecord, RepositoryId,
};

use common::{issue, transport_error, ts, FakeTracker};

const LISTING: &str = "Failing Test Issues";

fn query(per_page: u32) -> IssueQuery {
    IssueQuery {
        field: ReportField::new("", LISTING),
        repository: RepositoryId::new("kubernetes/kubernetes").unwrap(),
        labels: vec![LabelName::new("kind/failing-test").unwrap()],
        since: None,
        per_page,
    }
}

fn classifier() -> IssueClassifier {
    IssueClassifier::new(EmojiSet::default(), false, ts("2021-06-01T00:00:00Z"))
}

fn fetcher(tracker: &Arc<FakeTracker>) -> PaginatedFetcher {
    PaginatedFetcher::new(tracker.clone(), RequestGate::new(4), 2)
}

async fn collect(tracker: &Arc<FakeTracker>, per_page: u32) -> signal::Report {
    let (sink, merger) = ReportMerger::channel(4);
    fetcher(tracker)
        .collect_listing(query(per_page), &classifier(), &sink)
        .await;
    drop(sink);
    merger.drain().await
}

fn ids(records: &[ReportRecord]) -> Vec<u64> {
    let mut ids: Vec<u64> = records
        .iter()
        .map(|r| match r {
            ReportRecord::Issue(i) => i.id.as_u64(),
            other => panic!("unexpected record {other:?}"),
        })
        .collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn remainder_page_is_followed_by_one_empty_page() {
    let items: Vec<_> = (1..=250).map(|n| issue(n, &[])).collect();
    let tracker = Arc::new(FakeTracker::new().with_listing(LISTING, items, 100));

    let report = collect(&tracker, 100).await;

    // ceil(250 / 100) + 1
    assert_eq!(tracker.page_requests(), 4);
    assert_eq!(report.section_titled(LISTING).unwrap().len(), 250);
}

#[tokio::test]
async fn exact_multiple_still_fetches_the_empty_page() {
    let items: Vec<_> = (1..=200).map(|n| issue(n, &[])).collect();
    let tracker = Arc::new(FakeTracker::new().with_listing(LISTING, items, 100));

    collect(&tracker, 100).await;

    assert_eq!(tracker.page_requests(), 3);
}

#[tokio::test]
async fn empty_listing_issues_a_single_request() {
    let tracker = Arc::new(FakeTracker::new());

    let report = collect(&tracker, 100).await;

    assert_eq!(tracker.page_requests(), 1);
    assert_eq!(report.section_titled(LISTING), Some(&[][..]));
    assert!(report.is_complete());
}

#[tokio::test]
async fn fully_filtered_page_does_not_end_the_listing() {
    let tracker = Arc::new(FakeTracker::new());
    tracker.set_page(
        LISTING,
        1,
        Ok(vec![issue(1, &["lifecycle/stale"]), issue(2, &["priority/backlog"])]),
    );
    tracker.set_page(LISTING, 2, Ok(vec![issue(3, &["sig/node"])]));

    let report = collect(&tracker, 2).await;

    assert_eq!(tracker.page_requests(), 3);
    assert_eq!(ids(report.section_titled(LISTING).unwrap()), [3]);
}

#[tokio::test]
async fn later_page_wins_for_duplicate_numbers() {
    let tracker = Arc::new(FakeTracker::new());
    let mut first = issue(5, &[]);
    first.title = "old title".into();
    let mut second = issue(5, &[]);
    second.title = "new title".into();
    tracker.set_page(LISTING, 1, Ok(vec![first, issue(6, &[])]));
    tracker.set_page(LISTING, 2, Ok(vec![second]));

    let report = collect(&tracker, 2).await;

    let records = report.section_titled(LISTING).unwrap();
    assert_eq!(ids(records), [5, 6]);
    let five = records
        .iter()
        .find_map(|r| match r {
            ReportRecord::Issue(i) if i.id == IssueNumber::new(5) => Some(i),
            _ => None,
        })
        .unwrap();
    assert_eq!(five.title, "new title");
}

#[tokio::test]
async fn failed_page_keeps_earlier_records_and_stops() {
    let tracker = Arc::new(FakeTracker::new());
    tracker.set_page(LISTING, 1, Ok(vec![issue(1, &[]), issue(2, &[])]));
    tracker.set_page(LISTING, 2, Err(transport_error("page-2")));
    tracker.set_page(LISTING, 3, Ok(vec![issue(3, &[])]));

    let report = collect(&tracker, 2).await;

    assert_eq!(tracker.page_requests(), 2);
    assert_eq!(ids(report.section_titled(LISTING).unwrap()), [1, 2]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].partial);
}

#[tokio::test]
async fn failed_first_page_reports_only_the_failure() {
    let tracker = Arc::new(FakeTracker::new());
    tracker.set_page(LISTING, 1, Err(transport_error("page-1")));

    let report = collect(&tracker, 2).await;

    assert!(report.section_titled(LISTING).is_none());
    assert_eq!(report.failures.len(), 1);
    assert!(!report.failures[0].partial);
}

#[tokio::test]
async fn page_stream_yields_raw_pages_in_order() {
    let tracker = Arc::new(FakeTracker::new());
    tracker.set_page(LISTING, 1, Ok(vec![issue(1, &["lifecycle/rotten"])]));
    tracker.set_page(LISTING, 2, Ok(vec![issue(2, &[])]));

    let pages: Vec<_> = fetcher(&tracker).pages(query(1)).collect().await;

    let numbers: Vec<u32> = pages
        .iter()
        .map(|p| p.as_ref().unwrap().number.as_u32())
        .collect();
    assert_eq!(numbers, [1, 2]);
    // Excluded items are still part of the raw page.
    assert_eq!(pages[0].as_ref().unwrap().items.len(), 1);
}

#[tokio::test]
async fn listing_records_carry_issue_path_classification() {
    let tracker = Arc::new(FakeTracker::new());
    tracker.set_page(
        LISTING,
        1,
        Ok(vec![issue(9, &["sig/node", "sig/storage", "kind/failing-test"])]),
    );

    let report = collect(&tracker, 1).await;

    let ReportRecord::Issue(record) = &report.section_titled(LISTING).unwrap()[0] else {
        panic!("expected an issue record");
    };
    assert_eq!(record.sig, "node, storage");
    assert_eq!(record.title, "[Failing Test] job-9");
    assert_eq!(record.notes.len(), 2);
    assert!(report.is_complete());
}

#[tokio::test]
async fn fragments_name_the_listing_field() {
    let tracker = Arc::new(FakeTracker::new());
    let (sink, mut rx) = tokio::sync::mpsc::channel(4);
    fetcher(&tracker)
        .collect_listing(query(10), &classifier(), &sink)
        .await;
    drop(sink);

    match rx.recv().await.unwrap() {
        Fragment::Section { field, records } => {
            assert_eq!(field.title, LISTING);
            assert!(records.is_empty());
        }
        other => panic!("unexpected fragment {other:?}"),
    }
    assert!(rx.recv().await.is_none());
}

async fn settle(tracker: &FakeTracker, expected: usize) {
    for _ in 0..200 {
        if tracker.page_requests() >= expected {
            break;
        }
        tokio::task::yield_now().await;
    }
    // Give an unbounded producer the chance to overrun.
    for _ in 0..200 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn next_pages_are_fetched_while_the_consumer_holds_page_one() {
    let items: Vec<_> = (1..=10).map(|n| issue(n, &[])).collect();
    let tracker = Arc::new(FakeTracker::new().with_listing(LISTING, items, 1));
    let prefetch = 2;
    let fetcher = PaginatedFetcher::new(tracker.clone(), RequestGate::new(4), prefetch);

    let mut pages = std::pin::pin!(fetcher.pages(query(1)));
    let first = pages.next().await.unwrap().unwrap();
    assert_eq!(first.number.as_u32(), 1);

    // Page one is held unconsumed: the producer fills the buffer, fetches one
    // more page and then waits for room.
    settle(&tracker, 1 + prefetch + 1).await;
    assert!(tracker.page_requests() >= 2);
    assert_eq!(tracker.page_requests(), 1 + prefetch + 1);

    // Consuming one page frees one slot.
    assert_eq!(pages.next().await.unwrap().unwrap().number.as_u32(), 2);
    settle(&tracker, 1 + prefetch + 2).await;
    assert_eq!(tracker.page_requests(), 1 + prefetch + 2);
}

#[tokio::test]
async fn no_request_is_made_until_the_stream_is_polled() {
    let tracker = Arc::new(FakeTracker::new().with_listing(LISTING, vec![issue(1, &[])], 1));

    let fetcher = fetcher(&tracker);
    let pages = fetcher.pages(query(1));
    settle(&tracker, 1).await;
    assert_eq!(tracker.page_requests(), 0);
    drop(pages);

    let pages: Vec<_> = fetcher.pages(query(1)).collect().await;
    assert_eq!(pages.len(), 1);
    assert_eq!(tracker.page_requests(), 2);
}
