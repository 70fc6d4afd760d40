//! Report sources and the run that combines them.
//!
//! Both upstream services are exposed through [`ReportSource`], so the run
//! treats them uniformly: each source fans its own work out, merges it into a
//! [`Report`] contribution, and the run concatenates the contributions.

use std::sync::Arc;

use async_trait::async_trait;
use signal::{
    DashboardSource, IssueClassifier, IssueTracker, ProjectBoard, Report, ReportConfig,
    RunSettings,
};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::{CardResolver, PaginatedFetcher, ReportMerger, RequestGate, TestgridJobAggregator};

/// Buffered fragments per source before producers wait for the merger.
const FRAGMENT_BUFFER: usize = 16;

/// One upstream service contributing sections to the report.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches and merges this source's contribution.
    ///
    /// Never fails as a whole: fetch failures are carried in
    /// [`Report::failures`].
    async fn fetch(&self, settings: &RunSettings) -> Report;
}

async fn join_workers(name: &str, mut workers: JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(error) = joined {
            tracing::error!(source = name, %error, "Collector worker panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// Board buckets and issue listings from the issue tracker.
pub struct GithubSource {
    config: Arc<ReportConfig>,
    tracker: Arc<dyn IssueTracker>,
    board: Arc<dyn ProjectBoard>,
}

impl GithubSource {
    /// Creates the source. `tracker` and `board` are usually the same client.
    pub fn new(
        config: Arc<ReportConfig>,
        tracker: Arc<dyn IssueTracker>,
        board: Arc<dyn ProjectBoard>,
    ) -> Self {
        Self {
            config,
            tracker,
            board,
        }
    }
}

#[async_trait]
impl ReportSource for GithubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch(&self, settings: &RunSettings) -> Report {
        let gate = RequestGate::new(self.config.concurrency);
        let resolver = CardResolver::new(
            Arc::clone(&self.board),
            Arc::clone(&self.tracker),
            gate.clone(),
            self.config.project,
        );
        let fetcher = PaginatedFetcher::new(Arc::clone(&self.tracker), gate, self.config.prefetch);
        let classifier = Arc::new(IssueClassifier::new(
            self.config.emojis.clone(),
            settings.emojis_off,
            settings.now,
        ));

        let (sink, merger) = ReportMerger::channel(FRAGMENT_BUFFER);
        let mut workers = JoinSet::new();

        for bucket in &self.config.buckets {
            if settings.short && bucket.omit_when_short {
                tracing::debug!(bucket = %bucket.field, "Skipping bucket in short mode");
                continue;
            }
            let resolver = resolver.clone();
            let bucket = bucket.clone();
            let sink = sink.clone();
            let span = tracing::info_span!("bucket", name = %bucket.field);
            workers.spawn(
                async move { resolver.collect_bucket(&bucket, &sink).await }.instrument(span),
            );
        }

        for query in &self.config.issue_queries {
            let fetcher = fetcher.clone();
            let classifier = Arc::clone(&classifier);
            let query = query.clone();
            let sink = sink.clone();
            let span = tracing::info_span!("listing", name = %query.field);
            workers.spawn(
                async move { fetcher.collect_listing(query, &classifier, &sink).await }
                    .instrument(span),
            );
        }
        drop(sink);

        let report = merger.drain().await;
        join_workers(self.name(), workers).await;
        report
    }
}

// ---------------------------------------------------------------------------
// TestGrid
// ---------------------------------------------------------------------------

/// Dashboard summaries from TestGrid.
pub struct TestgridSource {
    config: Arc<ReportConfig>,
    source: Arc<dyn DashboardSource>,
}

impl TestgridSource {
    /// Creates the source.
    pub fn new(config: Arc<ReportConfig>, source: Arc<dyn DashboardSource>) -> Self {
        Self { config, source }
    }
}

#[async_trait]
impl ReportSource for TestgridSource {
    fn name(&self) -> &'static str {
        "testgrid"
    }

    async fn fetch(&self, settings: &RunSettings) -> Report {
        let aggregator = TestgridJobAggregator::new(
            Arc::clone(&self.source),
            RequestGate::new(self.config.concurrency),
            self.config.emojis.clone(),
        );
        let dashboards = self.config.dashboards(&settings.release_versions);
        let short = settings.short;

        let (sink, merger) = ReportMerger::channel(FRAGMENT_BUFFER);
        let mut workers = JoinSet::new();
        workers.spawn(
            async move { aggregator.collect(dashboards, short, &sink).await }.in_current_span(),
        );

        let report = merger.drain().await;
        join_workers(self.name(), workers).await;
        report
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Fetches every source concurrently and concatenates their contributions.
pub async fn generate_report(sources: &[Arc<dyn ReportSource>], settings: &RunSettings) -> Report {
    let span = tracing::info_span!("report_run", run_id = %settings.run_id, short = settings.short);
    async {
        let contributions = futures::future::join_all(sources.iter().map(|source| {
            let span = tracing::info_span!("source", name = source.name());
            source.fetch(settings).instrument(span)
        }))
        .await;

        let mut report = Report::new();
        for contribution in contributions {
            report.extend(contribution);
        }
        tracing::info!(
            sections = report.sections.len(),
            failures = report.failures.len(),
            "Report generated"
        );
        report
    }
    .instrument(span)
    .await
}
