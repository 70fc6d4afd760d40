//! Concurrent aggregation of TestGrid dashboard summaries.

use std::sync::Arc;

use signal::dashboard::{detail_record, summarize};
use signal::{
    Dashboard, DashboardSource, EmojiSet, Fragment, OverallStatus, ReportRecord,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::RequestGate;

/// Fetches dashboard summaries and turns them into report sections.
#[derive(Clone)]
pub struct TestgridJobAggregator {
    source: Arc<dyn DashboardSource>,
    gate: RequestGate,
    emojis: Arc<EmojiSet>,
}

impl TestgridJobAggregator {
    /// Creates an aggregator reading from `source`.
    pub fn new(source: Arc<dyn DashboardSource>, gate: RequestGate, emojis: EmojiSet) -> Self {
        Self {
            source,
            gate,
            emojis: Arc::new(emojis),
        }
    }

    /// Fetches every dashboard concurrently and sends one section per
    /// dashboard to `sink`. Returns once every dashboard worker finished.
    ///
    /// Each section holds the summary record and, unless `short` is set, one
    /// detail record per job that is not passing. A dashboard that cannot be
    /// fetched is reported as failed without affecting the others.
    pub async fn collect(
        &self,
        dashboards: Vec<Dashboard>,
        short: bool,
        sink: &mpsc::Sender<Fragment>,
    ) {
        let mut workers = JoinSet::new();
        for dashboard in dashboards {
            let this = self.clone();
            let sink = sink.clone();
            let span = tracing::info_span!("dashboard", name = %dashboard.name);
            workers.spawn(
                async move {
                    let fragment = this.dashboard_fragment(dashboard, short).await;
                    let _ = sink.send(fragment).await;
                }
                .instrument(span),
            );
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                tracing::error!(%error, "Dashboard worker panicked");
            }
        }
    }

    async fn dashboard_fragment(&self, dashboard: Dashboard, short: bool) -> Fragment {
        let jobs = match self.gate.run(self.source.summary(&dashboard)).await {
            Ok(jobs) => jobs,
            Err(error) => {
                tracing::warn!(%error, "Dashboard summary failed");
                return Fragment::Failed {
                    field: dashboard.field,
                    error,
                    partial: false,
                };
            }
        };

        let mut records = vec![ReportRecord::JobSummary(summarize(&jobs))];
        if !short {
            records.extend(
                jobs.iter()
                    .filter(|job| job.overall_status != OverallStatus::Passing)
                    .map(|job| {
                        let url = self.source.job_url(&dashboard, &job.name);
                        ReportRecord::JobDetail(detail_record(job, url, &self.emojis))
                    }),
            );
        }
        tracing::info!(jobs = jobs.len(), records = records.len(), "Dashboard summarised");

        Fragment::Section {
            field: dashboard.field,
            records,
        }
    }
}
