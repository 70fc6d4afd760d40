//! Board bucket collection: column resolution and card fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use signal::{
    BoardColumn, BucketConfig, ColumnId, ColumnLocator, FetchError, Fragment, IssueClassifier,
    IssueNumber, IssueRecord, IssueTracker, ProjectBoard, ProjectId, ReportRecord,
};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::RequestGate;

/// Picks the column named exactly `name`; the lowest id wins on duplicates.
pub fn select_column(columns: &[BoardColumn], name: &str) -> Option<ColumnId> {
    columns
        .iter()
        .filter(|column| column.name == name)
        .map(|column| column.id)
        .min()
}

/// Resolves board columns and turns their cards into issue records.
#[derive(Clone)]
pub struct CardResolver {
    board: Arc<dyn ProjectBoard>,
    tracker: Arc<dyn IssueTracker>,
    gate: RequestGate,
    project: ProjectId,
}

impl CardResolver {
    /// Creates a resolver for the board `project`.
    pub fn new(
        board: Arc<dyn ProjectBoard>,
        tracker: Arc<dyn IssueTracker>,
        gate: RequestGate,
        project: ProjectId,
    ) -> Self {
        Self {
            board,
            tracker,
            gate,
            project,
        }
    }

    /// Resolves a column name to its id.
    ///
    /// # Errors
    ///
    /// Propagates the column-listing failure, or returns
    /// [`FetchError::Resolution`] when no column has that name.
    pub async fn resolve_column(&self, name: &str) -> Result<ColumnId, FetchError> {
        let columns = self
            .gate
            .run(self.board.list_columns(self.project))
            .await?;
        select_column(&columns, name).ok_or_else(|| FetchError::Resolution {
            what: format!("column '{name}' on project {}", self.project),
        })
    }

    /// Collects one bucket and sends its section to `sink`.
    ///
    /// One worker is spawned per card that links an issue. Workers funnel
    /// their results into a bucket-local channel; the bucket is complete when
    /// every worker has dropped its sender. A failed card leaves the rest of
    /// the bucket intact and is reported as a partial failure. A column that
    /// cannot be resolved or listed fails the whole bucket, and only it.
    pub async fn collect_bucket(&self, bucket: &BucketConfig, sink: &mpsc::Sender<Fragment>) {
        let field = bucket.field.clone();
        match self.bucket_records(bucket).await {
            Ok((records, failures)) => {
                tracing::info!(
                    bucket = %field,
                    records = records.len(),
                    failed_cards = failures.len(),
                    "Board bucket collected"
                );
                let _ = sink
                    .send(Fragment::Section {
                        field: field.clone(),
                        records: records.into_iter().map(ReportRecord::Issue).collect(),
                    })
                    .await;
                for error in failures {
                    tracing::warn!(bucket = %field, error = %error, "Board card failed");
                    let _ = sink
                        .send(Fragment::Failed {
                            field: field.clone(),
                            error,
                            partial: true,
                        })
                        .await;
                }
            }
            Err(error) => {
                tracing::warn!(bucket = %field, error = %error, "Board bucket failed");
                let _ = sink
                    .send(Fragment::Failed {
                        field,
                        error,
                        partial: false,
                    })
                    .await;
            }
        }
    }

    async fn bucket_records(
        &self,
        bucket: &BucketConfig,
    ) -> Result<(Vec<IssueRecord>, Vec<FetchError>), FetchError> {
        let column = match &bucket.column {
            ColumnLocator::Id(id) => *id,
            ColumnLocator::Named(name) => self.resolve_column(name).await?,
        };
        let cards = self.gate.run(self.board.list_cards(column)).await?;
        tracing::debug!(%column, cards = cards.len(), "Listed column cards");

        let (tx, mut rx) = mpsc::channel(cards.len().max(1));
        for card in cards {
            let Some(content_url) = card.content_url else {
                continue;
            };
            let tx = tx.clone();
            let tracker = Arc::clone(&self.tracker);
            let gate = self.gate.clone();
            let span = tracing::debug_span!("card", card = %card.id);
            tokio::spawn(
                async move {
                    let result = gate
                        .run(tracker.issue_at(&content_url))
                        .await
                        .map(|issue| IssueClassifier::card_record(&issue));
                    let _ = tx.send(result).await;
                }
                .instrument(span),
            );
        }
        drop(tx);

        // Several cards may link the same issue; it is listed once.
        let mut records: HashMap<IssueNumber, IssueRecord> = HashMap::new();
        let mut failures = Vec::new();
        while let Some(result) = rx.recv().await {
            match result {
                Ok(record) => {
                    records.insert(record.id, record);
                }
                Err(error) => failures.push(error),
            }
        }
        Ok((records.into_values().collect(), failures))
    }
}
