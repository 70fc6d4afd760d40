//! Fan-in of producer fragments into one [`Report`].

use signal::{Fragment, Report, SectionFailure};
use tokio::sync::mpsc;

/// Drains fragments from independent producers into a report.
///
/// Each producer owns a clone of the channel's sender; the channel closes
/// once the last producer drops it, which is the merger's completion signal.
#[derive(Debug)]
pub struct ReportMerger {
    fragments: mpsc::Receiver<Fragment>,
}

impl ReportMerger {
    /// Creates a merger and the sender producers report through.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Fragment>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { fragments: rx })
    }

    /// Collects every fragment until all producers are done.
    ///
    /// A section emitted twice for the same field keeps the later records
    /// and is recorded in [`Report::collisions`].
    pub async fn drain(mut self) -> Report {
        let mut report = Report::new();
        while let Some(fragment) = self.fragments.recv().await {
            match fragment {
                Fragment::Section { field, records } => {
                    if report.sections.contains_key(&field) {
                        tracing::warn!(
                            section = %field,
                            "Section emitted twice; keeping the later one"
                        );
                        report.collisions.push(field.clone());
                    }
                    report.sections.insert(field, records);
                }
                Fragment::Failed {
                    field,
                    error,
                    partial,
                } => report.failures.push(SectionFailure {
                    field,
                    error: error.to_string(),
                    partial,
                }),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use signal::{FetchError, IssueNumber, IssueRecord, ReportField, ReportRecord};

    use super::*;

    fn record(id: u64) -> ReportRecord {
        ReportRecord::Issue(IssueRecord {
            id: IssueNumber::new(id),
            url: String::new(),
            title: String::new(),
            sig: String::new(),
            highlight: String::new(),
            notes: vec![],
        })
    }

    #[tokio::test]
    async fn completes_when_all_producers_finish() {
        let (tx, merger) = ReportMerger::channel(1);
        for n in 0..5u64 {
            let tx = tx.clone();
            tokio::spawn(async move {
                let field = ReportField::new("", format!("section {n}"));
                let _ = tx
                    .send(Fragment::Section {
                        field,
                        records: vec![record(n)],
                    })
                    .await;
            });
        }
        drop(tx);

        let report = merger.drain().await;
        assert_eq!(report.sections.len(), 5);
        assert!(report.collisions.is_empty());
    }

    #[tokio::test]
    async fn duplicate_sections_are_flagged_last_write_wins() {
        let field = ReportField::new("", "Observing");
        let (tx, merger) = ReportMerger::channel(4);
        tx.send(Fragment::Section { field: field.clone(), records: vec![record(1)] })
            .await
            .unwrap();
        tx.send(Fragment::Section { field: field.clone(), records: vec![record(2)] })
            .await
            .unwrap();
        drop(tx);

        let report = merger.drain().await;
        assert_eq!(report.collisions, vec![field.clone()]);
        assert_eq!(report.section(&field).unwrap(), &[record(2)]);
    }

    #[tokio::test]
    async fn failures_are_kept_alongside_sections() {
        let (tx, merger) = ReportMerger::channel(4);
        let field = ReportField::new("", "Resolved");
        tx.send(Fragment::Failed {
            field: field.clone(),
            error: FetchError::Resolution { what: "column 'Resolved'".into() },
            partial: false,
        })
        .await
        .unwrap();
        drop(tx);

        let report = merger.drain().await;
        assert!(report.sections.is_empty());
        assert_eq!(
            report.failures,
            vec![SectionFailure {
                field,
                error: "could not resolve column 'Resolved'".into(),
                partial: false,
            }]
        );
        assert!(!report.is_complete());
    }
}
