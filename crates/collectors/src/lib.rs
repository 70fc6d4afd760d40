//! CI signal report collectors.
//!
//! This crate drives the concurrent fetch-classify-merge pipeline: it pages
//! through issue listings, resolves board buckets, aggregates dashboard
//! summaries and fans every result into a [`signal::Report`].
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Collectors sequence calls between the rules in
//! the [`signal`] crate and the port traits it defines (`IssueTracker`,
//! `ProjectBoard`, `DashboardSource`). They contain no classification rules
//! of their own.
//!
//! ## Concurrency
//!
//! Every producer (a listing, a bucket, a card, a dashboard) runs as its own
//! tokio task and reports through a channel. A channel closes only when its
//! last sender is dropped, so draining a channel to the end doubles as the
//! join barrier for everything that was spawned to feed it. All upstream
//! requests of one source share a [`RequestGate`].
//!
//! Records arrive in completion order; callers must use
//! [`signal::Report::sorted_sections`] for any presentation.

pub mod cards;
pub mod dashboards;
pub mod gate;
pub mod merger;
pub mod pagination;
pub mod sources;

pub use cards::{select_column, CardResolver};
pub use dashboards::TestgridJobAggregator;
pub use gate::RequestGate;
pub use merger::ReportMerger;
pub use pagination::{Page, PaginatedFetcher};
pub use sources::{generate_report, GithubSource, ReportSource, TestgridSource};
