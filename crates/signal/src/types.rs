//! Shared value types for the CI signal report domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (page numbers start at one, severities
//! are ordered) and participate in domain computations.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// A 1-based page index into a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageNumber(u32);

impl PageNumber {
    /// The first page of every listing.
    pub const FIRST: Self = Self(1);

    /// Creates a [`PageNumber`], returning `None` for zero.
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the page that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the underlying integer value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Ordinal measure of how urgently a failing or flaky job should be
/// highlighted.
///
/// The discriminant doubles as the highlight intensity: a job's marker is
/// repeated [`Severity::intensity`] times.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Not scored (passing or stale jobs, or jobs without run history).
    #[default]
    None = 0,
    /// Mostly passing, or too new to judge.
    Light = 1,
    /// Passing between 50% and 80% of recent runs.
    Medium = 2,
    /// Passing at most half of recent runs.
    High = 3,
}

impl Severity {
    /// Returns the ordinal value (`0..=3`).
    pub fn intensity(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.intensity())
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses an RFC 3339 timestamp (`2021-03-04T05:06:07Z`).
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns this timestamp moved back by `months` calendar months.
    ///
    /// Saturates at the earliest representable time.
    #[must_use]
    pub fn months_before(self, months: u32) -> Self {
        Self(
            self.0
                .checked_sub_months(Months::new(months))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Returns this timestamp moved back by `days` days.
    #[must_use]
    pub fn days_before(self, days: i64) -> Self {
        Self(
            self.0
                .checked_sub_signed(Duration::days(days))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Formats the date part only (`2021-03-04`).
    pub fn date_string(self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_start_at_one() {
        assert!(PageNumber::new(0).is_none());
        assert_eq!(PageNumber::FIRST.next().as_u32(), 2);
    }

    #[test]
    fn severity_orders_by_intensity() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Light);
        assert!(Severity::Light > Severity::None);
        assert_eq!(Severity::High.intensity(), 3);
        assert_eq!(Severity::None.intensity(), 0);
    }

    #[test]
    fn timestamp_arithmetic() {
        let t = Timestamp::parse_rfc3339("2021-05-31T12:00:00Z").unwrap();
        assert_eq!(t.months_before(3).date_string(), "2021-02-28");
        assert_eq!(t.days_before(5).date_string(), "2021-05-26");
    }

    #[test]
    fn timestamp_reads_github_format() {
        let t: Timestamp = serde_json::from_str("\"2021-03-04T05:06:07Z\"").unwrap();
        assert_eq!(t.date_string(), "2021-03-04");
    }
}
