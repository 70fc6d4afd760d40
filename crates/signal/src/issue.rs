//! GitHub issues and the rules that turn them into report records.
//!
//! Two paths exist. The **issue path** classifies items of a filtered issue
//! listing: it applies the exclusion policy, collects every SIG, highlights
//! age and assembles notes. The **card path** classifies the issue linked from
//! a board card: no exclusion, first SIG only (normalized), bare title.

use serde::{Deserialize, Serialize};

use crate::{EmojiSet, IssueNumber, IssueRecord, Timestamp};

/// Labels that remove an issue from the listing sections.
pub const EXCLUDED_LABELS: [&str; 4] = [
    "priority/backlog",
    "triage/accepted",
    "lifecycle/rotten",
    "lifecycle/stale",
];

const SIG_PREFIX: &str = "sig/";
const FAILING_TEST_TAG: &str = "[Failing Test]";

/// An issue as seen by the domain, independent of the GitHub wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: IssueNumber,
    pub html_url: String,
    pub title: String,
    pub labels: Vec<String>,
    pub milestone: Option<String>,
    pub comments: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Issue {
    /// Returns `true` when the item is a pull request listed by the issues
    /// endpoint.
    pub fn is_pull_request(&self) -> bool {
        self.html_url.contains("/pull/")
    }

    /// Returns `true` if the issue must not appear in a listing section.
    pub fn is_excluded(&self) -> bool {
        self.is_pull_request()
            || self
                .labels
                .iter()
                .any(|label| EXCLUDED_LABELS.contains(&label.as_str()))
    }

    fn sig_names(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .filter_map(|label| label.strip_prefix(SIG_PREFIX))
            .filter(|name| !name.is_empty())
    }
}

/// Normalizes a SIG name for board-card records: `cli` is upper-cased,
/// `cluster-lifecycle` lower-cased, everything else title-cased.
pub fn normalize_sig(name: &str) -> String {
    if name.eq_ignore_ascii_case("cli") {
        name.to_uppercase()
    } else if name.eq_ignore_ascii_case("cluster-lifecycle") {
        name.to_lowercase()
    } else {
        title_case(name)
    }
}

fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Age markers of an issue-path record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeFlags {
    /// Created more than three months before the run.
    pub stale_old: bool,
    /// Created within the five days before the run.
    pub fresh: bool,
}

/// Result of classifying one listed issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub include: bool,
    pub sig: String,
    pub notes: Vec<String>,
    pub age: AgeFlags,
    pub highlight: String,
}

/// Classifies issues for one report run.
#[derive(Debug, Clone)]
pub struct IssueClassifier {
    emojis: EmojiSet,
    emojis_off: bool,
    now: Timestamp,
}

impl IssueClassifier {
    /// Creates a classifier judging ages relative to `now`.
    pub fn new(emojis: EmojiSet, emojis_off: bool, now: Timestamp) -> Self {
        Self {
            emojis,
            emojis_off,
            now,
        }
    }

    /// Classifies an issue from a listing (issue path).
    pub fn classify(&self, issue: &Issue) -> Classification {
        let age = self.age_flags(issue);
        Classification {
            include: !issue.is_excluded(),
            sig: issue.sig_names().collect::<Vec<_>>().join(", "),
            notes: self.notes(issue),
            highlight: self.highlight(age),
            age,
        }
    }

    /// Turns a listed issue into a record, or `None` if it is excluded.
    pub fn listing_record(&self, issue: &Issue) -> Option<IssueRecord> {
        let classification = self.classify(issue);
        classification.include.then(|| IssueRecord {
            id: issue.number,
            url: issue.html_url.clone(),
            title: issue.title.clone(),
            sig: classification.sig,
            highlight: classification.highlight,
            notes: classification.notes,
        })
    }

    /// Turns the issue linked from a board card into a record (card path).
    pub fn card_record(issue: &Issue) -> IssueRecord {
        IssueRecord {
            id: issue.number,
            url: issue.html_url.clone(),
            title: issue.title.replace(FAILING_TEST_TAG, "").trim().to_string(),
            sig: issue.sig_names().next().map(normalize_sig).unwrap_or_default(),
            highlight: String::new(),
            notes: Vec::new(),
        }
    }

    fn age_flags(&self, issue: &Issue) -> AgeFlags {
        AgeFlags {
            stale_old: issue.created_at < self.now.months_before(3),
            fresh: issue.created_at > self.now.days_before(5),
        }
    }

    fn highlight(&self, age: AgeFlags) -> String {
        let (old, fresh) = if self.emojis_off {
            ("[old]", "[new]")
        } else {
            (self.emojis.issue_old.as_str(), self.emojis.issue_fresh.as_str())
        };
        let mut highlight = String::new();
        if age.stale_old {
            highlight.push_str(old);
        }
        if age.fresh {
            highlight.push_str(fresh);
        }
        highlight
    }

    fn notes(&self, issue: &Issue) -> Vec<String> {
        let mut notes = vec![format!(
            "created {}, updated {}, {} comments",
            issue.created_at.date_string(),
            issue.updated_at.date_string(),
            issue.comments
        )];

        let (priority_marker, kind_marker) = if self.emojis_off {
            ("P:", "K:")
        } else {
            (
                self.emojis.priority_label.as_str(),
                self.emojis.kind_label.as_str(),
            )
        };
        let priorities = issue
            .labels
            .iter()
            .filter(|l| l.starts_with("priority/"))
            .map(|l| format!("{priority_marker} {l}"));
        let kinds = issue
            .labels
            .iter()
            .filter(|l| l.starts_with("kind/"))
            .map(|l| format!("{kind_marker} {l}"));
        let label_note = priorities.chain(kinds).collect::<Vec<_>>().join(" ");
        if !label_note.is_empty() {
            notes.push(label_note);
        }

        if let Some(milestone) = &issue.milestone {
            notes.push(format!("milestone {milestone}"));
        }
        notes
    }
}
