//! Buckets a proposal snapshot into the {new, pending, fcp, all} views.
//!
//! Output is structured, not textual: the chat layer renders a
//! [`ResultSet`] into whatever markup its protocol wants. Ordering inside
//! each bucket preserves snapshot order so identical inputs always produce
//! identical results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{best_entry, classify, fcp_remaining_days};
use crate::proposal::{Proposal, Snapshot, Stage};
use crate::taxonomy::Taxonomy;

/// Which bucket(s) a query asks for.
///
/// `Tasks` is the "what needs attention" view: unreviewed proposals plus
/// pending FCPs, optionally narrowed to one reviewer's outstanding
/// sign-offs via [`Aggregator::tasks`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    New,
    Pending,
    Fcp,
    #[default]
    All,
    Tasks,
}

impl View {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Fcp => "fcp",
            Self::All => "all",
            Self::Tasks => "tasks",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer sign-off state for a pending-FCP proposal.
///
/// Absent tracker data is `Unknown`, never a silently omitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "names")]
pub enum Reviewers {
    Known(Vec<String>),
    Unknown,
}

/// A proposal in the new/unreviewed bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub number: u64,
    pub title: String,
    pub stage: Stage,
}

/// A proposal awaiting team sign-off before its FCP can start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub number: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    pub awaiting: Reviewers,
}

/// A proposal currently inside (or expired out of) its FCP window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcpEntry {
    pub number: u64,
    pub title: String,
    /// Remaining whole days, clamped to >= 0. `None` when the snapshot
    /// carried no FCP start timestamp for this proposal.
    pub remaining_days: Option<i64>,
}

/// One bucket of a result set. An empty bucket is an explicit zero-count
/// section, never an absent field, so "none" is always visible downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section<T> {
    pub count: usize,
    pub entries: Vec<T>,
}

impl<T> Section<T> {
    fn new(entries: Vec<T>) -> Self {
        Self {
            count: entries.len(),
            entries,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Structured answer to one status query.
///
/// Sections not requested by the view are `None`; a requested-but-empty
/// section is `Some` with a zero count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub view: View,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Section<NewEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Section<PendingEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcp: Option<Section<FcpEntry>>,
    /// Proposals still labeled in-FCP past their window; needs a re-label.
    /// Populated only when the expired-FCP policy surfaces them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<Section<FcpEntry>>,
    /// Proposals in the snapshot that fell into none of the view's buckets
    /// (merged, or new-but-reviewed). Kept as a count so nothing disappears
    /// silently from the arithmetic.
    pub skipped: usize,
}

/// Snapshot-independent aggregation parameters, fixed at startup.
#[derive(Debug, Clone)]
pub struct Aggregator {
    taxonomy: Taxonomy,
    fcp_length_days: u32,
    /// Whether expired FCPs appear as their own section in summaries.
    include_expired: bool,
}

impl Aggregator {
    #[must_use]
    pub const fn new(taxonomy: Taxonomy, fcp_length_days: u32, include_expired: bool) -> Self {
        Self {
            taxonomy,
            fcp_length_days,
            include_expired,
        }
    }

    #[must_use]
    pub const fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Bucket `snapshot` according to `view` at time `now`.
    #[must_use]
    pub fn aggregate(&self, snapshot: &Snapshot, view: View, now: DateTime<Utc>) -> ResultSet {
        if view == View::Tasks {
            return self.tasks(snapshot, None, now);
        }

        let mut new = Vec::new();
        let mut pending = Vec::new();
        let mut fcp = Vec::new();
        let mut expired = Vec::new();
        let mut skipped = 0usize;

        let wants_new = matches!(view, View::New | View::All);
        let wants_pending = matches!(view, View::Pending | View::All);
        let wants_fcp = matches!(view, View::Fcp | View::All);

        for proposal in snapshot.proposals() {
            match classify(proposal, &self.taxonomy, self.fcp_length_days, now) {
                Stage::New | Stage::Unknown if wants_new => {
                    if self.needs_review(proposal) {
                        new.push(self.new_entry(proposal, now));
                    } else {
                        skipped += 1;
                    }
                }
                Stage::PendingFcp if wants_pending => pending.push(pending_entry(proposal)),
                Stage::InFcp if wants_fcp => fcp.push(self.fcp_entry(proposal, now)),
                Stage::FcpExpired if wants_fcp && self.include_expired => {
                    expired.push(self.fcp_entry(proposal, now));
                }
                _ => skipped += 1,
            }
        }

        ResultSet {
            view,
            new: wants_new.then(|| Section::new(new)),
            pending: wants_pending.then(|| Section::new(pending)),
            fcp: wants_fcp.then(|| Section::new(fcp)),
            expired: (wants_fcp && self.include_expired).then(|| Section::new(expired)),
            skipped,
        }
    }

    /// The tasks view: unreviewed proposals plus pending FCPs. With a
    /// `reviewer` filter, only pending FCPs still awaiting that reviewer's
    /// sign-off are kept; entries with unknown reviewer data cannot be
    /// attributed and are counted as skipped.
    #[must_use]
    pub fn tasks(
        &self,
        snapshot: &Snapshot,
        reviewer: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultSet {
        let mut new = Vec::new();
        let mut pending = Vec::new();
        let mut skipped = 0usize;

        for proposal in snapshot.proposals() {
            match classify(proposal, &self.taxonomy, self.fcp_length_days, now) {
                Stage::New | Stage::Unknown if self.needs_review(proposal) => {
                    new.push(self.new_entry(proposal, now));
                }
                Stage::PendingFcp => {
                    let entry = pending_entry(proposal);
                    if reviewer.is_none_or(|name| awaits_reviewer(&entry, name)) {
                        pending.push(entry);
                    } else {
                        skipped += 1;
                    }
                }
                _ => skipped += 1,
            }
        }

        ResultSet {
            view: View::Tasks,
            new: Some(Section::new(new)),
            pending: Some(Section::new(pending)),
            fcp: None,
            expired: None,
            skipped,
        }
    }

    /// Unreviewed means: no taxonomy match at all (nobody has triaged the
    /// proposal) or a matched entry that flags needs-review.
    fn needs_review(&self, proposal: &Proposal) -> bool {
        best_entry(proposal, &self.taxonomy).is_none_or(|entry| entry.needs_review)
    }

    fn new_entry(&self, proposal: &Proposal, now: DateTime<Utc>) -> NewEntry {
        NewEntry {
            number: proposal.number,
            title: proposal.title.clone(),
            stage: classify(proposal, &self.taxonomy, self.fcp_length_days, now),
        }
    }

    fn fcp_entry(&self, proposal: &Proposal, now: DateTime<Utc>) -> FcpEntry {
        FcpEntry {
            number: proposal.number,
            title: proposal.title.clone(),
            remaining_days: proposal
                .fcp
                .as_ref()
                .map(|f| fcp_remaining_days(f.started_at, self.fcp_length_days, now)),
        }
    }
}

fn awaits_reviewer(entry: &PendingEntry, reviewer: &str) -> bool {
    match &entry.awaiting {
        Reviewers::Known(names) => names.iter().any(|n| n.eq_ignore_ascii_case(reviewer)),
        Reviewers::Unknown => false,
    }
}

fn pending_entry(proposal: &Proposal) -> PendingEntry {
    let (disposition, awaiting) = proposal.fcp.as_ref().map_or(
        (None, Reviewers::Unknown),
        |f| {
            (
                f.disposition.clone(),
                f.pending_reviewers
                    .clone()
                    .map_or(Reviewers::Unknown, Reviewers::Known),
            )
        },
    );

    PendingEntry {
        number: proposal.number,
        title: proposal.title.clone(),
        disposition,
        awaiting,
    }
}

#[cfg(test)]
mod tests {
    use super::{Aggregator, Reviewers, View};
    use crate::proposal::{FcpInfo, Proposal, Snapshot, Stage};
    use crate::taxonomy::{FCP_LABEL, Taxonomy};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const FCP_DAYS: u32 = 5;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).single().expect("valid ts")
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(Taxonomy::default_msc(), FCP_DAYS, true)
    }

    fn proposal(number: u64, labels: &[&str], fcp: Option<FcpInfo>) -> Proposal {
        Proposal {
            number,
            title: format!("MSC{number}"),
            labels: labels.iter().map(ToString::to_string).collect(),
            fcp,
        }
    }

    fn fcp_started(days_ago: i64, reviewers: Option<&[&str]>) -> FcpInfo {
        FcpInfo {
            started_at: now() - Duration::days(days_ago),
            disposition: Some("merge".to_string()),
            pending_reviewers: reviewers.map(|r| r.iter().map(ToString::to_string).collect()),
        }
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot::new(vec![
            proposal(100, &["proposal-in-review"], None),
            proposal(200, &["proposed-final-comment-period"], Some(fcp_started(0, Some(&["alice"])))),
            proposal(300, &[FCP_LABEL], Some(fcp_started(2, None))),
            proposal(400, &["merged"], None),
            proposal(500, &["mislabeled-nonsense"], None),
            proposal(600, &[FCP_LABEL], Some(fcp_started(10, None))),
        ])
    }

    #[test]
    fn all_view_buckets_and_counts() {
        let rs = aggregator().aggregate(&sample_snapshot(), View::All, now());

        let new = rs.new.expect("new section");
        let pending = rs.pending.expect("pending section");
        let fcp = rs.fcp.expect("fcp section");
        let expired = rs.expired.expect("expired section");

        assert_eq!(new.count, 2); // in-review + unclassified
        assert_eq!(pending.count, 1);
        assert_eq!(fcp.count, 1);
        assert_eq!(expired.count, 1);
        assert_eq!(rs.skipped, 1); // the merged proposal

        let total = new.count + pending.count + fcp.count + expired.count + rs.skipped;
        assert_eq!(total, sample_snapshot().len());
    }

    #[test]
    fn unclassified_proposals_surface_in_new() {
        let rs = aggregator().aggregate(&sample_snapshot(), View::New, now());
        let new = rs.new.expect("new section");
        assert!(new.entries.iter().any(|e| e.number == 500 && e.stage == Stage::Unknown));
        assert!(rs.pending.is_none());
        assert!(rs.fcp.is_none());
    }

    #[test]
    fn pending_carries_reviewers_or_unknown() {
        let snap = Snapshot::new(vec![
            proposal(1, &["proposed-final-comment-period"], Some(fcp_started(0, Some(&["alice", "bob"])))),
            proposal(2, &["proposed-final-comment-period"], None),
        ]);
        let rs = aggregator().aggregate(&snap, View::Pending, now());
        let pending = rs.pending.expect("pending section");
        assert_eq!(
            pending.entries[0].awaiting,
            Reviewers::Known(vec!["alice".to_string(), "bob".to_string()])
        );
        assert_eq!(pending.entries[1].awaiting, Reviewers::Unknown);
    }

    #[test]
    fn fcp_remaining_days_clamped() {
        let rs = aggregator().aggregate(&sample_snapshot(), View::Fcp, now());
        let fcp = rs.fcp.expect("fcp section");
        assert_eq!(fcp.entries[0].number, 300);
        assert_eq!(fcp.entries[0].remaining_days, Some(3));

        let expired = rs.expired.expect("expired section");
        assert_eq!(expired.entries[0].number, 600);
        assert_eq!(expired.entries[0].remaining_days, Some(0));
    }

    #[test]
    fn expired_policy_off_hides_expired_section() {
        let agg = Aggregator::new(Taxonomy::default_msc(), FCP_DAYS, false);
        let rs = agg.aggregate(&sample_snapshot(), View::All, now());
        assert!(rs.expired.is_none());
        // The expired proposal still counts somewhere: it is skipped.
        assert_eq!(rs.skipped, 2);
    }

    #[test]
    fn tasks_view_carries_unreviewed_and_pending() {
        let rs = aggregator().tasks(&sample_snapshot(), None, now());
        assert_eq!(rs.view, View::Tasks);
        assert_eq!(rs.new.expect("new section").count, 2);
        assert_eq!(rs.pending.expect("pending section").count, 1);
        assert!(rs.fcp.is_none());
    }

    #[test]
    fn tasks_filter_keeps_only_the_reviewers_pending_fcps() {
        let snap = Snapshot::new(vec![
            proposal(1, &["proposed-final-comment-period"], Some(fcp_started(0, Some(&["alice"])))),
            proposal(2, &["proposed-final-comment-period"], Some(fcp_started(0, Some(&["bob"])))),
            proposal(3, &["proposed-final-comment-period"], None),
        ]);

        let rs = aggregator().tasks(&snap, Some("Alice"), now());
        let pending = rs.pending.expect("pending section");
        assert_eq!(pending.count, 1);
        assert_eq!(pending.entries[0].number, 1);
        // bob's entry plus the unattributable one.
        assert_eq!(rs.skipped, 2);
    }

    #[test]
    fn aggregate_routes_the_tasks_view() {
        let rs = aggregator().aggregate(&sample_snapshot(), View::Tasks, now());
        assert_eq!(rs.view, View::Tasks);
        assert!(rs.pending.is_some());
        assert!(rs.expired.is_none());
    }

    #[test]
    fn empty_snapshot_yields_explicit_empty_sections() {
        let rs = aggregator().aggregate(&Snapshot::default(), View::All, now());
        assert_eq!(rs.new.expect("new").count, 0);
        assert_eq!(rs.pending.expect("pending").count, 0);
        assert_eq!(rs.fcp.expect("fcp").count, 0);
        assert_eq!(rs.skipped, 0);
    }

    #[test]
    fn bucket_order_preserves_snapshot_order() {
        let snap = Snapshot::new(vec![
            proposal(9, &["proposal-in-review"], None),
            proposal(3, &["proposal-in-review"], None),
            proposal(7, &["proposal-in-review"], None),
        ]);
        let rs = aggregator().aggregate(&snap, View::New, now());
        let numbers: Vec<u64> = rs.new.expect("new").entries.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![9, 3, 7]);
    }
}
