//! Derives a proposal's lifecycle stage from its current label set.
//!
//! Classification is total and deterministic: no label set, however dirty,
//! produces an error. Tracker state is outside the engine's control, so
//! unrecognized or empty label sets degrade to [`Stage::Unknown`].

use chrono::{DateTime, Duration, Utc};

use crate::proposal::{Proposal, Stage};
use crate::taxonomy::{Taxonomy, label_rank};

/// Classify one proposal from its labels and FCP metadata.
///
/// When several recognized labels are present, the highest-ranked one wins
/// (see [`label_rank`]); among equal ranks the first in the proposal's
/// label order is used, which keeps the result deterministic for identical
/// inputs.
///
/// A proposal whose dominant label maps to [`Stage::InFcp`] and whose
/// window has elapsed classifies as [`Stage::FcpExpired`]. The check keys
/// on the mapped stage, not the label string, so custom taxonomies get the
/// same expiry behavior. An in-FCP proposal with no recorded start
/// timestamp is treated as still in FCP; the aggregator reports its
/// remaining days as unknown.
#[must_use]
pub fn classify(
    proposal: &Proposal,
    taxonomy: &Taxonomy,
    fcp_length_days: u32,
    now: DateTime<Utc>,
) -> Stage {
    let Some(entry) = best_entry(proposal, taxonomy) else {
        return Stage::Unknown;
    };

    if entry.stage == Stage::InFcp {
        if let Some(fcp) = &proposal.fcp {
            if fcp_elapsed(fcp.started_at, fcp_length_days, now) {
                return Stage::FcpExpired;
            }
        }
        return Stage::InFcp;
    }

    entry.stage
}

/// The taxonomy entry whose label dominates this proposal's label set.
pub(crate) fn best_entry<'a>(
    proposal: &Proposal,
    taxonomy: &'a Taxonomy,
) -> Option<&'a crate::taxonomy::TaxonomyEntry> {
    let mut best: Option<(&crate::taxonomy::TaxonomyEntry, u8)> = None;
    for label in &proposal.labels {
        let Some(entry) = taxonomy.lookup(label) else {
            continue;
        };
        let rank = label_rank(label);
        // Strict comparison keeps the earliest label on rank ties.
        if best.is_none_or(|(_, r)| rank > r) {
            best = Some((entry, rank));
        }
    }
    best.map(|(entry, _)| entry)
}

/// Whether an FCP window that started at `started_at` has fully elapsed.
#[must_use]
pub fn fcp_elapsed(started_at: DateTime<Utc>, fcp_length_days: u32, now: DateTime<Utc>) -> bool {
    now >= started_at + Duration::days(i64::from(fcp_length_days))
}

/// Remaining whole days in an FCP window, clamped to zero.
///
/// A partially elapsed final day counts as one remaining day, matching how
/// the deadline is announced ("ends in 1 day" until the day it ends).
#[must_use]
pub fn fcp_remaining_days(
    started_at: DateTime<Utc>,
    fcp_length_days: u32,
    now: DateTime<Utc>,
) -> i64 {
    let ends_at = started_at + Duration::days(i64::from(fcp_length_days));
    if now >= ends_at {
        return 0;
    }
    let left = ends_at - now;
    let whole = left.num_days();
    if left - Duration::days(whole) > Duration::zero() {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, fcp_remaining_days};
    use crate::proposal::{FcpInfo, Proposal, Stage};
    use crate::taxonomy::{FCP_LABEL, Taxonomy, TaxonomyEntry};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    const FCP_DAYS: u32 = 5;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("valid ts")
    }

    fn labeled(labels: &[&str]) -> Proposal {
        Proposal {
            number: 1,
            title: "test".to_string(),
            labels: labels.iter().map(ToString::to_string).collect(),
            fcp: None,
        }
    }

    fn in_fcp_since(started_at: DateTime<Utc>) -> Proposal {
        Proposal {
            fcp: Some(FcpInfo {
                started_at,
                disposition: None,
                pending_reviewers: None,
            }),
            ..labeled(&[FCP_LABEL])
        }
    }

    #[test]
    fn empty_and_unrecognized_labels_classify_unknown() {
        let tax = Taxonomy::default_msc();
        let now = at(2024, 3, 10, 9);
        assert_eq!(classify(&labeled(&[]), &tax, FCP_DAYS, now), Stage::Unknown);
        assert_eq!(
            classify(&labeled(&["wart", "kind:feature"]), &tax, FCP_DAYS, now),
            Stage::Unknown
        );
    }

    #[test]
    fn single_labels_map_to_their_stage() {
        let tax = Taxonomy::default_msc();
        let now = at(2024, 3, 10, 9);
        assert_eq!(classify(&labeled(&["proposal"]), &tax, FCP_DAYS, now), Stage::New);
        assert_eq!(
            classify(&labeled(&["proposed-final-comment-period"]), &tax, FCP_DAYS, now),
            Stage::PendingFcp
        );
        assert_eq!(classify(&labeled(&["merged"]), &tax, FCP_DAYS, now), Stage::Merged);
    }

    #[test]
    fn later_stage_dominates_label_superset() {
        // Mid-relabel the tracker briefly carries both labels.
        let tax = Taxonomy::default_msc();
        let now = at(2024, 3, 10, 9);
        let p = labeled(&["proposal", "proposed-final-comment-period"]);
        assert_eq!(classify(&p, &tax, FCP_DAYS, now), Stage::PendingFcp);

        let p = labeled(&["proposed-final-comment-period", "merged", "proposal"]);
        assert_eq!(classify(&p, &tax, FCP_DAYS, now), Stage::Merged);
    }

    #[test]
    fn fcp_within_window_is_in_fcp() {
        let tax = Taxonomy::default_msc();
        let now = at(2024, 3, 10, 9);
        let p = in_fcp_since(now - Duration::days(2));
        assert_eq!(classify(&p, &tax, FCP_DAYS, now), Stage::InFcp);
    }

    #[test]
    fn elapsed_fcp_is_expired_not_new() {
        let tax = Taxonomy::default_msc();
        let now = at(2024, 3, 10, 9);
        let p = in_fcp_since(now - Duration::days(i64::from(FCP_DAYS) + 1));
        assert_eq!(classify(&p, &tax, FCP_DAYS, now), Stage::FcpExpired);
    }

    #[test]
    fn fcp_label_without_start_stays_in_fcp() {
        let tax = Taxonomy::default_msc();
        let now = at(2024, 3, 10, 9);
        assert_eq!(classify(&labeled(&[FCP_LABEL]), &tax, FCP_DAYS, now), Stage::InFcp);
    }

    #[test]
    fn custom_in_fcp_label_also_expires() {
        let tax = Taxonomy::new(vec![TaxonomyEntry {
            label: "rfc-final-call".to_string(),
            stage: Stage::InFcp,
            needs_review: false,
        }]);
        let now = at(2024, 3, 10, 9);
        let p = Proposal {
            fcp: Some(FcpInfo {
                started_at: now - Duration::days(i64::from(FCP_DAYS) + 2),
                disposition: None,
                pending_reviewers: None,
            }),
            ..labeled(&["rfc-final-call"])
        };
        assert_eq!(classify(&p, &tax, FCP_DAYS, now), Stage::FcpExpired);
    }

    #[test]
    fn remaining_days_round_up_and_clamp() {
        let now = at(2024, 3, 10, 9);
        // Started 12 hours ago: 4.5 days left, announced as 5.
        assert_eq!(fcp_remaining_days(now - Duration::hours(12), FCP_DAYS, now), 5);
        // Exactly on the boundary.
        assert_eq!(
            fcp_remaining_days(now - Duration::days(i64::from(FCP_DAYS)), FCP_DAYS, now),
            0
        );
        // Long past.
        assert_eq!(fcp_remaining_days(now - Duration::days(30), FCP_DAYS, now), 0);
    }

    proptest! {
        /// `classify` is total and deterministic for arbitrary label soup.
        #[test]
        fn classify_never_panics_and_is_deterministic(
            labels in prop::collection::vec("[a-z-]{0,30}", 0..8),
            offset_hours in -2000i64..2000,
        ) {
            let tax = Taxonomy::default_msc();
            let now = at(2024, 3, 10, 9);
            let p = Proposal {
                number: 42,
                title: String::new(),
                labels,
                fcp: Some(FcpInfo {
                    started_at: now + Duration::hours(offset_hours),
                    disposition: None,
                    pending_reviewers: None,
                }),
            };
            let first = classify(&p, &tax, FCP_DAYS, now);
            let second = classify(&p, &tax, FCP_DAYS, now);
            prop_assert_eq!(first, second);
        }
    }
}
