//! Static mapping from configured tracker labels to lifecycle stages.
//!
//! The taxonomy is configured once at startup and immutable thereafter.
//! Lookup is pure data access; classification logic lives in
//! [`crate::classify`].

use serde::{Deserialize, Serialize};

use crate::proposal::Stage;

/// Tracker label carried by proposals currently inside an FCP window.
pub const FCP_LABEL: &str = "final-comment-period";

/// One configured label and the lifecycle stage it denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    /// Exact label string as it appears in the tracker.
    pub label: String,

    /// Stage a proposal carrying this label is in.
    pub stage: Stage,

    /// Whether a proposal in this stage still needs human review.
    #[serde(default)]
    pub needs_review: bool,
}

/// The full label-to-stage mapping for a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
}

impl Taxonomy {
    #[must_use]
    pub const fn new(entries: Vec<TaxonomyEntry>) -> Self {
        Self { entries }
    }

    /// Find the entry for an exact label string, if the label is recognized.
    #[must_use]
    pub fn lookup(&self, label: &str) -> Option<&TaxonomyEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    #[must_use]
    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    /// The taxonomy used by the Matrix spec-proposal tracker.
    ///
    /// This is the default when the config file carries no `[[labels]]`
    /// section of its own.
    #[must_use]
    pub fn default_msc() -> Self {
        let entry = |label: &str, stage: Stage, needs_review: bool| TaxonomyEntry {
            label: label.to_string(),
            stage,
            needs_review,
        };

        Self::new(vec![
            entry("proposal", Stage::New, false),
            entry("proposal-in-review", Stage::New, true),
            entry("proposed-final-comment-period", Stage::PendingFcp, true),
            entry(FCP_LABEL, Stage::InFcp, false),
            entry("finished-final-comment-period", Stage::Merged, false),
            entry("spec-pr-missing", Stage::Merged, false),
            entry("spec-pr-in-review", Stage::Merged, false),
            entry("merged", Stage::Merged, false),
        ])
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::default_msc()
    }
}

/// Fixed tie-break rank when a proposal carries several recognized labels.
///
/// Later pipeline stages dominate earlier ones: during a tracker label
/// update the issue briefly carries a superset of labels, and the furthest
/// stage is the truthful one.
#[must_use]
pub fn label_rank(label: &str) -> u8 {
    match label {
        "merged" => 8,
        "finished-final-comment-period" => 7,
        FCP_LABEL => 6,
        "proposed-final-comment-period" => 5,
        "spec-pr-in-review" | "spec-pr-missing" => 4,
        "proposal-in-review" => 3,
        "proposal" => 2,
        // Recognized by a custom taxonomy but absent from the fixed
        // priority table: rank above nothing, below every known label.
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::{FCP_LABEL, Taxonomy, label_rank};
    use crate::proposal::Stage;

    #[test]
    fn default_taxonomy_recognizes_tracker_labels() {
        let tax = Taxonomy::default_msc();
        assert_eq!(tax.lookup("proposal").map(|e| e.stage), Some(Stage::New));
        assert_eq!(
            tax.lookup("proposed-final-comment-period").map(|e| e.stage),
            Some(Stage::PendingFcp)
        );
        assert_eq!(tax.lookup(FCP_LABEL).map(|e| e.stage), Some(Stage::InFcp));
        assert_eq!(tax.lookup("merged").map(|e| e.stage), Some(Stage::Merged));
        assert!(tax.lookup("wart").is_none());
    }

    #[test]
    fn in_review_needs_human_attention() {
        let tax = Taxonomy::default_msc();
        assert!(tax.lookup("proposal-in-review").expect("entry").needs_review);
        assert!(!tax.lookup("proposal").expect("entry").needs_review);
    }

    #[test]
    fn later_stages_outrank_earlier_ones() {
        assert!(label_rank("merged") > label_rank(FCP_LABEL));
        assert!(label_rank(FCP_LABEL) > label_rank("proposed-final-comment-period"));
        assert!(label_rank("proposed-final-comment-period") > label_rank("spec-pr-in-review"));
        assert!(label_rank("spec-pr-in-review") > label_rank("proposal-in-review"));
        assert!(label_rank("proposal-in-review") > label_rank("proposal"));
        assert_eq!(label_rank("spec-pr-in-review"), label_rank("spec-pr-missing"));
    }

    #[test]
    fn unlisted_labels_rank_lowest_but_nonzero() {
        assert_eq!(label_rank("custom-stage"), 1);
        assert!(label_rank("proposal") > label_rank("custom-stage"));
    }
}
