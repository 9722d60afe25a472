use std::sync::Arc;
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived lifecycle classification of a tracked proposal.
///
/// Stage is a pure function of (labels, FCP length, current time). It is
/// recomputed on every query and never cached across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    New,
    PendingFcp,
    InFcp,
    /// Still labeled `final-comment-period`, but the window has elapsed.
    /// The tracker does not auto-clear the label; the engine surfaces the
    /// proposal as expired rather than re-bucketing it as `New`.
    FcpExpired,
    Merged,
    Unknown,
}

impl Stage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PendingFcp => "pending-fcp",
            Self::InFcp => "in-fcp",
            Self::FcpExpired => "fcp-expired",
            Self::Merged => "merged",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a stage value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStageError {
    pub got: String,
}

impl fmt::Display for ParseStageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid stage: '{}'", self.got)
    }
}

impl std::error::Error for ParseStageError {}

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "pending-fcp" => Ok(Self::PendingFcp),
            "in-fcp" => Ok(Self::InFcp),
            "fcp-expired" => Ok(Self::FcpExpired),
            "merged" => Ok(Self::Merged),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseStageError { got: s.to_string() }),
        }
    }
}

/// Final-comment-period metadata attached to a proposal by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcpInfo {
    /// When the FCP window (or the FCP proposal vote) started.
    pub started_at: DateTime<Utc>,

    /// Requested disposition, e.g. `merge` or `close`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,

    /// Team members who have not yet signed off the FCP proposal.
    /// `None` means the tracker snapshot carried no reviewer data at all,
    /// which is distinct from an empty (everyone approved) list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_reviewers: Option<Vec<String>>,
}

/// One tracked proposal as materialized by the external tracker client.
///
/// Tracker data is untrusted: `labels` may contain zero, one, or several
/// taxonomy-recognized entries, in whatever order the tracker returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proposal {
    pub number: u64,
    pub title: String,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcp: Option<FcpInfo>,
}

/// Immutable point-in-time list of tracked proposals.
///
/// A refresh produces a new `Snapshot`; the old value is never mutated in
/// place, so concurrent readers keep consuming the snapshot they started
/// with. Cloning is an `Arc` bump.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    proposals: Arc<[Proposal]>,
}

impl Snapshot {
    #[must_use]
    pub fn new(proposals: Vec<Proposal>) -> Self {
        Self {
            proposals: proposals.into(),
        }
    }

    #[must_use]
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

impl FromIterator<Proposal> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Proposal>>(iter: I) -> Self {
        Self {
            proposals: iter.into_iter().collect(),
        }
    }
}
