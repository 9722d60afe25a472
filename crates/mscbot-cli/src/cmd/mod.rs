pub mod check;
pub mod query;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use mscbot_core::proposal::Snapshot;

/// Load a proposal snapshot from a JSON file (an array of proposals as
/// materialized by the tracker client).
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let proposals: Vec<mscbot_core::proposal::Proposal> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    Ok(Snapshot::new(proposals))
}
