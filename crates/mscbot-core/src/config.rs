//! Process configuration, loaded once at startup and immutable thereafter.
//!
//! A change requires a restart; nothing in the engine re-reads the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::proposal::Stage;
use crate::taxonomy::{Taxonomy, TaxonomyEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub bot: BotSection,
    pub tracker: TrackerSection,
    /// Label taxonomy; defaults to the MSC tracker's label set when the
    /// config file has no `[[labels]]` tables.
    pub labels: Vec<LabelEntry>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot: BotSection::default(),
            tracker: TrackerSection::default(),
            labels: default_labels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// Prefix a chat message must carry (before `:`) to address the bot.
    pub command_prefix: String,

    /// Daily summary time for rooms without their own setting (UTC).
    #[serde(with = "hm")]
    pub default_summary_time: NaiveTime,

    /// Where per-room schedule state is persisted.
    pub data_path: PathBuf,

    /// Whether summaries surface FCPs that outlived their window as a
    /// distinct "expired, needs re-label" section.
    pub expired_fcp_in_summary: bool,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            command_prefix: "mscbot".to_string(),
            default_summary_time: NaiveTime::from_hms_opt(9, 0, 0)
                .unwrap_or(NaiveTime::MIN),
            data_path: PathBuf::from("mscbot-rooms.json"),
            expired_fcp_in_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSection {
    /// Tracker repository slug, for logs and operator output. The engine
    /// never contacts it; snapshots arrive pre-fetched.
    pub repo: String,

    /// Final comment period length in days.
    pub fcp_length_days: u32,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            repo: "matrix-org/matrix-spec-proposals".to_string(),
            fcp_length_days: 5,
        }
    }
}

/// One `[[labels]]` table in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    pub stage: Stage,
    #[serde(default)]
    pub needs_review: bool,
}

impl BotConfig {
    /// Build the immutable taxonomy from the configured label tables.
    #[must_use]
    pub fn taxonomy(&self) -> Taxonomy {
        Taxonomy::new(
            self.labels
                .iter()
                .map(|l| TaxonomyEntry {
                    label: l.name.clone(),
                    stage: l.stage,
                    needs_review: l.needs_review,
                })
                .collect(),
        )
    }
}

fn default_labels() -> Vec<LabelEntry> {
    Taxonomy::default_msc()
        .entries()
        .iter()
        .map(|e| LabelEntry {
            name: e.label.clone(),
            stage: e.stage,
            needs_review: e.needs_review,
        })
        .collect()
}

/// Load and parse the config file at `path`.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed; config errors
/// are fatal at startup.
pub fn load_config(path: &Path) -> Result<BotConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<BotConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// `HH:MM` (de)serialization for config times.
mod hm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(de)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(D::Error::custom)
    }
}
