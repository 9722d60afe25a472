//! Per-room persisted schedule state.
//!
//! The store is the single source of truth for room configuration across
//! restarts. Layout on disk is one JSON document mapping room id to record
//! (enabled flag, summary time as `HH:MM` UTC, last-fired date). Every
//! mutation flushes: the previous file is kept as a `.bak` sibling and the
//! new contents land via write-to-temp + rename, so a concurrent reader
//! never observes a torn record.
//!
//! Single-writer assumption: an exclusive advisory lock on a `.lock`
//! sibling is held for the store's lifetime, so no two processes can
//! mutate the same file.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::View;
use crate::error::StoreError;

/// `HH:MM` serialization for summary times, matching the persisted layout.
mod time_hm {
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

/// Persisted configuration for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Whether the daily summary fires in this room.
    pub enabled: bool,

    /// Time of day (UTC, minute resolution) the summary is due.
    #[serde(with = "time_hm")]
    pub summary_time: NaiveTime,

    /// Date of the last summary fired, or `None` if never fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fired: Option<NaiveDate>,

    /// Which view the daily summary carries in this room.
    #[serde(default)]
    pub summary_view: View,
}

impl RoomConfig {
    /// The record a never-configured room gets: summaries disabled, time
    /// set to the process-wide default, full summary content.
    #[must_use]
    pub const fn unconfigured(default_time: NaiveTime) -> Self {
        Self {
            enabled: false,
            summary_time: default_time,
            last_fired: None,
            summary_view: View::All,
        }
    }
}

/// Exclusive advisory lock guarding one store file.
#[derive(Debug)]
struct StoreGuard {
    file: File,
}

impl StoreGuard {
    fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)
                .map_err(|source| StoreError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Self { file });
            }

            if start.elapsed() >= timeout {
                return Err(StoreError::Locked {
                    path: path.to_path_buf(),
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// The room schedule store: in-memory map + flush-on-mutation persistence.
#[derive(Debug)]
pub struct RoomStore {
    path: PathBuf,
    default_time: NaiveTime,
    rooms: Mutex<BTreeMap<String, RoomConfig>>,
    _guard: StoreGuard,
}

impl RoomStore {
    /// Load the store from `path`, creating an empty one if the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// A file that exists but cannot be read or parsed is fatal
    /// ([`StoreError::is_fatal`]): ambiguous room state must not be
    /// silently reset. Lock contention with another process is likewise
    /// fatal at open.
    pub fn open(path: impl Into<PathBuf>, default_time: NaiveTime) -> Result<Self, StoreError> {
        let path = path.into();
        let guard = StoreGuard::acquire(&lock_path(&path), Duration::from_millis(500))?;

        let rooms = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| StoreError::Unreadable {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else if backup_path(&path).exists() {
            // A backup with no primary means the store file was lost, not
            // that this is a fresh install. Starting empty here would
            // silently reset every room.
            return Err(StoreError::Unreadable {
                path: path.clone(),
                source: io::Error::other("room store file is missing but its backup exists"),
            });
        } else {
            debug!(path = %path.display(), "room store file absent, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            default_time,
            rooms: Mutex::new(rooms),
            _guard: guard,
        })
    }

    /// The configured record for `room_id`, or the unconfigured default.
    #[must_use]
    pub fn get(&self, room_id: &str) -> RoomConfig {
        self.lock_rooms()
            .get(room_id)
            .cloned()
            .unwrap_or_else(|| RoomConfig::unconfigured(self.default_time))
    }

    /// Whether `room_id` has an explicit record.
    #[must_use]
    pub fn contains(&self, room_id: &str) -> bool {
        self.lock_rooms().contains_key(room_id)
    }

    /// Insert or replace the record for `room_id` and flush.
    ///
    /// # Errors
    ///
    /// A failed flush returns [`StoreError::WriteFailed`] but does not
    /// roll back: the in-memory record stays authoritative and the next
    /// successful mutation persists it (at-least-once durability).
    pub fn set(&self, room_id: &str, config: RoomConfig) -> Result<(), StoreError> {
        let mut rooms = self.lock_rooms();
        rooms.insert(room_id.to_string(), config);
        self.flush(&rooms)
    }

    /// Remove the record for `room_id` (e.g. after the bot leaves the
    /// room) and flush. Removing an absent record is a no-op.
    ///
    /// # Errors
    ///
    /// Same flush semantics as [`Self::set`].
    pub fn delete(&self, room_id: &str) -> Result<(), StoreError> {
        let mut rooms = self.lock_rooms();
        if rooms.remove(room_id).is_none() {
            debug!(room_id, "delete for room with no record");
            return Ok(());
        }
        self.flush(&rooms)
    }

    /// All rooms with summaries enabled, in stable (id) order.
    #[must_use]
    pub fn all_enabled(&self) -> Vec<(String, RoomConfig)> {
        self.lock_rooms()
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(id, cfg)| (id.clone(), cfg.clone()))
            .collect()
    }

    /// Process-wide default summary time for unconfigured rooms.
    #[must_use]
    pub const fn default_time(&self) -> NaiveTime {
        self.default_time
    }

    fn lock_rooms(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, RoomConfig>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self, rooms: &BTreeMap<String, RoomConfig>) -> Result<(), StoreError> {
        self.flush_inner(rooms).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "room store flush failed");
            StoreError::WriteFailed {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn flush_inner(&self, rooms: &BTreeMap<String, RoomConfig>) -> io::Result<()> {
        let payload = serde_json::to_vec_pretty(rooms).map_err(io::Error::other)?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&payload)?;
        tmp.sync_all()?;

        // The previous generation is copied, not renamed, to its backup:
        // the primary file must never be absent, whatever instant the
        // process dies at. The swap itself is a single atomic rename.
        if self.path.exists() {
            fs::copy(&self.path, backup_path(&self.path))?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("json.lock")
}

fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("json.bak")
}
