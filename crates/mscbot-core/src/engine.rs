//! The engine surface exposed to the surrounding process.
//!
//! Two independent control paths share this state: `on_message` (inbound
//! chat events) and `on_tick` (the scheduler loop). Both are read-mostly;
//! the store serializes its own writes and the snapshot is an immutable
//! value swapped atomically, so they may run concurrently.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregator, ResultSet, View};
use crate::config::BotConfig;
use crate::dispatch::{Intent, Outcome, dispatch};
use crate::error::{ErrorCode, StoreError};
use crate::proposal::Snapshot;
use crate::schedule::{due_rooms, next_wakeup};
use crate::store::{RoomConfig, RoomStore};

/// Result of handing one summary to the chat layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The call exceeded its bound. Soft failure: the room stays due and
    /// retries next tick rather than being marked fired.
    TimedOut,
    Failed,
}

/// Where the scheduler delivers daily summaries.
///
/// Implementations own their transport and its timeout; a slow send for
/// one room must not stall the others, so the bound lives inside `send`.
pub trait ChatSink {
    fn send(&mut self, room_id: &str, summary: &ResultSet) -> SendOutcome;
}

/// Structured reply to an inbound message, for the chat layer to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Results(ResultSet),
    Text(String),
    /// The message addressed the bot but was not usable. Reported to the
    /// invoking room; never fatal.
    InvalidInput(String),
}

/// What one scheduler tick did, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Rooms whose summary was sent and recorded this tick.
    pub fired: Vec<String>,
    /// Rooms left due after a timed-out or failed send; retried next tick.
    pub deferred: Vec<String>,
}

/// The proposal state-aggregation and room-scheduling engine.
pub struct Engine {
    prefix: String,
    aggregator: Aggregator,
    store: RoomStore,
    snapshot: RwLock<Snapshot>,
}

impl Engine {
    #[must_use]
    pub fn new(config: &BotConfig, store: RoomStore) -> Self {
        let aggregator = Aggregator::new(
            config.taxonomy(),
            config.tracker.fcp_length_days,
            config.bot.expired_fcp_in_summary,
        );
        Self {
            prefix: config.bot.command_prefix.clone(),
            aggregator,
            store,
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// Atomically replace the proposal snapshot. Readers holding the old
    /// value keep it until they finish.
    pub fn update_snapshot(&self, snapshot: Snapshot) {
        debug!(proposals = snapshot.len(), "snapshot refreshed");
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// The current snapshot (cheap `Arc` clone).
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub const fn store(&self) -> &RoomStore {
        &self.store
    }

    /// Handle one inbound chat message. Returns `None` for room chatter
    /// that does not address the bot.
    #[must_use]
    pub fn on_message(&self, room_id: &str, text: &str, now: DateTime<Utc>) -> Option<Reply> {
        let intent = match dispatch(text, &self.prefix) {
            Outcome::NotAddressed => return None,
            Outcome::UnknownCommand => {
                return Some(Reply::InvalidInput(format!(
                    "Unknown command. Send `{}: help` for the command list.",
                    self.prefix
                )));
            }
            Outcome::InvalidArgument(complaint) => {
                info!(room_id, code = %ErrorCode::InvalidSummaryTime, "rejected command input");
                return Some(Reply::InvalidInput(complaint));
            }
            Outcome::Addressed(intent) => intent,
        };

        info!(room_id, ?intent, "command received");
        let reply = match intent {
            Intent::ShowNew => Reply::Results(self.aggregate(View::New, now)),
            Intent::ShowPending => Reply::Results(self.aggregate(View::Pending, now)),
            Intent::ShowFcp => Reply::Results(self.aggregate(View::Fcp, now)),
            Intent::ShowAll | Intent::ShowSummary => Reply::Results(self.aggregate(View::All, now)),
            Intent::ShowTasks(user) => Reply::Results(self.aggregator.tasks(
                &self.snapshot(),
                user.as_deref(),
                now,
            )),
            Intent::Help => Reply::Text(self.help_text(room_id)),
            Intent::EnableSummary => self.reconfigure(room_id, |cfg| cfg.enabled = true, "Daily summary enabled."),
            Intent::DisableSummary => {
                self.reconfigure(room_id, |cfg| cfg.enabled = false, "Daily summary disabled.")
            }
            Intent::SetSummaryTime(time) => self.reconfigure(
                room_id,
                |cfg| cfg.summary_time = time,
                &format!("Summary time now set to {} UTC.", time.format("%H:%M")),
            ),
            Intent::SetSummaryContent(view) => self.reconfigure(
                room_id,
                |cfg| cfg.summary_view = view,
                &format!("Daily summary will carry the {view} view."),
            ),
            Intent::SummaryTimeInfo => Reply::Text(self.summary_time_info(room_id)),
        };
        Some(reply)
    }

    /// One scheduler pass: fire every room that is due at `now`.
    ///
    /// The fire is recorded in the store before the tick completes, so a
    /// crash between send and record can at worst duplicate one summary
    /// after restart, which beats silently losing one. A send
    /// that times out or fails leaves the room due for the next tick.
    pub fn on_tick(&self, now: DateTime<Utc>, sink: &mut dyn ChatSink) -> TickReport {
        let mut report = TickReport::default();
        let snapshot = self.snapshot();

        for (room_id, mut config) in due_rooms(&self.store, now) {
            let summary = self
                .aggregator
                .aggregate(&snapshot, config.summary_view, now);

            match sink.send(&room_id, &summary) {
                SendOutcome::Sent => {
                    config.last_fired = Some(now.date_naive());
                    if let Err(err) = self.store.set(&room_id, config) {
                        // In-memory state is authoritative: the room still
                        // counts as fired today; the flush retries on the
                        // next mutation.
                        warn!(room_id, error = %err, "failed to persist fire record");
                    }
                    info!(room_id, "daily summary sent");
                    report.fired.push(room_id);
                }
                SendOutcome::TimedOut => {
                    warn!(room_id, code = %ErrorCode::ExternalTimeout, "summary send timed out; room stays due");
                    report.deferred.push(room_id);
                }
                SendOutcome::Failed => {
                    warn!(room_id, code = %ErrorCode::ExternalSendFailed, "summary send failed; room stays due");
                    report.deferred.push(room_id);
                }
            }
        }

        report
    }

    /// Validate and persist a full room configuration.
    ///
    /// # Errors
    ///
    /// Propagates store flush failures; the in-memory record is updated
    /// regardless.
    pub fn on_reconfigure_room(&self, room_id: &str, config: RoomConfig) -> Result<(), StoreError> {
        self.store.set(room_id, config)
    }

    /// The chat layer saw the bot leave `room_id`: drop its record.
    pub fn on_room_left(&self, room_id: &str) {
        if let Err(err) = self.store.delete(room_id) {
            warn!(room_id, error = %err, "failed to persist room removal");
        }
    }

    /// When the scheduler loop should wake next. Recompute after any
    /// reconfiguration.
    #[must_use]
    pub fn next_wakeup(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        next_wakeup(&self.store, now)
    }

    fn aggregate(&self, view: View, now: DateTime<Utc>) -> ResultSet {
        self.aggregator.aggregate(&self.snapshot(), view, now)
    }

    /// Apply `change` to the room's record and persist, acknowledging with
    /// `ack`. A flush failure is reported in the reply but does not lose
    /// the change.
    fn reconfigure(&self, room_id: &str, change: impl FnOnce(&mut RoomConfig), ack: &str) -> Reply {
        let mut config = self.store.get(room_id);
        change(&mut config);
        match self.store.set(room_id, config) {
            Ok(()) => Reply::Text(ack.to_string()),
            Err(err) => {
                warn!(room_id, error = %err, "room reconfiguration not yet flushed");
                Reply::Text(format!(
                    "{ack} (warning: {}: change not yet saved to disk)",
                    err.code()
                ))
            }
        }
    }

    fn summary_time_info(&self, room_id: &str) -> String {
        let config = self.store.get(room_id);
        let mut text = format!(
            "The daily summary time for this room is {} UTC.",
            config.summary_time.format("%H:%M")
        );
        if !config.enabled {
            text.push_str(" However, summaries in this room are currently disabled.");
        }
        text
    }

    fn help_text(&self, room_id: &str) -> String {
        let p = &self.prefix;
        let mut text = format!(
            "Commands (address me as `{p}: <command>`):\n\
             show new: proposals awaiting first review\n\
             show pending: proposals pending a final comment period\n\
             show fcp: proposals currently in final comment period\n\
             show all: all of the above\n\
             show tasks [user]: unreviewed proposals and pending sign-offs\n\
             show summary: send this room's summary now\n\
             set summary enable|disable: toggle the daily summary\n\
             set summary time HH:MM: set the daily summary time (UTC)\n\
             set summary content all|pending|fcp|in-progress: choose the summary view\n\
             summary time: show the configured summary time\n\
             help: this text\n"
        );
        text.push_str(&self.summary_time_info(room_id));
        text
    }
}
