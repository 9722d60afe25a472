//! Daily-summary scheduling: which rooms fire now, and when to wake next.
//!
//! Each room cycles `Idle -> Due -> Fired -> Idle` once per day. `Due` is
//! entered when the room's summary time passes and it has not fired today;
//! that definition also gives catch-up for free: a room whose time went by
//! while the process was down is still due on resume, and fires exactly
//! once because firing records today's date.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

use crate::store::{RoomConfig, RoomStore};

/// Where a room is in its daily cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Summaries disabled, or not yet due today.
    Idle,
    /// Due now: summary time passed and nothing fired today.
    Due,
    /// Already fired today.
    Fired,
}

/// Compute a room's phase at `now`.
#[must_use]
pub fn phase(config: &RoomConfig, now: DateTime<Utc>) -> Phase {
    if !config.enabled {
        return Phase::Idle;
    }
    if config.last_fired == Some(now.date_naive()) {
        return Phase::Fired;
    }
    if now.time() >= config.summary_time {
        Phase::Due
    } else {
        Phase::Idle
    }
}

/// All rooms due for a summary at `now`, in stable store order.
#[must_use]
pub fn due_rooms(store: &RoomStore, now: DateTime<Utc>) -> Vec<(String, RoomConfig)> {
    store
        .all_enabled()
        .into_iter()
        .filter(|(_, cfg)| phase(cfg, now) == Phase::Due)
        .collect()
}

/// When the scheduler loop should wake next.
///
/// The minimum of the next minute boundary and the earliest unfired room's
/// due time. Minute granularity is the floor, since summary times are
/// specified to the minute; the loop never busy-polls below it.
#[must_use]
pub fn next_wakeup(store: &RoomStore, now: DateTime<Utc>) -> DateTime<Utc> {
    let mut wakeup = next_minute_boundary(now);

    for (_, cfg) in store.all_enabled() {
        if let Some(due) = next_due_at(&cfg, now) {
            wakeup = wakeup.min(due);
        }
    }

    wakeup
}

/// The next instant `config`'s summary becomes due, if summaries are
/// enabled. Rooms already due return the next minute boundary, not `now`:
/// a room left due by a failed send retries one tick later, and the
/// runner's sleep stays strictly positive instead of spinning.
#[must_use]
pub fn next_due_at(config: &RoomConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !config.enabled {
        return None;
    }

    match phase(config, now) {
        Phase::Due => Some(next_minute_boundary(now)),
        Phase::Idle => at_time(now, config.summary_time),
        Phase::Fired => at_time(now + Duration::days(1), config.summary_time),
    }
}

fn at_time(day: DateTime<Utc>, time: NaiveTime) -> Option<DateTime<Utc>> {
    Some(day.date_naive().and_time(time).and_utc())
}

fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + Duration::minutes(1)
}
