//! `mscbot run`: the long-running scheduler daemon.
//!
//! Inbound chat events are the embedding chat layer's concern; this
//! command drives the other control path: the scheduler loop, plus
//! periodic snapshot refresh from a file the tracker client maintains.
//!
//! The loop never busy-polls. Each pass handles due rooms, then sleeps
//! until the engine's next wakeup (at most one minute away), waking early
//! on a control event. Shutdown drains the tick in progress and does not
//! start another; the operator requests it with a `quit` line on stdin or
//! by closing stdin, as a supervisor does on stop.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::Args;
use mscbot_core::aggregate::ResultSet;
use mscbot_core::engine::{ChatSink, Engine, SendOutcome};
use mscbot_core::store::RoomStore;
use mscbot_core::{BotConfig, load_config};
use tracing::{info, warn};

use crate::cmd::load_snapshot;
use crate::output::{OutputMode, render_result_set};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the config file.
    #[arg(short, long, default_value = "mscbot.toml")]
    pub config: PathBuf,

    /// JSON file holding the tracked-proposal snapshot, maintained by the
    /// external tracker client.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Seconds between snapshot reloads.
    #[arg(long, default_value = "300")]
    pub refresh_secs: u64,
}

/// Events that wake the scheduler loop before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// A room was reconfigured; recompute the sleep deadline.
    Reconfigured,
    /// Finish the current pass and exit.
    Shutdown,
}

/// Sink that prints each summary to stdout.
///
/// Stands in for a chat client; sends to a local pipe do not block, so
/// every send reports `Sent`.
struct ConsoleSink {
    mode: OutputMode,
}

impl ChatSink for ConsoleSink {
    fn send(&mut self, room_id: &str, summary: &ResultSet) -> SendOutcome {
        let mut stdout = std::io::stdout().lock();
        let written = writeln!(stdout, "--- daily summary for {room_id} ---")
            .map_err(Into::into)
            .and_then(|()| render_result_set(summary, self.mode, &mut stdout));
        match written {
            Ok(()) => SendOutcome::Sent,
            Err(err) => {
                warn!(room_id, error = %err, "failed to write summary");
                SendOutcome::Failed
            }
        }
    }
}

pub fn run_daemon(args: &RunArgs, output: OutputMode) -> Result<()> {
    let config = load_config(&args.config)?;
    let engine = open_engine(&config)?;

    engine.update_snapshot(load_snapshot(&args.snapshot)?);
    info!(
        snapshot = %args.snapshot.display(),
        repo = %config.tracker.repo,
        rooms = engine.store().all_enabled().len(),
        "mscbot started"
    );

    let (control, events) = control_channel();
    std::thread::spawn(move || watch_stdin(std::io::stdin().lock(), &control));
    let mut sink = ConsoleSink { mode: output };
    run_loop(
        &engine,
        &events,
        &mut sink,
        || {
            load_snapshot(&args.snapshot)
                .map_err(|err| warn!(error = %err, "snapshot reload failed, keeping last good"))
                .ok()
        },
        Duration::from_secs(args.refresh_secs),
    );

    info!("mscbot stopped");
    Ok(())
}

/// Open the room store and build the engine. Store problems at startup
/// are fatal: ambiguous room state must not be silently reset.
fn open_engine(config: &BotConfig) -> Result<Engine> {
    let store = RoomStore::open(&config.bot.data_path, config.bot.default_summary_time).map_err(
        |err| match err.hint() {
            Some(hint) => anyhow!("{err}\n  {hint}"),
            None => anyhow!("{err}"),
        },
    )?;
    Ok(Engine::new(config, store))
}

/// Build the control channel. The sender side is handed to whatever
/// embeds the loop (the stdin watcher here, the chat layer on
/// reconfiguration); dropping it ends the loop.
pub fn control_channel() -> (Sender<ControlEvent>, Receiver<ControlEvent>) {
    channel()
}

/// Watch `input` for an operator shutdown request. A `quit` or `exit`
/// line, end of input, or a read error all request shutdown; the loop
/// then drains its current tick and stops.
fn watch_stdin(input: impl BufRead, control: &Sender<ControlEvent>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        let word = line.trim();
        if word.eq_ignore_ascii_case("quit") || word.eq_ignore_ascii_case("exit") {
            break;
        }
    }
    let _ = control.send(ControlEvent::Shutdown);
}

/// The scheduler loop proper, parameterized for tests.
pub fn run_loop(
    engine: &Engine,
    events: &Receiver<ControlEvent>,
    sink: &mut dyn ChatSink,
    mut reload: impl FnMut() -> Option<mscbot_core::proposal::Snapshot>,
    refresh_every: Duration,
) {
    let mut last_refresh = Instant::now();

    loop {
        let now = Utc::now();
        let report = engine.on_tick(now, sink);
        if !report.fired.is_empty() || !report.deferred.is_empty() {
            info!(
                fired = report.fired.len(),
                deferred = report.deferred.len(),
                "tick complete"
            );
        }

        if last_refresh.elapsed() >= refresh_every {
            if let Some(snapshot) = reload() {
                engine.update_snapshot(snapshot);
            }
            last_refresh = Instant::now();
        }

        let wakeup = engine.next_wakeup(Utc::now());
        let sleep = (wakeup - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        match events.recv_timeout(sleep) {
            Ok(ControlEvent::Reconfigured) => {}
            Ok(ControlEvent::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}
