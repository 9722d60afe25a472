//! `mscbot query`: run one command through the engine without a chat
//! layer attached. Useful for operators and for exercising a snapshot
//! file before pointing the daemon at it.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::Args;
use mscbot_core::engine::Engine;
use mscbot_core::store::RoomStore;
use mscbot_core::load_config;

use crate::cmd::load_snapshot;
use crate::output::{OutputMode, render_reply};

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The message text, exactly as a room member would type it,
    /// e.g. "mscbot: show all".
    pub text: String,

    /// Path to the config file.
    #[arg(short, long, default_value = "mscbot.toml")]
    pub config: PathBuf,

    /// JSON file holding the tracked-proposal snapshot.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Room to attribute the message to (affects per-room settings).
    #[arg(long, default_value = "!local:operator")]
    pub room: String,
}

pub fn run_query(args: &QueryArgs, output: OutputMode) -> Result<()> {
    let config = load_config(&args.config)?;
    let store = RoomStore::open(&config.bot.data_path, config.bot.default_summary_time)
        .map_err(|err| anyhow!("{err}"))?;
    let engine = Engine::new(&config, store);
    engine.update_snapshot(load_snapshot(&args.snapshot)?);

    let mut stdout = std::io::stdout().lock();
    match engine.on_message(&args.room, &args.text, Utc::now()) {
        Some(reply) => render_reply(&reply, output, &mut stdout)?,
        None => {
            use std::io::Write;
            writeln!(
                stdout,
                "(message does not address the bot; prefix is '{}')",
                config.bot.command_prefix
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{QueryArgs, run_query};
    use crate::output::OutputMode;

    fn write_fixtures(dir: &tempfile::TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let config_path = dir.path().join("mscbot.toml");
        let data_path = dir.path().join("rooms.json");
        let snapshot_path = dir.path().join("snapshot.json");

        std::fs::write(
            &config_path,
            format!("[bot]\ndata_path = {:?}\n", data_path.display().to_string()),
        )
        .expect("write config");
        std::fs::write(
            &snapshot_path,
            r#"[{"number": 1, "title": "A", "labels": ["proposal-in-review"]}]"#,
        )
        .expect("write snapshot");

        (config_path, snapshot_path)
    }

    #[test]
    fn query_runs_an_addressed_command() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let (config, snapshot) = write_fixtures(&dir);

        let args = QueryArgs {
            text: "mscbot: show all".to_string(),
            config,
            snapshot,
            room: "!local:operator".to_string(),
        };
        run_query(&args, OutputMode::Json).expect("query runs");
    }

    #[test]
    fn query_tolerates_unaddressed_text() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let (config, snapshot) = write_fixtures(&dir);

        let args = QueryArgs {
            text: "just chatting".to_string(),
            config,
            snapshot,
            room: "!local:operator".to_string(),
        };
        run_query(&args, OutputMode::Human).expect("query runs");
    }
}
