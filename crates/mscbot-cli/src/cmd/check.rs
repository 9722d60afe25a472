//! `mscbot check-config`: validate config and room store before deploy.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Args;
use mscbot_core::load_config;
use mscbot_core::store::RoomStore;

use crate::output::{OutputMode, render_json};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the config file.
    #[arg(short, long, default_value = "mscbot.toml")]
    pub config: PathBuf,
}

pub fn run_check(args: &CheckArgs, output: OutputMode) -> Result<()> {
    let config = load_config(&args.config)?;

    if config.labels.is_empty() {
        return Err(anyhow!("config defines an empty label taxonomy"));
    }

    // Opening the store performs the same fatal-at-startup validation the
    // daemon would: unreadable or corrupt room state is reported here
    // instead of at 3am.
    let store = RoomStore::open(&config.bot.data_path, config.bot.default_summary_time)
        .map_err(|err| match err.hint() {
            Some(hint) => anyhow!("{err}\n  {hint}"),
            None => anyhow!("{err}"),
        })?;
    let enabled = store.all_enabled().len();
    drop(store);

    let mut stdout = std::io::stdout().lock();
    if output.is_json() {
        render_json(
            &serde_json::json!({
                "ok": true,
                "command_prefix": config.bot.command_prefix,
                "tracker_repo": config.tracker.repo,
                "labels": config.labels.len(),
                "rooms_enabled": enabled,
            }),
            &mut stdout,
        )?;
    } else {
        use std::io::Write;
        writeln!(stdout, "config ok: {}", args.config.display())?;
        writeln!(stdout, "  command prefix: {}", config.bot.command_prefix)?;
        writeln!(stdout, "  tracker repo: {}", config.tracker.repo)?;
        writeln!(stdout, "  taxonomy labels: {}", config.labels.len())?;
        writeln!(stdout, "  rooms with summaries enabled: {enabled}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CheckArgs, run_check};
    use crate::output::OutputMode;
    use std::io::Write;

    #[test]
    fn check_accepts_a_minimal_config() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config_path = dir.path().join("mscbot.toml");
        let data_path = dir.path().join("rooms.json");
        std::fs::write(
            &config_path,
            format!("[bot]\ndata_path = {:?}\n", data_path.display().to_string()),
        )
        .expect("write config");

        let args = CheckArgs {
            config: config_path,
        };
        run_check(&args, OutputMode::Human).expect("check passes");
    }

    #[test]
    fn check_rejects_corrupt_room_store() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config_path = dir.path().join("mscbot.toml");
        let data_path = dir.path().join("rooms.json");

        let mut f = std::fs::File::create(&data_path).expect("create");
        write!(f, "{{torn").expect("write");
        std::fs::write(
            &config_path,
            format!("[bot]\ndata_path = {:?}\n", data_path.display().to_string()),
        )
        .expect("write config");

        let args = CheckArgs {
            config: config_path,
        };
        let err = run_check(&args, OutputMode::Human).expect_err("must fail");
        assert!(err.to_string().contains("E2002"), "unexpected error: {err}");
    }
}
