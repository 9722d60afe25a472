#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "mscbot: proposal lifecycle bot engine",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run the scheduler daemon",
        long_about = "Run the scheduler loop: fire daily summaries for enabled rooms and \
                      periodically refresh the proposal snapshot from disk.",
        after_help = "EXAMPLES:\n    # Run against a snapshot maintained by the tracker client\n    mscbot run --snapshot proposals.json\n\n    # Custom config and faster snapshot refresh\n    mscbot run --config /etc/mscbot.toml --snapshot proposals.json --refresh-secs 60"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        name = "check-config",
        about = "Validate config and room store",
        long_about = "Load the config file, verify the label taxonomy, and open the room \
                      store exactly as the daemon would. Fails fast on anything the daemon \
                      would refuse to start with.",
        after_help = "EXAMPLES:\n    # Validate the default config\n    mscbot check-config\n\n    # Emit machine-readable output\n    mscbot check-config --config /etc/mscbot.toml --json"
    )]
    CheckConfig(cmd::check::CheckArgs),

    #[command(
        about = "Run one command against a snapshot",
        long_about = "Dispatch a single message through the engine against a snapshot file \
                      and print the reply, without starting the daemon.",
        after_help = "EXAMPLES:\n    # Ask for the full status breakdown\n    mscbot query \"mscbot: show all\" --snapshot proposals.json\n\n    # Emit machine-readable output\n    mscbot query \"mscbot: show fcp\" --snapshot proposals.json --json"
    )]
    Query(cmd::query::QueryArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MSCBOT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "mscbot=debug,info"
        } else {
            "mscbot=info,warn"
        })
    });

    let format = env::var("MSCBOT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    match cli.command {
        Commands::Run(ref args) => cmd::run::run_daemon(args, output),
        Commands::CheckConfig(ref args) => cmd::check::run_check(args, output),
        Commands::Query(ref args) => cmd::query::run_query(args, output),
    }
}
