//! mnav-sync — entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use mnav_sync::{cli, config, logging};

#[derive(Parser)]
#[command(
    name = "mnav-sync",
    about = "mnav-sync — scrape treasury disclosures, derive mNAV, publish to Firebase",
    version,
    after_help = "Run 'mnav-sync <command> --help' for details on each command.\nRun 'mnav-sync' with no command to perform one sync run."
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the page, extract, and publish or alert (default).
    Run {
        /// Write the extracted values to this file before gating.
        #[arg(long)]
        check_file: Option<PathBuf>,

        /// Exit with code 2 when the run does not publish.
        #[arg(long)]
        strict: bool,
    },

    /// Print the numbered fragments and each field's resolution.
    Inspect {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check environment and diagnose issues.
    Doctor,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let command = cli.command.unwrap_or(Commands::Run {
        check_file: None,
        strict: false,
    });

    match command {
        Commands::Run { check_file, strict } => {
            let config = config::load(cli.config.as_deref())?;
            cli::run_cmd::run(config, check_file, strict).await
        }
        Commands::Inspect { json } => {
            let config = config::load(cli.config.as_deref())?;
            cli::inspect_cmd::run(config, json).await?;
            Ok(0)
        }
        Commands::Doctor => {
            cli::doctor::run(cli.config.as_deref()).await?;
            Ok(0)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mnav-sync", &mut std::io::stdout());
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.json_logs);

    // 0 on normal completion, whatever the run outcome; 1 on setup errors.
    match dispatch(cli).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("  Error: {e:#}");
            std::process::exit(1);
        }
    }
}
