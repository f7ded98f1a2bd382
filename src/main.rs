mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "khalorg")]
#[command(about = "Interface between khal and org-mode")]
struct Cli {
    /// Set the logging level to: CRITICAL, ERROR, WARNING (default), INFO, DEBUG
    #[arg(long, default_value = "WARNING", global = true)]
    loglevel: String,

    /// The path to the log file
    #[arg(long, global = true)]
    logfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a khal event from the org agenda item on stdin
    New {
        /// Name of the khal calendar
        calendar: String,
    },
    /// List khal events as org agenda items
    List {
        /// Template for each agenda item (default: khalorg_format.txt)
        #[arg(long)]
        format: Option<String>,

        /// Name of the khal calendar
        calendar: String,

        /// Start date
        #[arg(default_value = "today")]
        start: String,

        /// End date
        #[arg(default_value = "1d")]
        stop: String,
    },
    /// Edit the khal event matching the org agenda item on stdin
    Edit {
        /// Also edit the date and its recurrence
        #[arg(long)]
        edit_dates: bool,

        /// Name of the khal calendar
        calendar: String,
    },
    /// Delete the khal event with the UID of the org agenda item on stdin
    Delete {
        /// Name of the khal calendar
        calendar: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logfile = cli.logfile.clone().unwrap_or_else(logging::default_log_file);
    let _guard = logging::init(&cli.loglevel, &logfile)?;
    info!("--- New run ---");

    let cfg = config::load_config()?;
    let timeout = cfg.timeout()?;

    let stdout = tokio::time::timeout(timeout, run(cli.command, &cfg))
        .await
        .with_context(|| {
            format!(
                "khalorg did not finish within {}",
                humantime::format_duration(timeout)
            )
        })??;

    if !stdout.is_empty() {
        print!("{}", stdout);
    }
    Ok(())
}

async fn run(command: Commands, cfg: &config::Config) -> Result<String> {
    match command {
        Commands::New { calendar } => {
            let input = commands::read_stdin().await?;
            commands::new::run(cfg, &calendar, &input).await
        }
        Commands::List {
            format,
            calendar,
            start,
            stop,
        } => commands::list::run(cfg, &calendar, &start, &stop, format.as_deref()).await,
        Commands::Edit {
            edit_dates,
            calendar,
        } => {
            let input = commands::read_stdin().await?;
            commands::edit::run(cfg, &calendar, edit_dates, &input)
        }
        Commands::Delete { calendar } => {
            let input = commands::read_stdin().await?;
            commands::delete::run(cfg, &calendar, &input)
        }
    }
}
