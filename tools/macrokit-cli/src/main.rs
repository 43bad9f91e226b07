//! MacroKit CLI: inspect and replay recordings, run the auto-clicker.
//!
//! Usage:
//!   macrokit info <PATH>        Show recording information
//!   macrokit validate <PATH>    Check a recording file
//!   macrokit play <PATH>        Replay a recording
//!   macrokit click [OPTIONS]    Run the auto-clicker
//!   macrokit config [--init]    Show or create the configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use macrokit_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "macrokit",
    about = "Auto-clicker and input macro recorder/player",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show recording information
    Info {
        /// Path to the recording file
        path: PathBuf,
    },

    /// Check a recording file for ordering and duration problems
    Validate {
        /// Path to the recording file
        path: PathBuf,
    },

    /// Replay a recording
    Play {
        /// Path to the recording file
        path: PathBuf,

        /// Speed multiplier, e.g. 2 or 0.5x (defaults to the configured speed)
        #[arg(short, long)]
        speed: Option<String>,

        /// Loop mode: once|count|continuous (defaults to the configured mode)
        #[arg(short, long = "loop")]
        loop_mode: Option<String>,

        /// Number of passes when the loop mode is "count"
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Run the auto-clicker until Ctrl+C or the click count is reached
    Click {
        /// Milliseconds between clicks
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Random offset bound in milliseconds
        #[arg(short, long)]
        jitter_ms: Option<i64>,

        /// Mouse button: left|right|middle
        #[arg(short, long)]
        button: Option<String>,

        /// Double-click instead of single-click
        #[arg(long)]
        double: bool,

        /// Stop after this many clicks
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Click at a fixed position, e.g. 640,480
        #[arg(long, value_name = "X,Y")]
        at: Option<String>,
    },

    /// Show the configuration, or write the defaults
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::load();

    // Initialize logging
    let mut logging = app_config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    macrokit_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Play {
            path,
            speed,
            loop_mode,
            count,
        } => commands::play::run(&app_config, path, speed, loop_mode, count).await,
        Commands::Click {
            interval_ms,
            jitter_ms,
            button,
            double,
            count,
            at,
        } => {
            commands::click::run(
                &app_config,
                commands::click::ClickArgs {
                    interval_ms,
                    jitter_ms,
                    button,
                    double,
                    count,
                    at,
                },
            )
            .await
        }
        Commands::Config { init } => commands::config::run(&app_config, init),
    }
}
