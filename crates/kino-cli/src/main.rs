//! Kino CLI - Player selection and event inspection tool
//!
//! Features:
//! - Backend capability listing
//! - Backend selection from a player profile
//! - Simulated playback with unified event output
//! - Native event script replay

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Kino CLI - Playback abstraction toolkit
#[derive(Parser)]
#[command(name = "kino-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Inspect backend selection, DRM wiring and player events", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which DRM and content types each backend supports
    Capabilities,

    /// Print a profile template
    Profile,

    /// Choose a backend for a profile
    Select {
        /// Path to a player profile (JSON)
        #[arg(short, long)]
        profile: PathBuf,
    },

    /// Load a video on a simulated engine and print the resulting events
    Play {
        /// Path to a player profile (JSON)
        #[arg(short, long)]
        profile: PathBuf,

        /// Media URL
        url: String,

        /// Content type override (h264, dash, hls)
        #[arg(short, long)]
        content_type: Option<String>,

        /// Seek to this position (seconds) after starting playback
        #[arg(short, long)]
        seek: Option<u64>,
    },

    /// Feed a script of native events through a forwarder
    Replay {
        /// Path to a player profile (JSON)
        #[arg(short, long)]
        profile: PathBuf,

        /// JSON array of native events
        #[arg(short, long)]
        script: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    kino_player::init();

    match cli.command {
        Commands::Capabilities => {
            commands::capabilities(&cli.format)?;
        }
        Commands::Profile => {
            commands::profile_template()?;
        }
        Commands::Select { profile } => {
            commands::select(&profile, &cli.format)?;
        }
        Commands::Play { profile, url, content_type, seek } => {
            commands::play(&profile, &url, content_type.as_deref(), seek, &cli.format)?;
        }
        Commands::Replay { profile, script } => {
            commands::replay(&profile, &script, &cli.format)?;
        }
    }

    Ok(())
}
