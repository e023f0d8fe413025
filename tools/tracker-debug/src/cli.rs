//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tracker-debug")]
#[command(about = "Inspect Impulse Tracker modules and dry-run the playback engine")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to ./tracker.toml when it exists)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print title, tracker and song layout
    Info {
        /// Path to the IT file
        file: PathBuf,

        /// Only read the title and format from the header
        #[arg(long)]
        quick: bool,
    },

    /// Estimate the playing time without playing
    Length {
        /// Path to the IT file
        file: PathBuf,

        /// Stop at this order
        #[arg(long)]
        stop_order: Option<u32>,

        /// Row within --stop-order
        #[arg(long, requires = "stop_order")]
        stop_row: Option<u32>,

        /// Give up after this many seconds
        #[arg(long)]
        max_seconds: Option<u32>,
    },

    /// Run the engine without audio and print what it plays
    Trace {
        /// Path to the IT file
        file: PathBuf,

        /// Print every tick instead of every row
        #[arg(long, short)]
        ticks: bool,

        /// Stop after this many rows
        #[arg(long, default_value_t = 64)]
        rows: usize,

        /// Channels shown per row
        #[arg(long, default_value_t = 4)]
        channels: usize,

        /// Start from this order instead of the beginning
        #[arg(long)]
        order: Option<usize>,

        /// Channels to mute, 1-based and comma separated
        #[arg(long, value_delimiter = ',')]
        mute: Vec<usize>,
    },
}
