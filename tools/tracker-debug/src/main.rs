//! Tracker Debug Tool
//!
//! Loads an Impulse Tracker module and inspects it without an audio device:
//!
//! - `tracker-debug info song.it` - header, layout, samples and instruments
//! - `tracker-debug length song.it` - estimated playing time
//! - `tracker-debug trace song.it` - run the engine and print every row
//!
//! Settings come from `tracker.toml` (see [`config`]).

mod cli;
mod config;
mod display;
mod trace;

use anyhow::{Context, Result};
use clap::Parser;
use nether_it::LoadFlags;
use nether_tracker::Song;
use std::path::Path;

use cli::{Cli, Commands};
use config::ToolConfig;
use display::format_duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = ToolConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file, quick } => {
            if quick {
                print_quick_info(&file)?;
            } else {
                let song = load_song(&file, config.load.flags())?;
                print_info(&song, &config);
            }
        }
        Commands::Length {
            file,
            stop_order,
            stop_row,
            max_seconds,
        } => {
            let song = load_song(&file, LoadFlags::NO_SAMPLES)?;
            let mut player = config.player;
            if stop_order.is_some() {
                player.stop_at_order = stop_order;
                player.stop_at_row = stop_row;
            }
            if max_seconds.is_some() {
                player.stop_at_time = max_seconds;
            }
            let seconds = nether_player::estimate_length_with(&song, &player);
            println!("{}", format_duration(seconds));
        }
        Commands::Trace {
            file,
            ticks,
            rows,
            channels,
            order,
            mute,
        } => {
            let song = load_song(&file, config.load.flags())?;
            let options = trace::TraceOptions {
                ticks,
                rows,
                channels,
                start_order: order,
                muted: mute,
            };
            trace::run(song, config.player, &options);
        }
    }

    Ok(())
}

fn load_song(path: &Path, flags: LoadFlags) -> Result<Song> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let song = nether_it::load_it(&data, flags)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    tracing::debug!(
        orders = song.orderlist.len(),
        patterns = song.patterns.len(),
        "loaded {}",
        path.display()
    );
    Ok(song)
}

fn print_quick_info(path: &Path) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (title, format) = nether_it::read_info(&data)
        .with_context(|| format!("{} is not an Impulse Tracker module", path.display()))?;
    println!("{title}");
    println!("{format}");
    Ok(())
}

fn print_info(song: &Song, config: &ToolConfig) {
    println!("Title:    {}", song.title);
    println!("Tracker:  {}", song.tracker_id);
    println!(
        "Mode:     {}, {} slides",
        if song.uses_instruments() {
            "instruments"
        } else {
            "samples"
        },
        if song.uses_linear_slides() {
            "linear"
        } else {
            "Amiga"
        }
    );
    println!(
        "Speed:    {}  Tempo: {}  Global volume: {}  Mixing volume: {}",
        song.initial_speed, song.initial_tempo, song.initial_global_volume, song.mixing_volume
    );
    println!(
        "Orders:   {}  Patterns: {}",
        song.orderlist.len(),
        song.patterns.iter().filter(|p| p.is_some()).count()
    );
    println!(
        "Length:   {}",
        format_duration(nether_player::estimate_length_with(song, &config.player))
    );

    let samples: Vec<_> = song
        .samples
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, s)| s.length > 0 || !s.name.is_empty())
        .collect();
    if !samples.is_empty() {
        println!("\nSamples:");
        for (index, sample) in samples {
            println!(
                "  {:3} {:26} {:8} frames {:6} Hz{}",
                index,
                sample.name,
                sample.length,
                sample.c5speed,
                if sample.has_loop() { " loop" } else { "" }
            );
        }
    }

    if song.uses_instruments() {
        println!("\nInstruments:");
        for (index, ins) in song.instruments.iter().enumerate() {
            if let Some(ins) = ins {
                println!(
                    "  {:3} {:26} NNA {:?} DCT {:?} fadeout {}",
                    index, ins.name, ins.nna, ins.dct, ins.fadeout
                );
            }
        }
    }

    if !song.message.is_empty() {
        println!("\n{}", song.message);
    }
}
