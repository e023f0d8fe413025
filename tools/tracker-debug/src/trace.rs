//! Dry run of the playback engine
//!
//! Drives [`Player`] tick by tick with no mixer attached, printing the
//! pattern cells as they are reached and the voices they leave sounding.

use nether_player::{Player, PlayerConfig, SharedSong};
use nether_tracker::{MAX_CHANNELS, Song};

use crate::display::{format_cell, format_position, format_voice};

/// What `trace` prints and where it starts
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    /// One line per tick instead of per row
    pub ticks: bool,
    /// Rows to run before stopping
    pub rows: usize,
    /// Pattern channels shown per line
    pub channels: usize,
    pub start_order: Option<usize>,
    /// 1-based channel numbers
    pub muted: Vec<usize>,
}

/// Play `song` until it ends or `options.rows` rows have been shown
pub fn run(song: Song, config: PlayerConfig, options: &TraceOptions) {
    let shared = SharedSong::new(song);
    let mut player = Player::new(shared.clone(), config);
    if let Some(order) = options.start_order {
        player.set_order(order);
    }
    for &channel in &options.muted {
        player.set_channel_muted(channel.saturating_sub(1), true);
    }

    let columns = options.channels.clamp(1, MAX_CHANNELS);
    let mut rows_shown = 0;
    let mut ticks = 0u64;
    let mut frames = 0u64;

    while rows_shown < options.rows && player.process_tick() {
        ticks += 1;
        let pos = player.position();
        if pos.tick == 0 {
            rows_shown += 1;
            let song = shared.lock_audio();
            let cells: Vec<String> = (0..columns)
                .map(|channel| {
                    song.pattern(pos.pattern)
                        .and_then(|p| p.note(pos.row, channel))
                        .map(format_cell)
                        .unwrap_or_else(|| format_cell(&Default::default()))
                })
                .collect();
            println!(
                "{}  spd {:2} bpm {:3} gv {:3} | {}",
                format_position(&pos),
                player.speed(),
                player.tempo(),
                player.global_volume(),
                cells.join(" | ")
            );
        }

        if options.ticks || pos.tick == 0 {
            for (index, voice) in player.voices().iter().enumerate() {
                if voice.is_active() && voice.final_volume > 0 {
                    println!("    {}", format_voice(index, voice));
                }
            }
        }

        let step = player.samples_per_tick();
        player.advance_voices(step);
        frames += step as u64;
    }

    let rate = player.config().mix_frequency.max(1) as u64;
    println!(
        "{} rows, {} ticks, {:.2} s{}",
        rows_shown,
        ticks,
        frames as f64 / rate as f64,
        if player.is_playing() { "" } else { " (end of song)" }
    );
    println!(
        "{} samples and {} instruments played",
        player.played_samples().len(),
        player.played_instruments().len()
    );
}
