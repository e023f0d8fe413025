//! Song length estimation
//!
//! Walks the order list the way playback does but only interprets the
//! timing effects. Backward position jumps end the walk and pattern loops add
//! their repeated time instead of looping, so the walk always terminates.
//! The row holding the jump or the loop end is counted, since playback
//! spends its ticks before acting on it.

use nether_tracker::{Effect, MAX_CHANNELS, MAX_ORDERS, MAX_PATTERNS, ORDER_LAST, ORDER_SKIP, Song};
use tracing::debug;

use crate::config::PlayerConfig;

/// Song duration in seconds, rounded to the nearest second
pub fn estimate_length(song: &Song) -> u32 {
    estimate_length_with(song, &PlayerConfig::default())
}

/// [`estimate_length`] honouring the stop-at bounds of `config`
pub fn estimate_length_with(song: &Song, config: &PlayerConfig) -> u32 {
    let elapsed_ms = walk(song, config);
    ((elapsed_ms + 500) / 1000) as u32
}

/// Milliseconds for `ticks` ticks at `tempo`
fn ticks_to_ms(ticks: u64, tempo: u64) -> u64 {
    2500 * ticks / tempo.max(1)
}

fn walk(song: &Song, config: &PlayerConfig) -> u64 {
    let mut speed = song.initial_speed.max(1) as u64;
    let mut tempo = song.initial_tempo as u64;
    let mut elapsed: u64 = 0;
    let mut tempo_memory = [0u8; MAX_CHANNELS];
    let mut loop_start = [0u64; MAX_CHANNELS];

    let stop_ms = config.stop_at_time.map(|s| s as u64 * 1000);
    let stop_at = config
        .stop_at_order
        .map(|order| (order as usize, config.stop_at_row.unwrap_or(0) as usize));

    let mut order = 0usize;
    let mut start_row = 0usize;

    while order < MAX_ORDERS {
        let pattern_index = song.order(order);
        if pattern_index == ORDER_LAST {
            break;
        }
        if pattern_index == ORDER_SKIP || pattern_index as usize >= MAX_PATTERNS {
            order += 1;
            continue;
        }
        let Some(pattern) = song.pattern(pattern_index as usize) else {
            break;
        };

        let mut row = if start_row < pattern.rows() { start_row } else { 0 };
        start_row = 0;
        let mut next_order = None;

        while row < pattern.rows() {
            if stop_at == Some((order, row)) || stop_ms.is_some_and(|ms| elapsed >= ms) {
                return elapsed;
            }
            if row == 0 {
                loop_start = [elapsed; MAX_CHANNELS];
            }

            let mut extra_ticks = 0u64;
            let mut loop_repeats: [u8; MAX_CHANNELS] = [0; MAX_CHANNELS];
            let mut backward_jump = false;
            let mut break_pattern = false;

            for (ch, note) in pattern.row(row).iter().enumerate() {
                if note.is_empty() {
                    continue;
                }
                let param = note.param;
                match note.effect {
                    Effect::PositionJump => {
                        if (param as usize) <= order {
                            backward_jump = true;
                        } else {
                            next_order = Some(param as usize);
                            break_pattern = true;
                        }
                    }
                    Effect::PatternBreak => {
                        start_row = param as usize;
                        if next_order.is_none() {
                            next_order = Some(order + 1);
                        }
                        break_pattern = true;
                    }
                    Effect::Speed if param > 0 => speed = param as u64,
                    Effect::Tempo => {
                        let param = if param != 0 {
                            tempo_memory[ch] = param;
                            param
                        } else {
                            tempo_memory[ch]
                        };
                        let delta = (param & 0x0F) as u64 * speed;
                        tempo = match param >> 4 {
                            0 => tempo.saturating_sub(delta).max(32),
                            1 => (tempo + delta).min(255),
                            _ => param as u64,
                        };
                    }
                    Effect::Special => {
                        let x = param & 0x0F;
                        match param >> 4 {
                            0x6 => extra_ticks = x as u64,
                            0xB if x == 0 => loop_start[ch] = elapsed,
                            0xB => loop_repeats[ch] = x,
                            0xE => extra_ticks = x as u64 * speed,
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }

            elapsed += ticks_to_ms(speed + extra_ticks, tempo);

            for (ch, &repeats) in loop_repeats.iter().enumerate() {
                if repeats > 0 {
                    let body = elapsed.saturating_sub(loop_start[ch]);
                    elapsed += body * repeats as u64;
                    loop_start[ch] = elapsed;
                }
            }

            if backward_jump {
                debug!(order, row, elapsed, "length walk stopped at backward jump");
                return elapsed;
            }
            if break_pattern {
                break;
            }
            row += 1;
        }

        order = next_order.unwrap_or(order + 1);
    }

    elapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_tracker::{Note, Pattern};

    fn song_with(patterns: usize, orders: &[u8]) -> Song {
        Song {
            orderlist: orders.to_vec(),
            patterns: (0..patterns).map(|_| Some(Pattern::new(64))).collect(),
            ..Default::default()
        }
    }

    fn put(song: &mut Song, pattern: usize, row: usize, ch: usize, effect: Effect, param: u8) {
        if let Some(cell) = song.pattern_mut(pattern).and_then(|p| p.note_mut(row, ch)) {
            *cell = Note {
                effect,
                param,
                ..Default::default()
            };
        }
    }

    #[test]
    fn test_empty_order_list_is_zero() {
        let song = song_with(0, &[ORDER_LAST]);
        assert_eq!(estimate_length(&song), 0);
    }

    #[test]
    fn test_single_pattern_default_timing() {
        // 64 rows x 6 ticks x 20 ms
        let song = song_with(1, &[0, ORDER_LAST]);
        assert_eq!(walk(&song, &PlayerConfig::default()), 7680);
        assert_eq!(estimate_length(&song), 8);
    }

    #[test]
    fn test_idempotent() {
        let mut song = song_with(2, &[0, 1, ORDER_SKIP, 0, ORDER_LAST]);
        put(&mut song, 1, 10, 3, Effect::Tempo, 0x10 | 4);
        assert_eq!(estimate_length(&song), estimate_length(&song));
    }

    #[test]
    fn test_speed_and_tempo() {
        let mut song = song_with(1, &[0, ORDER_LAST]);
        put(&mut song, 0, 0, 0, Effect::Speed, 3);
        put(&mut song, 0, 0, 1, Effect::Tempo, 250);
        // 64 rows x 3 ticks x 10 ms
        assert_eq!(walk(&song, &PlayerConfig::default()), 1920);
    }

    #[test]
    fn test_backward_jump_ends() {
        let mut song = song_with(2, &[0, 1, ORDER_LAST]);
        put(&mut song, 1, 0, 0, Effect::PositionJump, 0);
        assert_eq!(walk(&song, &PlayerConfig::default()), 7680 + 120);
    }

    #[test]
    fn test_pattern_break_skips_rows() {
        let mut song = song_with(2, &[0, 1, ORDER_LAST]);
        put(&mut song, 0, 0, 0, Effect::PatternBreak, 32);
        // One row of pattern 0, then rows 32..64 of pattern 1
        assert_eq!(walk(&song, &PlayerConfig::default()), 120 + 32 * 120);
    }

    #[test]
    fn test_pattern_loop_accumulates() {
        let mut song = song_with(1, &[0, ORDER_LAST]);
        put(&mut song, 0, 63, 0, Effect::Special, 0xB1);
        assert_eq!(walk(&song, &PlayerConfig::default()), 2 * 7680);
    }

    #[test]
    fn test_pattern_loop_agrees_with_playback() {
        let mut song = song_with(1, &[0, ORDER_LAST]);
        put(&mut song, 0, 63, 0, Effect::Special, 0xB1);
        let mut player = crate::Player::new(song.clone(), PlayerConfig::default());
        let mut ticks = 0u64;
        while player.process_tick() {
            ticks += 1;
        }
        assert_eq!(ticks, 2 * 64 * 6);
        assert_eq!(walk(&song, &PlayerConfig::default()), ticks_to_ms(ticks, 125));
    }

    #[test]
    fn test_row_and_tick_delays() {
        let mut song = song_with(1, &[0, ORDER_LAST]);
        put(&mut song, 0, 0, 0, Effect::Special, 0xE2);
        put(&mut song, 0, 1, 0, Effect::Special, 0x63);
        assert_eq!(walk(&song, &PlayerConfig::default()), 7680 + 2 * 120 + 3 * 20);
    }

    #[test]
    fn test_stop_bounds() {
        let song = song_with(2, &[0, 1, ORDER_LAST]);
        let config = PlayerConfig {
            stop_at_order: Some(1),
            stop_at_row: Some(16),
            ..Default::default()
        };
        assert_eq!(walk(&song, &config), 7680 + 16 * 120);

        let config = PlayerConfig {
            stop_at_time: Some(3),
            ..Default::default()
        };
        assert_eq!(estimate_length_with(&song, &config), 3);
    }

    #[test]
    fn test_absent_pattern_ends_walk() {
        let mut song = song_with(2, &[0, 1, ORDER_LAST]);
        song.patterns[1] = None;
        assert_eq!(estimate_length(&song), 8);
    }
}
