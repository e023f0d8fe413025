//! Tick driver, row fetch and order sequencing

use nether_tracker::{MAX_CHANNELS, MAX_ORDERS, MAX_PATTERNS, Note, ORDER_LAST, ORDER_SKIP, Song};
use tracing::{debug, trace};

use super::{PROCESS_NEXT_ORDER, Player};

impl Player {
    /// Advance playback by one tick.
    ///
    /// Returns `false` once the song has ended (order list exhausted, repeat
    /// count reached or [`Player::stop`] called). The song stays locked for
    /// the whole tick.
    pub fn process_tick(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        let shared = self.song.clone();
        let song = shared.lock_audio();
        if !self.run_tick(&song) {
            debug!(order = self.current_order, plays = self.plays, "playback ended");
            self.stopped = true;
        }
        !self.stopped
    }

    pub(super) fn run_tick(&mut self, song: &Song) -> bool {
        self.tick_count = self.tick_count.saturating_sub(1);
        let first_tick = self.tick_count == 0;

        if first_tick {
            self.tick_count = self.speed;
            self.row_tick = 0;
            self.row_count -= 1;
            if self.row_count <= 0 {
                self.row_count = 0;
                if !self.advance_row(song) {
                    return false;
                }
            } else {
                // SEx repeat: effects run again, notes do not retrigger
                for voice in self.pool.channels_mut() {
                    voice.row_note = 0;
                    voice.row_instrument = 0;
                }
            }
        } else {
            self.row_tick += 1;
        }

        self.process_effects(song, first_tick);
        self.update_voices(song);
        true
    }

    /// Fetch the next row, moving to the next order when the pattern is done
    fn advance_row(&mut self, song: &Song) -> bool {
        self.process_row = self.process_row.wrapping_add(1);
        if self.process_row >= song.pattern_rows(self.current_pattern) || self.next_order.is_some()
        {
            if !self.increment_order(song) {
                return false;
            }
        }
        self.row = self.process_row;
        self.load_row(song);
        true
    }

    /// Select the next playable order.
    ///
    /// Skip markers and out-of-range pattern numbers are passed over; the end
    /// marker counts one play of the song and wraps to order 0 unless the
    /// repeat count has been reached.
    fn increment_order(&mut self, song: &Song) -> bool {
        let mut order = self
            .next_order
            .take()
            .unwrap_or(self.current_order.wrapping_add(1));
        self.process_row = self.break_row;
        self.break_row = 0;

        let mut wrapped = false;
        let pattern = loop {
            if order >= MAX_ORDERS || song.order(order) == ORDER_LAST {
                self.plays += 1;
                let limit = self.config.repeat_count;
                if (limit != 0 && self.plays >= limit) || wrapped {
                    return false;
                }
                trace!(plays = self.plays, "order list restarts");
                wrapped = true;
                order = 0;
                continue;
            }
            match song.order(order) {
                ORDER_SKIP => order += 1,
                p if p as usize >= MAX_PATTERNS => order += 1,
                p => break p as usize,
            }
        };

        if pattern != self.current_pattern || order != self.current_order {
            for voice in self.pool.channels_mut() {
                voice.patloop_row = 0;
                voice.cd_patloop = 0;
            }
        }
        self.current_order = order;
        self.current_pattern = pattern;
        if self.process_row >= song.pattern_rows(pattern) {
            self.process_row = 0;
        }
        trace!(order, pattern, row = self.process_row, "order change");
        true
    }

    /// Copy the current row's cells into the channel voices.
    /// An absent pattern reads as empty cells.
    fn load_row(&mut self, song: &Song) {
        let pattern = song.pattern(self.current_pattern);
        for channel in 0..MAX_CHANNELS {
            let cell = pattern
                .and_then(|p| p.note(self.row, channel))
                .copied()
                .unwrap_or_default();
            let voice = &mut self.pool[channel];
            let Note {
                note,
                instrument,
                vol_effect,
                vol_param,
                effect,
                param,
            } = cell;
            voice.row_note = note;
            voice.row_instrument = instrument;
            voice.row_vol_effect = vol_effect;
            voice.row_vol_param = vol_param;
            voice.row_effect = effect;
            voice.row_param = param;
        }
    }

    /// Jump straight to `order`, row 0, with channel voices cut
    pub fn set_order(&mut self, order: usize) {
        for voice in self.pool.iter_mut() {
            voice.stop();
        }
        self.pool.clear_background();
        self.next_order = Some(order);
        self.break_row = 0;
        self.process_row = PROCESS_NEXT_ORDER;
        self.tick_count = 1;
        self.row_count = 0;
        self.stopped = false;
    }
}
