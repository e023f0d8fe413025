//! Per-channel row processing: note delay, triggering, then both effect columns

use nether_tracker::{ChannelFlags, Effect, MAX_CHANNELS, NOTE_NONE, Song, is_control, is_note};

use super::Player;

impl Player {
    /// Run both effect columns of every pattern channel for the current tick
    pub(super) fn process_effects(&mut self, song: &Song, first_tick: bool) {
        for channel in 0..MAX_CHANNELS {
            self.process_channel(song, channel, first_tick);
        }
    }

    fn process_channel(&mut self, song: &Song, channel: usize, first_tick: bool) {
        let voice = &mut self.pool[channel];
        voice.n_command = Effect::None;
        voice.flags.remove(
            ChannelFlags::FAST_VOL_RAMP
                | ChannelFlags::VIBRATO
                | ChannelFlags::TREMOLO
                | ChannelFlags::PANBRELLO
                | ChannelFlags::PORTAMENTO,
        );

        let effect = voice.row_effect;
        let mut param = voice.row_param;
        let vol_effect = voice.row_vol_effect;
        let vol_param = voice.row_vol_param;
        let mut porta = voice.row_has_porta();
        let mut start_note = first_tick;

        if effect == Effect::Special {
            if param != 0 {
                voice.memory.special = param;
            } else {
                param = voice.memory.special;
            }
            // SDx: hold the whole channel back x ticks
            if param >> 4 == 0xD {
                if first_tick {
                    voice.cd_note_delay = (param & 0x0F).max(1);
                    return;
                }
                if voice.cd_note_delay > 0 {
                    voice.cd_note_delay -= 1;
                    if voice.cd_note_delay > 0 {
                        return;
                    }
                    start_note = true;
                }
            }
        }

        if start_note {
            self.trigger_row(song, channel, &mut porta);
        }

        self.handle_volume_column(song, channel, vol_effect, vol_param, first_tick, start_note);
        self.handle_effect(song, channel, effect, param, first_tick);
    }

    /// Note and instrument columns of the row, with the NNA check before a
    /// new note displaces the old one.
    fn trigger_row(&mut self, song: &Song, channel: usize, porta: &mut bool) {
        let inst_mode = song.uses_instruments();
        let voice = &mut self.pool[channel];
        let mut instrument = voice.row_instrument;
        let mut note = voice.row_note;

        if instrument != 0 && note == NOTE_NONE {
            // Instrument alone: reset to the default volume, and restart the
            // note when the instrument differs from what is playing
            let slot = if inst_mode {
                voice.sample
            } else {
                instrument as usize
            };
            if let Some(sample) = song.sample(slot) {
                voice.volume = sample.volume as i32;
            }
            let current = if inst_mode {
                voice.instrument
            } else {
                voice.sample
            };
            if current != instrument as usize || voice.sample == 0 {
                note = voice.new_note;
            }
        }

        if is_control(note) {
            instrument = 0;
        }
        if is_note(note) {
            self.pool[channel].new_note = note;
            if !*porta {
                self.check_nna(song, channel, instrument, note, false);
            }
        }

        if instrument != 0 {
            let previous = self.pool[channel].sample;
            self.instrument_change(song, channel, instrument, *porta, true);
            if *porta && self.pool[channel].sample != previous {
                *porta = false;
            }
            self.pool[channel].new_instrument = 0;
        }

        if note != NOTE_NONE {
            self.note_change(song, channel, note, *porta, false, instrument != 0);
        }
    }
}
