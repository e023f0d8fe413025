//! Instrument and note changes on a channel

use nether_tracker::{
    ChannelFlags, InstrumentFlags, MAX_INSTRUMENTS, MAX_SAMPLES, NOTE_CUT, NOTE_FIRST, NOTE_NONE,
    NOTE_OFF, NewNoteAction, Song, is_control, is_note,
};
use rand::Rng;

use super::{FADEOUT_MAX, Player, VOLUME_MAX};
use crate::pitch::{muldiv, period_from_note};

impl Player {
    /// Switch `channel` to instrument (or, in sample mode, sample) `instr`.
    ///
    /// `inst_column` is set when the change comes from the row's instrument
    /// column, in which case the sample's default volume is applied.
    pub(super) fn instrument_change(
        &mut self,
        song: &Song,
        channel: usize,
        instr: u8,
        porta: bool,
        inst_column: bool,
    ) {
        let inst_mode = song.uses_instruments();
        let note = self.pool[channel].new_note;
        if note == NOTE_NONE {
            return;
        }

        let (instrument, sample_index) = if inst_mode {
            if instr as usize > MAX_INSTRUMENTS {
                return;
            }
            let Some(ins) = song.instrument(instr as usize) else {
                let voice = &mut self.pool[channel];
                voice.instrument = 0;
                voice.new_instrument = 0;
                return;
            };
            if is_control(note) {
                return;
            }
            let sample = ins.sample_for_note(note) as usize;
            if sample == 0 {
                // Unmapped key: remember the instrument, keep the old sample
                self.pool[channel].instrument = instr as usize;
                return;
            }
            (Some(ins), sample)
        } else {
            if instr as usize > MAX_SAMPLES {
                return;
            }
            (None, instr as usize)
        };

        let Some(sample) = song.sample(sample_index) else {
            return;
        };
        self.played_samples.insert(sample_index);
        if inst_mode {
            self.played_instruments.insert(instr as usize);
        }

        let linear = song.uses_linear_slides();
        let old_effects = song.uses_old_effects();
        let rng = &mut self.rng;
        let voice = &mut self.pool[channel];

        if inst_column {
            voice.volume = sample.volume as i32;
        }
        voice.instrument = if inst_mode { instr as usize } else { 0 };
        voice.new_instrument = 0;

        match instrument {
            Some(ins) => {
                voice.instrument_volume =
                    (sample.global_volume as i32 * ins.global_volume as i32) >> 7;
                if ins.flags.contains(InstrumentFlags::SET_PANNING) {
                    voice.panning = ins.panning as i32;
                    voice.flags.remove(ChannelFlags::SURROUND);
                }
                voice.nna = ins.nna;
            }
            None => {
                voice.instrument_volume = sample.global_volume as i32;
                voice.nna = NewNoteAction::Cut;
            }
        }
        if sample.flags.contains(ChannelFlags::PANNING) {
            voice.panning = sample.panning as i32;
            voice.flags.remove(ChannelFlags::SURROUND);
        }

        let released = voice
            .flags
            .intersects(ChannelFlags::KEY_OFF | ChannelFlags::NOTE_FADE);

        if let Some(ins) = instrument {
            if !porta || !song.uses_compat_gxx() || voice.length == 0 {
                let always = voice.length == 0 || (old_effects && released);
                voice.env_reset(song, always);
                voice.flags.remove(ChannelFlags::NOTE_FADE);
                voice.fadeout_volume = FADEOUT_MAX;
            }

            voice.vol_swing = if ins.vol_swing > 0 {
                let d: f64 = rng.random_range(-1.0..1.0);
                (d * ins.vol_swing as f64 / 100.0 * voice.volume as f64) as i32
            } else {
                0
            };
            voice.pan_swing = if ins.pan_swing > 0 {
                let d: f64 = rng.random_range(-1.0..1.0);
                (d * ins.pan_swing as f64 * 4.0) as i32
            } else {
                0
            };
        }

        if sample_index == voice.sample && voice.length > 0 {
            return;
        }

        voice.autovib_depth = 0;
        voice.autovib_position = 0;

        if released && inst_column {
            voice.period = 0;
        } else if !linear && voice.period != 0 && voice.c5speed != 0 && sample.c5speed != 0 {
            // Amiga periods scale with the sample rate
            voice.period = muldiv(
                voice.period as i64,
                voice.c5speed as i64,
                sample.c5speed as i64,
            ) as i32;
        }

        voice.flags.remove(
            ChannelFlags::KEY_OFF
                | ChannelFlags::NOTE_FADE
                | ChannelFlags::VOL_ENV
                | ChannelFlags::PAN_ENV
                | ChannelFlags::PITCH_ENV,
        );
        voice.load_sample(sample_index, sample);

        if let Some(ins) = instrument {
            voice
                .flags
                .set(ChannelFlags::VOL_ENV, ins.flags.contains(InstrumentFlags::VOLUME));
            voice
                .flags
                .set(ChannelFlags::PAN_ENV, ins.flags.contains(InstrumentFlags::PANNING));
            voice
                .flags
                .set(ChannelFlags::PITCH_ENV, ins.flags.contains(InstrumentFlags::PITCH));
            if ins.ifc & 0x80 != 0 {
                voice.cutoff = ins.ifc & 0x7F;
            }
            if ins.ifr & 0x80 != 0 {
                voice.resonance = ins.ifr & 0x7F;
            }
            voice.flags.set(
                ChannelFlags::FILTER,
                ins.flags
                    .contains(InstrumentFlags::PITCH | InstrumentFlags::FILTER),
            );
        }
    }

    /// Start (or, with `porta`, glide to) `note` on `channel`.
    ///
    /// Control notes release, cut or fade the current note instead.
    pub(super) fn note_change(
        &mut self,
        song: &Song,
        channel: usize,
        note: u8,
        porta: bool,
        retrig: bool,
        have_inst: bool,
    ) {
        if note == NOTE_NONE {
            return;
        }
        let inst_mode = song.uses_instruments();
        let linear = song.uses_linear_slides();
        let instrument = if inst_mode {
            song.instrument(self.pool[channel].instrument)
        } else {
            None
        };

        let mut note = note;
        if let Some(ins) = instrument {
            if is_note(note) {
                note = ins.note_map[(note - NOTE_FIRST) as usize];
            }
        }

        if is_control(note) {
            match note {
                NOTE_OFF => self.key_off_voice(song, channel),
                NOTE_CUT => {
                    let voice = &mut self.pool[channel];
                    voice.note_cut();
                    if inst_mode {
                        voice.fadeout_volume = 0;
                        voice.flags.insert(ChannelFlags::NOTE_FADE);
                    }
                    if Self::uses_midi(song, &self.pool[channel]) {
                        self.hooks.note_off(channel);
                    }
                }
                _ => {
                    if inst_mode {
                        self.pool[channel].flags.insert(ChannelFlags::NOTE_FADE);
                    }
                }
            }
            return;
        }

        let voice = &mut self.pool[channel];
        let Some(sample) = song.sample(voice.sample) else {
            return;
        };
        let period = period_from_note(note, sample.c5speed, linear);
        if period == 0 {
            return;
        }
        voice.note = note;
        voice.new_instrument = 0;

        if porta && voice.period != 0 && voice.length > 0 {
            voice.portamento_target = period;
        } else {
            voice.period = period;
            voice.portamento_target = 0;
        }

        if !porta || voice.length == 0 {
            let index = voice.sample;
            voice.load_sample(index, sample);
            if voice.vibrato_type & 4 == 0 {
                voice.vibrato_position = 0;
            }
            if voice.tremolo_type & 4 == 0 {
                voice.tremolo_position = 0;
            }
            if !have_inst && inst_mode {
                // Bare note on an existing instrument: envelopes follow the
                // instrument's envelope switches again
                if let Some(ins) = instrument {
                    voice
                        .flags
                        .set(ChannelFlags::VOL_ENV, ins.flags.contains(InstrumentFlags::VOLUME));
                    voice
                        .flags
                        .set(ChannelFlags::PAN_ENV, ins.flags.contains(InstrumentFlags::PANNING));
                    voice
                        .flags
                        .set(ChannelFlags::PITCH_ENV, ins.flags.contains(InstrumentFlags::PITCH));
                }
            }
        }

        if !porta {
            voice.env_reset(song, false);
            voice.flags.remove(ChannelFlags::NOTE_FADE);
            voice.fadeout_volume = FADEOUT_MAX;
            if !retrig {
                voice.autovib_depth = 0;
                voice.autovib_position = 0;
            }
        }
        voice.flags.remove(ChannelFlags::KEY_OFF);
        voice.volume = voice.volume.clamp(0, VOLUME_MAX);

        if let Some(ins) = instrument.filter(|ins| ins.is_midi()) {
            let program = ins.midi_program;
            let bank = ins.midi_bank;
            let volume = voice.volume;
            self.hooks.patch_change(channel, program, bank);
            self.hooks.note_on(channel, note, volume);
            let text = &song.midi_config.note_on;
            self.run_macro(song, channel, text, note);
        }
    }

    /// NOTE_OFF on a channel (also used by Kxx and S71)
    pub(super) fn key_off_voice(&mut self, song: &Song, index: usize) {
        self.pool[index].key_off(song);
        if Self::uses_midi(song, &self.pool[index]) {
            self.hooks.key_off(index);
            let text = &song.midi_config.note_off;
            let note = self.pool[index].note;
            self.run_macro(song, index, text, note);
        }
    }
}
