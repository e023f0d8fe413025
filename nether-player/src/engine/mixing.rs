//! Per-tick voice finalisation
//!
//! Turns each voice's effect state into what a mixer consumes: a 16.16
//! increment, left/right gains and filter coefficients. Envelopes advance
//! here, after their current value has been used.

use nether_tracker::{
    ChannelFlags, Effect, Envelope, Instrument, InstrumentFlags, MAX_CHANNELS, MAX_VOICES,
    Song, SongFlags,
};

use super::{FADEOUT_MAX, Player, VOLUME_MAX};
use crate::pitch::{do_freq_slide, freq_from_period, muldivr, nearest_note, period_from_note};
use crate::tables::{LINEAR_SLIDE_DOWN, waveform};
use crate::voice::Voice;

/// Panning centre on the 0-256 scale
const PAN_CENTER: i32 = 128;

/// Denominator of the final volume product (volume x channel x instrument x global)
const VOLUME_DIVISOR: i32 = 64 * 64 * 128;

impl Player {
    /// Finalise every voice for the tick just processed
    pub(super) fn update_voices(&mut self, song: &Song) {
        for index in 0..MAX_VOICES {
            self.update_voice(song, index);
            if index < MAX_CHANNELS && Self::uses_midi(song, &self.pool[index]) {
                let volume = self.pool[index].final_volume;
                if self.pool[index].length > 0 {
                    self.hooks.touch(index, volume);
                }
            }
        }
    }

    fn update_voice(&mut self, song: &Song, index: usize) {
        let mix_frequency = self.config.mix_frequency.max(1);
        let global_volume = self.global_volume;
        let rng = &mut self.rng;
        let voice = &mut self.pool[index];

        if voice.length == 0 {
            voice.increment = 0;
            voice.final_volume = 0;
            voice.left_volume = 0;
            voice.right_volume = 0;
            return;
        }

        let instrument = if song.uses_instruments() {
            song.instrument(voice.instrument)
        } else {
            None
        };
        let linear = song.uses_linear_slides();

        // ---- Volume ----
        let mut volume = voice.volume + voice.vol_swing;
        if voice.flags.contains(ChannelFlags::TREMOLO) {
            volume += voice.tremolo_delta;
        }
        volume = volume.clamp(0, VOLUME_MAX);
        if voice.n_command == Effect::Tremor && voice.cd_tremor & 0xC0 == 0x80 {
            volume = 0;
        }

        if let Some(ins) = instrument {
            if voice.flags.contains(ChannelFlags::VOL_ENV) && !ins.vol_env.nodes.is_empty() {
                volume = (volume * ins.vol_env.value_at(voice.vol_env_position)) >> 6;
            }
            if voice.flags.contains(ChannelFlags::NOTE_FADE) && ins.fadeout > 0 {
                let rate = (ins.fadeout as i32) << 1;
                voice.fadeout_volume = (voice.fadeout_volume - rate).max(0);
            }
        }
        if voice.flags.contains(ChannelFlags::NOTE_FADE) {
            volume = ((volume as i64 * voice.fadeout_volume as i64) / FADEOUT_MAX as i64) as i32;
            if voice.fadeout_volume == 0 && index >= MAX_CHANNELS {
                voice.stop();
                return;
            }
        }

        // ---- Panning ----
        let mut pan = voice.panning;
        if let Some(ins) = instrument {
            if voice.flags.contains(ChannelFlags::PAN_ENV) && !ins.pan_env.nodes.is_empty() {
                let env = ins.pan_env.value_at(voice.pan_env_position) - 32;
                let room = if pan >= PAN_CENTER { VOLUME_MAX - pan } else { pan };
                pan += (env * room) >> 5;
            }
            if ins.pitch_pan_separation != 0 && voice.note != 0 {
                let offset = voice.note as i32 - ins.pitch_pan_center as i32 - 1;
                pan += offset * ins.pitch_pan_separation as i32 / 8;
            }
        }
        pan += voice.pan_swing;
        if voice.flags.contains(ChannelFlags::PANBRELLO) {
            pan += voice.panbrello_delta;
        }
        pan = pan.clamp(0, VOLUME_MAX);
        pan = PAN_CENTER + (pan - PAN_CENTER) * song.pan_separation as i32 / 128;
        if song.flags.contains(SongFlags::NO_STEREO) {
            pan = PAN_CENTER;
        }
        voice.final_panning = pan;

        // ---- Pitch ----
        let mut period = voice.period;
        if voice.flags.contains(ChannelFlags::GLISSANDO | ChannelFlags::PORTAMENTO) && period > 0 {
            let note = nearest_note(period, voice.c5speed, linear);
            period = period_from_note(note, voice.c5speed, linear);
        }
        if voice.flags.contains(ChannelFlags::VIBRATO) {
            let value = waveform(voice.vibrato_type, voice.vibrato_position, rng);
            let shift = if song.uses_old_effects() { 6 } else { 7 };
            let delta = (value * voice.vibrato_depth as i32) >> shift;
            period = do_freq_slide(period, delta, linear);
            voice.vibrato_position = voice
                .vibrato_position
                .wrapping_add(voice.vibrato_speed.wrapping_mul(4));
        }
        if let Some(sample) = song.sample(voice.sample).filter(|s| s.vib_depth > 0) {
            let full = (sample.vib_depth as i32) << 8;
            voice.autovib_depth = if sample.vib_rate == 0 {
                full
            } else {
                (voice.autovib_depth + sample.vib_rate as i32).min(full)
            };
            let value = waveform(sample.vib_type as u8, voice.autovib_position, rng);
            let delta = (value * (voice.autovib_depth >> 8)) >> 6;
            period = do_freq_slide(period, delta, linear);
            voice.autovib_position = voice.autovib_position.wrapping_add(sample.vib_speed);
        }
        if voice.n_command == Effect::Arpeggio {
            let param = voice.memory.arpeggio;
            let semitones = match self.row_tick % 3 {
                1 => param >> 4,
                2 => param & 0x0F,
                _ => 0,
            } as usize;
            if semitones > 0 && period > 0 {
                period = muldivr(period as i64, LINEAR_SLIDE_DOWN[semitones * 16] as i64, 65536)
                    as i32;
            }
        }

        let mut cutoff = voice.cutoff;
        if let Some(ins) = instrument {
            if voice.flags.contains(ChannelFlags::PITCH_ENV) && !ins.pitch_env.nodes.is_empty() {
                let env = ins.pitch_env.value_at(voice.pitch_env_position) - 32;
                if ins.flags.contains(InstrumentFlags::FILTER) {
                    // Filter envelope scales the cutoff
                    cutoff = ((voice.cutoff as i32 * (env + 32)) / 64).clamp(0, 127) as u8;
                } else {
                    period = do_freq_slide(period, -(env << 5), true);
                }
            }
        }

        period = period.max(1);
        voice.frequency = freq_from_period(period, voice.c5speed, linear);
        voice.increment = (((voice.frequency as u64) << 16) / mix_frequency as u64)
            .min(u32::MAX as u64) as u32;

        // ---- Output gains ----
        let mut final_volume =
            volume * voice.global_volume * voice.instrument_volume / 64 * global_volume
                / (VOLUME_DIVISOR / 64);
        if voice.flags.contains(ChannelFlags::MUTE) {
            final_volume = 0;
        }
        final_volume = final_volume.clamp(0, VOLUME_MAX);
        voice.final_volume = final_volume;
        if voice.flags.contains(ChannelFlags::SURROUND) {
            voice.left_volume = final_volume >> 1;
            voice.right_volume = -(final_volume >> 1);
        } else {
            voice.left_volume = final_volume * (VOLUME_MAX - pan) / VOLUME_MAX;
            voice.right_volume = final_volume * pan / VOLUME_MAX;
        }

        if voice.flags.contains(ChannelFlags::FILTER) || cutoff < 0x7F || voice.resonance > 0 {
            voice.filter.update(cutoff, voice.resonance, mix_frequency);
        } else {
            voice.filter.update(0x7F, 0, mix_frequency);
        }

        if let Some(ins) = instrument {
            advance_envelopes(voice, ins);
        }
    }
}

/// Step each enabled envelope one tick, honouring sustain (until key-off)
/// and loop points. A volume envelope that runs off its end starts the
/// fade, and silences the voice if it ended at zero.
fn advance_envelopes(voice: &mut Voice, ins: &Instrument) {
    let released = voice.flags.contains(ChannelFlags::KEY_OFF);

    if voice.flags.contains(ChannelFlags::VOL_ENV) {
        let ended = step_envelope(
            &mut voice.vol_env_position,
            &ins.vol_env,
            ins.flags.contains(InstrumentFlags::VOL_LOOP),
            ins.flags.contains(InstrumentFlags::VOL_SUSTAIN) && !released,
        );
        if ended {
            voice.flags.insert(ChannelFlags::NOTE_FADE);
            if ins.vol_env.nodes.last().is_some_and(|n| n.value == 0) {
                voice.fadeout_volume = 0;
            }
        }
    }
    if voice.flags.contains(ChannelFlags::PAN_ENV) {
        step_envelope(
            &mut voice.pan_env_position,
            &ins.pan_env,
            ins.flags.contains(InstrumentFlags::PAN_LOOP),
            ins.flags.contains(InstrumentFlags::PAN_SUSTAIN) && !released,
        );
    }
    if voice.flags.contains(ChannelFlags::PITCH_ENV) {
        step_envelope(
            &mut voice.pitch_env_position,
            &ins.pitch_env,
            ins.flags.contains(InstrumentFlags::PITCH_LOOP),
            ins.flags.contains(InstrumentFlags::PITCH_SUSTAIN) && !released,
        );
    }
}

/// Returns true when a non-looping envelope has passed its last node
fn step_envelope(position: &mut u32, env: &Envelope, looped: bool, sustained: bool) -> bool {
    *position += 1;
    if sustained {
        if *position > env.tick(env.sustain_end) as u32 {
            *position = env.tick(env.sustain_start) as u32;
        }
        return false;
    }
    if looped {
        if *position > env.tick(env.loop_end) as u32 {
            *position = env.tick(env.loop_start) as u32;
        }
        return false;
    }
    let last = env.last_tick() as u32;
    if *position > last {
        *position = last;
        return true;
    }
    false
}
