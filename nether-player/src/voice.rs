//! Voice state
//!
//! A voice is what a mixer reads: sample slot, position, 16.16 increment and
//! final left/right volumes. Voices 0..64 follow the pattern channels; the
//! rest are background voices spawned by New Note Actions.

use nether_tracker::{
    ChannelFlags, ChannelSettings, Effect, InstrumentFlags, NewNoteAction, Sample, Song,
    VolumeEffect,
};

use crate::filter::ResonantFilter;

/// Last non-zero parameter of each effect family
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct EffectMemory {
    pub volume_slide: u8,
    /// Exx/Fxx (and Gxx unless Compat Gxx)
    pub pitch_slide: u8,
    /// Gxx
    pub porta_note: u8,
    pub panning_slide: u8,
    pub channel_volume_slide: u8,
    pub global_volume_slide: u8,
    /// Volume column Cx/Dx
    pub volume_column_slide: u8,
    pub tremor: u8,
    pub retrig: u8,
    pub arpeggio: u8,
    pub special: u8,
    pub tempo: u8,
    /// Oxx plus the SAx high byte
    pub offset: u32,
}

/// Playback state of one voice
#[derive(Clone, Default, Debug)]
pub struct Voice {
    // Sample
    /// Sample slot (0 = none)
    pub sample: usize,
    /// Instrument slot (0 = none)
    pub instrument: usize,
    /// Playable length in frames; 0 means the voice is silent and reusable
    pub length: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub position: u32,
    /// 16-bit fraction of `position`
    pub position_frac: u32,
    /// 16.16 frames per output frame
    pub increment: u32,
    pub c5speed: u32,
    pub flags: ChannelFlags,

    // Pitch
    pub period: i32,
    /// Tone portamento destination (0 = none)
    pub portamento_target: i32,
    /// Rate after vibrato/arpeggio/envelopes, Hz
    pub frequency: u32,

    // Volume
    /// 0-256
    pub volume: i32,
    /// Channel volume, 0-64
    pub global_volume: i32,
    /// Sample x instrument global volume, 0-64
    pub instrument_volume: i32,
    /// 0-65536
    pub fadeout_volume: i32,
    pub vol_swing: i32,
    /// Volume after every scaling stage, 0-256
    pub final_volume: i32,
    pub left_volume: i32,
    pub right_volume: i32,

    // Panning
    /// 0-256
    pub panning: i32,
    pub pan_swing: i32,
    pub final_panning: i32,

    // Envelopes
    pub vol_env_position: u32,
    pub pan_env_position: u32,
    pub pitch_env_position: u32,

    // Note
    /// Currently sounding note after keyboard translation
    pub note: u8,
    /// Note as triggered, before translation
    pub new_note: u8,
    pub new_instrument: u8,
    pub nna: NewNoteAction,
    /// Foreground channel (1-based) that spawned this background voice; 0 otherwise
    pub master_channel: usize,

    // Row data (captured on the first tick of a row)
    pub row_note: u8,
    pub row_instrument: u8,
    pub row_vol_effect: VolumeEffect,
    pub row_vol_param: u8,
    pub row_effect: Effect,
    pub row_param: u8,
    /// Command whose continuous part runs in finalisation (arpeggio, tremor)
    pub n_command: Effect,

    // LFOs
    pub vibrato_type: u8,
    pub vibrato_speed: u8,
    pub vibrato_depth: u8,
    pub vibrato_position: u8,
    pub tremolo_type: u8,
    pub tremolo_speed: u8,
    pub tremolo_depth: u8,
    pub tremolo_position: u8,
    pub tremolo_delta: i32,
    pub panbrello_type: u8,
    pub panbrello_speed: u8,
    pub panbrello_depth: u8,
    pub panbrello_position: u8,
    pub panbrello_delta: i32,
    /// Sample auto-vibrato depth, 8.8
    pub autovib_depth: i32,
    pub autovib_position: u8,

    // Countdowns
    pub cd_note_delay: u8,
    pub cd_note_cut: u8,
    pub cd_retrig: i32,
    pub cd_tremor: u8,
    /// Remaining SBx iterations (0 = not looping)
    pub cd_patloop: u8,
    pub patloop_row: usize,
    pub note_slide_counter: u8,
    pub note_slide_speed: u8,
    pub note_slide_step: i32,

    // Filter
    /// 0-127 (127 = open)
    pub cutoff: u8,
    /// 0-127
    pub resonance: u8,
    pub filter: ResonantFilter,

    /// SFx macro slot used by Z00-Z7F
    pub active_macro: u8,
    pub memory: EffectMemory,
}

impl Voice {
    /// Voice for a pattern channel, initialised from the song's channel table
    pub fn for_channel(settings: &ChannelSettings) -> Self {
        let mut voice = Self {
            panning: settings.panning as i32,
            global_volume: settings.volume as i32,
            cutoff: 0x7F,
            ..Default::default()
        };
        voice.flags = settings.flags & (ChannelFlags::MUTE | ChannelFlags::SURROUND);
        voice
    }

    /// Reset everything except the channel-table settings
    pub fn reset(&mut self) {
        let panning = self.panning;
        let global_volume = self.global_volume;
        let flags = self.flags & (ChannelFlags::MUTE | ChannelFlags::SURROUND);
        *self = Self {
            panning,
            global_volume,
            flags,
            cutoff: 0x7F,
            ..Default::default()
        };
    }

    /// Row asks for tone portamento (Gxx, Lxx or volume-column Gx)
    pub fn row_has_porta(&self) -> bool {
        matches!(self.row_effect, Effect::TonePorta | Effect::TonePortaVol)
            || self.row_vol_effect == VolumeEffect::TonePorta
    }

    /// Point the voice at `sample` from its start, switching to the sustain
    /// loop when the sample has one.
    pub fn load_sample(&mut self, index: usize, sample: &Sample) {
        self.sample = index;
        self.c5speed = sample.c5speed;
        self.length = sample.length;
        self.loop_start = sample.loop_start;
        self.loop_end = sample.loop_end;
        self.position = 0;
        self.position_frac = 0;
        self.flags.remove(ChannelFlags::SAMPLE_FLAGS);
        self.flags.insert(sample.flags & ChannelFlags::SAMPLE_FLAGS);

        if self.flags.contains(ChannelFlags::SUSTAIN_LOOP) {
            self.loop_start = sample.sustain_start;
            self.loop_end = sample.sustain_end;
            self.flags.insert(ChannelFlags::LOOP);
            self.flags.set(
                ChannelFlags::PINGPONG_LOOP,
                self.flags.contains(ChannelFlags::PINGPONG_SUSTAIN),
            );
        }
        if self.flags.contains(ChannelFlags::LOOP) && self.loop_end < self.length {
            self.length = self.loop_end;
        }
        self.loop_end = self.loop_end.min(self.length);
        self.filter.clear_history();
    }

    /// True while the voice produces (or may produce) sound
    pub fn is_active(&self) -> bool {
        self.length > 0 && self.increment > 0 && (self.left_volume | self.right_volume) != 0
    }

    /// Silence the voice and make it reusable
    pub fn stop(&mut self) {
        self.length = 0;
        self.position = 0;
        self.position_frac = 0;
        self.increment = 0;
        self.left_volume = 0;
        self.right_volume = 0;
        self.final_volume = 0;
        self.filter.clear_history();
    }

    /// Note cut: volume drops to zero, the sample keeps its place
    pub fn note_cut(&mut self) {
        self.volume = 0;
        self.flags.insert(ChannelFlags::FAST_VOL_RAMP);
    }

    /// Release the note: sustain loops end and, without a volume envelope,
    /// the instrument fade starts.
    pub fn key_off(&mut self, song: &Song) {
        let key_was_on = !self.flags.contains(ChannelFlags::KEY_OFF);
        self.flags.insert(ChannelFlags::KEY_OFF);

        let instrument = song.instrument(self.instrument);
        if instrument.is_some() && !self.flags.contains(ChannelFlags::VOL_ENV) {
            self.flags.insert(ChannelFlags::NOTE_FADE);
        }
        if self.length == 0 {
            return;
        }

        if key_was_on && self.flags.contains(ChannelFlags::SUSTAIN_LOOP) {
            if let Some(sample) = song.sample(self.sample) {
                if sample.flags.contains(ChannelFlags::LOOP) {
                    self.flags.set(
                        ChannelFlags::PINGPONG_LOOP,
                        sample.flags.contains(ChannelFlags::PINGPONG_LOOP),
                    );
                    if !self.flags.contains(ChannelFlags::PINGPONG_LOOP) {
                        self.flags.remove(ChannelFlags::PINGPONG_FLAG);
                    }
                    self.flags.insert(ChannelFlags::LOOP);
                    self.loop_start = sample.loop_start;
                    self.loop_end = sample.loop_end;
                    self.length = sample.length.min(sample.loop_end);
                } else {
                    self.flags.remove(
                        ChannelFlags::LOOP | ChannelFlags::PINGPONG_LOOP | ChannelFlags::PINGPONG_FLAG,
                    );
                    self.length = sample.length;
                }
            }
        }

        if let Some(ins) = instrument {
            if ins.flags.contains(InstrumentFlags::VOL_LOOP) && ins.fadeout > 0 {
                self.flags.insert(ChannelFlags::NOTE_FADE);
            }
        }
    }

    /// Rewind the envelopes of the current instrument. Unless `always` is
    /// set, envelopes flagged as carry keep their position.
    pub fn env_reset(&mut self, song: &Song, always: bool) {
        let Some(ins) = song.instrument(self.instrument) else {
            return;
        };
        self.flags.insert(ChannelFlags::FAST_VOL_RAMP);
        if always || !ins.flags.contains(InstrumentFlags::VOL_CARRY) {
            self.vol_env_position = 0;
        }
        if always || !ins.flags.contains(InstrumentFlags::PAN_CARRY) {
            self.pan_env_position = 0;
        }
        if always || !ins.flags.contains(InstrumentFlags::PITCH_CARRY) {
            self.pitch_env_position = 0;
        }
    }

    /// Step the sample position by `frames` output frames, honouring loops.
    ///
    /// This is the position bookkeeping a mixer performs; it lets callers
    /// without an audio backend keep voices moving between ticks.
    pub fn advance(&mut self, frames: u32) {
        if self.length == 0 || self.increment == 0 {
            return;
        }
        let step = self.increment as u64 * frames as u64;
        let mut pos = ((self.position as u64) << 16) + self.position_frac as u64;
        let backwards = self.flags.contains(ChannelFlags::PINGPONG_FLAG);
        let length = (self.length as u64) << 16;

        if backwards {
            let loop_start = (self.loop_start as u64) << 16;
            pos = pos.saturating_sub(step);
            if pos < loop_start {
                // Bounce forwards off the loop start
                pos = loop_start + (loop_start - pos);
                self.flags.remove(ChannelFlags::PINGPONG_FLAG);
            }
        } else {
            pos += step;
        }

        if pos >= length {
            if !self.flags.contains(ChannelFlags::LOOP) || self.loop_end <= self.loop_start {
                self.stop();
                return;
            }
            let loop_start = (self.loop_start as u64) << 16;
            let loop_len = length - loop_start;
            let over = (pos - length) % loop_len.max(1);
            if self.flags.contains(ChannelFlags::PINGPONG_LOOP) {
                self.flags.insert(ChannelFlags::PINGPONG_FLAG);
                pos = length.saturating_sub(over + 1).max(loop_start);
            } else {
                pos = loop_start + over;
            }
        }

        self.position = (pos >> 16) as u32;
        self.position_frac = (pos & 0xFFFF) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping_voice(pingpong: bool) -> Voice {
        let mut flags = ChannelFlags::LOOP;
        if pingpong {
            flags |= ChannelFlags::PINGPONG_LOOP;
        }
        Voice {
            length: 100,
            loop_start: 50,
            loop_end: 100,
            increment: 1 << 16,
            flags,
            ..Default::default()
        }
    }

    #[test]
    fn test_advance_forward_loop_wraps() {
        let mut v = looping_voice(false);
        v.advance(120);
        assert_eq!(v.position, 70);
        assert_eq!(v.length, 100);
    }

    #[test]
    fn test_advance_pingpong_bounces() {
        let mut v = looping_voice(true);
        v.advance(110);
        assert!(v.flags.contains(ChannelFlags::PINGPONG_FLAG));
        assert!(v.position < 100 && v.position >= 50);
        v.advance(100);
        assert!(v.position >= 50);
    }

    #[test]
    fn test_advance_one_shot_stops() {
        let mut v = Voice {
            length: 10,
            increment: 2 << 16,
            left_volume: 10,
            ..Default::default()
        };
        v.advance(5);
        assert_eq!(v.length, 0);
        assert_eq!(v.left_volume, 0);
    }

    #[test]
    fn test_key_off_releases_sustain_loop() {
        let mut song = Song::default();
        song.samples[1] = Sample {
            length: 1000,
            loop_start: 100,
            loop_end: 900,
            sustain_start: 10,
            sustain_end: 20,
            flags: ChannelFlags::LOOP | ChannelFlags::SUSTAIN_LOOP,
            ..Default::default()
        };
        let mut v = Voice {
            sample: 1,
            length: 20,
            loop_start: 10,
            loop_end: 20,
            flags: ChannelFlags::LOOP | ChannelFlags::SUSTAIN_LOOP,
            ..Default::default()
        };
        v.key_off(&song);
        assert!(v.flags.contains(ChannelFlags::KEY_OFF));
        assert_eq!((v.loop_start, v.loop_end, v.length), (100, 900, 900));
        // No instrument, so no fade
        assert!(!v.flags.contains(ChannelFlags::NOTE_FADE));
    }

    #[test]
    fn test_load_sample_uses_sustain_loop() {
        let sample = Sample {
            length: 500,
            loop_start: 0,
            loop_end: 400,
            sustain_start: 100,
            sustain_end: 200,
            flags: ChannelFlags::SUSTAIN_LOOP | ChannelFlags::PINGPONG_SUSTAIN,
            ..Default::default()
        };
        let mut v = Voice {
            position: 77,
            ..Default::default()
        };
        v.load_sample(3, &sample);
        assert_eq!(v.sample, 3);
        assert_eq!(v.position, 0);
        assert_eq!((v.loop_start, v.loop_end, v.length), (100, 200, 200));
        assert!(v.flags.contains(ChannelFlags::LOOP | ChannelFlags::PINGPONG_LOOP));
    }

    #[test]
    fn test_env_reset_honours_carry() {
        let mut song = Song::default();
        song.instruments[1] = Some(nether_tracker::Instrument {
            flags: InstrumentFlags::VOL_CARRY,
            ..Default::default()
        });
        let mut v = Voice {
            instrument: 1,
            vol_env_position: 12,
            pan_env_position: 12,
            pitch_env_position: 12,
            ..Default::default()
        };
        v.env_reset(&song, false);
        assert_eq!(
            (v.vol_env_position, v.pan_env_position, v.pitch_env_position),
            (12, 0, 0)
        );

        v.env_reset(&song, true);
        assert_eq!(v.vol_env_position, 0);
    }

    #[test]
    fn test_reset_keeps_channel_settings() {
        let settings = ChannelSettings {
            panning: 64,
            volume: 32,
            flags: ChannelFlags::MUTE,
        };
        let mut v = Voice::for_channel(&settings);
        v.volume = 200;
        v.length = 5;
        v.reset();
        assert_eq!((v.panning, v.global_volume, v.volume, v.length), (64, 32, 0, 0));
        assert!(v.flags.contains(ChannelFlags::MUTE));
    }
}
