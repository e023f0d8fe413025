//! Effect column dispatch
//!
//! Handlers are indexed by the [`Effect`] discriminant. Every handler runs on
//! every tick and decides for itself what to do on the first one.

use nether_tracker::{ChannelFlags, Effect, NOTE_FIRST, NOTE_LAST, Song, is_note};

use super::slides::remember;
use super::{CHANNEL_VOLUME_MAX, GLOBAL_VOLUME_MAX, MAX_TEMPO, MIN_TEMPO, PROCESS_NEXT_ORDER, Player};
use crate::pitch::{nearest_note, period_from_note};
use crate::tables::{RETRIG_ADD, RETRIG_MULTIPLY, waveform};

/// `(player, song, channel, param, first_tick)`
type EffectHandler = fn(&mut Player, &Song, usize, u8, bool);

const HANDLERS: [EffectHandler; 34] = [
    fx_none,              // None
    fx_arpeggio,          // Arpeggio
    fx_porta_up,          // PortaUp
    fx_porta_down,        // PortaDown
    fx_tone_porta,        // TonePorta
    fx_vibrato,           // Vibrato
    fx_tone_porta_vol,    // TonePortaVol
    fx_vibrato_vol,       // VibratoVol
    fx_tremolo,           // Tremolo
    fx_panning,           // Panning
    fx_offset,            // Offset
    fx_volume_slide,      // VolumeSlide
    fx_position_jump,     // PositionJump
    fx_volume,            // Volume
    fx_pattern_break,     // PatternBreak
    fx_retrig,            // Retrig
    fx_speed,             // Speed
    fx_tempo,             // Tempo
    fx_tremor,            // Tremor
    fx_none,              // (unused)
    fx_special,           // Special
    fx_channel_volume,    // ChannelVolume
    fx_channel_vol_slide, // ChannelVolSlide
    fx_global_volume,     // GlobalVolume
    fx_global_vol_slide,  // GlobalVolSlide
    fx_key_off,           // KeyOff
    fx_fine_vibrato,      // FineVibrato
    fx_panbrello,         // Panbrello
    fx_extra_fine_porta,  // ExtraFinePorta
    fx_panning_slide,     // PanningSlide
    fx_set_env_position,  // SetEnvPosition
    fx_midi,              // Midi
    fx_note_slide_up,     // NoteSlideUp
    fx_note_slide_down,   // NoteSlideDown
];

impl Player {
    pub(super) fn handle_effect(
        &mut self,
        song: &Song,
        channel: usize,
        effect: Effect,
        param: u8,
        first_tick: bool,
    ) {
        if let Some(handler) = HANDLERS.get(effect as usize) {
            handler(self, song, channel, param, first_tick);
        }
    }

    /// Hxy / Uxy / volume column Hx: depth and speed of the vibrato LFO
    pub(super) fn set_vibrato(&mut self, channel: usize, param: u8, fine: bool) {
        let voice = &mut self.pool[channel];
        let depth = param & 0x0F;
        if depth != 0 {
            voice.vibrato_depth = if fine { depth } else { depth * 4 };
        }
        if param >> 4 != 0 {
            voice.vibrato_speed = param >> 4;
        }
        voice.flags.insert(ChannelFlags::VIBRATO);
    }
}

fn fx_none(_: &mut Player, _: &Song, _: usize, _: u8, _: bool) {}

// ============================================================================
// Pitch
// ============================================================================

fn fx_arpeggio(p: &mut Player, _: &Song, ch: usize, param: u8, _first_tick: bool) {
    let voice = &mut p.pool[ch];
    remember(&mut voice.memory.arpeggio, param);
    voice.n_command = Effect::Arpeggio;
}

fn fx_porta_up(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    p.portamento(song, ch, param, first_tick, true);
}

fn fx_porta_down(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    p.portamento(song, ch, param, first_tick, false);
}

fn fx_tone_porta(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    p.tone_portamento(song, ch, param, first_tick);
}

fn fx_tone_porta_vol(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    p.tone_portamento(song, ch, 0, first_tick);
    p.volume_slide(ch, param, first_tick);
}

fn fx_vibrato(p: &mut Player, _: &Song, ch: usize, param: u8, _first_tick: bool) {
    p.set_vibrato(ch, param, false);
}

fn fx_fine_vibrato(p: &mut Player, _: &Song, ch: usize, param: u8, _first_tick: bool) {
    p.set_vibrato(ch, param, true);
}

fn fx_vibrato_vol(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    p.set_vibrato(ch, 0, false);
    p.volume_slide(ch, param, first_tick);
}

/// X1x/X2x: extra-fine slide up/down by x (IT files encode this in Exx/Fxx)
fn fx_extra_fine_porta(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    let amount = param & 0x0F;
    match param >> 4 {
        1 => p.portamento(song, ch, 0xE0 | amount, first_tick, true),
        2 => p.portamento(song, ch, 0xE0 | amount, first_tick, false),
        _ => {}
    }
}

fn note_slide(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool, up: bool) {
    let linear = song.uses_linear_slides();
    let voice = &mut p.pool[ch];
    if first_tick {
        if param >> 4 != 0 {
            voice.note_slide_speed = param >> 4;
        }
        if param & 0x0F != 0 {
            voice.note_slide_step = (param & 0x0F) as i32;
        }
        voice.note_slide_counter = voice.note_slide_speed;
        return;
    }
    if voice.note_slide_counter == 0 || voice.period == 0 {
        return;
    }
    voice.note_slide_counter -= 1;
    if voice.note_slide_counter > 0 {
        return;
    }
    voice.note_slide_counter = voice.note_slide_speed;
    let step = if up {
        voice.note_slide_step
    } else {
        -voice.note_slide_step
    };
    let current = nearest_note(voice.period, voice.c5speed, linear) as i32;
    let target = (current + step).clamp(NOTE_FIRST as i32, NOTE_LAST as i32) as u8;
    voice.period = period_from_note(target, voice.c5speed, linear);
}

fn fx_note_slide_up(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    note_slide(p, song, ch, param, first_tick, true);
}

fn fx_note_slide_down(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    note_slide(p, song, ch, param, first_tick, false);
}

// ============================================================================
// Volume
// ============================================================================

fn fx_volume(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    if first_tick {
        p.pool[ch].volume = if param < 64 { param as i32 * 4 } else { 256 };
    }
}

fn fx_volume_slide(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    p.volume_slide(ch, param, first_tick);
}

fn fx_channel_volume(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    if first_tick && param as i32 <= CHANNEL_VOLUME_MAX {
        p.pool[ch].global_volume = param as i32;
    }
}

fn fx_channel_vol_slide(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    p.channel_volume_slide(ch, param, first_tick);
}

fn fx_global_volume(p: &mut Player, _: &Song, _: usize, param: u8, first_tick: bool) {
    if first_tick && param as i32 <= GLOBAL_VOLUME_MAX {
        p.global_volume = param as i32;
    }
}

fn fx_global_vol_slide(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    p.global_volume_slide(ch, param, first_tick);
}

fn fx_tremolo(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    let old_effects = song.uses_old_effects();
    let rng = &mut p.rng;
    let voice = &mut p.pool[ch];
    if param & 0x0F != 0 {
        voice.tremolo_depth = (param & 0x0F) << 2;
    }
    if param >> 4 != 0 {
        voice.tremolo_speed = param >> 4;
    }
    voice.flags.insert(ChannelFlags::TREMOLO);
    if first_tick && old_effects {
        return;
    }
    let value = waveform(voice.tremolo_type, voice.tremolo_position, rng);
    voice.tremolo_delta = (value * voice.tremolo_depth as i32) >> 5;
    voice.tremolo_position = voice
        .tremolo_position
        .wrapping_add(voice.tremolo_speed.wrapping_mul(4));
}

/// Ixy: x ticks on, y ticks off. The on/off counter survives across rows.
fn fx_tremor(p: &mut Player, song: &Song, ch: usize, param: u8, _first_tick: bool) {
    let old_effects = song.uses_old_effects();
    let voice = &mut p.pool[ch];
    let mut param = remember(&mut voice.memory.tremor, param);
    if !old_effects {
        if param & 0xF0 != 0 {
            param -= 0x10;
        }
        if param & 0x0F != 0 {
            param -= 0x01;
        }
    }
    let on = param >> 4;
    let off = param & 0x0F;

    // bit 7: running, bit 6: sounding, bits 0-5: ticks left in the phase
    // A voice with no sample keeps its counter where it is.
    if voice.length > 0 {
        let cd = voice.cd_tremor;
        voice.cd_tremor = if cd & 0x80 == 0 {
            0xC0 | on
        } else if cd & 0x3F > 0 {
            cd - 1
        } else if cd & 0x40 != 0 {
            0x80 | off
        } else {
            0xC0 | on
        };
    }
    voice.n_command = Effect::Tremor;
}

fn fx_retrig(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    let voice = &mut p.pool[ch];
    let param = remember(&mut voice.memory.retrig, param);
    let interval = (param & 0x0F) as i32;

    if first_tick && voice.row_note != 0 {
        voice.cd_retrig = interval;
        return;
    }
    voice.cd_retrig -= 1;
    if voice.cd_retrig > 0 {
        return;
    }
    voice.cd_retrig = interval;

    let shape = (param >> 4) as usize;
    voice.volume = if RETRIG_MULTIPLY[shape] != 0 {
        (voice.volume * RETRIG_MULTIPLY[shape]) >> 4
    } else {
        voice.volume + (RETRIG_ADD[shape] << 2)
    }
    .clamp(0, 256);

    let note = voice.new_note;
    let period = voice.period;
    let row_note = voice.row_note;
    if is_note(note) && voice.length > 0 {
        p.check_nna(song, ch, 0, note, true);
    }
    p.note_change(song, ch, note, true, true, false);

    let voice = &mut p.pool[ch];
    if row_note == 0 && period != 0 {
        voice.period = period;
    }
    voice.position = 0;
    voice.position_frac = 0;
}

fn fx_key_off(p: &mut Player, song: &Song, ch: usize, param: u8, _first_tick: bool) {
    if p.row_tick == param as u32 {
        p.key_off_voice(song, ch);
    }
}

// ============================================================================
// Panning
// ============================================================================

fn fx_panning(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    if first_tick {
        let voice = &mut p.pool[ch];
        voice.panning = param as i32;
        voice.pan_swing = 0;
        voice.panbrello_delta = 0;
        voice.flags.remove(ChannelFlags::SURROUND);
        voice.flags.insert(ChannelFlags::FAST_VOL_RAMP);
    }
}

fn fx_panning_slide(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    p.panning_slide(ch, param, first_tick);
}

fn fx_panbrello(p: &mut Player, _: &Song, ch: usize, param: u8, _first_tick: bool) {
    let rng = &mut p.rng;
    let voice = &mut p.pool[ch];
    if param & 0x0F != 0 {
        voice.panbrello_depth = param & 0x0F;
    }
    if param >> 4 != 0 {
        voice.panbrello_speed = param >> 4;
    }
    voice.flags.insert(ChannelFlags::PANBRELLO);
    let value = waveform(voice.panbrello_type, voice.panbrello_position, rng);
    voice.panbrello_delta = (value * voice.panbrello_depth as i32 + 2) >> 3;
    voice.panbrello_position = voice.panbrello_position.wrapping_add(voice.panbrello_speed);
}

// ============================================================================
// Sample
// ============================================================================

fn fx_offset(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    if !first_tick {
        return;
    }
    let old_effects = song.uses_old_effects();
    let voice = &mut p.pool[ch];
    if param != 0 {
        voice.memory.offset = (voice.memory.offset & !0xFF00) | ((param as u32) << 8);
    }
    if !is_note(voice.row_note) {
        return;
    }
    let offset = voice.memory.offset;
    if voice.row_has_porta() {
        voice.position = offset;
    } else {
        voice.position += offset;
    }
    if voice.position > voice.length {
        voice.position = if old_effects { voice.length } else { 0 };
    }
    voice.position_frac = 0;
}

fn fx_set_env_position(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    if !first_tick {
        return;
    }
    let voice = &mut p.pool[ch];
    let position = param as u32;
    voice.vol_env_position = position;
    voice.pan_env_position = position;
    voice.pitch_env_position = position;
    if let Some(ins) = song.instrument(voice.instrument) {
        if position > ins.pan_env.last_tick() as u32 {
            voice.flags.remove(ChannelFlags::PAN_ENV);
        }
    }
}

// ============================================================================
// Song flow
// ============================================================================

fn fx_position_jump(p: &mut Player, _: &Song, _: usize, param: u8, first_tick: bool) {
    if !first_tick {
        return;
    }
    // A refused backward jump still ends the pattern
    if !p.config.no_backward_jumps || param as usize > p.current_order {
        p.next_order = Some(param as usize);
    }
    p.process_row = PROCESS_NEXT_ORDER;
}

fn fx_pattern_break(p: &mut Player, _: &Song, _: usize, param: u8, first_tick: bool) {
    if first_tick {
        p.break_row = param as usize;
        p.process_row = PROCESS_NEXT_ORDER;
    }
}

fn fx_speed(p: &mut Player, _: &Song, _: usize, param: u8, first_tick: bool) {
    if first_tick && param != 0 {
        p.speed = param as u32;
        p.tick_count = param as u32;
    }
}

/// Txx sets the tempo; T0x/T1x slide it down/up on every tick after the first
fn fx_tempo(p: &mut Player, _: &Song, ch: usize, param: u8, first_tick: bool) {
    let param = remember(&mut p.pool[ch].memory.tempo, param);
    if first_tick {
        if param >= 0x20 {
            p.tempo = param as u32;
        }
        return;
    }
    let amount = (param & 0x0F) as u32;
    p.tempo = match param >> 4 {
        0 => p.tempo.saturating_sub(amount),
        1 => p.tempo + amount,
        _ => p.tempo,
    }
    .clamp(MIN_TEMPO, MAX_TEMPO);
}

fn fx_special(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    p.handle_special(song, ch, param, first_tick);
}

fn fx_midi(p: &mut Player, song: &Song, ch: usize, param: u8, first_tick: bool) {
    if !first_tick {
        return;
    }
    let text = if param < 0x80 {
        let slot = (p.pool[ch].active_macro & 0x0F) as usize;
        &song.midi_config.sfx[slot]
    } else {
        &song.midi_config.zxx[(param & 0x7F) as usize]
    };
    p.run_macro(song, ch, text, param);
}
