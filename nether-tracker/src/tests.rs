//! Tests for nether-tracker types

use crate::{
    Effect, Envelope, EnvelopeNode, Instrument, MAX_CHANNELS, MidiConfig, NOTE_CUT, NOTE_FIRST,
    NOTE_OFF, Note, ORDER_LAST, Pattern, Song, VolumeEffect, is_control, is_note, note_name,
};

#[test]
fn test_note_classification() {
    assert!(is_note(NOTE_FIRST));
    assert!(is_note(120));
    assert!(!is_note(0));
    assert!(is_control(NOTE_OFF));
    assert!(is_control(NOTE_CUT));
    assert!(!is_control(61));
    assert_eq!(note_name(61), "C-5");
    assert_eq!(note_name(NOTE_OFF), "===");
}

#[test]
fn test_pattern_bounds() {
    let mut pat = Pattern::new(32);
    assert_eq!(pat.rows(), 32);
    assert!(pat.note(32, 0).is_none());
    assert!(pat.note(0, MAX_CHANNELS).is_none());

    if let Some(n) = pat.note_mut(5, 3) {
        n.note = 61;
        n.effect = Effect::VolumeSlide;
    }
    assert_eq!(pat.row(5)[3].note, 61);
    assert_eq!(pat.used_channels(), 4);
    assert!(pat.row(99).is_empty());
}

#[test]
fn test_pattern_rows_clamped() {
    assert_eq!(Pattern::new(0).rows(), 1);
    assert_eq!(Pattern::new(1000).rows(), 200);
}

#[test]
fn test_it_letters() {
    assert_eq!(Effect::from_it_command(1), Effect::Speed);
    assert_eq!(Effect::from_it_command(4), Effect::VolumeSlide);
    assert_eq!(Effect::from_it_command(26), Effect::Midi);
    assert_eq!(Effect::from_it_command(0), Effect::None);
    assert_eq!(Effect::from_it_command(27), Effect::None);
    assert_eq!(Effect::VolumeSlide.letter(), 'D');
    assert_eq!(Effect::None.letter(), '.');
    assert_eq!(Effect::from_u8(Effect::Tremor as u8), Effect::Tremor);
    assert_eq!(VolumeEffect::from_u8(VolumeEffect::TonePorta as u8), VolumeEffect::TonePorta);
}

#[test]
fn test_envelope_normalize() {
    let mut env = Envelope {
        nodes: vec![
            EnvelopeNode { tick: 5, value: 64 },
            EnvelopeNode { tick: 10, value: 0 },
        ],
        loop_start: 7,
        loop_end: 1,
        sustain_start: 0,
        sustain_end: 9,
    };
    env.normalize();
    assert_eq!(env.nodes[0].tick, 0);
    assert_eq!(env.loop_start, 2);
    assert_eq!(env.loop_end, 2);
    assert_eq!(env.sustain_end, 2);
}

#[test]
fn test_envelope_interpolation() {
    let env = Envelope {
        nodes: vec![
            EnvelopeNode { tick: 0, value: 0 },
            EnvelopeNode { tick: 10, value: 64 },
        ],
        loop_start: 0,
        loop_end: 0,
        sustain_start: 0,
        sustain_end: 0,
    };
    assert_eq!(env.value_at(0), 0);
    assert_eq!(env.value_at(5), 32);
    assert_eq!(env.value_at(10), 64);
    assert_eq!(env.value_at(50), 64);
}

#[test]
fn test_keyboard_self_maps_invalid_notes() {
    let mut ins = Instrument::default();
    ins.set_keyboard(10, 200, 3);
    assert_eq!(ins.note_map[10], 11);
    assert_eq!(ins.sample_map[10], 3);
    ins.set_keyboard(11, 23, 4);
    assert_eq!(ins.note_map[11], 24);
    assert_eq!(ins.sample_for_note(12), 4);
}

#[test]
fn test_song_accessors() {
    let mut song = Song {
        orderlist: vec![0, 254, 1, ORDER_LAST, 3],
        ..Default::default()
    };
    song.patterns.push(Some(Pattern::new(16)));
    song.patterns.push(None);

    assert_eq!(song.order(0), 0);
    assert_eq!(song.order(99), ORDER_LAST);
    assert_eq!(song.order_count(), 3);
    assert_eq!(song.pattern_rows(0), 16);
    assert_eq!(song.pattern_rows(1), 64);
    assert_eq!(song.pattern_count(), 1);
    assert!(song.sample(0).is_none());
    assert!(song.sample(1).is_some());
    assert!(song.instrument(1).is_none());
    assert_eq!(song.sample_count(), 0);
}

#[test]
fn test_default_midi_config() {
    let cfg = MidiConfig::default();
    assert_eq!(cfg.sfx[0], "F0F000z");
    assert_eq!(cfg.zxx[0], "F0F00100");
    assert_eq!(cfg.zxx[15], "F0F00178");
    assert!(cfg.zxx[16].is_empty());
}

#[test]
fn test_midi_config_from_bytes() {
    let mut raw = vec![0u8; MidiConfig::SIZE];
    raw[..2].copy_from_slice(b"FA");
    raw[9 * 32..9 * 32 + 3].copy_from_slice(b"F0z");
    assert!(MidiConfig::from_bytes(&raw[..100]).is_none());
    let cfg = MidiConfig::from_bytes(&raw).unwrap();
    assert_eq!(cfg.start, "FA");
    assert_eq!(cfg.sfx[0], "F0z");
    assert!(cfg.zxx[127].is_empty());
}

#[test]
fn test_note_default_empty() {
    let n = Note::default();
    assert!(n.is_empty());
    assert!(!n.has_note());
}
