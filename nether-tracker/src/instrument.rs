//! Instrument data structures and envelopes

use crate::flags::InstrumentFlags;
use crate::pattern::{NOTE_FIRST, NOTE_MIDC, is_note};
use crate::MAX_ENVELOPE_POINTS;

/// New Note Action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NewNoteAction {
    #[default]
    Cut = 0,
    Continue = 1,
    NoteOff = 2,
    NoteFade = 3,
}

impl NewNoteAction {
    pub fn from_u8(value: u8) -> Self {
        match value % 4 {
            1 => Self::Continue,
            2 => Self::NoteOff,
            3 => Self::NoteFade,
            _ => Self::Cut,
        }
    }
}

/// Duplicate Check Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DuplicateCheckType {
    #[default]
    Off = 0,
    Note = 1,
    Sample = 2,
    Instrument = 3,
}

impl DuplicateCheckType {
    pub fn from_u8(value: u8) -> Self {
        match value % 4 {
            1 => Self::Note,
            2 => Self::Sample,
            3 => Self::Instrument,
            _ => Self::Off,
        }
    }
}

/// Duplicate Check Action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DuplicateCheckAction {
    #[default]
    Cut = 0,
    NoteOff = 1,
    NoteFade = 2,
}

impl DuplicateCheckAction {
    pub fn from_u8(value: u8) -> Self {
        match value % 3 {
            1 => Self::NoteOff,
            2 => Self::NoteFade,
            _ => Self::Cut,
        }
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// One envelope point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvelopeNode {
    pub tick: u16,
    /// 0-64 (32 is centre for panning and pitch)
    pub value: u8,
}

/// Volume, panning or pitch envelope.
///
/// Enabled/loop/sustain/carry switches live in the owning instrument's
/// [`InstrumentFlags`].
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub nodes: Vec<EnvelopeNode>,
    pub loop_start: usize,
    pub loop_end: usize,
    pub sustain_start: usize,
    pub sustain_end: usize,
}

impl Envelope {
    /// Two-node flat envelope at `value`
    pub fn flat(value: u8) -> Self {
        Self {
            nodes: vec![
                EnvelopeNode { tick: 0, value },
                EnvelopeNode { tick: 100, value },
            ],
            loop_start: 0,
            loop_end: 0,
            sustain_start: 0,
            sustain_end: 0,
        }
    }

    /// Tick of the last node (0 for an empty envelope)
    pub fn last_tick(&self) -> u16 {
        self.nodes.last().map_or(0, |n| n.tick)
    }

    pub fn tick(&self, node: usize) -> u16 {
        self.nodes.get(node).map_or(0, |n| n.tick)
    }

    /// Clamp node count and loop bounds into a consistent state and force the
    /// first tick to zero.
    pub fn normalize(&mut self) {
        self.nodes.truncate(MAX_ENVELOPE_POINTS);
        let count = self.nodes.len();
        self.loop_start = self.loop_start.min(count);
        self.loop_end = self.loop_end.clamp(self.loop_start, count);
        self.sustain_start = self.sustain_start.min(count);
        self.sustain_end = self.sustain_end.clamp(self.sustain_start, count);
        if let Some(first) = self.nodes.first_mut() {
            first.tick = 0;
        }
    }

    /// Interpolated value (0-64) at `position` ticks
    pub fn value_at(&self, position: u32) -> i32 {
        let Some(last) = self.nodes.len().checked_sub(1) else {
            return 0;
        };
        let pt = self
            .nodes
            .iter()
            .take(last)
            .position(|n| position <= n.tick as u32)
            .unwrap_or(last);
        let x2 = self.nodes[pt].tick as i32;
        let y2 = self.nodes[pt].value as i32;
        let pos = position as i32;
        if pt == 0 || pos >= x2 {
            return y2;
        }
        let x1 = self.nodes[pt - 1].tick as i32;
        let y1 = self.nodes[pt - 1].value as i32;
        if x2 <= x1 {
            return y2;
        }
        y1 + ((pos - x1) * (y2 - y1)) / (x2 - x1)
    }
}

// =============================================================================
// Instrument
// =============================================================================

/// Instrument slot
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub filename: String,
    pub flags: InstrumentFlags,
    /// Fade-out rate subtracted from the 65536 fade volume per tick
    pub fadeout: u32,
    /// 0-128
    pub global_volume: u8,
    /// 0-256, used when [`InstrumentFlags::SET_PANNING`] is set
    pub panning: u16,
    /// Note each keyboard note plays (1..=120)
    pub note_map: [u8; 120],
    /// Sample each keyboard note plays (0 = none)
    pub sample_map: [u8; 120],
    pub nna: NewNoteAction,
    pub dct: DuplicateCheckType,
    pub dca: DuplicateCheckAction,
    /// -32..=32
    pub pitch_pan_separation: i8,
    pub pitch_pan_center: u8,
    /// Random volume variation, percent (0-100)
    pub vol_swing: u8,
    /// Random panning variation (0-64)
    pub pan_swing: u8,
    /// Initial filter cutoff, bit 7 = enabled
    pub ifc: u8,
    /// Initial filter resonance, bit 7 = enabled
    pub ifr: u8,
    pub midi_channel_mask: u32,
    pub midi_program: u8,
    pub midi_bank: u16,
    pub vol_env: Envelope,
    pub pan_env: Envelope,
    pub pitch_env: Envelope,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: String::new(),
            filename: String::new(),
            flags: InstrumentFlags::empty(),
            fadeout: 0,
            global_volume: 128,
            panning: 128,
            note_map: std::array::from_fn(|n| n as u8 + NOTE_FIRST),
            sample_map: [0; 120],
            nna: NewNoteAction::Cut,
            dct: DuplicateCheckType::Off,
            dca: DuplicateCheckAction::Cut,
            pitch_pan_separation: 0,
            pitch_pan_center: NOTE_MIDC - NOTE_FIRST,
            vol_swing: 0,
            pan_swing: 0,
            ifc: 0,
            ifr: 0,
            midi_channel_mask: 0,
            midi_program: 0,
            midi_bank: 0,
            vol_env: Envelope::flat(64),
            pan_env: Envelope::flat(32),
            pitch_env: Envelope::flat(32),
        }
    }
}

impl Instrument {
    /// Set one keyboard entry. Out-of-range notes map to themselves.
    pub fn set_keyboard(&mut self, index: usize, note: u8, sample: u8) {
        if index >= 120 {
            return;
        }
        let mapped = note.wrapping_add(NOTE_FIRST);
        self.note_map[index] = if is_note(mapped) {
            mapped
        } else {
            index as u8 + NOTE_FIRST
        };
        self.sample_map[index] = sample;
    }

    /// Sample played by `note` (1-based note), 0 if none
    pub fn sample_for_note(&self, note: u8) -> u8 {
        if !is_note(note) {
            return 0;
        }
        self.sample_map[(note - NOTE_FIRST) as usize]
    }

    /// Whether this instrument drives an external MIDI channel
    pub fn is_midi(&self) -> bool {
        self.midi_channel_mask != 0
    }
}
