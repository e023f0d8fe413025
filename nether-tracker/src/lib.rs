//! Nether-Tracker: in-memory song model for tracker modules
//!
//! Format decoders (see `nether-it`) build a [`Song`]; the playback engine
//! (`nether-player`) reads it tick by tick. The model is format-agnostic but
//! follows Impulse Tracker's conventions: 1-based sample and instrument slots,
//! 64 channels, order lists with skip/end markers and 0-256 volume/panning.
//!
//! ```text
//!   IT file ──load_it()──▶ Song ──▶ Player (per-tick effects, voices)
//!                            │
//!                            └────▶ estimate_length()
//! ```

mod effects;
mod flags;
mod instrument;
mod midi;
mod pattern;
mod sample;

#[cfg(test)]
mod tests;

pub use effects::{Effect, VolumeEffect};
pub use flags::{ChannelFlags, InstrumentFlags, SongFlags};
pub use instrument::{
    DuplicateCheckAction, DuplicateCheckType, Envelope, EnvelopeNode, Instrument, NewNoteAction,
};
pub use midi::{MACRO_LEN, MidiConfig};
pub use pattern::{
    NOTE_CUT, NOTE_FADE, NOTE_FIRST, NOTE_LAST, NOTE_MIDC, NOTE_NONE, NOTE_OFF, Note, Pattern,
    is_control, is_note, note_name,
};
pub use sample::{Sample, SampleData, VibratoType};

// =============================================================================
// Limits
// =============================================================================

pub const MAX_CHANNELS: usize = 64;
/// Foreground channels plus background (NNA) voices
pub const MAX_VOICES: usize = 256;
pub const MAX_ORDERS: usize = 256;
pub const MAX_PATTERNS: usize = 240;
pub const MAX_SAMPLES: usize = 240;
pub const MAX_INSTRUMENTS: usize = 240;
pub const MAX_ENVELOPE_POINTS: usize = 25;
pub const MAX_PATTERN_ROWS: usize = 200;
pub const MAX_SAMPLE_LENGTH: u32 = 16_000_000;
pub const MAX_MESSAGE: usize = 8000;

/// Order list entry that is stepped over
pub const ORDER_SKIP: u8 = 254;
/// Order list terminator
pub const ORDER_LAST: u8 = 255;

// =============================================================================
// Channel settings
// =============================================================================

/// Initial state of one of the 64 pattern channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// 0-256
    pub panning: u16,
    /// 0-64
    pub volume: u8,
    /// Only [`ChannelFlags::MUTE`] and [`ChannelFlags::SURROUND`] are meaningful here
    pub flags: ChannelFlags,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            panning: 128,
            volume: 64,
            flags: ChannelFlags::empty(),
        }
    }
}

impl ChannelSettings {
    pub fn is_muted(&self) -> bool {
        self.flags.contains(ChannelFlags::MUTE)
    }
}

// =============================================================================
// Song
// =============================================================================

/// A decoded module
#[derive(Debug, Clone)]
pub struct Song {
    pub title: String,
    pub flags: SongFlags,
    pub initial_speed: u8,
    pub initial_tempo: u8,
    /// 0-128
    pub initial_global_volume: u8,
    /// 0-128
    pub mixing_volume: u8,
    /// 0-128
    pub pan_separation: u8,
    /// MIDI pitch wheel depth, valid with [`SongFlags::MIDI_PITCHBEND`]
    pub pitch_wheel_depth: u8,
    pub row_highlight_minor: u8,
    pub row_highlight_major: u8,
    /// Pattern numbers, [`ORDER_SKIP`] and [`ORDER_LAST`] markers
    pub orderlist: Vec<u8>,
    /// Up to [`MAX_PATTERNS`] slots; `None` is an absent pattern
    pub patterns: Vec<Option<Pattern>>,
    /// Slot 0 is unused; slots 1..=240 are addressable
    pub samples: Vec<Sample>,
    /// Slot 0 is unused; `None` is an empty slot
    pub instruments: Vec<Option<Instrument>>,
    pub channels: [ChannelSettings; MAX_CHANNELS],
    /// Best-effort name of the tool that wrote the file
    pub tracker_id: String,
    pub message: String,
    pub midi_config: MidiConfig,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            title: String::new(),
            flags: SongFlags::empty(),
            initial_speed: 6,
            initial_tempo: 125,
            initial_global_volume: 128,
            mixing_volume: 48,
            pan_separation: 128,
            pitch_wheel_depth: 0,
            row_highlight_minor: 4,
            row_highlight_major: 16,
            orderlist: Vec::new(),
            patterns: Vec::new(),
            samples: vec![Sample::default(); MAX_SAMPLES + 1],
            instruments: vec![None; MAX_INSTRUMENTS + 1],
            channels: [ChannelSettings::default(); MAX_CHANNELS],
            tracker_id: String::new(),
            message: String::new(),
            midi_config: MidiConfig::default(),
        }
    }
}

impl Song {
    /// Order list entry, [`ORDER_LAST`] past the end
    pub fn order(&self, index: usize) -> u8 {
        self.orderlist.get(index).copied().unwrap_or(ORDER_LAST)
    }

    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)?.as_ref()
    }

    pub fn pattern_mut(&mut self, index: usize) -> Option<&mut Pattern> {
        self.patterns.get_mut(index)?.as_mut()
    }

    /// Row count of a pattern; absent patterns count as 64 rows
    pub fn pattern_rows(&self, index: usize) -> usize {
        self.pattern(index).map_or(64, Pattern::rows)
    }

    /// Sample slot `n` (1-based). Slot 0 and out-of-range return `None`.
    pub fn sample(&self, n: usize) -> Option<&Sample> {
        if n == 0 {
            return None;
        }
        self.samples.get(n)
    }

    /// Instrument slot `n` (1-based)
    pub fn instrument(&self, n: usize) -> Option<&Instrument> {
        if n == 0 {
            return None;
        }
        self.instruments.get(n)?.as_ref()
    }

    pub fn uses_instruments(&self) -> bool {
        self.flags.contains(SongFlags::INSTRUMENT_MODE)
    }

    pub fn uses_linear_slides(&self) -> bool {
        self.flags.contains(SongFlags::LINEAR_SLIDES)
    }

    pub fn uses_old_effects(&self) -> bool {
        self.flags.contains(SongFlags::OLD_EFFECTS)
    }

    pub fn uses_compat_gxx(&self) -> bool {
        self.flags.contains(SongFlags::COMPAT_GXX)
    }

    /// Number of orders before the first [`ORDER_LAST`]
    pub fn order_count(&self) -> usize {
        self.orderlist
            .iter()
            .position(|&o| o == ORDER_LAST)
            .unwrap_or(self.orderlist.len())
    }

    /// Highest sample slot holding anything
    pub fn sample_count(&self) -> usize {
        (1..self.samples.len())
            .rev()
            .find(|&n| {
                let s = &self.samples[n];
                s.length > 0 || !s.name.is_empty()
            })
            .unwrap_or(0)
    }

    pub fn instrument_count(&self) -> usize {
        (1..self.instruments.len())
            .rev()
            .find(|&n| self.instruments[n].is_some())
            .unwrap_or(0)
    }

    /// Number of allocated pattern slots (absent trailing slots excluded)
    pub fn pattern_count(&self) -> usize {
        self.patterns
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |n| n + 1)
    }
}
