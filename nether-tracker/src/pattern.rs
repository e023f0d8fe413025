//! Pattern and note data structures

use crate::effects::{Effect, VolumeEffect};
use crate::{MAX_CHANNELS, MAX_PATTERN_ROWS};

// =============================================================================
// Note values
// =============================================================================

/// Empty note cell
pub const NOTE_NONE: u8 = 0;
/// C-0
pub const NOTE_FIRST: u8 = 1;
/// B-9
pub const NOTE_LAST: u8 = 120;
/// C-5
pub const NOTE_MIDC: u8 = 61;
pub const NOTE_FADE: u8 = 253;
pub const NOTE_CUT: u8 = 254;
pub const NOTE_OFF: u8 = 255;

/// True for a playable note (C-0..B-9)
pub const fn is_note(note: u8) -> bool {
    note >= NOTE_FIRST && note <= NOTE_LAST
}

/// True for note-off / note-cut / note-fade
pub const fn is_control(note: u8) -> bool {
    note > NOTE_LAST
}

/// Format a note value as a tracker would display it
pub fn note_name(note: u8) -> String {
    const NAMES: [&str; 12] = [
        "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
    ];
    match note {
        NOTE_NONE => "...".to_string(),
        NOTE_OFF => "===".to_string(),
        NOTE_CUT => "^^^".to_string(),
        NOTE_FADE => "~~~".to_string(),
        n if is_note(n) => {
            let n = n - NOTE_FIRST;
            format!("{}{}", NAMES[(n % 12) as usize], n / 12)
        }
        _ => "???".to_string(),
    }
}

// =============================================================================
// Note cell
// =============================================================================

/// Single cell of a pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Note {
    /// Note value, see the `NOTE_*` constants
    pub note: u8,
    /// Instrument (or sample, outside instrument mode), 1-based; 0 = none
    pub instrument: u8,
    pub vol_effect: VolumeEffect,
    pub vol_param: u8,
    pub effect: Effect,
    pub param: u8,
}

impl Note {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_note(&self) -> bool {
        is_note(self.note)
    }

    pub fn has_instrument(&self) -> bool {
        self.instrument > 0
    }
}

// =============================================================================
// Pattern
// =============================================================================

/// A rows x 64 grid of note cells
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    rows: usize,
    /// Row-major, one stride of [`MAX_CHANNELS`] cells per row
    notes: Vec<Note>,
}

impl Pattern {
    /// Create an empty pattern. The row count is clamped to 1..=200.
    pub fn new(rows: usize) -> Self {
        let rows = rows.clamp(1, MAX_PATTERN_ROWS);
        Self {
            rows,
            notes: vec![Note::default(); rows * MAX_CHANNELS],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell at `row`, `channel`; `None` when out of range
    pub fn note(&self, row: usize, channel: usize) -> Option<&Note> {
        if row >= self.rows || channel >= MAX_CHANNELS {
            return None;
        }
        self.notes.get(row * MAX_CHANNELS + channel)
    }

    pub fn note_mut(&mut self, row: usize, channel: usize) -> Option<&mut Note> {
        if row >= self.rows || channel >= MAX_CHANNELS {
            return None;
        }
        self.notes.get_mut(row * MAX_CHANNELS + channel)
    }

    /// All 64 cells of a row
    pub fn row(&self, row: usize) -> &[Note] {
        if row >= self.rows {
            return &[];
        }
        &self.notes[row * MAX_CHANNELS..(row + 1) * MAX_CHANNELS]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [Note] {
        if row >= self.rows {
            return &mut [];
        }
        &mut self.notes[row * MAX_CHANNELS..(row + 1) * MAX_CHANNELS]
    }

    /// Highest channel index (plus one) holding any data
    pub fn used_channels(&self) -> usize {
        (0..MAX_CHANNELS)
            .rev()
            .find(|&c| (0..self.rows).any(|r| !self.notes[r * MAX_CHANNELS + c].is_empty()))
            .map_or(0, |c| c + 1)
    }
}
