//! Packed pattern decoding

use std::io::Cursor;

use nether_tracker::{
    Effect, MAX_CHANNELS, NOTE_CUT, NOTE_FADE, NOTE_FIRST, NOTE_OFF, Note, Pattern, VolumeEffect,
};
use tracing::warn;

use crate::error::ItError;

use super::helpers::{read_u8, read_u16, seek_to};

// Mask variable bits
const MASK_NOTE: u8 = 1;
const MASK_INSTRUMENT: u8 = 2;
const MASK_VOLUME: u8 = 4;
const MASK_EFFECT: u8 = 8;
const MASK_SAME_NOTE: u8 = 16;
const MASK_SAME_INSTRUMENT: u8 = 32;
const MASK_SAME_VOLUME: u8 = 64;
const MASK_SAME_EFFECT: u8 = 128;

/// Per-channel "last seen" state for one pattern.
///
/// Holds the last mask byte and the last explicitly decoded value of every
/// field, so the `SAME_*` bits and mask reuse can refer back to them.
pub(crate) struct RowCache {
    masks: [u8; MAX_CHANNELS],
    last: [Note; MAX_CHANNELS],
}

impl RowCache {
    pub fn new() -> Self {
        Self {
            masks: [0; MAX_CHANNELS],
            last: [Note::default(); MAX_CHANNELS],
        }
    }
}

/// Result of decoding one pattern
pub(crate) struct DecodedPattern {
    pub pattern: Pattern,
    /// Zxx effects replaced with nothing
    pub discarded_zxx: usize,
}

/// Decode one pattern at `offset`: an 8-byte header (packed length, rows,
/// 4 reserved) followed by the packed stream.
pub(crate) fn load_pattern(
    cursor: &mut Cursor<&[u8]>,
    index: usize,
    offset: u32,
    ignore_zxx: bool,
) -> Result<DecodedPattern, ItError> {
    seek_to(cursor, offset as u64)?;
    let packed_length = read_u16(cursor)?;
    let rows = read_u16(cursor)?;
    let _reserved = read_u16(cursor)?;
    let _reserved = read_u16(cursor)?;

    let mut pattern = Pattern::new(rows as usize);
    let mut cache = RowCache::new();
    let discarded_zxx = decode_rows(cursor, &mut pattern, &mut cache, ignore_zxx);

    let got = cursor.position().saturating_sub(offset as u64 + 8);
    if got != packed_length as u64 {
        warn!(
            pattern = index,
            expected = packed_length,
            got,
            "pattern size mismatch"
        );
    }

    Ok(DecodedPattern {
        pattern,
        discarded_zxx,
    })
}

/// Unpack rows until the pattern is full. A truncated stream leaves the
/// remaining rows empty.
pub(crate) fn decode_rows(
    cursor: &mut Cursor<&[u8]>,
    pattern: &mut Pattern,
    cache: &mut RowCache,
    ignore_zxx: bool,
) -> usize {
    let mut zxx = 0;
    let mut row = 0;
    while row < pattern.rows() {
        let Ok(chanvar) = read_u8(cursor) else {
            warn!(row, "pattern data truncated");
            break;
        };
        if chanvar == 0 {
            row += 1;
            continue;
        }
        match decode_channel(cursor, chanvar, pattern, row, cache, ignore_zxx) {
            Ok(discarded) => zxx += discarded as usize,
            Err(_) => {
                warn!(row, "pattern data truncated");
                break;
            }
        }
    }
    zxx
}

fn decode_channel(
    cursor: &mut Cursor<&[u8]>,
    chanvar: u8,
    pattern: &mut Pattern,
    row: usize,
    cache: &mut RowCache,
    ignore_zxx: bool,
) -> Result<bool, ItError> {
    let chan = (chanvar.wrapping_sub(1) & 63) as usize;
    let mask = if chanvar & 128 != 0 {
        let m = read_u8(cursor)?;
        cache.masks[chan] = m;
        m
    } else {
        cache.masks[chan]
    };

    let mut note = pattern.note(row, chan).copied().unwrap_or_default();
    let last = &mut cache.last[chan];
    let mut discarded = false;

    if mask & MASK_NOTE != 0 {
        note.note = import_note(read_u8(cursor)?);
        last.note = note.note;
    }
    if mask & MASK_INSTRUMENT != 0 {
        note.instrument = read_u8(cursor)?;
        last.instrument = note.instrument;
    }
    if mask & MASK_VOLUME != 0 {
        if let Some((effect, param)) = import_volume(read_u8(cursor)?) {
            note.vol_effect = effect;
            note.vol_param = param;
        }
        last.vol_effect = note.vol_effect;
        last.vol_param = note.vol_param;
    }
    if mask & MASK_EFFECT != 0 {
        note.effect = Effect::from_it_command(read_u8(cursor)?);
        note.param = read_u8(cursor)?;
        if ignore_zxx && note.effect == Effect::Midi {
            note.effect = Effect::None;
            discarded = true;
        }
        last.effect = note.effect;
        last.param = note.param;
    }

    if mask & MASK_SAME_NOTE != 0 {
        note.note = last.note;
    }
    if mask & MASK_SAME_INSTRUMENT != 0 {
        note.instrument = last.instrument;
    }
    if mask & MASK_SAME_VOLUME != 0 {
        note.vol_effect = last.vol_effect;
        note.vol_param = last.vol_param;
    }
    if mask & MASK_SAME_EFFECT != 0 {
        note.effect = last.effect;
        note.param = last.param;
    }

    if let Some(cell) = pattern.note_mut(row, chan) {
        *cell = note;
    }
    Ok(discarded)
}

/// Raw note byte to model note value
fn import_note(raw: u8) -> u8 {
    match raw {
        255 => NOTE_OFF,
        254 => NOTE_CUT,
        // 253 is IT's internal blank; treated like other out-of-range values
        120.. => NOTE_FADE,
        n => n + NOTE_FIRST,
    }
}

/// Volume column byte ranges: (first, last, effect). The parameter is the
/// byte minus `first`.
const VOLUME_RANGES: [(u8, u8, VolumeEffect); 10] = [
    (0, 64, VolumeEffect::Volume),
    (128, 192, VolumeEffect::Panning),
    (65, 74, VolumeEffect::FineVolUp),
    (75, 84, VolumeEffect::FineVolDown),
    (85, 94, VolumeEffect::VolSlideUp),
    (95, 104, VolumeEffect::VolSlideDown),
    (105, 114, VolumeEffect::PortaDown),
    (115, 124, VolumeEffect::PortaUp),
    (193, 202, VolumeEffect::TonePorta),
    (203, 212, VolumeEffect::VibratoDepth),
];

/// Demultiplex a volume column byte; `None` for unused ranges
pub(crate) fn import_volume(raw: u8) -> Option<(VolumeEffect, u8)> {
    VOLUME_RANGES
        .iter()
        .find(|(first, last, _)| (*first..=*last).contains(&raw))
        .map(|&(first, _, effect)| (effect, raw - first))
}
