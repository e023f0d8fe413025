//! Instrument and envelope parsing
//!
//! Two on-disk layouts exist: the pre-2.00 one (selected when the header's
//! compatible-with version is below 0x200) with a single volume envelope, and
//! the current one with volume, panning and pitch envelopes.

use std::io::Cursor;

use nether_tracker::{
    DuplicateCheckAction, DuplicateCheckType, Envelope, EnvelopeNode, Instrument, InstrumentFlags,
    MAX_ENVELOPE_POINTS, NOTE_FIRST, NOTE_MIDC, NewNoteAction,
};

use crate::error::ItError;

use super::helpers::{read_array, read_i8, read_string, read_u8, read_u16, seek_to};

/// Parse the instrument at `offset`
pub(crate) fn load_instrument(
    cursor: &mut Cursor<&[u8]>,
    offset: u32,
    compatible_with: u16,
) -> Result<Instrument, ItError> {
    seek_to(cursor, offset as u64)?;
    if compatible_with >= 0x0200 {
        parse_instrument(cursor)
    } else {
        parse_instrument_old(cursor)
    }
}

/// Read the 120-entry keyboard table into the instrument
fn read_keyboard(cursor: &mut Cursor<&[u8]>, instrument: &mut Instrument) -> Result<(), ItError> {
    for n in 0..120 {
        let note = read_u8(cursor)?;
        let sample = read_u8(cursor)?;
        instrument.set_keyboard(n, note, sample);
    }
    Ok(())
}

/// Current (2.00+) instrument layout
fn parse_instrument(cursor: &mut Cursor<&[u8]>) -> Result<Instrument, ItError> {
    let mut ins = Instrument::default();

    // "IMPI" is not checked; IT itself loads whatever is there
    let _magic: [u8; 4] = read_array(cursor)?;
    let filename: [u8; 13] = read_array(cursor)?;
    ins.filename = read_string(&filename, 12);

    ins.nna = NewNoteAction::from_u8(read_u8(cursor)?);
    ins.dct = DuplicateCheckType::from_u8(read_u8(cursor)?);
    ins.dca = DuplicateCheckAction::from_u8(read_u8(cursor)?);
    ins.fadeout = (read_u16(cursor)? as u32) << 5;
    ins.pitch_pan_separation = read_i8(cursor)?.clamp(-32, 32);
    ins.pitch_pan_center = read_u8(cursor)?.min(119);
    ins.global_volume = read_u8(cursor)?.min(128);

    let dfp = read_u8(cursor)?;
    ins.panning = (dfp & 127).min(64) as u16 * 4;
    if dfp & 128 == 0 {
        ins.flags.insert(InstrumentFlags::SET_PANNING);
    }

    ins.vol_swing = read_u8(cursor)?.min(100);
    ins.pan_swing = read_u8(cursor)?.min(64);

    // Tracker version and sample count only matter for instrument files
    let _trkvers = read_u16(cursor)?;
    let _num_samples = read_u8(cursor)?;
    let _pad = read_u8(cursor)?;

    let name: [u8; 26] = read_array(cursor)?;
    ins.name = read_string(&name, 25);

    ins.ifc = read_u8(cursor)?;
    ins.ifr = read_u8(cursor)?;

    let mch = read_u8(cursor)?;
    ins.midi_channel_mask = match mch {
        0 => 0,
        1..=16 => 1 << (mch - 1),
        _ => 0x10000 + mch as u32,
    };
    ins.midi_program = read_u8(cursor)?;
    ins.midi_bank = read_u16(cursor)?;

    read_keyboard(cursor, &mut ins)?;

    let (env, flags) = parse_envelope(cursor, EnvelopeKind::Volume)?;
    ins.vol_env = env;
    ins.flags |= flags;
    let (env, flags) = parse_envelope(cursor, EnvelopeKind::Panning)?;
    ins.pan_env = env;
    ins.flags |= flags;
    let (env, flags) = parse_envelope(cursor, EnvelopeKind::Pitch)?;
    ins.pitch_env = env;
    ins.flags |= flags;

    Ok(ins)
}

/// Pre-2.00 instrument layout
fn parse_instrument_old(cursor: &mut Cursor<&[u8]>) -> Result<Instrument, ItError> {
    let mut ins = Instrument::default();

    let _magic: [u8; 4] = read_array(cursor)?;
    let filename: [u8; 13] = read_array(cursor)?;
    ins.filename = read_string(&filename, 12);

    let flg = read_u8(cursor)?;
    let vls = read_u8(cursor)?;
    let vle = read_u8(cursor)?;
    let sls = read_u8(cursor)?;
    let sle = read_u8(cursor)?;
    let _reserved: [u8; 2] = read_array(cursor)?;
    let fadeout = read_u16(cursor)?;
    let nna = read_u8(cursor)?;
    let dnc = read_u8(cursor)?;
    let _trkvers = read_u16(cursor)?;
    let _num_samples = read_u8(cursor)?;
    let _pad = read_u8(cursor)?;
    let name: [u8; 26] = read_array(cursor)?;
    ins.name = read_string(&name, 25);
    let _reserved: [u8; 6] = read_array(cursor)?;

    ins.nna = NewNoteAction::from_u8(nna);
    if dnc != 0 {
        ins.dct = DuplicateCheckType::Note;
        ins.dca = DuplicateCheckAction::Cut;
    }
    ins.fadeout = (fadeout as u32) << 6;
    ins.pitch_pan_separation = 0;
    ins.pitch_pan_center = NOTE_MIDC - NOTE_FIRST;
    ins.global_volume = 128;
    ins.panning = 32 * 4;

    read_keyboard(cursor, &mut ins)?;

    if flg & 1 != 0 {
        ins.flags.insert(InstrumentFlags::VOLUME);
    }
    if flg & 2 != 0 {
        ins.flags.insert(InstrumentFlags::VOL_LOOP);
    }
    if flg & 4 != 0 {
        ins.flags.insert(InstrumentFlags::VOL_SUSTAIN);
    }

    // The 200-byte sampled envelope is ignored; the node list is what plays
    let _sampled_envelope: [u8; 200] = read_array(cursor)?;
    let points: [u8; 50] = read_array(cursor)?;
    let nodes = points
        .chunks_exact(2)
        .take_while(|pair| pair[0] != 0xff)
        .map(|pair| EnvelopeNode {
            tick: pair[0] as u16,
            value: pair[1],
        })
        .collect();

    ins.vol_env = Envelope {
        nodes,
        loop_start: vls as usize,
        loop_end: vle as usize,
        sustain_start: sls as usize,
        sustain_end: sle as usize,
    };
    ins.vol_env.normalize();

    Ok(ins)
}

// =============================================================================
// Envelopes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvelopeKind {
    Volume,
    Panning,
    Pitch,
}

impl EnvelopeKind {
    /// enabled, loop, sustain, carry
    fn flags(self) -> [InstrumentFlags; 4] {
        match self {
            Self::Volume => [
                InstrumentFlags::VOLUME,
                InstrumentFlags::VOL_LOOP,
                InstrumentFlags::VOL_SUSTAIN,
                InstrumentFlags::VOL_CARRY,
            ],
            Self::Panning => [
                InstrumentFlags::PANNING,
                InstrumentFlags::PAN_LOOP,
                InstrumentFlags::PAN_SUSTAIN,
                InstrumentFlags::PAN_CARRY,
            ],
            Self::Pitch => [
                InstrumentFlags::PITCH,
                InstrumentFlags::PITCH_LOOP,
                InstrumentFlags::PITCH_SUSTAIN,
                InstrumentFlags::PITCH_CARRY,
            ],
        }
    }

    /// Pan and pitch values are stored signed around zero
    fn value_offset(self) -> i32 {
        match self {
            Self::Volume => 0,
            Self::Panning | Self::Pitch => 32,
        }
    }
}

/// Parse one 82-byte envelope block
fn parse_envelope(
    cursor: &mut Cursor<&[u8]>,
    kind: EnvelopeKind,
) -> Result<(Envelope, InstrumentFlags), ItError> {
    let raw_flags = read_u8(cursor)?;
    let num_nodes = (read_u8(cursor)? as usize).clamp(2, MAX_ENVELOPE_POINTS);
    let loop_start = read_u8(cursor)? as usize;
    let loop_end = read_u8(cursor)? as usize;
    let sustain_start = read_u8(cursor)? as usize;
    let sustain_end = read_u8(cursor)? as usize;

    let mut nodes = Vec::with_capacity(num_nodes);
    for n in 0..MAX_ENVELOPE_POINTS {
        let value = read_i8(cursor)? as i32 + kind.value_offset();
        let tick = read_u16(cursor)?;
        if n < num_nodes {
            nodes.push(EnvelopeNode {
                tick,
                value: value.clamp(0, 64) as u8,
            });
        }
    }
    let _pad = read_u8(cursor)?;

    let mut env = Envelope {
        nodes,
        loop_start,
        loop_end,
        sustain_start,
        sustain_end,
    };
    env.normalize();

    let mut flags = InstrumentFlags::empty();
    for (bit, flag) in kind.flags().into_iter().enumerate() {
        if raw_flags & (1 << bit) != 0 {
            flags.insert(flag);
        }
    }
    if kind == EnvelopeKind::Pitch && raw_flags & 0x80 != 0 {
        flags.insert(InstrumentFlags::FILTER);
    }

    Ok((env, flags))
}
