//! IT file parser

use std::io::Cursor;

use nether_tracker::{MAX_MESSAGE, MidiConfig, Song, SongFlags};
use tracing::{debug, warn};

use crate::error::ItError;
use crate::tracker_id::{Fingerprint, identify};
use crate::LoadFlags;

mod header;
mod helpers;
mod instrument;
mod pattern;
mod sample;
#[cfg(test)]
mod tests;

pub(crate) use header::ItHeader;
use helpers::{read_array, read_u16, read_u32, read_vec, remaining, seek_to};
use instrument::load_instrument;
use pattern::load_pattern;
use sample::load_sample;

/// Decode an IT module.
///
/// Structural errors abort the decode; inconsistencies inside otherwise
/// readable data (pattern size mismatches, truncated sample data) are logged
/// and the best-effort result is kept.
pub fn load_it(data: &[u8], flags: LoadFlags) -> Result<Song, ItError> {
    let mut cursor = Cursor::new(data);
    let header = ItHeader::read(&mut cursor)?;
    let mut song = Song::default();
    header.apply(&mut song);

    debug!(
        title = %song.title,
        orders = header.ordnum,
        instruments = header.insnum,
        samples = header.smpnum,
        patterns = header.patnum,
        cwtv = format_args!("{:#06x}", header.cwtv),
        cmwt = format_args!("{:#06x}", header.cmwt),
        "IT header"
    );

    song.orderlist = read_vec(&mut cursor, header.ordnum as usize)?;
    let para_ins = read_parapointers(&mut cursor, header.insnum)?;
    let para_smp = read_parapointers(&mut cursor, header.smpnum)?;
    let para_pat = read_parapointers(&mut cursor, header.patnum)?;

    // Save history: some tools write garbage here, so a count that runs
    // past the end of the file is treated as zero.
    let mut history = read_u16(&mut cursor)?;
    let history_bytes = 8 * history as usize;
    if history_bytes >= remaining(&cursor) {
        history = 0;
        seek_to(&mut cursor, data.len() as u64)?;
    } else {
        let after_history = cursor.position() + history_bytes as u64;
        seek_to(&mut cursor, after_history)?;
        song.midi_config = read_midi_config(&mut cursor, song.flags);
    }

    let bero = history == 0 && {
        let modu: Result<[u8; 4], _> = read_array(&mut cursor);
        matches!(modu, Ok(m) if &m == b"MODU")
    };

    song.message = read_message(data, &header);

    if !flags.contains(LoadFlags::NO_SAMPLES) {
        for (n, &para) in para_ins.iter().enumerate() {
            if para == 0 {
                continue;
            }
            song.instruments[n + 1] = Some(load_instrument(&mut cursor, para, header.cmwt)?);
        }
        for (n, &para) in para_smp.iter().enumerate() {
            if para == 0 {
                continue;
            }
            song.samples[n + 1] = load_sample(&mut cursor, para)?;
        }
    }

    if !flags.contains(LoadFlags::NO_PATTERNS) {
        song.patterns = vec![None; header.patnum as usize];
        let mut discarded_zxx = 0;
        for (n, &para) in para_pat.iter().enumerate() {
            if para == 0 {
                continue;
            }
            let decoded = load_pattern(&mut cursor, n, para, header.ignores_zxx())?;
            discarded_zxx += decoded.discarded_zxx;
            song.patterns[n] = Some(decoded.pattern);
        }
        if discarded_zxx > 0 {
            warn!(
                count = discarded_zxx,
                "Zxx effects discarded (file version too old)"
            );
        }
    }

    let first_instrument_trkvers = para_ins
        .first()
        .filter(|&&p| p != 0)
        .and_then(|&p| {
            let at = p as usize + 0x1c;
            data.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
        });

    song.tracker_id = identify(&Fingerprint {
        header: &header,
        history,
        bero,
        first_instrument_trkvers,
    });
    debug!(tracker = %song.tracker_id, "identified");

    Ok(song)
}

fn read_parapointers(cursor: &mut Cursor<&[u8]>, count: u16) -> Result<Vec<u32>, ItError> {
    (0..count).map(|_| read_u32(cursor)).collect()
}

/// Embedded MIDI configuration, or the defaults when absent
fn read_midi_config(cursor: &mut Cursor<&[u8]>, flags: SongFlags) -> MidiConfig {
    if flags.contains(SongFlags::EMBED_MIDI_CONFIG) && remaining(cursor) >= MidiConfig::SIZE {
        if let Ok(raw) = read_vec(cursor, MidiConfig::SIZE) {
            if let Some(cfg) = MidiConfig::from_bytes(&raw) {
                return cfg;
            }
        }
    }
    MidiConfig::default()
}

/// Song message, when the header points at one inside the file
fn read_message(data: &[u8], header: &ItHeader) -> String {
    let offset = header.msg_offset as usize;
    let length = header.msg_length as usize;
    if header.special & 1 == 0 || length == 0 || offset + length >= data.len() {
        return String::new();
    }
    let length = length.min(MAX_MESSAGE);
    let raw = &data[offset..offset + length];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    // IT uses CR line breaks
    String::from_utf8_lossy(&raw[..end]).replace('\r', "\n")
}

/// Title and description without a full decode
pub fn read_info(data: &[u8]) -> Option<(String, &'static str)> {
    if data.len() <= 30 || &data[..4] != crate::IT_MAGIC {
        return None;
    }
    let description = if data.len() > 42 && data[42] >= 0x14 {
        "Compressed Impulse Tracker"
    } else {
        "Impulse Tracker"
    };
    Some((helpers::read_string(&data[4..30], 25), description))
}
