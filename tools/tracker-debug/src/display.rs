//! Plain-text rendering of pattern cells and engine state

use nether_player::{Position, Voice};
use nether_tracker::{Effect, Note, VolumeEffect, note_name};

/// One pattern cell in tracker notation, e.g. `C-5 01 v64 D05`
pub fn format_cell(note: &Note) -> String {
    let instrument = if note.instrument == 0 {
        "..".to_string()
    } else {
        format!("{:02}", note.instrument)
    };
    let effect = if note.effect == Effect::None {
        "...".to_string()
    } else {
        format!("{}{:02X}", note.effect.letter(), note.param)
    };
    format!(
        "{} {} {} {}",
        note_name(note.note),
        instrument,
        format_volume(note.vol_effect, note.vol_param),
        effect
    )
}

/// Volume column in Impulse Tracker's letter notation
pub fn format_volume(effect: VolumeEffect, param: u8) -> String {
    let letter = match effect {
        VolumeEffect::None => return "...".to_string(),
        VolumeEffect::Volume => 'v',
        VolumeEffect::Panning => 'p',
        VolumeEffect::FineVolUp => 'a',
        VolumeEffect::FineVolDown => 'b',
        VolumeEffect::VolSlideUp => 'c',
        VolumeEffect::VolSlideDown => 'd',
        VolumeEffect::PortaDown => 'e',
        VolumeEffect::PortaUp => 'f',
        VolumeEffect::TonePorta => 'g',
        VolumeEffect::VibratoDepth => 'h',
        VolumeEffect::VibratoSpeed => 'u',
        VolumeEffect::PanSlideLeft => 'l',
        VolumeEffect::PanSlideRight => 'r',
    };
    format!("{}{:02}", letter, param)
}

/// `m:ss`
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Row cursor, e.g. `003/012 17.2`
pub fn format_position(pos: &Position) -> String {
    format!(
        "{:03}/{:03} {:02}.{}",
        pos.order, pos.pattern, pos.row, pos.tick
    )
}

/// Short summary of a sounding voice
pub fn format_voice(index: usize, voice: &Voice) -> String {
    let owner = match voice.master_channel {
        0 => "   ".to_string(),
        ch => format!("<{:02}", ch),
    };
    format!(
        "#{:03}{} s{:03} {} vol {:3} pan {:3} {:6} Hz",
        index,
        owner,
        voice.sample,
        note_name(voice.note),
        voice.final_volume,
        voice.final_panning,
        voice.frequency
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_tracker::NOTE_MIDC;

    #[test]
    fn test_format_cell() {
        let note = Note {
            note: NOTE_MIDC,
            instrument: 1,
            vol_effect: VolumeEffect::Volume,
            vol_param: 64,
            effect: Effect::VolumeSlide,
            param: 0x05,
        };
        assert_eq!(format_cell(&note), "C-5 01 v64 D05");
        assert_eq!(format_cell(&Note::default()), "... .. ... ...");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(185), "3:05");
    }

    #[test]
    fn test_format_position() {
        let pos = Position {
            order: 3,
            pattern: 12,
            row: 17,
            tick: 2,
        };
        assert_eq!(format_position(&pos), "003/012 17.2");
    }
}
