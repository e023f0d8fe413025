//! IT file header

use std::io::Cursor;

use nether_tracker::{
    ChannelFlags, ChannelSettings, MAX_CHANNELS, MAX_INSTRUMENTS, MAX_ORDERS, MAX_PATTERNS,
    MAX_SAMPLES, Song, SongFlags,
};

use crate::IT_MAGIC;
use crate::error::ItError;

use super::helpers::{read_array, read_string, read_u8, read_u16, read_u32};

/// Raw header fields, kept for the tracker-id heuristics
#[derive(Debug, Clone)]
pub(crate) struct ItHeader {
    pub title: [u8; 26],
    pub highlight_minor: u8,
    pub highlight_major: u8,
    pub ordnum: u16,
    pub insnum: u16,
    pub smpnum: u16,
    pub patnum: u16,
    /// Created-with tracker version
    pub cwtv: u16,
    /// Compatible-with version
    pub cmwt: u16,
    pub flags: u16,
    pub special: u16,
    pub gv: u8,
    pub mv: u8,
    pub is: u8,
    pub it: u8,
    pub sep: u8,
    pub pwd: u8,
    pub msg_length: u16,
    pub msg_offset: u32,
    pub reserved: u32,
    pub chan_pan: [u8; 64],
    pub chan_vol: [u8; 64],
}

impl ItHeader {
    /// Read and validate the fixed header
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, ItError> {
        let magic: [u8; 4] = read_array(cursor).map_err(|_| ItError::Unsupported)?;
        if &magic != IT_MAGIC {
            return Err(ItError::Unsupported);
        }

        let header = Self {
            title: read_array(cursor)?,
            highlight_minor: read_u8(cursor)?,
            highlight_major: read_u8(cursor)?,
            ordnum: read_u16(cursor)?,
            insnum: read_u16(cursor)?,
            smpnum: read_u16(cursor)?,
            patnum: read_u16(cursor)?,
            cwtv: read_u16(cursor)?,
            cmwt: read_u16(cursor)?,
            flags: read_u16(cursor)?,
            special: read_u16(cursor)?,
            gv: read_u8(cursor)?,
            mv: read_u8(cursor)?,
            is: read_u8(cursor)?,
            it: read_u8(cursor)?,
            sep: read_u8(cursor)?,
            pwd: read_u8(cursor)?,
            msg_length: read_u16(cursor)?,
            msg_offset: read_u32(cursor)?,
            reserved: read_u32(cursor)?,
            chan_pan: read_array(cursor)?,
            chan_vol: read_array(cursor)?,
        };

        if header.ordnum as usize > MAX_ORDERS {
            return Err(ItError::TooManyOrders(header.ordnum));
        }
        if header.insnum as usize > MAX_INSTRUMENTS {
            return Err(ItError::TooManyInstruments(header.insnum));
        }
        if header.smpnum as usize > MAX_SAMPLES {
            return Err(ItError::TooManySamples(header.smpnum));
        }
        if header.patnum as usize > MAX_PATTERNS {
            return Err(ItError::TooManyPatterns(header.patnum));
        }

        Ok(header)
    }

    /// Files older than 2.14 stored garbage where Zxx now lives
    pub fn ignores_zxx(&self) -> bool {
        self.cwtv < 0x0214
    }

    /// Copy header-level settings into the song
    pub fn apply(&self, song: &mut Song) {
        song.title = read_string(&self.title, 25);

        if self.cwtv >= 0x0213 {
            song.row_highlight_minor = self.highlight_minor;
            song.row_highlight_major = self.highlight_major;
        } else {
            song.row_highlight_minor = 4;
            song.row_highlight_major = 16;
        }

        let mut flags = SongFlags::empty();
        // Bit 1 (vol0 optimisations) is obsolete
        flags.set(SongFlags::NO_STEREO, self.flags & 1 == 0);
        flags.set(SongFlags::INSTRUMENT_MODE, self.flags & 4 != 0);
        flags.set(SongFlags::LINEAR_SLIDES, self.flags & 8 != 0);
        flags.set(SongFlags::OLD_EFFECTS, self.flags & 16 != 0);
        flags.set(SongFlags::COMPAT_GXX, self.flags & 32 != 0);
        if self.flags & 64 != 0 {
            flags.insert(SongFlags::MIDI_PITCHBEND);
            song.pitch_wheel_depth = self.pwd;
        }
        flags.set(SongFlags::EMBED_MIDI_CONFIG, self.flags & 128 != 0);
        song.flags = flags;

        song.initial_global_volume = self.gv.min(128);
        song.mixing_volume = self.mv.min(128);
        song.initial_speed = if self.is == 0 { 6 } else { self.is };
        song.initial_tempo = self.it.max(31);
        song.pan_separation = self.sep;

        for (n, channel) in song.channels.iter_mut().enumerate().take(MAX_CHANNELS) {
            *channel = channel_settings(self.chan_pan[n], self.chan_vol[n]);
        }
    }
}

/// Decode one entry of the channel pan/volume tables
fn channel_settings(raw_pan: u8, raw_vol: u8) -> ChannelSettings {
    let mut flags = ChannelFlags::empty();
    let mut pan = raw_pan;
    if pan & 128 != 0 {
        flags.insert(ChannelFlags::MUTE);
        pan &= !128;
    }
    let panning = if pan == 100 {
        flags.insert(ChannelFlags::SURROUND);
        32
    } else {
        pan.min(64)
    };
    ChannelSettings {
        panning: panning as u16 * 4,
        volume: raw_vol.min(64),
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_settings() {
        let c = channel_settings(32, 64);
        assert_eq!(c.panning, 128);
        assert!(!c.is_muted());

        let c = channel_settings(128 | 10, 70);
        assert!(c.is_muted());
        assert_eq!(c.panning, 40);
        assert_eq!(c.volume, 64);

        let c = channel_settings(100, 0);
        assert!(c.flags.contains(ChannelFlags::SURROUND));
        assert_eq!(c.panning, 128);

        let c = channel_settings(80, 0);
        assert_eq!(c.panning, 256);
    }
}
