//! Sample header parsing and sample data loading

use std::io::Cursor;

use nether_tracker::{ChannelFlags, MAX_SAMPLE_LENGTH, Sample, SampleData, VibratoType};

use crate::error::ItError;
use crate::sample_data::{BitDepth, ChannelLayout, Encoding, SampleFormat, read_sample};

use super::helpers::{read_array, read_string, read_u8, read_u32, seek_to};

// Sample header flag bits
const FLAG_HAS_DATA: u8 = 1;
const FLAG_16BIT: u8 = 2;
const FLAG_STEREO: u8 = 4;
const FLAG_COMPRESSED: u8 = 8;
const FLAG_LOOP: u8 = 16;
const FLAG_SUSTAIN: u8 = 32;
const FLAG_PINGPONG: u8 = 64;
const FLAG_PINGPONG_SUSTAIN: u8 = 128;

// Convert flag bits
const CVT_SIGNED: u8 = 1;
const CVT_DELTA: u8 = 4;

/// Header fields needed to locate and decode the PCM data
struct DataInfo {
    flag: u8,
    cvt: u8,
    pointer: u32,
}

/// Parse the sample header at `offset` and, when present, its PCM data
pub(crate) fn load_sample(cursor: &mut Cursor<&[u8]>, offset: u32) -> Result<Sample, ItError> {
    seek_to(cursor, offset as u64)?;
    let (mut sample, info) = parse_sample_header(cursor)?;

    if info.flag & FLAG_HAS_DATA == 0 {
        sample.length = 0;
        return Ok(sample);
    }

    let format = sample_format(info.flag, info.cvt);
    if format.bits == BitDepth::Sixteen {
        sample.flags.insert(ChannelFlags::SIXTEEN_BIT);
    }
    if format.is_stereo() {
        sample.flags.insert(ChannelFlags::STEREO);
    }

    let data: &[u8] = cursor.get_ref();
    let start = (info.pointer as usize).min(data.len());
    let (pcm, _) = read_sample(&data[start..], sample.length as usize, format);
    sample.data = pcm;
    if sample.data.is_empty() {
        sample.data = SampleData::Empty;
    }

    Ok(sample)
}

/// Map header flag/convert bits to a reader format
fn sample_format(flag: u8, cvt: u8) -> SampleFormat {
    let bits = if flag & FLAG_16BIT != 0 {
        BitDepth::Sixteen
    } else {
        BitDepth::Eight
    };

    if flag & FLAG_COMPRESSED != 0 {
        return SampleFormat {
            bits,
            channels: ChannelLayout::Mono,
            encoding: if cvt & CVT_DELTA != 0 {
                Encoding::It215
            } else {
                Encoding::It214
            },
            big_endian: false,
        };
    }

    SampleFormat {
        bits,
        channels: if flag & FLAG_STEREO != 0 {
            ChannelLayout::SplitStereo
        } else {
            ChannelLayout::Mono
        },
        encoding: if cvt & CVT_DELTA != 0 {
            Encoding::Delta
        } else if cvt & CVT_SIGNED != 0 {
            Encoding::Signed
        } else {
            Encoding::Unsigned
        },
        big_endian: false,
    }
}

/// Parse the 80-byte "IMPS" header
fn parse_sample_header(cursor: &mut Cursor<&[u8]>) -> Result<(Sample, DataInfo), ItError> {
    let mut s = Sample::default();

    // The magic is not validated; IT loads whatever is stored here
    let _magic: [u8; 4] = read_array(cursor)?;
    let filename: [u8; 13] = read_array(cursor)?;
    s.filename = read_string(&filename, 12);

    let gvl = read_u8(cursor)?;
    let flag = read_u8(cursor)?;
    let vol = read_u8(cursor)?;
    let name: [u8; 26] = read_array(cursor)?;
    s.name = read_string(&name, 25);
    let cvt = read_u8(cursor)?;
    let mut dfp = read_u8(cursor)?;

    if dfp & 128 != 0 {
        s.flags.insert(ChannelFlags::PANNING);
        dfp &= 127;
    }

    s.global_volume = gvl.min(64);
    s.volume = vol.min(64) as u16 * 4;
    s.panning = dfp.min(64) as u16 * 4;
    s.length = read_u32(cursor)?.min(MAX_SAMPLE_LENGTH);
    s.loop_start = read_u32(cursor)?;
    s.loop_end = read_u32(cursor)?;
    s.c5speed = read_u32(cursor)?;
    s.sustain_start = read_u32(cursor)?;
    s.sustain_end = read_u32(cursor)?;
    let pointer = read_u32(cursor)?;

    s.vib_speed = read_u8(cursor)?;
    s.vib_depth = read_u8(cursor)? & 0x7f;
    s.vib_rate = read_u8(cursor)?;
    s.vib_type = VibratoType::from_u8(read_u8(cursor)? % 4);

    if flag & FLAG_LOOP != 0 {
        s.flags.insert(ChannelFlags::LOOP);
    }
    if flag & FLAG_SUSTAIN != 0 {
        s.flags.insert(ChannelFlags::SUSTAIN_LOOP);
    }
    if flag & FLAG_PINGPONG != 0 {
        s.flags.insert(ChannelFlags::PINGPONG_LOOP);
    }
    if flag & FLAG_PINGPONG_SUSTAIN != 0 {
        s.flags.insert(ChannelFlags::PINGPONG_SUSTAIN);
    }

    Ok((s, DataInfo { flag, cvt, pointer }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_selection() {
        let f = sample_format(FLAG_HAS_DATA | FLAG_COMPRESSED | FLAG_16BIT, CVT_DELTA);
        assert_eq!(f.encoding, Encoding::It215);
        assert_eq!(f.bits, BitDepth::Sixteen);
        assert_eq!(f.channels, ChannelLayout::Mono);

        let f = sample_format(FLAG_HAS_DATA | FLAG_STEREO, CVT_SIGNED);
        assert_eq!(f.encoding, Encoding::Signed);
        assert_eq!(f.channels, ChannelLayout::SplitStereo);

        let f = sample_format(FLAG_HAS_DATA, 0);
        assert_eq!(f.encoding, Encoding::Unsigned);
        assert_eq!(f.bits, BitDepth::Eight);
    }
}
