//! Generic PCM sample reader
//!
//! Converts raw sample bytes into [`SampleData`] according to a
//! [`SampleFormat`] describing bit depth, channel layout, encoding and
//! endianness.

use nether_tracker::SampleData;
use tracing::warn;

use crate::compression::{decompress_16bit, decompress_8bit};

/// How a sample's bytes are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub bits: BitDepth,
    pub channels: ChannelLayout,
    pub encoding: Encoding,
    pub big_endian: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    /// Whole left channel followed by the whole right channel
    SplitStereo,
    /// L/R pairs
    InterleavedStereo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Signed,
    Unsigned,
    /// Each value is a delta from the previous one
    Delta,
    It214,
    It215,
}

impl SampleFormat {
    pub fn is_stereo(&self) -> bool {
        self.channels != ChannelLayout::Mono
    }
}

/// Decode `frames` frames from `data`. Missing data is zero-filled.
///
/// Returns the decoded data and the number of bytes consumed.
pub fn read_sample(data: &[u8], frames: usize, format: SampleFormat) -> (SampleData, usize) {
    let channels = if format.is_stereo() { 2 } else { 1 };

    match format.encoding {
        Encoding::It214 | Encoding::It215 => {
            let it215 = format.encoding == Encoding::It215;
            let mut used = 0;
            match format.bits {
                BitDepth::Eight => {
                    let mut planes = Vec::with_capacity(channels);
                    for _ in 0..channels {
                        let (plane, n) = decompress_8bit(&data[used.min(data.len())..], frames, it215);
                        used += n;
                        planes.push(plane);
                    }
                    (SampleData::Pcm8(interleave(planes)), used)
                }
                BitDepth::Sixteen => {
                    let mut planes = Vec::with_capacity(channels);
                    for _ in 0..channels {
                        let (plane, n) =
                            decompress_16bit(&data[used.min(data.len())..], frames, it215);
                        used += n;
                        planes.push(plane);
                    }
                    (SampleData::Pcm16(interleave(planes)), used)
                }
            }
        }
        _ => read_pcm(data, frames, channels, format),
    }
}

fn read_pcm(
    data: &[u8],
    frames: usize,
    channels: usize,
    format: SampleFormat,
) -> (SampleData, usize) {
    let width = match format.bits {
        BitDepth::Eight => 1,
        BitDepth::Sixteen => 2,
    };
    let values = frames * channels;
    let wanted = values * width;
    if data.len() < wanted {
        warn!(
            expected = wanted,
            got = data.len(),
            "sample data truncated, zero-filling"
        );
    }
    let available = data.len().min(wanted) / width;

    // Raw values as i32 in file order
    let mut raw: Vec<i32> = (0..available)
        .map(|i| match format.bits {
            BitDepth::Eight => data[i] as i32,
            BitDepth::Sixteen => {
                let pair = [data[i * 2], data[i * 2 + 1]];
                if format.big_endian {
                    u16::from_be_bytes(pair) as i32
                } else {
                    u16::from_le_bytes(pair) as i32
                }
            }
        })
        .collect();
    raw.resize(values, 0);

    let bits = width as u32 * 8;
    let sign_bit = 1i32 << (bits - 1);
    let full = 1i32 << bits;
    let to_signed = |v: i32| if v >= sign_bit { v - full } else { v };

    // Split stereo is decoded per plane so delta runs restart per channel
    let plane_len = if format.channels == ChannelLayout::SplitStereo {
        frames
    } else {
        values
    };
    for plane in raw.chunks_mut(plane_len.max(1)) {
        let mut acc = 0i32;
        for v in plane.iter_mut() {
            *v = match format.encoding {
                Encoding::Unsigned => to_signed(*v ^ sign_bit),
                Encoding::Delta => {
                    acc = to_signed((acc + *v) & (full - 1));
                    acc
                }
                _ => to_signed(*v),
            };
        }
    }

    let ordered = if format.channels == ChannelLayout::SplitStereo {
        let right = raw.split_off(frames);
        interleave(vec![raw, right])
    } else {
        raw
    };

    let out = match format.bits {
        BitDepth::Eight => SampleData::Pcm8(ordered.into_iter().map(|v| v as i8).collect()),
        BitDepth::Sixteen => SampleData::Pcm16(ordered.into_iter().map(|v| v as i16).collect()),
    };
    (out, data.len().min(wanted))
}

/// Interleave per-channel planes into frames
fn interleave<T: Copy>(mut planes: Vec<Vec<T>>) -> Vec<T> {
    if planes.len() == 1 {
        return planes.pop().unwrap_or_default();
    }
    let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * planes.len());
    for i in 0..frames {
        for plane in &planes {
            out.push(plane[i]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(bits: BitDepth, channels: ChannelLayout, encoding: Encoding) -> SampleFormat {
        SampleFormat {
            bits,
            channels,
            encoding,
            big_endian: false,
        }
    }

    #[test]
    fn test_unsigned_8bit() {
        let (data, used) = read_sample(
            &[0x80, 0xFF, 0x00],
            3,
            fmt(BitDepth::Eight, ChannelLayout::Mono, Encoding::Unsigned),
        );
        assert_eq!(used, 3);
        assert_eq!(data, SampleData::Pcm8(vec![0, 127, -128]));
    }

    #[test]
    fn test_delta_8bit() {
        let (data, _) = read_sample(
            &[10, 5, 0xFB],
            3,
            fmt(BitDepth::Eight, ChannelLayout::Mono, Encoding::Delta),
        );
        assert_eq!(data, SampleData::Pcm8(vec![10, 15, 10]));
    }

    #[test]
    fn test_signed_16bit_split_stereo() {
        let bytes: Vec<u8> = [1i16, 2, -1, -2]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let (data, used) = read_sample(
            &bytes,
            2,
            fmt(BitDepth::Sixteen, ChannelLayout::SplitStereo, Encoding::Signed),
        );
        assert_eq!(used, 8);
        assert_eq!(data, SampleData::Pcm16(vec![1, -1, 2, -2]));
    }

    #[test]
    fn test_truncated_zero_fill() {
        let (data, used) = read_sample(
            &[5],
            4,
            fmt(BitDepth::Eight, ChannelLayout::Mono, Encoding::Signed),
        );
        assert_eq!(used, 1);
        assert_eq!(data, SampleData::Pcm8(vec![5, 0, 0, 0]));
    }
}
