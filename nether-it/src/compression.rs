//! IT 2.14 / 2.15 sample decompression
//!
//! Compressed samples are a sequence of blocks. Each block starts with a
//! little-endian u16 byte count followed by a bit stream (LSB first) of
//! variable-width deltas. 8-bit data uses 0x8000-frame blocks starting at
//! 9 bits, 16-bit data uses 0x4000-frame blocks starting at 17 bits.
//! IT 2.15 integrates twice, IT 2.14 once.

use tracing::warn;

/// Bit-width parameters for one sample depth
struct Depth {
    block_frames: usize,
    /// Starting (and maximum) width
    max_width: u32,
    /// Bits read for a short-form width change
    width_bits: u32,
    /// Output width in bits
    out_bits: u32,
    /// Size of the mid-form width-change window
    span: u32,
}

const DEPTH_8: Depth = Depth {
    block_frames: 0x8000,
    max_width: 9,
    width_bits: 3,
    out_bits: 8,
    span: 8,
};

const DEPTH_16: Depth = Depth {
    block_frames: 0x4000,
    max_width: 17,
    width_bits: 4,
    out_bits: 16,
    span: 16,
};

/// Decompress 8-bit data. Returns the samples and the number of input bytes used.
pub fn decompress_8bit(data: &[u8], frames: usize, it215: bool) -> (Vec<i8>, usize) {
    let (out, used) = decompress(data, frames, it215, &DEPTH_8);
    (out.into_iter().map(|v| v as i8).collect(), used)
}

/// Decompress 16-bit data. Returns the samples and the number of input bytes used.
pub fn decompress_16bit(data: &[u8], frames: usize, it215: bool) -> (Vec<i16>, usize) {
    let (out, used) = decompress(data, frames, it215, &DEPTH_16);
    (out.into_iter().map(|v| v as i16).collect(), used)
}

fn decompress(data: &[u8], frames: usize, it215: bool, depth: &Depth) -> (Vec<i32>, usize) {
    let mut output = Vec::with_capacity(frames);
    let mut pos = 0usize;

    while output.len() < frames {
        if pos + 2 > data.len() {
            warn!(
                missing = frames - output.len(),
                "compressed sample truncated, zero-filling"
            );
            break;
        }
        let block_bytes = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
        pos += 2;
        let end = (pos + block_bytes).min(data.len());
        let block = &data[pos..end];
        pos = end;

        let frames_in_block = (frames - output.len()).min(depth.block_frames);
        decompress_block(block, frames_in_block, it215, depth, &mut output);
    }

    output.resize(frames, 0);
    (output, pos)
}

fn decompress_block(
    block: &[u8],
    frames: usize,
    it215: bool,
    depth: &Depth,
    output: &mut Vec<i32>,
) {
    let mut reader = BitReader::new(block);
    let mut width = depth.max_width;
    let mut d1: i32 = 0;
    let mut d2: i32 = 0;
    let mut produced = 0;
    let out_mask = (1u32 << depth.out_bits) - 1;

    while produced < frames {
        let Some(mut value) = reader.read_bits(width) else {
            break;
        };

        if width == 0 || width > depth.max_width {
            warn!(width, "invalid bit width in compressed sample");
            break;
        } else if width < 7 {
            // Short form: the value 1 << (width - 1) announces a width change
            if value == 1 << (width - 1) {
                let Some(v) = reader.read_bits(depth.width_bits) else {
                    break;
                };
                let v = v + 1;
                width = if v < width { v } else { v + 1 };
                continue;
            }
        } else if width < depth.max_width {
            // Mid form: a window of values just below the top announces a change
            let border = (out_mask >> (depth.max_width - width)) - depth.span / 2;
            if value > border && value <= border + depth.span {
                value -= border;
                width = if value < width { value } else { value + 1 };
                continue;
            }
        } else if value & (1 << (depth.max_width - 1)) != 0 {
            // Long form: the top bit announces a change
            width = (value + 1) & 0xff;
            continue;
        }

        // Sign-extend from the narrower of `width` and the output width
        let shift = 32 - width.min(depth.out_bits);
        let v = ((value << shift) as i32) >> shift;

        d1 = wrap(d1 + v, depth.out_bits);
        d2 = wrap(d2 + d1, depth.out_bits);
        output.push(if it215 { d2 } else { d1 });
        produced += 1;
    }

    // A block that ends early leaves silence for the rest of its frames
    for _ in produced..frames {
        output.push(0);
    }
}

/// Wrap an accumulator to a signed `bits`-wide value
fn wrap(value: i32, bits: u32) -> i32 {
    let shift = 32 - bits;
    (value << shift) >> shift
}

/// LSB-first bit reader over one block
struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Read `count` bits, `None` once the block is exhausted
    fn read_bits(&mut self, count: u32) -> Option<u32> {
        if count == 0 || count > 32 {
            return Some(0);
        }

        let mut result = 0u32;
        let mut bits_read = 0;

        while bits_read < count {
            let current_byte = *self.data.get(self.byte_pos)? as u32;
            let bits_left_in_byte = 8 - self.bit_pos;
            let bits_to_read = (count - bits_read).min(bits_left_in_byte);

            let mask = (1u32 << bits_to_read) - 1;
            let bits = (current_byte >> self.bit_pos) & mask;

            result |= bits << bits_read;
            bits_read += bits_to_read;
            self.bit_pos += bits_to_read;

            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// LSB-first bit packer for building test streams
    struct BitWriter {
        bytes: Vec<u8>,
        bit: u32,
    }

    impl BitWriter {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                bit: 0,
            }
        }

        fn write(&mut self, value: u32, count: u32) {
            for i in 0..count {
                if self.bit == 0 {
                    self.bytes.push(0);
                }
                if (value >> i) & 1 != 0 {
                    if let Some(last) = self.bytes.last_mut() {
                        *last |= 1 << self.bit;
                    }
                }
                self.bit = (self.bit + 1) % 8;
            }
        }

        fn into_block(self) -> Vec<u8> {
            let mut out = (self.bytes.len() as u16).to_le_bytes().to_vec();
            out.extend(self.bytes);
            out
        }
    }

    #[test]
    fn test_8bit_full_width_deltas() {
        let deltas: [i8; 5] = [10, -3, 0, 127, -128];
        let mut w = BitWriter::new();
        for d in deltas {
            w.write(d as u8 as u32, 9);
        }
        let data = w.into_block();

        let (out, used) = decompress_8bit(&data, 5, false);
        assert_eq!(used, data.len());
        let mut acc: i8 = 0;
        for (i, d) in deltas.iter().enumerate() {
            acc = acc.wrapping_add(*d);
            assert_eq!(out[i], acc, "frame {i}");
        }
    }

    #[test]
    fn test_8bit_width_change() {
        let mut w = BitWriter::new();
        // Width 9 -> 4 via the long form: value with bit 8 set, (v + 1) & 0xff = 4
        w.write(0x100 | 3, 9);
        // Two 4-bit deltas: +2, -1
        w.write(2, 4);
        w.write(0xF, 4);
        // Short form change (value 1 << 3) to width 9: read 3 bits = 7 -> 8 -> 9
        w.write(8, 4);
        w.write(7, 3);
        w.write(5, 9);
        let data = w.into_block();

        let (out, _) = decompress_8bit(&data, 3, false);
        assert_eq!(out, vec![2, 1, 6]);
    }

    #[test]
    fn test_it215_double_integration() {
        let mut w = BitWriter::new();
        for _ in 0..3 {
            w.write(1, 9);
        }
        let data = w.into_block();
        let (out, _) = decompress_8bit(&data, 3, true);
        assert_eq!(out, vec![1, 3, 6]);
    }

    #[test]
    fn test_16bit_full_width() {
        let mut w = BitWriter::new();
        w.write(1000, 17);
        w.write((-500i16) as u16 as u32, 17);
        let data = w.into_block();
        let (out, _) = decompress_16bit(&data, 2, false);
        assert_eq!(out, vec![1000, 500]);
    }

    #[test]
    fn test_truncated_is_zero_filled() {
        let (out, used) = decompress_8bit(&[], 4, false);
        assert_eq!(out, vec![0; 4]);
        assert_eq!(used, 0);
    }
}
