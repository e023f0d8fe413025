//! Lookup tables for slides, LFO waveforms and retrig volumes
//!
//! The slide tables are built at compile time from a Taylor expansion of
//! `2^x`, the same way a float table would be generated offline.

use rand::Rng;

// =============================================================================
// Compile-time math helpers
// =============================================================================

const LN2: f64 = std::f64::consts::LN_2;

/// `2^x` for |x| < 2, accurate well beyond table precision
const fn exp2(x: f64) -> f64 {
    let t = x * LN2;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1;
    while k < 16 {
        term = term * t / k as f64;
        sum += term;
        k += 1;
    }
    sum
}

/// Sine for x in [-pi, pi]
const fn sin(x: f64) -> f64 {
    let x2 = x * x;
    let mut sum = x;
    let mut term = x;
    let mut k = 1;
    while k < 12 {
        term = -term * x2 / ((2 * k) as f64 * (2 * k + 1) as f64);
        sum += term;
        k += 1;
    }
    sum
}

const fn round(x: f64) -> i32 {
    if x >= 0.0 {
        (x + 0.5) as i32
    } else {
        (x - 0.5) as i32
    }
}

/// 65536 * 2^(sign * i / steps) for i in 0..N
const fn slide_table<const N: usize>(steps: f64, sign: f64) -> [u32; N] {
    let mut table = [0u32; N];
    let mut i = 0;
    while i < N {
        table[i] = round(65536.0 * exp2(sign * i as f64 / steps)) as u32;
        i += 1;
    }
    table
}

// =============================================================================
// Linear slide tables (16.16 multipliers)
// =============================================================================

/// Multiplier raising the period by i/192 octave (pitch goes down)
pub const LINEAR_SLIDE_UP: [u32; 256] = slide_table::<256>(192.0, 1.0);

/// Multiplier lowering the period by i/192 octave (pitch goes up)
pub const LINEAR_SLIDE_DOWN: [u32; 256] = slide_table::<256>(192.0, -1.0);

/// Fine variants, 1/768 octave per step
pub const FINE_LINEAR_SLIDE_UP: [u32; 16] = slide_table::<16>(768.0, 1.0);
pub const FINE_LINEAR_SLIDE_DOWN: [u32; 16] = slide_table::<16>(768.0, -1.0);

// =============================================================================
// LFO waveforms (256 steps, -64..=64)
// =============================================================================

pub const SINE_TABLE: [i8; 256] = {
    let mut table = [0i8; 256];
    let mut i = 0;
    while i < 256 {
        let mut angle = 2.0 * std::f64::consts::PI * i as f64 / 256.0;
        if angle > std::f64::consts::PI {
            angle -= 2.0 * std::f64::consts::PI;
        }
        table[i] = round(64.0 * sin(angle)) as i8;
        i += 1;
    }
    table
};

pub const RAMP_DOWN_TABLE: [i8; 256] = {
    let mut table = [0i8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = if i < 128 {
            -(((i + 1) / 2) as i32) as i8
        } else {
            (64 - (i as i32 - 127) / 2) as i8
        };
        i += 1;
    }
    table
};

pub const SQUARE_TABLE: [i8; 256] = {
    let mut table = [0i8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = if i < 128 { 64 } else { -64 };
        i += 1;
    }
    table
};

/// Value of an LFO waveform at `position`.
///
/// `kind` is the S3x/S4x/S5x selector; only the low two bits pick the shape
/// (bit 2 is the "don't retrigger" switch).
pub fn waveform<R: Rng>(kind: u8, position: u8, rng: &mut R) -> i32 {
    let pos = position as usize;
    match kind & 3 {
        1 => RAMP_DOWN_TABLE[pos] as i32,
        2 => SQUARE_TABLE[pos] as i32,
        3 => rng.random_range(-64..=64),
        _ => SINE_TABLE[pos] as i32,
    }
}

// =============================================================================
// Effect parameter tables
// =============================================================================

/// Qxy: multiplicative volume change (x * vol >> 4), 0 = use the additive table
pub const RETRIG_MULTIPLY: [i32; 16] = [0, 0, 0, 0, 0, 0, 10, 8, 0, 0, 0, 0, 0, 0, 24, 32];

/// Qxy: additive volume change in 0-64 units
pub const RETRIG_ADD: [i32; 16] = [0, -1, -2, -4, -8, -16, 0, 0, 0, 1, 2, 4, 8, 16, 0, 0];

/// Volume column Gx speeds
pub const VOLUME_PORTAMENTO: [u8; 16] = [
    0x00, 0x01, 0x04, 0x08, 0x10, 0x20, 0x40, 0x60, 0x80, 0xFF, 0, 0, 0, 0, 0, 0,
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_slide_tables_endpoints() {
        assert_eq!(LINEAR_SLIDE_UP[0], 65536);
        assert_eq!(LINEAR_SLIDE_DOWN[0], 65536);
        // 192 steps is one octave
        assert_eq!(slide_table::<193>(192.0, 1.0)[192], 131072);
        assert_eq!(slide_table::<193>(192.0, -1.0)[192], 32768);
        assert!(LINEAR_SLIDE_UP.windows(2).all(|w| w[0] < w[1]));
        assert!(FINE_LINEAR_SLIDE_DOWN.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_sine_shape() {
        assert_eq!(SINE_TABLE[0], 0);
        assert_eq!(SINE_TABLE[64], 64);
        assert_eq!(SINE_TABLE[128], 0);
        assert_eq!(SINE_TABLE[192], -64);
    }

    #[test]
    fn test_waveform_random_is_seeded() {
        let mut a = rand_pcg::Pcg32::seed_from_u64(7);
        let mut b = rand_pcg::Pcg32::seed_from_u64(7);
        for pos in 0..32 {
            let va = waveform(3, pos, &mut a);
            assert_eq!(va, waveform(3, pos, &mut b));
            assert!((-64..=64).contains(&va));
        }
        assert_eq!(waveform(4, 64, &mut a), 64);
        assert_eq!(waveform(2, 200, &mut a), -64);
    }
}
