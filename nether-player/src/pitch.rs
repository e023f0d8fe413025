//! Period and frequency arithmetic
//!
//! Pitch is carried as a period. In linear mode the period is only a
//! log-scale position (slides multiply it by table values); in Amiga mode
//! slides add to it directly.

use nether_tracker::{NOTE_FIRST, NOTE_LAST};

use crate::tables::{
    FINE_LINEAR_SLIDE_DOWN, FINE_LINEAR_SLIDE_UP, LINEAR_SLIDE_DOWN, LINEAR_SLIDE_UP,
};

/// Amiga periods of octave 0 (C..B), shifted left by 5 bits before use
pub const PERIOD_TABLE: [u32; 12] = [
    1712, 1616, 1524, 1440, 1356, 1280, 1208, 1140, 1076, 1016, 960, 907,
];

/// Reference rate that Amiga periods are expressed against
pub const AMIGA_C5: u32 = 8363;

/// `a * b / c` without intermediate overflow
pub fn muldiv(a: i64, b: i64, c: i64) -> i64 {
    if c == 0 {
        return 0;
    }
    a * b / c
}

/// `a * b / c` rounded to nearest
pub fn muldivr(a: i64, b: i64, c: i64) -> i64 {
    if c == 0 {
        return 0;
    }
    (a * b + c / 2) / c
}

/// Period of `note` (1-based) for a sample playing C-5 at `c5speed`.
/// Returns 0 for anything that is not a note.
pub fn period_from_note(note: u8, c5speed: u32, linear: bool) -> i32 {
    if note == 0 || note > 0xF0 {
        return 0;
    }
    let n = (note - NOTE_FIRST) as u32;
    let base = (PERIOD_TABLE[(n % 12) as usize] as i64) << 5;
    let octave = n / 12;
    if linear {
        return (base >> octave) as i32;
    }
    if c5speed == 0 {
        return 0;
    }
    muldiv(AMIGA_C5 as i64, base, (c5speed as i64) << octave) as i32
}

/// Playback rate in Hz for `period`
pub fn freq_from_period(period: i32, c5speed: u32, linear: bool) -> u32 {
    if period <= 0 {
        return 0;
    }
    let rate = (if linear { c5speed } else { AMIGA_C5 }) as i64;
    muldiv(rate, 1712 << 8, (period as i64) << 8).clamp(0, u32::MAX as i64) as u32
}

/// Nearest note (1-based) at or above `period`, measured at the Amiga reference rate
pub fn note_from_period(period: i32) -> u8 {
    if period <= 0 {
        return 0;
    }
    (NOTE_FIRST..=NOTE_LAST)
        .find(|&n| {
            let p = period_from_note(n, AMIGA_C5, false);
            p > 0 && period >= p
        })
        .unwrap_or(NOTE_LAST)
}

/// Note closest to `period` for a sample playing C-5 at `c5speed`
pub fn nearest_note(period: i32, c5speed: u32, linear: bool) -> u8 {
    if period <= 0 {
        return 0;
    }
    let reference = if linear || c5speed == 0 {
        period
    } else {
        muldiv(period as i64, c5speed as i64, AMIGA_C5 as i64) as i32
    };
    (NOTE_FIRST..=NOTE_LAST)
        .min_by_key(|&n| (period_from_note(n, AMIGA_C5, false) - reference).abs())
        .unwrap_or(NOTE_FIRST)
}

/// Slide `period` by `slide` units. Negative values raise the pitch.
///
/// Linear mode maps |slide| / 4 onto the 1/192-octave tables (capped at 255);
/// Amiga mode adds the value to the period.
pub fn do_freq_slide(period: i32, slide: i32, linear: bool) -> i32 {
    if period == 0 || slide == 0 {
        return period;
    }
    if !linear {
        return period + slide;
    }
    let n = ((slide.unsigned_abs() >> 2) as usize).min(255);
    let factor = if slide < 0 {
        LINEAR_SLIDE_DOWN[n]
    } else {
        LINEAR_SLIDE_UP[n]
    };
    let slid = muldivr(period as i64, factor as i64, 65536) as i32;
    if slid == period {
        // Always move at least one unit so tiny slides are not lost
        period + slide.signum()
    } else {
        slid
    }
}

/// Fine linear slide of `amount` (0-15) steps of 1/768 octave.
/// `raise` moves the pitch up.
pub fn fine_linear_slide(period: i32, amount: u8, raise: bool) -> i32 {
    let n = (amount & 0x0F) as usize;
    let factor = if raise {
        FINE_LINEAR_SLIDE_DOWN[n]
    } else {
        FINE_LINEAR_SLIDE_UP[n]
    };
    muldivr(period as i64, factor as i64, 65536) as i32
}

/// Regular linear slide of `amount` (0-255) steps of 1/192 octave
pub fn linear_slide(period: i32, amount: u8, raise: bool) -> i32 {
    let n = amount as usize;
    let factor = if raise {
        LINEAR_SLIDE_DOWN[n]
    } else {
        LINEAR_SLIDE_UP[n]
    };
    muldivr(period as i64, factor as i64, 65536) as i32
}
