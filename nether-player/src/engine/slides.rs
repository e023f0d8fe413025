//! Slide families: volume, channel volume, global volume, panning and pitch
//!
//! The four volume-like families share one parameter shape. `Fx` and `xF`
//! are one-shot fine slides applied on the first tick; anything else is a
//! continuous slide applied on the remaining ticks.

use nether_tracker::{ChannelFlags, Song};

use super::{CHANNEL_VOLUME_MAX, GLOBAL_VOLUME_MAX, Player, VOLUME_MAX};
use crate::pitch::{fine_linear_slide, linear_slide};

/// Decoded two-nibble slide parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slide {
    /// `xF`: one-shot by the high nibble
    FineHigh(u8),
    /// `Fx`: one-shot by the low nibble
    FineLow(u8),
    /// Continuous by the high nibble
    High(u8),
    /// Continuous by the low nibble
    Low(u8),
}

/// Which nibble a continuous slide reads when both are set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Continuous {
    PreferLow,
    PreferHigh,
    /// Both nibbles set (and neither is F) is not a slide
    Exclusive,
}

/// Classify a slide parameter. `Fx` wins over `xF`, so `FF` is a fine slide
/// by the low nibble.
pub(crate) fn decode_slide(param: u8, continuous: Continuous) -> Option<Slide> {
    let hi = param >> 4;
    let lo = param & 0x0F;
    if hi == 0x0F && lo != 0 {
        return Some(Slide::FineLow(lo));
    }
    if lo == 0x0F && hi != 0 {
        return Some(Slide::FineHigh(hi));
    }
    match (hi, lo) {
        (0, 0) => None,
        (hi, 0) => Some(Slide::High(hi)),
        (0, lo) => Some(Slide::Low(lo)),
        (hi, lo) => match continuous {
            Continuous::PreferLow => Some(Slide::Low(lo)),
            Continuous::PreferHigh => Some(Slide::High(hi)),
            Continuous::Exclusive => None,
        },
    }
}

/// Signed amount to apply this tick: high nibble counts up, low counts down
fn slide_amount(slide: Option<Slide>, first_tick: bool) -> i32 {
    match slide {
        Some(Slide::FineHigh(x)) if first_tick => x as i32,
        Some(Slide::FineLow(x)) if first_tick => -(x as i32),
        Some(Slide::High(x)) if !first_tick => x as i32,
        Some(Slide::Low(x)) if !first_tick => -(x as i32),
        _ => 0,
    }
}

/// Store a non-zero parameter, or recall the stored one
pub(crate) fn remember(memory: &mut u8, param: u8) -> u8 {
    if param != 0 {
        *memory = param;
    }
    *memory
}

impl Player {
    /// Dxy
    pub(super) fn volume_slide(&mut self, channel: usize, param: u8, first_tick: bool) {
        let voice = &mut self.pool[channel];
        let param = remember(&mut voice.memory.volume_slide, param);
        let slide = decode_slide(param, Continuous::Exclusive);
        let delta = match slide {
            // D0F and DF0 also slide on the first tick
            Some(Slide::High(0x0F)) => 0x0F,
            Some(Slide::Low(0x0F)) => -0x0F,
            other => slide_amount(other, first_tick),
        };
        voice.volume = (voice.volume + delta * 4).clamp(0, VOLUME_MAX);
    }

    /// Nxy
    pub(super) fn channel_volume_slide(&mut self, channel: usize, param: u8, first_tick: bool) {
        let voice = &mut self.pool[channel];
        let param = remember(&mut voice.memory.channel_volume_slide, param);
        let delta = slide_amount(decode_slide(param, Continuous::PreferLow), first_tick);
        voice.global_volume = (voice.global_volume + delta).clamp(0, CHANNEL_VOLUME_MAX);
    }

    /// Wxy
    pub(super) fn global_volume_slide(&mut self, channel: usize, param: u8, first_tick: bool) {
        let param = remember(&mut self.pool[channel].memory.global_volume_slide, param);
        let delta = slide_amount(decode_slide(param, Continuous::PreferHigh), first_tick);
        self.global_volume = (self.global_volume + delta).clamp(0, GLOBAL_VOLUME_MAX);
    }

    /// Pxy: the high nibble pans left, the low nibble right
    pub(super) fn panning_slide(&mut self, channel: usize, param: u8, first_tick: bool) {
        let voice = &mut self.pool[channel];
        let param = remember(&mut voice.memory.panning_slide, param);
        let delta = slide_amount(decode_slide(param, Continuous::PreferLow), first_tick);
        voice.panning = (voice.panning - delta * 4).clamp(0, VOLUME_MAX);
        voice.flags.remove(ChannelFlags::SURROUND);
        voice.panbrello_delta = 0;
    }

    /// Exx/Fxx. `raise` slides the pitch up (period down).
    pub(super) fn portamento(
        &mut self,
        song: &Song,
        channel: usize,
        param: u8,
        first_tick: bool,
        raise: bool,
    ) {
        let compat_gxx = song.uses_compat_gxx();
        let linear = song.uses_linear_slides();
        let voice = &mut self.pool[channel];
        if param != 0 {
            voice.memory.pitch_slide = param;
            if !compat_gxx {
                voice.memory.porta_note = param;
            }
        }
        let param = voice.memory.pitch_slide;
        if voice.period == 0 {
            return;
        }
        let amount = param & 0x0F;
        let sign = if raise { -1 } else { 1 };

        voice.period = match param & 0xF0 {
            0xE0 if first_tick => {
                if linear {
                    fine_linear_slide(voice.period, amount, raise)
                } else {
                    voice.period + sign * amount as i32
                }
            }
            0xF0 if first_tick => {
                if linear {
                    linear_slide(voice.period, amount, raise)
                } else {
                    voice.period + sign * amount as i32 * 4
                }
            }
            0xE0 | 0xF0 => voice.period,
            _ if !first_tick => {
                if linear {
                    linear_slide(voice.period, param, raise)
                } else {
                    voice.period + sign * param as i32 * 4
                }
            }
            _ => voice.period,
        }
        .max(1);
    }

    /// Volume column Ex/Fx: memory holds the already scaled amount
    pub(super) fn volume_column_portamento(
        &mut self,
        song: &Song,
        channel: usize,
        param: u8,
        first_tick: bool,
        raise: bool,
    ) {
        let linear = song.uses_linear_slides();
        let voice = &mut self.pool[channel];
        if first_tick {
            if param != 0 {
                voice.memory.pitch_slide = param.saturating_mul(4);
            }
            return;
        }
        let amount = voice.memory.pitch_slide;
        if voice.period == 0 || amount == 0 {
            return;
        }
        voice.period = if linear {
            linear_slide(voice.period, amount, raise)
        } else if raise {
            voice.period - amount as i32 * 4
        } else {
            voice.period + amount as i32 * 4
        }
        .max(1);
    }

    /// Gxx: glide toward the latched target, stopping on it
    pub(super) fn tone_portamento(
        &mut self,
        song: &Song,
        channel: usize,
        param: u8,
        first_tick: bool,
    ) {
        let compat_gxx = song.uses_compat_gxx();
        let linear = song.uses_linear_slides();
        let voice = &mut self.pool[channel];
        if param != 0 {
            voice.memory.porta_note = param;
            if !compat_gxx {
                voice.memory.pitch_slide = param;
            }
        }
        let speed = voice.memory.porta_note;
        voice.flags.insert(ChannelFlags::PORTAMENTO);

        let target = voice.portamento_target;
        if first_tick || voice.period == 0 || target == 0 || speed == 0 {
            return;
        }

        let period = voice.period;
        let upward = period < target;
        let delta = if linear {
            let slid = linear_slide(period, speed, !upward);
            match slid - period {
                0 if upward => 1,
                0 => -1,
                d => d,
            }
        } else if upward {
            speed as i32 * 4
        } else {
            -(speed as i32 * 4)
        };

        let next = period + delta;
        if (upward && next >= target) || (!upward && next <= target) {
            voice.period = target;
            voice.portamento_target = 0;
        } else {
            voice.period = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fine_shapes() {
        assert_eq!(decode_slide(0xF3, Continuous::Exclusive), Some(Slide::FineLow(3)));
        assert_eq!(decode_slide(0x3F, Continuous::Exclusive), Some(Slide::FineHigh(3)));
        // FF is a fine slide down
        assert_eq!(decode_slide(0xFF, Continuous::PreferHigh), Some(Slide::FineLow(15)));
    }

    #[test]
    fn test_decode_continuous_shapes() {
        assert_eq!(decode_slide(0x40, Continuous::Exclusive), Some(Slide::High(4)));
        assert_eq!(decode_slide(0x05, Continuous::Exclusive), Some(Slide::Low(5)));
        assert_eq!(decode_slide(0xF0, Continuous::Exclusive), Some(Slide::High(15)));
        assert_eq!(decode_slide(0x00, Continuous::PreferLow), None);
        assert_eq!(decode_slide(0x35, Continuous::Exclusive), None);
        assert_eq!(decode_slide(0x35, Continuous::PreferLow), Some(Slide::Low(5)));
        assert_eq!(decode_slide(0x35, Continuous::PreferHigh), Some(Slide::High(3)));
    }

    #[test]
    fn test_fine_slides_only_on_first_tick() {
        for p in 0xF1..=0xFFu8 {
            let slide = decode_slide(p, Continuous::Exclusive);
            assert_eq!(slide_amount(slide, true), -((p & 0x0F) as i32));
            assert_eq!(slide_amount(slide, false), 0);
        }
    }

    #[test]
    fn test_remember() {
        let mut memory = 0;
        assert_eq!(remember(&mut memory, 0), 0);
        assert_eq!(remember(&mut memory, 0x12), 0x12);
        assert_eq!(remember(&mut memory, 0), 0x12);
    }
}
