//! MIDI macros and synth hooks
//!
//! A macro is an ASCII program: hex digit pairs are literal bytes, lower-case
//! letters are placeholders filled from the channel state. Messages that
//! start `F0 F0` are internal and drive the resonant filter; anything else
//! goes out through [`SynthHooks::midi_out`].

use nether_tracker::{ChannelFlags, Song};
use smallvec::SmallVec;
use tracing::trace;

use super::Player;

/// Receiver for MIDI instruments and macro output.
///
/// Every method defaults to doing nothing, so implementors only override
/// the events they care about.
pub trait SynthHooks: Send {
    fn note_on(&mut self, _channel: usize, _note: u8, _volume: i32) {}
    fn note_off(&mut self, _channel: usize) {}
    fn key_off(&mut self, _channel: usize) {}
    /// Volume of a sounding MIDI note changed
    fn touch(&mut self, _channel: usize, _volume: i32) {}
    fn patch_change(&mut self, _channel: usize, _program: u8, _bank: u16) {}
    /// Raw bytes produced by a macro
    fn midi_out(&mut self, _channel: usize, _data: &[u8]) {}
}

/// Hooks that discard everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl SynthHooks for NoHooks {}

/// Internal message: `F0 F0 <kind> <value>`
const INTERNAL_PREFIX: [u8; 2] = [0xF0, 0xF0];
const INTERNAL_CUTOFF: u8 = 0x00;
const INTERNAL_RESONANCE: u8 = 0x01;

/// Encoded macro; rarely longer than a handful of bytes
pub(crate) type MacroBytes = SmallVec<[u8; 32]>;

/// Values a macro's placeholders may read
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MacroContext {
    /// MIDI channel, 0-15
    pub midi_channel: u8,
    pub note: u8,
    pub velocity: u8,
    pub volume: u8,
    pub panning: u8,
    pub final_panning: u8,
    pub program: u8,
    pub bank: u16,
    pub param: u8,
}

/// Expand `text` into bytes. Hex digits pair into bytes; a placeholder
/// standing for a full byte flushes any pending half byte first.
pub(crate) fn encode_macro(text: &str, ctx: &MacroContext) -> MacroBytes {
    let mut out = MacroBytes::new();
    let mut pending: Option<u8> = None;

    for c in text.bytes() {
        let nibble = match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'A'..=b'F' => Some(c - b'A' + 10),
            b'c' => Some(ctx.midi_channel & 0x0F),
            _ => None,
        };
        if let Some(n) = nibble {
            match pending.take() {
                Some(hi) => out.push((hi << 4) | n),
                None => pending = Some(n),
            }
            continue;
        }

        let byte = match c {
            b'n' => ctx.note.wrapping_sub(1) & 0x7F,
            b'v' => ctx.velocity,
            b'u' => ctx.volume,
            b'x' => ctx.panning,
            b'y' => ctx.final_panning,
            b'a' => ((ctx.bank >> 7) & 0x7F) as u8,
            b'b' => (ctx.bank & 0x7F) as u8,
            b'p' => ctx.program & 0x7F,
            b'z' => ctx.param & 0x7F,
            _ => continue,
        };
        if let Some(hi) = pending.take() {
            out.push(hi);
        }
        out.push(byte);
    }
    if let Some(hi) = pending {
        out.push(hi);
    }

    if out.first() == Some(&0xF0) && !out.starts_with(&INTERNAL_PREFIX) && out.last() != Some(&0xF7) {
        out.push(0xF7);
    }
    out
}

impl Player {
    fn macro_context(&self, song: &Song, channel: usize, param: u8) -> (MacroContext, bool) {
        let voice = &self.pool[channel];
        let instrument = if song.uses_instruments() {
            song.instrument(voice.instrument)
        } else {
            None
        };
        let (midi_channel, fake) = match instrument {
            Some(ins) if ins.midi_channel_mask != 0 => {
                let mask = ins.midi_channel_mask;
                let ch = if mask >= 0x10000 {
                    // "Mapped": follow the pattern channel
                    (channel % 16) as u8
                } else {
                    mask.trailing_zeros().min(15) as u8
                };
                (ch, false)
            }
            _ => (15, true),
        };
        let ctx = MacroContext {
            midi_channel,
            note: voice.note,
            velocity: (voice.final_volume >> 1).clamp(0, 127) as u8,
            volume: (voice.volume >> 1).clamp(0, 127) as u8,
            panning: (voice.panning >> 1).clamp(0, 127) as u8,
            final_panning: (voice.final_panning >> 1).clamp(0, 127) as u8,
            program: instrument.map_or(0, |ins| ins.midi_program),
            bank: instrument.map_or(0, |ins| ins.midi_bank),
            param,
        };
        (ctx, fake)
    }

    /// Expand and send one macro for `channel`
    pub(super) fn run_macro(&mut self, song: &Song, channel: usize, text: &str, param: u8) {
        if text.is_empty() {
            return;
        }
        let (ctx, fake) = self.macro_context(song, channel, param);
        let bytes = encode_macro(text, &ctx);
        if bytes.is_empty() {
            return;
        }
        trace!(channel, macro_text = text, ?bytes, "midi macro");

        if bytes.len() >= 4 && bytes.starts_with(&INTERNAL_PREFIX) {
            let value = bytes[3] & 0x7F;
            let voice = &mut self.pool[channel];
            match bytes[2] {
                INTERNAL_CUTOFF => voice.cutoff = value,
                INTERNAL_RESONANCE => voice.resonance = value,
                _ => return,
            }
            voice.flags.set(
                ChannelFlags::FILTER,
                voice.cutoff < 0x7F || voice.resonance > 0,
            );
            return;
        }
        if !fake {
            self.hooks.midi_out(channel, &bytes);
        }
    }
}
