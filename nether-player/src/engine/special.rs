//! S-command family

use nether_tracker::{ChannelFlags, NewNoteAction, Song};
use smallvec::SmallVec;

use super::Player;

impl Player {
    /// S0x..SFx. `param` has already been resolved through the S memory; SDx
    /// is handled before the note columns.
    pub(super) fn handle_special(&mut self, song: &Song, channel: usize, param: u8, first_tick: bool) {
        let x = param & 0x0F;
        let command = param >> 4;

        if command == 0xC {
            self.note_cut_countdown(channel, x, first_tick);
            return;
        }
        if !first_tick {
            return;
        }

        let voice = &mut self.pool[channel];
        match command {
            0x1 => voice.flags.set(ChannelFlags::GLISSANDO, x != 0),
            0x3 => voice.vibrato_type = x,
            0x4 => voice.tremolo_type = x,
            0x5 => {
                voice.panbrello_type = x;
                voice.panbrello_position = 0;
            }
            0x6 => self.tick_count += x as u32,
            0x7 => self.nna_control(song, channel, x),
            0x8 => {
                voice.panning = ((x as i32) << 4) + 8;
                voice.pan_swing = 0;
                voice.flags.remove(ChannelFlags::SURROUND);
            }
            0x9 if x == 1 => {
                voice.flags.insert(ChannelFlags::SURROUND);
                voice.panning = 128;
            }
            0x9 if x == 0 => voice.flags.remove(ChannelFlags::SURROUND),
            0xA => {
                voice.memory.offset = ((x as u32) << 16) | (voice.memory.offset & 0xFFFF);
            }
            0xB => self.pattern_loop(channel, x),
            0xE => {
                if self.row_count == 0 {
                    self.row_count = x as i32 + 1;
                }
            }
            0xF => voice.active_macro = x,
            _ => {}
        }
    }

    /// SCx: cut after x ticks (SC0 behaves as SC1)
    fn note_cut_countdown(&mut self, channel: usize, ticks: u8, first_tick: bool) {
        let voice = &mut self.pool[channel];
        if first_tick {
            voice.cd_note_cut = ticks.max(1);
            return;
        }
        if voice.cd_note_cut == 0 {
            return;
        }
        voice.cd_note_cut -= 1;
        if voice.cd_note_cut == 0 {
            voice.note_cut();
        }
    }

    /// SB0 marks the loop start; SBx jumps back x times
    fn pattern_loop(&mut self, channel: usize, count: u8) {
        let row = self.row;
        let voice = &mut self.pool[channel];
        if count == 0 {
            voice.patloop_row = row;
            return;
        }
        if voice.cd_patloop > 0 {
            voice.cd_patloop -= 1;
            if voice.cd_patloop == 0 {
                // Loop done; a later SBx on this channel starts after this row
                voice.patloop_row = row + 1;
                return;
            }
        } else {
            voice.cd_patloop = count;
        }
        self.process_row = voice.patloop_row.wrapping_sub(1);
    }

    /// S7x: act on past notes, or change this channel's NNA and envelopes
    fn nna_control(&mut self, song: &Song, channel: usize, x: u8) {
        match x {
            0..=2 => {
                let children: SmallVec<[usize; 16]> = self.pool.children_of(channel).collect();
                for index in children {
                    match x {
                        0 => {
                            let voice = &mut self.pool[index];
                            voice.flags.insert(ChannelFlags::NOTE_FADE);
                            voice.fadeout_volume = 0;
                        }
                        1 => self.key_off_voice(song, index),
                        _ => self.pool[index].flags.insert(ChannelFlags::NOTE_FADE),
                    }
                }
            }
            3..=6 => self.pool[channel].nna = NewNoteAction::from_u8(x - 3),
            7 => self.pool[channel].flags.remove(ChannelFlags::VOL_ENV),
            8 => self.pool[channel].flags.insert(ChannelFlags::VOL_ENV),
            9 => self.pool[channel].flags.remove(ChannelFlags::PAN_ENV),
            10 => self.pool[channel].flags.insert(ChannelFlags::PAN_ENV),
            11 => self.pool[channel].flags.remove(ChannelFlags::PITCH_ENV),
            12 => self.pool[channel].flags.insert(ChannelFlags::PITCH_ENV),
            _ => {}
        }
    }
}
