//! Volume column commands

use nether_tracker::{ChannelFlags, Song, VolumeEffect};

use super::{Player, VOLUME_MAX};
use crate::tables::VOLUME_PORTAMENTO;

impl Player {
    /// Run the volume column for this tick. Set volume and set panning only
    /// act when the row's note starts.
    pub(super) fn handle_volume_column(
        &mut self,
        song: &Song,
        channel: usize,
        effect: VolumeEffect,
        param: u8,
        first_tick: bool,
        start_note: bool,
    ) {
        match effect {
            VolumeEffect::None => {}
            VolumeEffect::Volume => {
                if start_note {
                    self.pool[channel].volume = param.min(64) as i32 * 4;
                }
            }
            VolumeEffect::Panning => {
                if start_note {
                    let voice = &mut self.pool[channel];
                    voice.panning = param.min(64) as i32 * 4;
                    voice.flags.remove(ChannelFlags::SURROUND);
                }
            }
            VolumeEffect::VolSlideUp | VolumeEffect::VolSlideDown => {
                let voice = &mut self.pool[channel];
                if param != 0 {
                    voice.memory.volume_column_slide = param;
                }
                if !first_tick {
                    let amount = voice.memory.volume_column_slide as i32 * 4;
                    let delta = if effect == VolumeEffect::VolSlideUp {
                        amount
                    } else {
                        -amount
                    };
                    voice.volume = (voice.volume + delta).clamp(0, VOLUME_MAX);
                }
            }
            VolumeEffect::FineVolUp | VolumeEffect::FineVolDown => {
                let voice = &mut self.pool[channel];
                if param != 0 {
                    voice.memory.volume_column_slide = param;
                }
                if first_tick {
                    let amount = voice.memory.volume_column_slide as i32 * 4;
                    let delta = if effect == VolumeEffect::FineVolUp {
                        amount
                    } else {
                        -amount
                    };
                    voice.volume = (voice.volume + delta).clamp(0, VOLUME_MAX);
                }
            }
            VolumeEffect::VibratoSpeed => self.set_vibrato(channel, param << 4, false),
            VolumeEffect::VibratoDepth => self.set_vibrato(channel, param & 0x0F, false),
            VolumeEffect::PanSlideLeft => self.panning_slide(channel, param << 4, first_tick),
            VolumeEffect::PanSlideRight => self.panning_slide(channel, param & 0x0F, first_tick),
            VolumeEffect::TonePorta => {
                let speed = VOLUME_PORTAMENTO[(param & 0x0F) as usize];
                self.tone_portamento(song, channel, speed, first_tick);
            }
            VolumeEffect::PortaUp => {
                self.volume_column_portamento(song, channel, param, first_tick, true);
            }
            VolumeEffect::PortaDown => {
                self.volume_column_portamento(song, channel, param, first_tick, false);
            }
        }
    }
}
