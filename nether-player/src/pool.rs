//! Voice arena: 64 foreground channels followed by background voices

use std::ops::{Index, IndexMut};

use nether_tracker::{ChannelFlags, MAX_CHANNELS, MAX_VOICES, Song};
use tracing::debug;

use crate::voice::Voice;

/// Quietest volume a background voice may have and still be stolen (25%)
const EVICTION_CEILING: u64 = 64 * 65536;

/// Fixed-size arena of voices addressed by index
#[derive(Clone, Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    pub fn new(song: &Song) -> Self {
        let mut voices = vec![Voice::default(); MAX_VOICES];
        for (voice, settings) in voices.iter_mut().zip(song.channels.iter()) {
            *voice = Voice::for_channel(settings);
        }
        Self { voices }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }

    /// The 64 pattern channels
    pub fn channels(&self) -> &[Voice] {
        &self.voices[..MAX_CHANNELS]
    }

    pub fn channels_mut(&mut self) -> &mut [Voice] {
        &mut self.voices[..MAX_CHANNELS]
    }

    /// Background (NNA) voices
    pub fn background(&self) -> &[Voice] {
        &self.voices[MAX_CHANNELS..]
    }

    /// Indices of background voices spawned by `channel`
    pub fn children_of(&self, channel: usize) -> impl Iterator<Item = usize> + '_ {
        (MAX_CHANNELS..MAX_VOICES).filter(move |&i| self.voices[i].master_channel == channel + 1)
    }

    /// Pick a background slot for a note leaving `channel`.
    ///
    /// A silent slot wins. Failing that, the quietest background voice is
    /// evicted, preferring the one furthest into its volume envelope. Returns
    /// `None` when the outgoing note has already faded out or every
    /// background voice is too loud to steal.
    pub fn allocate_background(&mut self, channel: usize) -> Option<usize> {
        for i in MAX_CHANNELS..MAX_VOICES {
            let voice = &mut self.voices[i];
            if voice.length > 0 {
                continue;
            }
            if voice.flags.contains(ChannelFlags::MUTE) {
                if !voice.flags.contains(ChannelFlags::NNA_MUTE) {
                    continue;
                }
                voice.flags.remove(ChannelFlags::NNA_MUTE | ChannelFlags::MUTE);
            }
            return Some(i);
        }

        if self.voices.get(channel)?.fadeout_volume == 0 {
            return None;
        }

        let mut quietest = EVICTION_CEILING;
        let mut env_position = 0u32;
        let mut result = None;
        for i in MAX_CHANNELS..MAX_VOICES {
            let voice = &self.voices[i];
            if voice.fadeout_volume == 0 {
                result = Some(i);
                break;
            }
            let v = effective_volume(voice);
            let tie_later = v == quietest && result.is_some() && voice.vol_env_position > env_position;
            if v < quietest || tie_later {
                quietest = v;
                env_position = voice.vol_env_position;
                result = Some(i);
            }
        }

        if let Some(i) = result {
            debug!(slot = i, channel, "evicting background voice");
            self.voices[i]
                .flags
                .remove(ChannelFlags::MUTE | ChannelFlags::NNA_MUTE);
        }
        result
    }

    /// Silence every background voice
    pub fn clear_background(&mut self) {
        for voice in &mut self.voices[MAX_CHANNELS..] {
            *voice = Voice::default();
        }
    }
}

/// Loudness used for eviction: volume scaled by the fade level, halved for
/// looping voices.
pub fn effective_volume(voice: &Voice) -> u64 {
    let volume = voice.volume.max(0) as u64;
    let mut v = if voice.flags.contains(ChannelFlags::NOTE_FADE) {
        volume * voice.fadeout_volume.max(0) as u64
    } else {
        volume << 16
    };
    if voice.flags.contains(ChannelFlags::LOOP) {
        v >>= 1;
    }
    v
}

impl Index<usize> for VoicePool {
    type Output = Voice;
    fn index(&self, index: usize) -> &Voice {
        &self.voices[index]
    }
}

impl IndexMut<usize> for VoicePool {
    fn index_mut(&mut self, index: usize) -> &mut Voice {
        &mut self.voices[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy(volume: i32, fadeout: i32, env: u32) -> Voice {
        Voice {
            length: 100,
            volume,
            fadeout_volume: fadeout,
            vol_env_position: env,
            ..Default::default()
        }
    }

    fn full_pool() -> VoicePool {
        let mut pool = VoicePool::new(&Song::default());
        for i in MAX_CHANNELS..MAX_VOICES {
            pool[i] = busy(200, 65536, 0);
        }
        pool[0].fadeout_volume = 65536;
        pool
    }

    #[test]
    fn test_prefers_silent_slot() {
        let mut pool = full_pool();
        pool[MAX_CHANNELS + 7].length = 0;
        assert_eq!(pool.allocate_background(0), Some(MAX_CHANNELS + 7));
    }

    #[test]
    fn test_skips_muted_silent_slot() {
        let mut pool = full_pool();
        pool[MAX_CHANNELS + 3].length = 0;
        pool[MAX_CHANNELS + 3].flags = ChannelFlags::MUTE;
        pool[MAX_CHANNELS + 9].length = 0;
        pool[MAX_CHANNELS + 9].flags = ChannelFlags::MUTE | ChannelFlags::NNA_MUTE;
        assert_eq!(pool.allocate_background(0), Some(MAX_CHANNELS + 9));
        assert!(pool[MAX_CHANNELS + 9].flags.is_empty());
    }

    #[test]
    fn test_evicts_quietest() {
        let mut pool = full_pool();
        for i in MAX_CHANNELS..MAX_VOICES {
            pool[i].volume = 32;
        }
        pool[MAX_CHANNELS + 20].volume = 10;
        assert_eq!(pool.allocate_background(0), Some(MAX_CHANNELS + 20));
    }

    #[test]
    fn test_eviction_tie_prefers_later_envelope() {
        let mut pool = full_pool();
        for i in MAX_CHANNELS..MAX_VOICES {
            pool[i].volume = 10;
        }
        pool[MAX_CHANNELS + 40].vol_env_position = 90;
        pool[MAX_CHANNELS + 12].vol_env_position = 30;
        assert_eq!(pool.allocate_background(0), Some(MAX_CHANNELS + 40));
    }

    #[test]
    fn test_faded_voice_is_taken_immediately() {
        let mut pool = full_pool();
        pool[MAX_CHANNELS + 5].fadeout_volume = 0;
        assert_eq!(pool.allocate_background(0), Some(MAX_CHANNELS + 5));
    }

    #[test]
    fn test_loud_pool_refuses() {
        let mut pool = full_pool();
        assert_eq!(pool.allocate_background(0), None);
        // Outgoing note already silent
        pool[0].fadeout_volume = 0;
        pool[MAX_CHANNELS + 1].volume = 1;
        assert_eq!(pool.allocate_background(0), None);
    }

    #[test]
    fn test_loop_and_fade_weighting() {
        let mut v = busy(64, 32768, 0);
        assert_eq!(effective_volume(&v), 64 << 16);
        v.flags = ChannelFlags::NOTE_FADE;
        assert_eq!(effective_volume(&v), 64 * 32768);
        v.flags |= ChannelFlags::LOOP;
        assert_eq!(effective_volume(&v), 32 * 32768);
    }
}
