//! Tick-driven playback engine
//!
//! The engine owns the song cursor and the voice pool. Each call to
//! [`Player::process_tick`] takes the audio lock, advances one tick and
//! leaves every voice with an up-to-date increment and left/right volume:
//! - Row fetch and order sequencing (`tick`)
//! - Per-channel note triggering (`process`, `notes`, `nna`)
//! - Effect column and volume column (`effects`, `slides`, `volume_column`, `special`)
//! - MIDI macros and synth hooks (`midi`)
//! - Envelopes, LFOs and final gains (`mixing`)

mod effects;
mod midi;
mod mixing;
mod nna;
mod notes;
mod process;
mod slides;
mod special;
mod tick;
mod volume_column;


pub use midi::{NoHooks, SynthHooks};

use hashbrown::HashSet;
use nether_tracker::{MAX_CHANNELS, Song};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::PlayerConfig;
use crate::pool::VoicePool;
use crate::sync::SharedSong;
use crate::voice::Voice;

// ============================================================================
// Engine constants
// ============================================================================

/// `process_row` value that forces the next row fetch onto a new order
pub(crate) const PROCESS_NEXT_ORDER: usize = usize::MAX - 1;

/// Full fade level of a voice
pub(crate) const FADEOUT_MAX: i32 = 65536;

/// Global volume ceiling (IT scale)
pub(crate) const GLOBAL_VOLUME_MAX: i32 = 128;

/// Channel volume ceiling
pub(crate) const CHANNEL_VOLUME_MAX: i32 = 64;

/// Voice volume/panning ceiling
pub(crate) const VOLUME_MAX: i32 = 256;

/// Slowest and fastest tempo reachable through Txx slides
pub(crate) const MIN_TEMPO: u32 = 32;
pub(crate) const MAX_TEMPO: u32 = 255;

/// Where playback currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub order: usize,
    pub pattern: usize,
    pub row: usize,
    /// Ticks elapsed within the row (0 on the row's first tick)
    pub tick: u32,
}

/// Song player: cursor, timing state and voice pool
pub struct Player {
    song: SharedSong,
    config: PlayerConfig,
    pub(crate) pool: VoicePool,
    rng: Pcg32,
    hooks: Box<dyn SynthHooks>,

    // Timing
    speed: u32,
    tempo: u32,
    /// Counts down from `speed`; a new row starts when it reaches zero
    tick_count: u32,
    /// Row repeats still owed to SEx (0 = fetch a new row)
    row_count: i32,
    row_tick: u32,
    /// 0-128
    global_volume: i32,

    // Cursor
    current_order: usize,
    current_pattern: usize,
    row: usize,
    /// Row fetched last; the next fetch reads `process_row + 1`
    process_row: usize,
    break_row: usize,
    next_order: Option<usize>,
    plays: u32,
    stopped: bool,

    played_samples: HashSet<usize>,
    played_instruments: HashSet<usize>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("position", &self.position())
            .field("speed", &self.speed)
            .field("tempo", &self.tempo)
            .field("global_volume", &self.global_volume)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl Player {
    /// Create a player positioned before the first row of the first order
    pub fn new(song: impl Into<SharedSong>, config: PlayerConfig) -> Self {
        let song = song.into();
        let rng = match config.random_seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        let (pool, speed, tempo, global_volume) = {
            let locked = song.lock_audio();
            (
                VoicePool::new(&locked),
                locked.initial_speed.max(1) as u32,
                locked.initial_tempo.max(MIN_TEMPO as u8) as u32,
                (locked.initial_global_volume as i32).min(GLOBAL_VOLUME_MAX),
            )
        };

        Self {
            song,
            config,
            pool,
            rng,
            hooks: Box::new(NoHooks),
            speed,
            tempo,
            tick_count: 1,
            row_count: 0,
            row_tick: 0,
            global_volume,
            current_order: 0,
            current_pattern: 0,
            row: 0,
            process_row: PROCESS_NEXT_ORDER,
            break_row: 0,
            next_order: Some(0),
            plays: 0,
            stopped: false,
            played_samples: HashSet::new(),
            played_instruments: HashSet::new(),
        }
    }

    /// Route MIDI instruments and macros to `hooks`
    pub fn with_hooks(mut self, hooks: impl SynthHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Handle to the song being played, for editing from another thread
    pub fn song(&self) -> SharedSong {
        self.song.clone()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// End playback and silence every voice
    pub fn stop(&mut self) {
        self.stopped = true;
        for voice in self.pool.iter_mut() {
            voice.stop();
        }
        self.pool.clear_background();
    }

    pub fn is_playing(&self) -> bool {
        !self.stopped
    }

    pub fn position(&self) -> Position {
        Position {
            order: self.current_order,
            pattern: self.current_pattern,
            row: self.row,
            tick: self.row_tick,
        }
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// 0-128
    pub fn global_volume(&self) -> i32 {
        self.global_volume
    }

    /// Output frames the current tick lasts
    pub fn samples_per_tick(&self) -> u32 {
        self.config.samples_per_tick(self.tempo)
    }

    /// Every voice, foreground channels first
    pub fn voices(&self) -> &VoicePool {
        &self.pool
    }

    /// Foreground voice of pattern channel `channel`
    pub fn channel(&self, channel: usize) -> Option<&Voice> {
        self.pool.channels().get(channel)
    }

    /// Number of voices currently producing sound
    pub fn active_voices(&self) -> usize {
        self.pool.iter().filter(|v| v.is_active()).count()
    }

    /// Sample slots triggered so far
    pub fn played_samples(&self) -> &HashSet<usize> {
        &self.played_samples
    }

    /// Instrument slots triggered so far
    pub fn played_instruments(&self) -> &HashSet<usize> {
        &self.played_instruments
    }

    /// Move every voice `frames` output frames forward.
    ///
    /// A mixer does this while rendering; headless callers use it to keep
    /// sample positions honest between ticks.
    pub fn advance_voices(&mut self, frames: u32) {
        for voice in self.pool.iter_mut() {
            voice.advance(frames);
        }
    }

    /// Mute or unmute a pattern channel
    pub fn set_channel_muted(&mut self, channel: usize, muted: bool) {
        if channel < MAX_CHANNELS {
            self.pool[channel]
                .flags
                .set(nether_tracker::ChannelFlags::MUTE, muted);
        }
    }

    fn uses_midi(song: &Song, voice: &Voice) -> bool {
        song.uses_instruments()
            && song
                .instrument(voice.instrument)
                .is_some_and(|ins| ins.is_midi())
    }
}
