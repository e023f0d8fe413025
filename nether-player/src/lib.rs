//! Nether-Player: tick-driven playback of a [`nether_tracker::Song`]
//!
//! The player advances a song one tick at a time. Each tick it reads the
//! current row, runs both effect columns of every channel and finalises every
//! voice into the three things a mixer needs: a 16.16 sample increment and a
//! left and right gain.
//!
//! # Architecture
//!
//! - **Player** (`engine`) - song cursor, timing, effects, New Note Actions
//! - **VoicePool** (`pool`) - 64 channel voices plus 192 background voices
//! - **SharedSong** (`sync`) - lock that keeps edits and ticks apart
//! - **estimate_length** (`length`) - playtime without playing
//!
//! Rendering PCM is left to the caller; [`Player::advance_voices`] moves
//! sample positions forward when no mixer is attached.
//!
//! # Usage
//!
//! ```ignore
//! use nether_player::{Player, PlayerConfig};
//!
//! let song = nether_it::load_it(&data, nether_it::LoadFlags::empty())?;
//! let mut player = Player::new(song, PlayerConfig::default());
//! while player.process_tick() {
//!     let frames = player.samples_per_tick();
//!     mixer.render(player.voices(), frames);
//!     player.advance_voices(frames);
//! }
//! ```

mod config;
mod engine;
mod filter;
mod length;
pub mod pitch;
mod pool;
mod sync;
pub mod tables;
mod voice;

pub use config::{ConfigError, PlayerConfig};
pub use engine::{NoHooks, Player, Position, SynthHooks};
pub use filter::ResonantFilter;
pub use length::{estimate_length, estimate_length_with};
pub use pool::{VoicePool, effective_volume};
pub use sync::{AudioLock, SharedSong};
pub use voice::{EffectMemory, Voice};
