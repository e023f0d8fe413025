//! Nether-IT: Impulse Tracker module decoder
//!
//! Decodes `.it` files into a [`nether_tracker::Song`]. Every multi-byte field
//! is read little-endian through a bounds-checked cursor; counts and values
//! are clamped the way Impulse Tracker itself tolerates them.
//!
//! # IT Format Overview
//!
//! IT files contain:
//! - A 192-byte header (counts, flags, initial speed/tempo, channel tables)
//! - The order list and three parapointer tables (instruments, samples, patterns)
//! - Optional save history, embedded MIDI macros and a song message
//! - Instrument records (pre-2.00 or current layout) with envelopes
//! - Sample headers and PCM data (plain, delta, or IT 2.14/2.15 compressed)
//! - Packed pattern data
//!
//! # Usage
//!
//! ```ignore
//! use nether_it::{load_it, LoadFlags};
//!
//! let data = std::fs::read("song.it")?;
//! let song = load_it(&data, LoadFlags::empty())?;
//! println!("{} ({})", song.title, song.tracker_id);
//! ```
//!
//! # Format Reference
//!
//! - Impulse Tracker Technical Specification (ITTECH.TXT)

mod compression;
mod error;
mod parser;
mod sample_data;
mod tracker_id;

pub use compression::{decompress_16bit, decompress_8bit};
pub use error::ItError;
pub use parser::{load_it, read_info};
pub use sample_data::{BitDepth, ChannelLayout, Encoding, SampleFormat, read_sample};

// =============================================================================
// Constants
// =============================================================================

/// IT format magic string "IMPM"
pub const IT_MAGIC: &[u8; 4] = b"IMPM";

/// Instrument magic string "IMPI"
pub const INSTRUMENT_MAGIC: &[u8; 4] = b"IMPI";

/// Sample magic string "IMPS"
pub const SAMPLE_MAGIC: &[u8; 4] = b"IMPS";

// =============================================================================
// Load flags
// =============================================================================

bitflags::bitflags! {
    /// Parts of the file to skip for quick metadata scans
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LoadFlags: u8 {
        /// Skip instruments, sample headers and sample data
        const NO_SAMPLES = 0x01;
        /// Skip pattern data
        const NO_PATTERNS = 0x02;
    }
}
