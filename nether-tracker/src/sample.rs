//! Sample data structures

use crate::flags::ChannelFlags;

/// Auto-vibrato waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum VibratoType {
    #[default]
    Sine = 0,
    RampDown = 1,
    Square = 2,
    Random = 3,
}

impl VibratoType {
    pub fn from_u8(value: u8) -> Self {
        match value & 3 {
            1 => Self::RampDown,
            2 => Self::Square,
            3 => Self::Random,
            _ => Self::Sine,
        }
    }
}

/// Decoded PCM. Stereo data is interleaved L/R.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SampleData {
    #[default]
    Empty,
    Pcm8(Vec<i8>),
    Pcm16(Vec<i16>),
}

impl SampleData {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Pcm8(d) => d.is_empty(),
            Self::Pcm16(d) => d.is_empty(),
        }
    }

    /// Number of stored values (frames times channels)
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Pcm8(d) => d.len(),
            Self::Pcm16(d) => d.len(),
        }
    }
}

/// A sample slot
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub filename: String,
    /// Length in frames
    pub length: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sustain_start: u32,
    pub sustain_end: u32,
    /// Playback rate of C-5
    pub c5speed: u32,
    /// Default panning (0-256), used when [`ChannelFlags::PANNING`] is set
    pub panning: u16,
    /// Default volume (0-256)
    pub volume: u16,
    /// Global volume (0-64)
    pub global_volume: u8,
    /// Sample-level flags (a subset of [`ChannelFlags::SAMPLE_FLAGS`])
    pub flags: ChannelFlags,
    pub vib_type: VibratoType,
    pub vib_rate: u8,
    pub vib_depth: u8,
    pub vib_speed: u8,
    pub data: SampleData,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: String::new(),
            filename: String::new(),
            length: 0,
            loop_start: 0,
            loop_end: 0,
            sustain_start: 0,
            sustain_end: 0,
            c5speed: 8363,
            panning: 128,
            volume: 256,
            global_volume: 64,
            flags: ChannelFlags::empty(),
            vib_type: VibratoType::Sine,
            vib_rate: 0,
            vib_depth: 0,
            vib_speed: 0,
            data: SampleData::Empty,
        }
    }
}

impl Sample {
    pub fn has_data(&self) -> bool {
        self.length > 0 && !self.data.is_empty()
    }

    pub fn is_stereo(&self) -> bool {
        self.flags.contains(ChannelFlags::STEREO)
    }

    pub fn is_16bit(&self) -> bool {
        self.flags.contains(ChannelFlags::SIXTEEN_BIT)
    }

    /// True when the normal loop is enabled and non-empty
    pub fn has_loop(&self) -> bool {
        self.flags.contains(ChannelFlags::LOOP) && self.loop_end > self.loop_start
    }
}
