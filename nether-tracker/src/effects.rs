//! Effect command and volume-column command kinds
//!
//! Both enums are stored in [`crate::Note`] exactly as decoded. The numbering of
//! [`Effect`] follows the classic Modplug command numbering so raw command bytes
//! from older tools map onto the same values.

/// Effect column command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum Effect {
    #[default]
    None = 0,
    Arpeggio = 1,
    PortaUp = 2,
    PortaDown = 3,
    TonePorta = 4,
    Vibrato = 5,
    TonePortaVol = 6,
    VibratoVol = 7,
    Tremolo = 8,
    Panning = 9,
    Offset = 10,
    VolumeSlide = 11,
    PositionJump = 12,
    Volume = 13,
    PatternBreak = 14,
    Retrig = 15,
    Speed = 16,
    Tempo = 17,
    Tremor = 18,
    /// The S command family (S0x..SFx)
    Special = 20,
    ChannelVolume = 21,
    ChannelVolSlide = 22,
    GlobalVolume = 23,
    GlobalVolSlide = 24,
    /// Key off after `param` ticks
    KeyOff = 25,
    FineVibrato = 26,
    Panbrello = 27,
    /// Extra-fine portamento (handled through PortaUp/PortaDown E-nibble)
    ExtraFinePorta = 28,
    PanningSlide = 29,
    SetEnvPosition = 30,
    /// Zxx / SFx MIDI macro
    Midi = 31,
    NoteSlideUp = 32,
    NoteSlideDown = 33,
}

impl Effect {
    /// IT effect letters A..Z in order
    const IT_LETTERS: [Effect; 26] = [
        Effect::Speed,
        Effect::PositionJump,
        Effect::PatternBreak,
        Effect::VolumeSlide,
        Effect::PortaDown,
        Effect::PortaUp,
        Effect::TonePorta,
        Effect::Vibrato,
        Effect::Tremor,
        Effect::Arpeggio,
        Effect::VibratoVol,
        Effect::TonePortaVol,
        Effect::ChannelVolume,
        Effect::ChannelVolSlide,
        Effect::Offset,
        Effect::PanningSlide,
        Effect::Retrig,
        Effect::Tremolo,
        Effect::Special,
        Effect::Tempo,
        Effect::FineVibrato,
        Effect::GlobalVolume,
        Effect::GlobalVolSlide,
        Effect::Panning,
        Effect::Panbrello,
        Effect::Midi,
    ];

    /// Convert an IT command byte (1 = A .. 26 = Z). Anything else is [`Effect::None`].
    pub fn from_it_command(cmd: u8) -> Self {
        match cmd {
            1..=26 => Self::IT_LETTERS[(cmd - 1) as usize],
            _ => Self::None,
        }
    }

    /// Inverse of [`Effect::from_it_command`]; 0 for effects IT cannot express.
    pub fn to_it_command(self) -> u8 {
        Self::IT_LETTERS
            .iter()
            .position(|&e| e == self)
            .map_or(0, |i| i as u8 + 1)
    }

    /// Effect letter for display ('.' when there is none)
    pub fn letter(self) -> char {
        match self.to_it_command() {
            0 if self == Self::None => '.',
            0 => '?',
            n => (b'A' + n - 1) as char,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Arpeggio,
            2 => Self::PortaUp,
            3 => Self::PortaDown,
            4 => Self::TonePorta,
            5 => Self::Vibrato,
            6 => Self::TonePortaVol,
            7 => Self::VibratoVol,
            8 => Self::Tremolo,
            9 => Self::Panning,
            10 => Self::Offset,
            11 => Self::VolumeSlide,
            12 => Self::PositionJump,
            13 => Self::Volume,
            14 => Self::PatternBreak,
            15 => Self::Retrig,
            16 => Self::Speed,
            17 => Self::Tempo,
            18 => Self::Tremor,
            20 => Self::Special,
            21 => Self::ChannelVolume,
            22 => Self::ChannelVolSlide,
            23 => Self::GlobalVolume,
            24 => Self::GlobalVolSlide,
            25 => Self::KeyOff,
            26 => Self::FineVibrato,
            27 => Self::Panbrello,
            28 => Self::ExtraFinePorta,
            29 => Self::PanningSlide,
            30 => Self::SetEnvPosition,
            31 => Self::Midi,
            32 => Self::NoteSlideUp,
            33 => Self::NoteSlideDown,
            _ => Self::None,
        }
    }

    /// Effects that change the playback position or row timing
    pub fn is_global(self) -> bool {
        matches!(
            self,
            Self::Speed
                | Self::Tempo
                | Self::PositionJump
                | Self::PatternBreak
                | Self::GlobalVolume
                | Self::GlobalVolSlide
        )
    }
}

/// Volume column command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum VolumeEffect {
    #[default]
    None = 0,
    Volume = 1,
    Panning = 2,
    VolSlideUp = 3,
    VolSlideDown = 4,
    FineVolUp = 5,
    FineVolDown = 6,
    VibratoSpeed = 7,
    VibratoDepth = 8,
    PanSlideLeft = 9,
    PanSlideRight = 10,
    TonePorta = 11,
    PortaUp = 12,
    PortaDown = 13,
}

impl VolumeEffect {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Volume,
            2 => Self::Panning,
            3 => Self::VolSlideUp,
            4 => Self::VolSlideDown,
            5 => Self::FineVolUp,
            6 => Self::FineVolDown,
            7 => Self::VibratoSpeed,
            8 => Self::VibratoDepth,
            9 => Self::PanSlideLeft,
            10 => Self::PanSlideRight,
            11 => Self::TonePorta,
            12 => Self::PortaUp,
            13 => Self::PortaDown,
            _ => Self::None,
        }
    }
}
