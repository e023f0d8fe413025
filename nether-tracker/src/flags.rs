//! Bit flag sets shared by the song model and the player

// =============================================================================
// Song flags
// =============================================================================

bitflags::bitflags! {
    /// Song-wide behaviour flags decoded from the module header
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct SongFlags: u16 {
        /// Module was saved as mono
        const NO_STEREO = 0x0001;
        /// Instruments are used (otherwise samples are played directly)
        const INSTRUMENT_MODE = 0x0002;
        /// Linear frequency slides (otherwise Amiga period slides)
        const LINEAR_SLIDES = 0x0004;
        /// IT "old effects" compatibility
        const OLD_EFFECTS = 0x0008;
        /// Gxx shares memory with Exx/Fxx
        const COMPAT_GXX = 0x0010;
        /// MIDI macro configuration is embedded in the file
        const EMBED_MIDI_CONFIG = 0x0020;
        /// MIDI pitch bend enabled (pitch wheel depth is valid)
        const MIDI_PITCHBEND = 0x0040;
    }
}

// =============================================================================
// Channel / voice flags
// =============================================================================

bitflags::bitflags! {
    /// Flags carried by samples, channel settings and playing voices.
    ///
    /// A sample contributes the bits in [`ChannelFlags::SAMPLE_FLAGS`]; the rest
    /// is runtime state owned by the player.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct ChannelFlags: u32 {
        const SIXTEEN_BIT = 0x01;
        const LOOP = 0x02;
        const PINGPONG_LOOP = 0x04;
        const SUSTAIN_LOOP = 0x08;
        const PINGPONG_SUSTAIN = 0x10;
        /// Sample carries a default panning
        const PANNING = 0x20;
        const STEREO = 0x40;
        /// Ping-pong loop is currently playing backwards
        const PINGPONG_FLAG = 0x80;
        const MUTE = 0x100;
        const KEY_OFF = 0x200;
        const NOTE_FADE = 0x400;
        const SURROUND = 0x800;
        const FILTER = 0x4000;
        const VIBRATO = 0x1_0000;
        const TREMOLO = 0x2_0000;
        const PANBRELLO = 0x4_0000;
        const PORTAMENTO = 0x8_0000;
        const GLISSANDO = 0x10_0000;
        const VOL_ENV = 0x20_0000;
        const PAN_ENV = 0x40_0000;
        const PITCH_ENV = 0x80_0000;
        const FAST_VOL_RAMP = 0x100_0000;
        /// Muted voice that should be unmuted when reused as a background voice
        const NNA_MUTE = 0x1000_0000;
        const ADLIB = 0x2000_0000;

        /// Bits copied from a sample when it is loaded into a voice
        const SAMPLE_FLAGS = Self::SIXTEEN_BIT.bits()
            | Self::LOOP.bits()
            | Self::PINGPONG_LOOP.bits()
            | Self::SUSTAIN_LOOP.bits()
            | Self::PINGPONG_SUSTAIN.bits()
            | Self::PANNING.bits()
            | Self::STEREO.bits()
            | Self::PINGPONG_FLAG.bits()
            | Self::ADLIB.bits();
    }
}

// =============================================================================
// Instrument / envelope flags
// =============================================================================

bitflags::bitflags! {
    /// Per-instrument envelope switches and misc instrument bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct InstrumentFlags: u16 {
        const VOLUME = 0x0001;
        const VOL_SUSTAIN = 0x0002;
        const VOL_LOOP = 0x0004;
        const PANNING = 0x0008;
        const PAN_SUSTAIN = 0x0010;
        const PAN_LOOP = 0x0020;
        const PITCH = 0x0040;
        const PITCH_SUSTAIN = 0x0080;
        const PITCH_LOOP = 0x0100;
        /// Instrument default panning overrides the channel panning
        const SET_PANNING = 0x0200;
        /// Pitch envelope drives the filter instead of the pitch
        const FILTER = 0x0400;
        const VOL_CARRY = 0x0800;
        const PAN_CARRY = 0x1000;
        const PITCH_CARRY = 0x2000;
        const MUTE = 0x4000;
    }
}
