//! MIDI macro configuration

/// Length of one macro slot on disk
pub const MACRO_LEN: usize = 32;

/// Global, SFx and Zxx macro strings.
///
/// Each macro is a short ASCII program (hex digits plus placeholder letters)
/// interpreted by the player when a `Zxx` effect fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiConfig {
    pub start: String,
    pub stop: String,
    pub tick: String,
    pub note_on: String,
    pub note_off: String,
    pub set_volume: String,
    pub set_panning: String,
    pub set_bank: String,
    pub set_program: String,
    /// Parameterised macros selected by SFx
    pub sfx: [String; 16],
    /// Fixed macros for Z80..ZFF
    pub zxx: [String; 128],
}

impl MidiConfig {
    /// Size of the block as stored after the IT header
    pub const SIZE: usize = (9 + 16 + 128) * MACRO_LEN;

    /// Parse the on-disk block: nine global slots, 16 SFx slots, 128 Zxx slots,
    /// each a zero-padded 32-byte string.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let slot = |i: usize| {
            let raw = &data[i * MACRO_LEN..(i + 1) * MACRO_LEN];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(MACRO_LEN);
            String::from_utf8_lossy(&raw[..end]).into_owned()
        };
        Some(Self {
            start: slot(0),
            stop: slot(1),
            tick: slot(2),
            note_on: slot(3),
            note_off: slot(4),
            set_volume: slot(5),
            set_panning: slot(6),
            set_bank: slot(7),
            set_program: slot(8),
            sfx: std::array::from_fn(|i| slot(9 + i)),
            zxx: std::array::from_fn(|i| slot(25 + i)),
        })
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        let mut sfx: [String; 16] = Default::default();
        sfx[0] = "F0F000z".to_string();
        let zxx = std::array::from_fn(|i| {
            if i < 16 {
                format!("F0F001{:02X}", i * 8)
            } else {
                String::new()
            }
        });
        Self {
            start: "FF".to_string(),
            stop: "FC".to_string(),
            tick: String::new(),
            note_on: "9c n v".to_string(),
            note_off: "9c n 0".to_string(),
            set_volume: String::new(),
            set_panning: String::new(),
            set_bank: String::new(),
            set_program: "Cc p".to_string(),
            sfx,
            zxx,
        }
    }
}
