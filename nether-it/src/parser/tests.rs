//! Decoder tests against in-memory modules

use nether_tracker::{
    ChannelFlags, DuplicateCheckAction, DuplicateCheckType, Effect, InstrumentFlags, MidiConfig,
    NOTE_OFF, NewNoteAction, ORDER_LAST, SampleData, SongFlags, VolumeEffect,
};

use super::{load_it, read_info};
use crate::LoadFlags;
use crate::error::ItError;

// =============================================================================
// Module builder
// =============================================================================

/// Assembles a minimal IT file: header, order list, parapointers, history,
/// then instrument, sample and pattern blobs in that order.
struct ItBuilder {
    header: [u8; 192],
    orders: Vec<u8>,
    instruments: Vec<Vec<u8>>,
    samples: Vec<(Vec<u8>, Vec<u8>)>,
    patterns: Vec<Vec<u8>>,
    history: u16,
    after_history: Vec<u8>,
    message: Option<Vec<u8>>,
}

impl ItBuilder {
    fn new() -> Self {
        let mut header = [0u8; 192];
        header[..4].copy_from_slice(b"IMPM");
        header[4..14].copy_from_slice(b"Test Song\0");
        header[0x1e] = 4;
        header[0x1f] = 16;
        header[0x28..0x2a].copy_from_slice(&0x0214u16.to_le_bytes());
        header[0x2a..0x2c].copy_from_slice(&0x0214u16.to_le_bytes());
        // Stereo, linear slides
        header[0x2c..0x2e].copy_from_slice(&9u16.to_le_bytes());
        header[0x2e..0x30].copy_from_slice(&6u16.to_le_bytes());
        header[0x30] = 128;
        header[0x31] = 48;
        header[0x32] = 6;
        header[0x33] = 125;
        header[0x34] = 128;
        header[0x40..0x80].fill(32);
        header[0x80..0xc0].fill(64);
        Self {
            header,
            orders: vec![0, ORDER_LAST],
            instruments: Vec::new(),
            samples: Vec::new(),
            patterns: Vec::new(),
            history: 0,
            after_history: Vec::new(),
            message: None,
        }
    }

    fn set_u16(&mut self, at: usize, value: u16) -> &mut Self {
        self.header[at..at + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn versions(&mut self, cwtv: u16, cmwt: u16) -> &mut Self {
        self.set_u16(0x28, cwtv).set_u16(0x2a, cmwt)
    }

    fn flags(&mut self, flags: u16) -> &mut Self {
        self.set_u16(0x2c, flags)
    }

    fn orders(&mut self, orders: &[u8]) -> &mut Self {
        self.orders = orders.to_vec();
        self
    }

    fn instrument(&mut self, blob: Vec<u8>) -> &mut Self {
        self.instruments.push(blob);
        self
    }

    fn sample(&mut self, header: Vec<u8>, data: Vec<u8>) -> &mut Self {
        self.samples.push((header, data));
        self
    }

    /// `rows` rows of packed data (the 8-byte pattern header is added here)
    fn pattern(&mut self, rows: u16, packed: &[u8]) -> &mut Self {
        let mut blob = Vec::new();
        blob.extend_from_slice(&(packed.len() as u16).to_le_bytes());
        blob.extend_from_slice(&rows.to_le_bytes());
        blob.extend_from_slice(&[0; 4]);
        blob.extend_from_slice(packed);
        self.patterns.push(blob);
        self
    }

    fn history(&mut self, count: u16, bytes: &[u8]) -> &mut Self {
        self.history = count;
        self.after_history = bytes.to_vec();
        self
    }

    fn message(&mut self, text: &[u8]) -> &mut Self {
        self.message = Some(text.to_vec());
        self
    }

    fn build(&self) -> Vec<u8> {
        let mut header = self.header;
        header[0x20..0x22].copy_from_slice(&(self.orders.len() as u16).to_le_bytes());
        header[0x22..0x24].copy_from_slice(&(self.instruments.len() as u16).to_le_bytes());
        header[0x24..0x26].copy_from_slice(&(self.samples.len() as u16).to_le_bytes());
        header[0x26..0x28].copy_from_slice(&(self.patterns.len() as u16).to_le_bytes());

        let pointer_count = self.instruments.len() + self.samples.len() + self.patterns.len();
        let mut offset =
            192 + self.orders.len() + 4 * pointer_count + 2 + self.after_history.len();

        let mut pointers = Vec::new();
        let mut body = Vec::new();
        for blob in &self.instruments {
            pointers.push(offset as u32);
            body.extend_from_slice(blob);
            offset += blob.len();
        }
        let mut sample_headers = Vec::new();
        for (header, _) in &self.samples {
            pointers.push(offset as u32);
            sample_headers.push(body.len());
            body.extend_from_slice(header);
            offset += header.len();
        }
        for (n, (_, data)) in self.samples.iter().enumerate() {
            let at = sample_headers[n] + 0x48;
            body[at..at + 4].copy_from_slice(&(offset as u32).to_le_bytes());
            body.extend_from_slice(data);
            offset += data.len();
        }
        for blob in &self.patterns {
            pointers.push(offset as u32);
            body.extend_from_slice(blob);
            offset += blob.len();
        }
        if let Some(text) = &self.message {
            header[0x2e] |= 1;
            header[0x36..0x38].copy_from_slice(&(text.len() as u16).to_le_bytes());
            header[0x38..0x3c].copy_from_slice(&(offset as u32).to_le_bytes());
            body.extend_from_slice(text);
            // The message must end before the file does
            body.push(0);
        }

        let mut out = header.to_vec();
        out.extend_from_slice(&self.orders);
        for p in pointers {
            out.extend_from_slice(&p.to_le_bytes());
        }
        out.extend_from_slice(&self.history.to_le_bytes());
        out.extend_from_slice(&self.after_history);
        out.extend_from_slice(&body);
        out
    }
}

/// 80-byte sample header with signed 8-bit mono data
fn sample_header(length: u32, flag: u8) -> Vec<u8> {
    let mut h = vec![0u8; 80];
    h[..4].copy_from_slice(b"IMPS");
    h[4..12].copy_from_slice(b"kick.wav");
    h[0x11] = 64;
    h[0x12] = flag;
    h[0x13] = 64;
    h[0x14..0x1a].copy_from_slice(b"Kick 1");
    h[0x2e] = 1;
    h[0x2f] = 128 | 16;
    h[0x30..0x34].copy_from_slice(&length.to_le_bytes());
    h[0x34..0x38].copy_from_slice(&1u32.to_le_bytes());
    h[0x38..0x3c].copy_from_slice(&length.to_le_bytes());
    h[0x3c..0x40].copy_from_slice(&22050u32.to_le_bytes());
    h[0x4c] = 4;
    h[0x4d] = 0xff;
    h[0x4f] = 5;
    h
}

/// Current-layout instrument with a two-node volume envelope
fn instrument_blob() -> Vec<u8> {
    let mut b = vec![0u8; 554];
    b[..4].copy_from_slice(b"IMPI");
    b[0x11] = 1;
    b[0x12] = 1;
    b[0x13] = 2;
    b[0x14..0x16].copy_from_slice(&256u16.to_le_bytes());
    b[0x16] = 8u8;
    b[0x17] = 60;
    b[0x18] = 100;
    b[0x19] = 16;
    b[0x20..0x2a].copy_from_slice(b"Lead Synth");
    for n in 0..120 {
        b[0x40 + n * 2] = n as u8;
        b[0x41 + n * 2] = 1;
    }
    // Remap the lowest key to C-5
    b[0x40] = 60;
    let env = 0x130;
    b[env] = 1 | 2;
    b[env + 1] = 2;
    b[env + 3] = 1;
    b[env + 6] = 64;
    b[env + 9] = 0;
    b[env + 10..env + 12].copy_from_slice(&10u16.to_le_bytes());
    b
}

// =============================================================================
// Header and structure
// =============================================================================

#[test]
fn test_wrong_magic_is_unsupported() {
    let mut data = ItBuilder::new().build();
    data[..4].copy_from_slice(b"XXXX");
    let err = load_it(&data, LoadFlags::empty()).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn test_short_input_is_unsupported_or_eof() {
    assert!(load_it(b"IM", LoadFlags::empty()).unwrap_err().is_unsupported());
    let err = load_it(b"IMPMshort", LoadFlags::empty()).unwrap_err();
    assert!(matches!(err, ItError::UnexpectedEof));
}

#[test]
fn test_count_limits() {
    let mut builder = ItBuilder::new();
    let mut data = builder.build();
    data[0x20..0x22].copy_from_slice(&300u16.to_le_bytes());
    let err = load_it(&data, LoadFlags::empty()).unwrap_err();
    assert!(matches!(err, ItError::TooManyOrders(300)));
    assert!(err.is_format_error());

    data = builder.orders(&[ORDER_LAST]).build();
    data[0x26..0x28].copy_from_slice(&241u16.to_le_bytes());
    let err = load_it(&data, LoadFlags::empty()).unwrap_err();
    assert!(matches!(err, ItError::TooManyPatterns(241)));
}

#[test]
fn test_minimal_module() {
    let data = ItBuilder::new().orders(&[ORDER_LAST]).build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();

    assert_eq!(song.title, "Test Song");
    assert_eq!(song.order_count(), 1);
    assert_eq!(song.order(0), ORDER_LAST);
    assert_eq!(song.order(10), ORDER_LAST);
    assert_eq!(song.pattern_count(), 0);
    assert_eq!(song.instrument_count(), 0);
    assert_eq!(song.initial_speed, 6);
    assert_eq!(song.initial_tempo, 125);
    assert!(song.uses_linear_slides());
    assert!(!song.uses_instruments());
    assert_eq!(song.midi_config, MidiConfig::default());
    assert_eq!(song.tracker_id, "Impulse Tracker 2.14");
}

#[test]
fn test_header_flag_bits() {
    let data = ItBuilder::new()
        .orders(&[ORDER_LAST])
        .flags(0x10 | 0x20 | 0x40)
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();

    assert!(song.flags.contains(SongFlags::NO_STEREO));
    assert!(song.uses_old_effects());
    assert!(song.uses_compat_gxx());
    assert!(song.flags.contains(SongFlags::MIDI_PITCHBEND));
    assert!(!song.uses_linear_slides());
    assert!(!song.uses_instruments());
    assert!(!song.flags.contains(SongFlags::EMBED_MIDI_CONFIG));
}

#[test]
fn test_header_clamps() {
    let mut data = ItBuilder::new().orders(&[ORDER_LAST]).build();
    data[0x30] = 200;
    data[0x32] = 0;
    data[0x33] = 10;
    data[0x40] = 128 | 64;
    data[0x41] = 100;
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert_eq!(song.initial_global_volume, 128);
    assert_eq!(song.initial_speed, 6);
    assert_eq!(song.initial_tempo, 31);
    assert!(song.channels[0].is_muted());
    assert_eq!(song.channels[0].panning, 256);
    assert!(song.channels[1].flags.contains(ChannelFlags::SURROUND));
}

// =============================================================================
// Patterns
// =============================================================================

#[test]
fn test_pattern_decoding_and_reuse() {
    let packed = [
        // Row 0: channel 1 with everything, channel 2 volume only
        0x81, 0x0f, 60, 1, 32, 1, 6, 0x82, 0x04, 70, 0,
        // Row 1: channel 1 repeats every field via SAME_* bits
        0x81, 0xf0, 0,
        // Row 2: channel 1 reuses the last mask (0xf0)
        0x01, 0,
        // Row 3: note off
        0x81, 0x01, 255, 0,
    ];
    let data = ItBuilder::new().pattern(4, &packed).build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    let pattern = song.pattern(0).unwrap();
    assert_eq!(pattern.rows(), 4);

    let first = *pattern.note(0, 0).unwrap();
    assert_eq!(first.note, 61);
    assert_eq!(first.instrument, 1);
    assert_eq!(first.vol_effect, VolumeEffect::Volume);
    assert_eq!(first.vol_param, 32);
    assert_eq!(first.effect, Effect::Speed);
    assert_eq!(first.param, 6);

    let fine = pattern.note(0, 1).unwrap();
    assert_eq!(fine.vol_effect, VolumeEffect::FineVolUp);
    assert_eq!(fine.vol_param, 5);

    assert_eq!(*pattern.note(1, 0).unwrap(), first);
    assert_eq!(*pattern.note(2, 0).unwrap(), first);
    assert_eq!(pattern.note(3, 0).unwrap().note, NOTE_OFF);
    assert!(pattern.note(1, 1).unwrap().is_empty());
}

#[test]
fn test_truncated_pattern_keeps_decoded_rows() {
    let packed = [0x81, 0x01, 48, 0, 0x81];
    let data = ItBuilder::new().pattern(64, &packed).build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    let pattern = song.pattern(0).unwrap();
    assert_eq!(pattern.note(0, 0).unwrap().note, 49);
    assert!(pattern.note(1, 0).unwrap().is_empty());
}

#[test]
fn test_zxx_discarded_for_old_files() {
    let packed = [0x81, 0x08, 26, 0x40, 0];

    let data = ItBuilder::new().versions(0x0200, 0x0200).pattern(1, &packed).build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert_eq!(song.pattern(0).unwrap().note(0, 0).unwrap().effect, Effect::None);

    let data = ItBuilder::new().pattern(1, &packed).build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    let note = song.pattern(0).unwrap().note(0, 0).unwrap();
    assert_eq!(note.effect, Effect::Midi);
    assert_eq!(note.param, 0x40);
}

#[test]
fn test_volume_column_demux() {
    use super::pattern::import_volume;

    assert_eq!(import_volume(64), Some((VolumeEffect::Volume, 64)));
    assert_eq!(import_volume(128), Some((VolumeEffect::Panning, 0)));
    assert_eq!(import_volume(192), Some((VolumeEffect::Panning, 64)));
    assert_eq!(import_volume(84), Some((VolumeEffect::FineVolDown, 9)));
    assert_eq!(import_volume(90), Some((VolumeEffect::VolSlideUp, 5)));
    assert_eq!(import_volume(100), Some((VolumeEffect::VolSlideDown, 5)));
    assert_eq!(import_volume(105), Some((VolumeEffect::PortaDown, 0)));
    assert_eq!(import_volume(124), Some((VolumeEffect::PortaUp, 9)));
    assert_eq!(import_volume(195), Some((VolumeEffect::TonePorta, 2)));
    assert_eq!(import_volume(212), Some((VolumeEffect::VibratoDepth, 9)));
    assert_eq!(import_volume(125), None);
    assert_eq!(import_volume(213), None);
}

// =============================================================================
// Instruments and samples
// =============================================================================

#[test]
fn test_sample_loading() {
    let data = ItBuilder::new()
        .sample(sample_header(4, 1 | 16), vec![1, 2, 0xfe, 4])
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    let sample = song.sample(1).unwrap();

    assert_eq!(sample.name, "Kick 1");
    assert_eq!(sample.filename, "kick.wav");
    assert_eq!(sample.length, 4);
    assert_eq!(sample.c5speed, 22050);
    assert_eq!(sample.volume, 256);
    assert_eq!(sample.panning, 64);
    assert_eq!(sample.vib_depth, 0x7f);
    assert!(sample.flags.contains(ChannelFlags::PANNING));
    assert!(sample.has_loop());
    assert_eq!(sample.data, SampleData::Pcm8(vec![1, 2, -2, 4]));
    assert_eq!(song.sample_count(), 1);
}

#[test]
fn test_sample_without_data_has_zero_length() {
    let data = ItBuilder::new().sample(sample_header(100, 0), Vec::new()).build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    let sample = song.sample(1).unwrap();
    assert_eq!(sample.length, 0);
    assert!(!sample.has_data());
}

#[test]
fn test_truncated_sample_data_is_zero_filled() {
    let data = ItBuilder::new()
        .sample(sample_header(8, 1), vec![5, 6, 7])
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert_eq!(
        song.sample(1).unwrap().data,
        SampleData::Pcm8(vec![5, 6, 7, 0, 0, 0, 0, 0])
    );
}

#[test]
fn test_instrument_loading() {
    let data = ItBuilder::new().flags(9 | 4).instrument(instrument_blob()).build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert!(song.uses_instruments());

    let ins = song.instrument(1).unwrap();
    assert_eq!(ins.name, "Lead Synth");
    assert_eq!(ins.nna, NewNoteAction::Continue);
    assert_eq!(ins.dct, DuplicateCheckType::Note);
    assert_eq!(ins.dca, DuplicateCheckAction::NoteFade);
    assert_eq!(ins.fadeout, 256 << 5);
    assert_eq!(ins.pitch_pan_separation, 8);
    assert_eq!(ins.pitch_pan_center, 60);
    assert_eq!(ins.global_volume, 100);
    assert_eq!(ins.panning, 64);
    assert!(ins.flags.contains(InstrumentFlags::SET_PANNING));

    assert_eq!(ins.note_map[0], 61);
    assert_eq!(ins.note_map[12], 13);
    assert_eq!(ins.sample_for_note(13), 1);

    assert!(ins.flags.contains(InstrumentFlags::VOLUME));
    assert!(ins.flags.contains(InstrumentFlags::VOL_LOOP));
    assert!(!ins.flags.contains(InstrumentFlags::PANNING));
    assert_eq!(ins.vol_env.nodes.len(), 2);
    assert_eq!(ins.vol_env.nodes[0].value, 64);
    assert_eq!(ins.vol_env.nodes[1].tick, 10);
    assert_eq!(ins.vol_env.loop_end, 1);
    assert_eq!(song.tracker_id, "Impulse Tracker 2.14");
}

#[test]
fn test_old_instrument_layout() {
    let mut b = vec![0u8; 554];
    b[..4].copy_from_slice(b"IMPI");
    // Envelope on, sustain on
    b[0x11] = 1 | 4;
    b[0x18..0x1a].copy_from_slice(&100u16.to_le_bytes());
    b[0x1a] = 3;
    b[0x1b] = 1;
    for n in 0..120 {
        b[0x40 + n * 2] = n as u8;
        b[0x41 + n * 2] = 2;
    }
    let points = 0x1f8;
    b[points..points + 6].copy_from_slice(&[0, 64, 20, 32, 40, 0]);
    b[points + 6] = 0xff;

    let data = ItBuilder::new()
        .versions(0x0100, 0x0100)
        .flags(9 | 4)
        .instrument(b)
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    let ins = song.instrument(1).unwrap();

    assert_eq!(ins.nna, NewNoteAction::NoteFade);
    assert_eq!(ins.dct, DuplicateCheckType::Note);
    assert_eq!(ins.dca, DuplicateCheckAction::Cut);
    assert_eq!(ins.fadeout, 100 << 6);
    assert_eq!(ins.pitch_pan_center, 60);
    assert!(ins.flags.contains(InstrumentFlags::VOLUME));
    assert!(ins.flags.contains(InstrumentFlags::VOL_SUSTAIN));
    assert_eq!(ins.vol_env.nodes.len(), 3);
    assert_eq!(ins.vol_env.nodes[2].tick, 40);
    assert_eq!(ins.sample_for_note(61), 2);
}

#[test]
fn test_load_flags_skip_sections() {
    let data = ItBuilder::new()
        .sample(sample_header(4, 1), vec![1, 2, 3, 4])
        .pattern(1, &[0x81, 0x01, 60, 0])
        .build();

    let song = load_it(&data, LoadFlags::NO_SAMPLES | LoadFlags::NO_PATTERNS).unwrap();
    assert!(!song.sample(1).unwrap().has_data());
    assert_eq!(song.pattern_count(), 0);
    assert_eq!(song.pattern_rows(0), 64);

    let song = load_it(&data, LoadFlags::NO_PATTERNS).unwrap();
    assert!(song.sample(1).unwrap().has_data());
}

// =============================================================================
// History, MIDI and message
// =============================================================================

#[test]
fn test_garbage_history_is_ignored() {
    let data = ItBuilder::new()
        .orders(&[ORDER_LAST])
        .history(0xffff, &[1, 2, 3, 4])
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert_eq!(song.midi_config, MidiConfig::default());
}

#[test]
fn test_embedded_midi_config() {
    let mut raw = vec![0u8; MidiConfig::SIZE];
    raw[..4].copy_from_slice(b"FF 0");
    raw[9 * 32..9 * 32 + 7].copy_from_slice(b"F0F000z");
    raw[25 * 32..25 * 32 + 4].copy_from_slice(b"F0F1");

    let mut history = vec![0u8; 16];
    history.extend_from_slice(&raw);
    let data = ItBuilder::new()
        .flags(9 | 128)
        .orders(&[ORDER_LAST])
        .history(2, &history)
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert_eq!(song.midi_config.start, "FF 0");
    assert_eq!(song.midi_config.sfx[0], "F0F000z");
    assert_eq!(song.midi_config.zxx[0], "F0F1");
    assert_eq!(song.midi_config.zxx[1], "");
}

#[test]
fn test_message() {
    let data = ItBuilder::new()
        .orders(&[ORDER_LAST])
        .message(b"Hello\rWorld")
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert_eq!(song.message, "Hello\nWorld");
}

#[test]
fn test_bero_marker() {
    let data = ItBuilder::new()
        .orders(&[ORDER_LAST])
        .history(0, b"MODU")
        .build();
    let song = load_it(&data, LoadFlags::empty()).unwrap();
    assert_eq!(song.tracker_id, "BeroTracker");
}

#[test]
fn test_read_info() {
    let data = ItBuilder::new().orders(&[ORDER_LAST]).build();
    let (title, description) = read_info(&data).unwrap();
    assert_eq!(title, "Test Song");
    assert_eq!(description, "Compressed Impulse Tracker");
    assert!(read_info(b"IMPM").is_none());
    assert!(read_info(&[0u8; 64]).is_none());
}
