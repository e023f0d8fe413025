//! New Note Actions and duplicate checks

use nether_tracker::{
    ChannelFlags, DuplicateCheckAction, DuplicateCheckType, Effect, MAX_INSTRUMENTS,
    NewNoteAction, NOTE_FIRST, Song, VolumeEffect, is_note,
};
use smallvec::SmallVec;
use tracing::trace;

use super::Player;
use crate::voice::Voice;

impl Player {
    /// Decide what happens to the note already playing on `channel` before
    /// `note` (with instrument `instr`, 0 = unchanged) replaces it.
    ///
    /// Outside instrument mode, or with `force_cut`, the old note is handed to
    /// a background voice that fades out at once so the cut does not click.
    /// Otherwise the duplicate check runs over the channel and its
    /// background voices, then the channel's NNA moves the old note into
    /// the background. A Cut NNA still moves it, faded to zero, so the
    /// mixer can ramp it down.
    pub(super) fn check_nna(
        &mut self,
        song: &Song,
        channel: usize,
        instr: u8,
        note: u8,
        force_cut: bool,
    ) {
        if !is_note(note) {
            return;
        }
        if !song.uses_instruments() || force_cut {
            self.fade_out_copy(channel);
            return;
        }

        // The duplicate check only runs while the channel holds an instrument
        if song.instrument(self.pool[channel].instrument).is_none() {
            return;
        }

        let instr = if instr as usize > MAX_INSTRUMENTS { 0 } else { instr };
        let mut incoming = Some(self.pool[channel].instrument);
        let mut incoming_sample = self.pool[channel].sample;
        let mut note = note;
        if instr != 0 {
            match song.instrument(instr as usize) {
                Some(ins) => {
                    incoming = Some(instr as usize);
                    incoming_sample = ins.sample_for_note(note) as usize;
                    note = ins.note_map[(note - NOTE_FIRST) as usize];
                }
                None => {
                    incoming = None;
                    incoming_sample = 0;
                }
            }
        }
        let has_data = song.sample(incoming_sample).is_some_and(|s| s.length > 0);

        let candidates: SmallVec<[usize; 16]> = std::iter::once(channel)
            .chain(self.pool.children_of(channel))
            .collect();
        for index in candidates {
            let voice = &self.pool[index];
            let Some(ins) = song.instrument(voice.instrument) else {
                continue;
            };
            let same_instrument = incoming == Some(voice.instrument);
            let duplicate = match ins.dct {
                DuplicateCheckType::Off => false,
                DuplicateCheckType::Note => same_instrument && voice.note == note,
                DuplicateCheckType::Sample => has_data && voice.sample == incoming_sample,
                DuplicateCheckType::Instrument => same_instrument,
            };
            if !duplicate {
                continue;
            }
            trace!(channel, voice = index, action = ?ins.dca, "duplicate note");
            match ins.dca {
                DuplicateCheckAction::Cut => {
                    self.pool[index].note_cut();
                    if Self::uses_midi(song, &self.pool[index]) {
                        self.hooks.note_off(index);
                    }
                }
                DuplicateCheckAction::NoteOff => self.key_off_voice(song, index),
                DuplicateCheckAction::NoteFade => {
                    self.pool[index].flags.insert(ChannelFlags::NOTE_FADE);
                }
            }
            fade_if_silent(&mut self.pool[index]);
        }

        let voice = &self.pool[channel];
        if voice.flags.contains(ChannelFlags::MUTE) || voice.length == 0 || voice.volume == 0 {
            return;
        }
        let nna = voice.nna;
        let Some(slot) = self.pool.allocate_background(channel) else {
            return;
        };

        let copy = background_copy(&self.pool[channel], channel);
        self.pool[slot] = copy;
        match nna {
            NewNoteAction::NoteOff => self.key_off_voice(song, slot),
            NewNoteAction::Cut => {
                let voice = &mut self.pool[slot];
                voice.fadeout_volume = 0;
                voice.flags.insert(ChannelFlags::NOTE_FADE);
            }
            NewNoteAction::NoteFade => self.pool[slot].flags.insert(ChannelFlags::NOTE_FADE),
            NewNoteAction::Continue => {}
        }
        fade_if_silent(&mut self.pool[slot]);
        trace!(channel, slot, ?nna, "note moved to background");
        self.pool[channel].stop();
    }

    /// Move an audible note into a background voice that is already faded
    /// to zero, freeing the channel for a hard restart.
    fn fade_out_copy(&mut self, channel: usize) {
        let voice = &self.pool[channel];
        if voice.length == 0
            || voice.flags.contains(ChannelFlags::MUTE)
            || (voice.left_volume | voice.right_volume) == 0
        {
            return;
        }
        let mut copy = background_copy(voice, channel);
        let Some(slot) = self.pool.allocate_background(channel) else {
            return;
        };
        copy.flags
            .insert(ChannelFlags::NOTE_FADE | ChannelFlags::FAST_VOL_RAMP);
        copy.fadeout_volume = 0;
        self.pool[slot] = copy;

        let voice = &mut self.pool[channel];
        voice.length = 0;
        voice.position = 0;
        voice.position_frac = 0;
    }
}

/// A voice whose volume already reached zero fades out at once.
fn fade_if_silent(voice: &mut Voice) {
    if voice.volume == 0 {
        voice.fadeout_volume = 0;
        voice.flags
            .insert(ChannelFlags::NOTE_FADE | ChannelFlags::FAST_VOL_RAMP);
    }
}

/// Background copy of a channel voice. Row data and per-tick effect state do
/// not travel; background voices only run envelopes and fades.
fn background_copy(voice: &Voice, channel: usize) -> Voice {
    let mut copy = voice.clone();
    copy.master_channel = channel + 1;
    copy.flags.remove(
        ChannelFlags::VIBRATO
            | ChannelFlags::TREMOLO
            | ChannelFlags::PANBRELLO
            | ChannelFlags::PORTAMENTO
            | ChannelFlags::MUTE,
    );
    copy.n_command = Effect::None;
    copy.row_note = 0;
    copy.row_instrument = 0;
    copy.row_vol_effect = VolumeEffect::None;
    copy.row_vol_param = 0;
    copy.row_effect = Effect::None;
    copy.row_param = 0;
    copy.portamento_target = 0;
    copy.tremolo_delta = 0;
    copy.panbrello_delta = 0;
    copy
}
