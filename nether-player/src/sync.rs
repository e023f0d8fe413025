//! Song sharing between an editor thread and the audio thread
//!
//! Structural edits (orders, patterns, samples) take the same lock the player
//! holds for the duration of one tick, so the audio thread never observes a
//! half-edited song. Voice state is not shared and needs no locking.

use std::sync::{Arc, Mutex, MutexGuard};

use nether_tracker::Song;

/// Guard returned by [`SharedSong::lock_audio`]; playback pauses while it is held
pub type AudioLock<'a> = MutexGuard<'a, Song>;

/// Reference-counted, lock-protected song
#[derive(Clone, Debug, Default)]
pub struct SharedSong(Arc<Mutex<Song>>);

impl SharedSong {
    pub fn new(song: Song) -> Self {
        Self(Arc::new(Mutex::new(song)))
    }

    /// Take the audio lock.
    ///
    /// A panic while the lock was held leaves the song as it was at that
    /// point; playback carries on with it rather than propagating the poison.
    pub fn lock_audio(&self) -> AudioLock<'_> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `edit` with the audio lock held
    pub fn edit<R>(&self, edit: impl FnOnce(&mut Song) -> R) -> R {
        let mut song = self.lock_audio();
        edit(&mut song)
    }

    /// Swap in a different song, returning the old one
    pub fn replace(&self, song: Song) -> Song {
        std::mem::replace(&mut *self.lock_audio(), song)
    }
}

impl From<Song> for SharedSong {
    fn from(song: Song) -> Self {
        Self::new(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_is_visible_to_other_handles() {
        let shared = SharedSong::new(Song::default());
        let editor = shared.clone();
        std::thread::spawn(move || {
            editor.edit(|song| song.orderlist = vec![0, 1, 255]);
        })
        .join()
        .unwrap();
        assert_eq!(shared.lock_audio().orderlist, vec![0, 1, 255]);
    }

    #[test]
    fn test_poisoned_lock_still_usable() {
        let shared = SharedSong::new(Song::default());
        let editor = shared.clone();
        let result = std::thread::spawn(move || {
            editor.edit(|song| {
                song.title = "half".to_string();
                panic!("editor crashed");
            })
        })
        .join();
        assert!(result.is_err());
        assert_eq!(shared.lock_audio().title, "half");
    }

    #[test]
    fn test_replace_returns_previous() {
        let shared = SharedSong::new(Song {
            title: "old".to_string(),
            ..Default::default()
        });
        let old = shared.replace(Song::default());
        assert_eq!(old.title, "old");
        assert!(shared.lock_audio().title.is_empty());
    }
}
