use log::debug;

use crate::host::{AudioBackend, PlayerId, StreamId};

pub const SOUND_CACHE_SIZE: usize = 16;

/// Reference to a cache slot. A handle whose slot has since been evicted
/// fails the generation check and resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHandle {
    slot: usize,
    generation: u64,
}

#[derive(Debug)]
struct CacheEntry {
    name: String,
    generation: u64,
    one_shot: Option<StreamId>,
    looping: Option<StreamId>,
    player: Option<PlayerId>,
}

impl CacheEntry {
    fn release(self, audio: &mut dyn AudioBackend) {
        if let Some(player) = self.player {
            audio.stop(player);
        }
        for stream in [self.one_shot, self.looping].into_iter().flatten() {
            audio.release_stream(stream);
        }
    }
}

/// Fixed ring of decode streams. New names overwrite the slot under the
/// cursor, so eviction order is insertion order.
#[derive(Debug)]
pub struct SoundCache {
    slots: Vec<Option<CacheEntry>>,
    cursor: usize,
    next_generation: u64,
}

impl Default for SoundCache {
    fn default() -> Self {
        Self::new(SOUND_CACHE_SIZE)
    }
}

impl SoundCache {
    pub fn new(capacity: usize) -> Self {
        SoundCache {
            slots: (0..capacity.max(1)).map(|_| None).collect(),
            cursor: 0,
            next_generation: 1,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<CacheHandle> {
        self.slots.iter().enumerate().find_map(|(slot, entry)| match entry {
            Some(entry) if entry.name == name => Some(CacheHandle {
                slot,
                generation: entry.generation,
            }),
            _ => None,
        })
    }

    pub fn is_live(&self, handle: CacheHandle) -> bool {
        self.entry(handle).is_some()
    }

    /// Returns the slot caching `name`, evicting the slot under the cursor
    /// when the name is not cached yet.
    pub fn acquire(&mut self, name: &str, audio: &mut dyn AudioBackend) -> CacheHandle {
        if let Some(handle) = self.lookup(name) {
            return handle;
        }
        let slot = self.cursor;
        self.cursor = (self.cursor + 1) % self.slots.len();
        if let Some(evicted) = self.slots[slot].take() {
            debug!("evicting cached sound {} from slot {slot}", evicted.name);
            evicted.release(audio);
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots[slot] = Some(CacheEntry {
            name: name.to_string(),
            generation,
            one_shot: None,
            looping: None,
            player: None,
        });
        CacheHandle { slot, generation }
    }

    /// Stream for the requested loop mode, created on first use.
    pub fn stream(
        &mut self,
        handle: CacheHandle,
        looping: bool,
        audio: &mut dyn AudioBackend,
    ) -> Option<StreamId> {
        let entry = self.entry_mut(handle)?;
        let cached = if looping {
            &mut entry.looping
        } else {
            &mut entry.one_shot
        };
        if cached.is_none() {
            *cached = audio.create_stream(&entry.name, looping);
        }
        *cached
    }

    pub fn player(&self, handle: CacheHandle) -> Option<PlayerId> {
        self.entry(handle)?.player
    }

    pub fn set_player(&mut self, handle: CacheHandle, player: Option<PlayerId>) {
        if let Some(entry) = self.entry_mut(handle) {
            entry.player = player;
        }
    }

    pub fn stop_player(&mut self, handle: CacheHandle, audio: &mut dyn AudioBackend) {
        if let Some(player) = self.entry_mut(handle).and_then(|entry| entry.player.take()) {
            audio.stop(player);
        }
    }

    pub fn clear(&mut self, audio: &mut dyn AudioBackend) {
        for slot in self.slots.iter_mut() {
            if let Some(entry) = slot.take() {
                entry.release(audio);
            }
        }
        self.cursor = 0;
    }

    fn entry(&self, handle: CacheHandle) -> Option<&CacheEntry> {
        self.slots
            .get(handle.slot)?
            .as_ref()
            .filter(|entry| entry.generation == handle.generation)
    }

    fn entry_mut(&mut self, handle: CacheHandle) -> Option<&mut CacheEntry> {
        self.slots
            .get_mut(handle.slot)?
            .as_mut()
            .filter(|entry| entry.generation == handle.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingAudioBackend;

    #[test]
    fn eviction_follows_the_cursor_and_invalidates_handles() {
        let mut audio = RecordingAudioBackend::new();
        let mut cache = SoundCache::new(2);
        let a = cache.acquire("0001a", &mut audio);
        let b = cache.acquire("0002b", &mut audio);
        assert_eq!(cache.acquire("0001a", &mut audio), a);

        let stream = cache.stream(a, false, &mut audio).unwrap();
        let player = audio.play(stream, 100, 0, false);
        cache.set_player(a, Some(player));

        let c = cache.acquire("0003c", &mut audio);
        assert!(!cache.is_live(a));
        assert!(cache.is_live(b));
        assert!(cache.is_live(c));
        assert!(cache.player(a).is_none());
        assert!(!audio.is_playing(player));
        assert_eq!(audio.live_streams(), 0);

        cache.acquire("0004d", &mut audio);
        assert!(!cache.is_live(b));
    }

    #[test]
    fn one_shot_and_looping_streams_are_separate() {
        let mut audio = RecordingAudioBackend::new();
        let mut cache = SoundCache::default();
        let handle = cache.acquire("0007rain", &mut audio);
        let once = cache.stream(handle, false, &mut audio).unwrap();
        let looped = cache.stream(handle, true, &mut audio).unwrap();
        assert_ne!(once, looped);
        assert_eq!(cache.stream(handle, true, &mut audio), Some(looped));
        cache.clear(&mut audio);
        assert_eq!(audio.live_streams(), 0);
    }
}
