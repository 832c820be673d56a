use std::collections::VecDeque;

use vcruise_formats::SavedAmbientSound;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientSound {
    pub name: String,
    pub volume: i32,
    pub balance: i32,
    /// Play once every `frequency` scene changes.
    pub frequency: u32,
    pub scene_changes_remaining: u32,
}

impl AmbientSound {
    pub fn new(name: impl Into<String>, volume: i32, balance: i32, frequency: u32) -> Self {
        AmbientSound {
            name: name.into(),
            volume,
            balance,
            frequency,
            scene_changes_remaining: frequency,
        }
    }
}

/// Ambient sounds waiting their turn, rotated on scene changes.
#[derive(Debug, Clone, Default)]
pub struct AmbientRotation {
    queue: VecDeque<AmbientSound>,
}

impl AmbientRotation {
    pub fn add(&mut self, sound: AmbientSound) {
        self.remove(&sound.name);
        self.queue.push_back(sound);
    }

    pub fn remove(&mut self, name: &str) {
        self.queue.retain(|sound| !sound.name.eq_ignore_ascii_case(name));
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AmbientSound> {
        self.queue.iter()
    }

    /// Counts one completed scene change. Returns the sound whose countdown
    /// ran out; it moves to the tail with its countdown restarted.
    pub fn on_scene_change(&mut self) -> Option<AmbientSound> {
        for sound in self.queue.iter_mut() {
            sound.scene_changes_remaining = sound.scene_changes_remaining.saturating_sub(1);
        }
        let due = self
            .queue
            .iter()
            .position(|sound| sound.scene_changes_remaining == 0)?;
        let mut sound = self.queue.remove(due)?;
        sound.scene_changes_remaining = sound.frequency.saturating_sub(1);
        self.queue.push_back(sound.clone());
        Some(sound)
    }

    pub fn to_saved(&self) -> Vec<SavedAmbientSound> {
        self.queue
            .iter()
            .map(|sound| SavedAmbientSound {
                name: sound.name.clone(),
                volume: sound.volume,
                balance: sound.balance,
                frequency: sound.frequency,
                scene_changes_remaining: sound.scene_changes_remaining,
            })
            .collect()
    }

    pub fn restore(&mut self, saved: &[SavedAmbientSound]) {
        self.queue = saved
            .iter()
            .map(|sound| AmbientSound {
                name: sound.name.clone(),
                volume: sound.volume,
                balance: sound.balance,
                frequency: sound.frequency,
                scene_changes_remaining: sound.scene_changes_remaining,
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sounds_play_on_their_frequency_and_requeue_at_tail() {
        let mut rotation = AmbientRotation::default();
        rotation.add(AmbientSound::new("0100wind", 60, 0, 2));
        rotation.add(AmbientSound::new("0101bird", 40, 10, 3));

        assert_eq!(rotation.on_scene_change(), None);
        let first = rotation.on_scene_change().unwrap();
        assert_eq!(first.name, "0100wind");
        assert_eq!(first.scene_changes_remaining, 1);
        assert_eq!(rotation.iter().last().map(|s| s.name.as_str()), Some("0100wind"));

        let second = rotation.on_scene_change().unwrap();
        assert_eq!(second.name, "0101bird");
        let third = rotation.on_scene_change().unwrap();
        assert_eq!(third.name, "0100wind");
    }

    #[test]
    fn adding_a_sound_again_replaces_it() {
        let mut rotation = AmbientRotation::default();
        rotation.add(AmbientSound::new("0100wind", 60, 0, 2));
        rotation.add(AmbientSound::new("0100WIND", 30, 0, 4));
        assert_eq!(rotation.len(), 1);
        rotation.remove("0100wind");
        assert!(rotation.is_empty());
    }
}
