//! Sound instances, their cached decode streams, 3D positioning, volume
//! ramps, ambient rotation and background music.

mod ambient;
mod cache;
mod music;

pub use ambient::{AmbientRotation, AmbientSound};
pub use cache::{CacheHandle, SoundCache, SOUND_CACHE_SIZE};
pub use music::{MusicPlayer, ScoreTable};

use std::collections::BTreeSet;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use vcruise_formats::{SavedSound, SoundParams3D};

use crate::definitions::ListenerPose;
use crate::host::AudioBackend;

/// Volumes at or below this are inaudible.
pub const SILENT_VOLUME: i32 = 0;
pub const MAX_VOLUME: i32 = 100;
pub const MAX_BALANCE: i32 = 100;

static SOUND_ID_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})").expect("sound id pattern compiles"));

/// Numeric id encoded in the leading four digits of a wave name.
pub fn sound_id_from_name(name: &str) -> Option<u32> {
    SOUND_ID_PREFIX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Wave name with its numeric id prefix removed.
pub fn sound_name_suffix(name: &str) -> &str {
    match SOUND_ID_PREFIX.find(name) {
        Some(prefix) => &name[prefix.end()..],
        None => name,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopingState {
    NotLooping,
    Looping,
    /// Was looping; finishing the current iteration.
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VolumeRamp {
    start_volume: i32,
    end_volume: i32,
    /// Volume units per millisecond, 16.16 fixed point.
    rate: i64,
    start_time: u64,
    duration: u64,
    terminate_on_completion: bool,
}

#[derive(Debug, Clone)]
pub struct SoundInstance {
    pub name: String,
    pub id: u32,
    pub volume: i32,
    pub balance: i32,
    pub effective_volume: i32,
    pub effective_balance: i32,
    pub looping: LoopingState,
    pub is_speech: bool,
    pub is_3d: bool,
    pub x: i32,
    pub y: i32,
    pub params_3d: SoundParams3D,
    pub start_time: u64,
    pub end_time: u64,
    /// Looping sound triggered while silent; starts once it becomes audible.
    pub restart_when_audible: bool,
    pub try_to_loop_when_restarted: bool,
    ramp: Option<VolumeRamp>,
    cache: Option<CacheHandle>,
}

impl SoundInstance {
    fn new(name: String, id: u32) -> Self {
        SoundInstance {
            name,
            id,
            volume: MAX_VOLUME,
            balance: 0,
            effective_volume: MAX_VOLUME,
            effective_balance: 0,
            looping: LoopingState::NotLooping,
            is_speech: false,
            is_3d: false,
            x: 0,
            y: 0,
            params_3d: SoundParams3D::default(),
            start_time: 0,
            end_time: 0,
            restart_when_audible: false,
            try_to_loop_when_restarted: false,
            ramp: None,
            cache: None,
        }
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRequest {
    pub looping: bool,
    pub volume: i32,
    pub balance: i32,
    pub is_3d: bool,
    pub is_speech: bool,
}

impl TriggerRequest {
    pub fn one_shot(volume: i32, balance: i32) -> Self {
        TriggerRequest {
            looping: false,
            volume,
            balance,
            is_3d: false,
            is_speech: false,
        }
    }

    pub fn looping(volume: i32, balance: i32) -> Self {
        TriggerRequest {
            looping: true,
            ..Self::one_shot(volume, balance)
        }
    }

    pub fn speech(volume: i32) -> Self {
        TriggerRequest {
            is_speech: true,
            ..Self::one_shot(volume, 0)
        }
    }

    pub fn positioned(mut self) -> Self {
        self.is_3d = true;
        self
    }
}

/// Volume and balance actually sent to playback.
pub fn effective_volume_balance(sound: &SoundInstance, listener: &ListenerPose) -> (i32, i32) {
    let volume = sound.volume.clamp(SILENT_VOLUME, MAX_VOLUME);
    let balance = sound.balance.clamp(-MAX_BALANCE, MAX_BALANCE);
    if !sound.is_3d {
        return (volume, balance);
    }

    let dx = (sound.x - listener.x) as f64;
    let dy = (sound.y - listener.y) as f64;
    let distance = (dx * dx + dy * dy).sqrt();
    let min_range = sound.params_3d.min_range as f64;
    let max_range = (sound.params_3d.max_range as f64).max(min_range);

    let attenuated = if distance <= min_range {
        volume as f64
    } else if distance >= max_range {
        0.0
    } else {
        volume as f64 * (max_range - distance) / (max_range - min_range)
    };

    // Side component of the offset, positive to the listener's right,
    // scaled to three fifths of full deflection.
    let balance = if distance > 0.0 {
        let angle = (listener.angle as f64).to_radians();
        let side = (dx * angle.sin() - dy * angle.cos()) / distance;
        (side * MAX_BALANCE as f64 * 3.0 / 5.0).round() as i32
    } else {
        0
    };

    (attenuated.round() as i32, balance)
}

/// Registry of every sound referenced so far plus the shared stream cache.
#[derive(Debug, Default)]
pub struct SoundEngine {
    sounds: Vec<SoundInstance>,
    cache: SoundCache,
    listener: ListenerPose,
    ambient: AmbientRotation,
}

impl SoundEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sounds(&self) -> &[SoundInstance] {
        &self.sounds
    }

    pub fn sound(&self, index: usize) -> &SoundInstance {
        &self.sounds[index]
    }

    pub fn listener(&self) -> ListenerPose {
        self.listener
    }

    pub fn ambient(&self) -> &AmbientRotation {
        &self.ambient
    }

    pub fn ambient_mut(&mut self) -> &mut AmbientRotation {
        &mut self.ambient
    }

    pub fn find_by_id(&self, id: u32) -> Option<usize> {
        self.sounds.iter().position(|sound| sound.id == id)
    }

    /// Finds a registered sound by name, or registers it when `load` is set
    /// and the wave archive holds it.
    pub fn resolve_by_name(
        &mut self,
        name: &str,
        load: bool,
        waves: &BTreeSet<String>,
    ) -> Option<usize> {
        let key = name.to_ascii_lowercase();
        if let Some(index) = self.sounds.iter().position(|sound| sound.name == key) {
            return Some(index);
        }
        if !load {
            return None;
        }
        if !waves.contains(&key) {
            warn!("sound {name} is not in the wave archive");
            return None;
        }
        let id = sound_id_from_name(&key).unwrap_or(0);
        debug!("registering sound {key} with id {id}");
        self.sounds.push(SoundInstance::new(key, id));
        Some(self.sounds.len() - 1)
    }

    pub fn resolve_by_id(&mut self, id: u32, load: bool, waves: &BTreeSet<String>) -> Option<usize> {
        if let Some(index) = self.find_by_id(id) {
            return Some(index);
        }
        if !load {
            return None;
        }
        let prefix = format!("{id:04}");
        match waves.iter().find(|name| name.starts_with(&prefix)) {
            Some(name) => {
                let name = name.clone();
                self.resolve_by_name(&name, true, waves)
            }
            None => {
                warn!("no wave with sound id {id}");
                None
            }
        }
    }

    pub fn set_position(&mut self, index: usize, x: i32, y: i32, params: SoundParams3D) {
        let sound = &mut self.sounds[index];
        sound.x = x;
        sound.y = y;
        sound.params_3d = params;
    }

    pub fn trigger(
        &mut self,
        index: usize,
        request: TriggerRequest,
        now: u64,
        audio: &mut dyn AudioBackend,
    ) {
        let listener = self.listener;
        let sound = &mut self.sounds[index];
        sound.volume = request.volume;
        sound.balance = request.balance;
        sound.is_3d = request.is_3d;
        sound.is_speech = request.is_speech;
        sound.try_to_loop_when_restarted = request.looping;
        sound.ramp = None;
        let (volume, balance) = effective_volume_balance(sound, &listener);
        sound.effective_volume = volume;
        sound.effective_balance = balance;

        if request.looping && request.volume <= SILENT_VOLUME {
            if let Some(handle) = sound.cache {
                self.cache.stop_player(handle, audio);
            }
            let sound = &mut self.sounds[index];
            sound.restart_when_audible = true;
            sound.looping = LoopingState::Looping;
            sound.start_time = now;
            sound.end_time = 0;
            debug!("sound {} silenced until audible", sound.name);
            return;
        }
        self.sounds[index].restart_when_audible = false;

        let name = self.sounds[index].name.clone();
        let handle = match self.sounds[index].cache.filter(|h| self.cache.is_live(*h)) {
            Some(handle) => handle,
            None => self.cache.acquire(&name, audio),
        };
        self.sounds[index].cache = Some(handle);

        let current = self.cache.player(handle).filter(|p| audio.is_playing(*p));
        if request.looping && self.sounds[index].looping == LoopingState::Looping {
            if let Some(player) = current {
                audio.set_volume_balance(player, volume, balance);
                return;
            }
        }
        if current.is_some() {
            self.cache.stop_player(handle, audio);
        }

        let Some(stream) = self.cache.stream(handle, request.looping, audio) else {
            warn!("sound {name} could not be opened");
            self.sounds[index].looping = LoopingState::NotLooping;
            return;
        };
        let player = audio.play(stream, volume, balance, request.is_speech);
        self.cache.set_player(handle, Some(player));

        let sound = &mut self.sounds[index];
        sound.start_time = now;
        if request.looping {
            sound.looping = LoopingState::Looping;
            sound.end_time = 0;
        } else {
            sound.looping = LoopingState::NotLooping;
            sound.end_time = now + audio.stream_duration_ms(stream);
        }
    }

    /// Starts a linear ramp towards `target` over `duration` milliseconds.
    pub fn ramp_volume(
        &mut self,
        index: usize,
        duration: u64,
        target: i32,
        terminate_on_completion: bool,
        now: u64,
    ) {
        let sound = &mut self.sounds[index];
        let target = target.clamp(SILENT_VOLUME, MAX_VOLUME);
        let distance = ((target - sound.volume).unsigned_abs() as u64) << 16;
        let rate = if duration == 0 {
            distance
        } else {
            distance.div_ceil(duration)
        };
        sound.ramp = Some(VolumeRamp {
            start_volume: sound.volume,
            end_volume: target,
            rate: rate as i64,
            start_time: now,
            duration,
            terminate_on_completion,
        });
    }

    /// Lets a looping sound finish the iteration it is playing.
    pub fn convert_looping_to_non_looping(
        &mut self,
        index: usize,
        now: u64,
        audio: &mut dyn AudioBackend,
    ) {
        if self.sounds[index].looping != LoopingState::Looping {
            return;
        }
        if self.sounds[index].restart_when_audible {
            let sound = &mut self.sounds[index];
            sound.restart_when_audible = false;
            sound.looping = LoopingState::NotLooping;
            sound.end_time = now;
            return;
        }

        let handle = self.sounds[index].cache;
        let player = handle
            .and_then(|h| self.cache.player(h))
            .filter(|p| audio.is_playing(*p));
        match (handle, player) {
            (Some(handle), Some(player)) => {
                audio.end_loop(player);
                let duration = self
                    .cache
                    .stream(handle, true, audio)
                    .map(|stream| audio.stream_duration_ms(stream))
                    .unwrap_or(0);
                let sound = &mut self.sounds[index];
                let elapsed = now.saturating_sub(sound.start_time);
                let remaining = if duration > 0 {
                    duration - elapsed % duration
                } else {
                    0
                };
                sound.end_time = now + remaining;
                sound.looping = LoopingState::Terminated;
            }
            _ => {
                let sound = &mut self.sounds[index];
                sound.looping = LoopingState::NotLooping;
                sound.end_time = now;
            }
        }
    }

    /// Changes nominal volume and balance of a sound in place.
    pub fn adjust(&mut self, index: usize, volume: i32, balance: i32, audio: &mut dyn AudioBackend) {
        let sound = &mut self.sounds[index];
        sound.volume = volume;
        sound.balance = balance;
        self.refresh(index, audio);
    }

    pub fn set_speech(&mut self, index: usize, is_speech: bool) {
        self.sounds[index].is_speech = is_speech;
    }

    pub fn stop(&mut self, index: usize, audio: &mut dyn AudioBackend) {
        if let Some(handle) = self.sounds[index].cache {
            self.cache.stop_player(handle, audio);
        }
        let sound = &mut self.sounds[index];
        sound.looping = LoopingState::NotLooping;
        sound.restart_when_audible = false;
        sound.end_time = 0;
        sound.ramp = None;
    }

    pub fn stop_all(&mut self, audio: &mut dyn AudioBackend) {
        for index in 0..self.sounds.len() {
            self.stop(index, audio);
        }
    }

    pub fn looping_indices(&self) -> Vec<usize> {
        self.sounds
            .iter()
            .enumerate()
            .filter(|(_, sound)| sound.looping == LoopingState::Looping)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_playing(&self, index: usize, now: u64, audio: &dyn AudioBackend) -> bool {
        let sound = &self.sounds[index];
        match sound.looping {
            LoopingState::Looping => {
                sound.restart_when_audible
                    || sound
                        .cache
                        .and_then(|h| self.cache.player(h))
                        .map(|p| audio.is_playing(p))
                        .unwrap_or(false)
            }
            LoopingState::NotLooping | LoopingState::Terminated => sound.end_time > now,
        }
    }

    pub fn set_listener(&mut self, pose: ListenerPose, audio: &mut dyn AudioBackend) {
        self.listener = pose;
        for index in 0..self.sounds.len() {
            if self.sounds[index].is_3d {
                self.refresh(index, audio);
            }
        }
    }

    fn refresh(&mut self, index: usize, audio: &mut dyn AudioBackend) {
        let (volume, balance) = effective_volume_balance(&self.sounds[index], &self.listener);
        let sound = &mut self.sounds[index];
        sound.effective_volume = volume;
        sound.effective_balance = balance;
        if let Some(player) = sound.cache.and_then(|h| self.cache.player(h)) {
            audio.set_volume_balance(player, volume, balance);
        }
    }

    /// Per-quantum housekeeping: applies ramps, resurrects silenced loops
    /// and releases players whose one-shot playback has ended.
    pub fn update(&mut self, now: u64, audio: &mut dyn AudioBackend) {
        for index in 0..self.sounds.len() {
            if let Some(ramp) = self.sounds[index].ramp {
                let elapsed = now.saturating_sub(ramp.start_time);
                let travelled = ramp.rate.saturating_mul(elapsed as i64) >> 16;
                let (volume, done) = if elapsed >= ramp.duration {
                    (ramp.end_volume, true)
                } else if ramp.end_volume >= ramp.start_volume {
                    let volume = ramp.start_volume as i64 + travelled;
                    if volume >= ramp.end_volume as i64 {
                        (ramp.end_volume, true)
                    } else {
                        (volume as i32, false)
                    }
                } else {
                    let volume = ramp.start_volume as i64 - travelled;
                    if volume <= ramp.end_volume as i64 {
                        (ramp.end_volume, true)
                    } else {
                        (volume as i32, false)
                    }
                };

                if done {
                    self.sounds[index].ramp = None;
                    if ramp.terminate_on_completion {
                        self.stop(index, audio);
                        continue;
                    }
                }

                self.sounds[index].volume = volume;
                if !self.sounds[index].restart_when_audible {
                    self.refresh(index, audio);
                }
            }

            // Silenced loops start as soon as a ramp or an adjustment
            // makes them audible.
            let sound = &self.sounds[index];
            if sound.restart_when_audible
                && sound.looping == LoopingState::Looping
                && sound.volume > SILENT_VOLUME
            {
                let pending = sound.ramp;
                let request = TriggerRequest {
                    looping: true,
                    volume: sound.volume,
                    balance: sound.balance,
                    is_3d: sound.is_3d,
                    is_speech: sound.is_speech,
                };
                self.trigger(index, request, now, audio);
                self.sounds[index].ramp = pending;
            }

            let sound = &self.sounds[index];
            if sound.looping != LoopingState::Looping && sound.end_time != 0 && now >= sound.end_time {
                if let Some(handle) = sound.cache {
                    self.cache.stop_player(handle, audio);
                }
                let sound = &mut self.sounds[index];
                sound.looping = LoopingState::NotLooping;
                sound.end_time = 0;
            }
        }
    }

    /// Stops everything and forgets every sound and cached stream.
    pub fn clear(&mut self, audio: &mut dyn AudioBackend) {
        self.stop_all(audio);
        self.cache.clear(audio);
        self.sounds.clear();
    }

    pub fn to_saved(&self) -> Vec<SavedSound> {
        self.sounds
            .iter()
            .filter(|sound| sound.looping == LoopingState::Looping)
            .map(|sound| SavedSound {
                name: sound.name.clone(),
                id: sound.id,
                volume: sound.volume,
                balance: sound.balance,
                is_3d: sound.is_3d,
                is_looping: true,
                try_to_loop_when_restarted: sound.try_to_loop_when_restarted,
                is_speech: sound.is_speech,
                x: sound.x,
                y: sound.y,
                params_3d: sound.params_3d,
            })
            .collect()
    }

    pub fn restore_saved(
        &mut self,
        saved: &[SavedSound],
        now: u64,
        waves: &BTreeSet<String>,
        audio: &mut dyn AudioBackend,
    ) {
        for entry in saved.iter().filter(|entry| entry.is_looping) {
            let Some(index) = self.resolve_by_name(&entry.name, true, waves) else {
                continue;
            };
            self.set_position(index, entry.x, entry.y, entry.params_3d);
            let request = TriggerRequest {
                looping: true,
                volume: entry.volume,
                balance: entry.balance,
                is_3d: entry.is_3d,
                is_speech: entry.is_speech,
            };
            self.trigger(index, request, now, audio);
            self.sounds[index].try_to_loop_when_restarted = entry.try_to_loop_when_restarted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{AudioEvent, RecordingAudioBackend};

    fn waves(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn resolving_registers_each_name_once() {
        let waves = waves(&["0001xyz"]);
        let mut engine = SoundEngine::new();
        assert!(engine.resolve_by_name("0001xyz", false, &waves).is_none());
        let first = engine.resolve_by_name("0001xyz", true, &waves).unwrap();
        assert_eq!(engine.sound(first).id, 1);
        let second = engine.resolve_by_name("0001XYZ", true, &waves).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.sounds().len(), 1);
        assert_eq!(engine.resolve_by_id(1, false, &waves), Some(first));
        assert!(engine.resolve_by_name("0002nope", true, &waves).is_none());
    }

    #[test]
    fn id_prefix_parsing() {
        assert_eq!(sound_id_from_name("0042door"), Some(42));
        assert_eq!(sound_id_from_name("door"), None);
        assert_eq!(sound_name_suffix("0042door"), "door");
    }

    fn positioned(x: i32, y: i32) -> SoundInstance {
        let mut sound = SoundInstance::new("0001hum".into(), 1);
        sound.is_3d = true;
        sound.x = x;
        sound.y = y;
        sound.params_3d = SoundParams3D {
            min_range: 100,
            max_range: 1000,
            unknown_range: 0,
        };
        sound
    }

    #[test]
    fn sounds_behind_pan_towards_their_side() {
        let listener = ListenerPose { x: 0, y: 0, angle: 0 };
        let (_, behind_right) = effective_volume_balance(&positioned(-200, -50), &listener);
        let (_, behind_left) = effective_volume_balance(&positioned(-200, 50), &listener);
        assert!(behind_right > 0);
        assert!(behind_left < 0);
        let (_, hard_right) = effective_volume_balance(&positioned(0, -300), &listener);
        assert_eq!(hard_right, 60);
    }

    #[test]
    fn volume_falls_off_between_ranges_and_clamps_beyond() {
        let listener = ListenerPose { x: 0, y: 0, angle: 90 };
        let mut previous = i32::MAX;
        for distance in (100..=1000).step_by(50) {
            let (volume, _) = effective_volume_balance(&positioned(0, -distance), &listener);
            assert!(volume <= previous, "volume rose at distance {distance}");
            previous = volume;
        }
        assert_eq!(effective_volume_balance(&positioned(0, -100), &listener).0, 100);
        assert_eq!(effective_volume_balance(&positioned(0, -1000), &listener).0, 0);
        assert_eq!(effective_volume_balance(&positioned(0, -5000), &listener).0, 0);
    }

    #[test]
    fn silent_loops_start_once_ramped_up() {
        let waves = waves(&["0005rain"]);
        let mut audio = RecordingAudioBackend::new();
        let mut engine = SoundEngine::new();
        let index = engine.resolve_by_name("0005rain", true, &waves).unwrap();
        engine.trigger(index, TriggerRequest::looping(0, 0), 0, &mut audio);
        assert!(engine.sound(index).restart_when_audible);
        assert!(audio.events().is_empty());
        assert!(engine.is_playing(index, 0, &audio));

        engine.ramp_volume(index, 1000, 100, false, 0);
        engine.update(500, &mut audio);
        assert!(!engine.sound(index).restart_when_audible);
        assert_eq!(engine.sound(index).volume, 50);
        assert!(audio
            .events()
            .iter()
            .any(|event| matches!(event, AudioEvent::Play { volume: 50, .. })));

        engine.update(1000, &mut audio);
        assert_eq!(engine.sound(index).volume, 100);
        assert!(!engine.sound(index).is_ramping());
    }

    #[test]
    fn silent_loops_start_once_adjusted_up() {
        let waves = waves(&["0005rain"]);
        let mut audio = RecordingAudioBackend::new();
        let mut engine = SoundEngine::new();
        let index = engine.resolve_by_name("0005rain", true, &waves).unwrap();
        engine.trigger(index, TriggerRequest::looping(0, 0), 0, &mut audio);
        engine.update(100, &mut audio);
        assert!(audio.events().is_empty());

        engine.adjust(index, 80, 0, &mut audio);
        engine.update(200, &mut audio);
        let sound = engine.sound(index);
        assert!(!sound.restart_when_audible);
        assert_eq!(sound.looping, LoopingState::Looping);
        assert!(audio
            .events()
            .iter()
            .any(|event| matches!(event, AudioEvent::Play { volume: 80, .. })));
        assert!(engine.is_playing(index, 200, &audio));
    }

    #[test]
    fn ramp_down_with_termination_stops_the_sound() {
        let waves = waves(&["0005rain"]);
        let mut audio = RecordingAudioBackend::new();
        let mut engine = SoundEngine::new();
        let index = engine.resolve_by_name("0005rain", true, &waves).unwrap();
        engine.trigger(index, TriggerRequest::looping(80, 0), 0, &mut audio);
        engine.ramp_volume(index, 400, 0, true, 0);
        engine.update(200, &mut audio);
        assert_eq!(engine.sound(index).volume, 40);
        engine.update(400, &mut audio);
        assert_eq!(engine.sound(index).looping, LoopingState::NotLooping);
        assert_eq!(audio.live_players(), 0);
    }

    #[test]
    fn converting_a_loop_finishes_the_current_iteration() {
        let waves = waves(&["0005rain"]);
        let mut audio = RecordingAudioBackend::new();
        audio.set_duration("0005rain", 300);
        let mut engine = SoundEngine::new();
        let index = engine.resolve_by_name("0005rain", true, &waves).unwrap();
        engine.trigger(index, TriggerRequest::looping(80, 0), 1000, &mut audio);
        engine.convert_looping_to_non_looping(index, 1700, &mut audio);
        let sound = engine.sound(index);
        assert_eq!(sound.looping, LoopingState::Terminated);
        assert_eq!(sound.end_time, 1900);
        assert!(engine.is_playing(index, 1800, &audio));
        engine.update(1900, &mut audio);
        assert!(!engine.is_playing(index, 1900, &audio));
    }

    #[test]
    fn eviction_never_leaves_a_dangling_player() {
        let names: Vec<String> = (0..=SOUND_CACHE_SIZE).map(|i| format!("{:04}s", i + 1)).collect();
        let waves: BTreeSet<String> = names.iter().cloned().collect();
        let mut audio = RecordingAudioBackend::new();
        let mut engine = SoundEngine::new();
        let first = engine.resolve_by_name(&names[0], true, &waves).unwrap();
        engine.trigger(first, TriggerRequest::looping(100, 0), 0, &mut audio);
        for name in &names[1..] {
            let index = engine.resolve_by_name(name, true, &waves).unwrap();
            engine.trigger(index, TriggerRequest::one_shot(100, 0), 0, &mut audio);
        }
        assert_eq!(engine.sounds().len(), SOUND_CACHE_SIZE + 1);
        assert!(!engine.is_playing(first, 0, &audio));

        engine.trigger(first, TriggerRequest::looping(100, 0), 10, &mut audio);
        assert!(engine.is_playing(first, 10, &audio));
    }
}
