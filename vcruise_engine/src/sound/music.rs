use std::collections::BTreeMap;

use log::{debug, warn};

use crate::definitions::ScoreSection;
use crate::host::{AudioBackend, PlayerId, StreamId};

pub type ScoreTable = BTreeMap<String, BTreeMap<String, ScoreSection>>;

#[derive(Debug, Clone, Copy)]
struct MusicRamp {
    start_volume: i32,
    end_volume: i32,
    start_time: u64,
    duration: u64,
}

/// Background music: a single looping track, or a score graph whose
/// sections chain into each other as their durations elapse.
#[derive(Debug)]
pub struct MusicPlayer {
    track: i32,
    active: bool,
    volume: i32,
    muted: bool,
    mute_disabled: bool,
    score_track: String,
    score_section: String,
    section_volume: i32,
    section_end: u64,
    stream: Option<StreamId>,
    player: Option<PlayerId>,
    ramp: Option<MusicRamp>,
}

impl MusicPlayer {
    pub fn new(muted: bool) -> Self {
        MusicPlayer {
            track: 0,
            active: false,
            volume: 100,
            muted,
            mute_disabled: false,
            score_track: String::new(),
            score_section: String::new(),
            section_volume: 100,
            section_end: 0,
            stream: None,
            player: None,
            ramp: None,
        }
    }

    fn audible(&self) -> bool {
        !self.muted || self.mute_disabled
    }

    fn effective_volume(&self) -> i32 {
        self.volume * self.section_volume / 100
    }

    fn release(&mut self, audio: &mut dyn AudioBackend) {
        if let Some(player) = self.player.take() {
            audio.stop(player);
        }
        if let Some(stream) = self.stream.take() {
            audio.release_stream(stream);
        }
    }

    pub fn play_track(&mut self, track: i32, audio: &mut dyn AudioBackend) {
        self.release(audio);
        self.score_track.clear();
        self.score_section.clear();
        self.section_volume = 100;
        self.track = track;
        self.active = true;
        if !self.audible() {
            return;
        }
        let name = format!("music-{track:02}");
        match audio.create_stream(&name, true) {
            Some(stream) => {
                debug!("playing music track {track}");
                self.stream = Some(stream);
                self.player = Some(audio.play(stream, self.effective_volume(), 0, false));
            }
            None => warn!("music track {name} is missing"),
        }
    }

    pub fn play_score(
        &mut self,
        track: &str,
        section: &str,
        now: u64,
        scores: &ScoreTable,
        audio: &mut dyn AudioBackend,
    ) {
        self.score_track = track.to_string();
        self.score_section = section.to_string();
        self.active = true;
        self.start_section(now, scores, audio);
    }

    fn start_section(&mut self, now: u64, scores: &ScoreTable, audio: &mut dyn AudioBackend) {
        self.release(audio);
        let Some(section) = scores
            .get(&self.score_track)
            .and_then(|sections| sections.get(&self.score_section))
        else {
            warn!(
                "score section {}/{} is not defined",
                self.score_track, self.score_section
            );
            self.score_track.clear();
            self.score_section.clear();
            self.active = false;
            return;
        };

        self.section_volume = section.volume;
        let mut duration = section.duration_ms as u64;
        if let Some(file) = section.file.as_deref().filter(|_| self.audible()) {
            match audio.create_stream(file, false) {
                Some(stream) => {
                    duration = duration.max(audio.stream_duration_ms(stream));
                    self.stream = Some(stream);
                    self.player = Some(audio.play(stream, self.effective_volume(), 0, false));
                }
                None => warn!("score file {file} is missing"),
            }
        }
        debug!(
            "score {} entering section {} for {duration} ms",
            self.score_track, self.score_section
        );
        self.section_end = now + duration;
    }

    pub fn stop(&mut self, audio: &mut dyn AudioBackend) {
        self.release(audio);
        self.active = false;
        self.ramp = None;
        self.score_track.clear();
        self.score_section.clear();
    }

    pub fn ramp_volume(&mut self, duration: u64, target: i32, now: u64, audio: &mut dyn AudioBackend) {
        let target = target.clamp(0, 100);
        if duration == 0 {
            self.ramp = None;
            self.set_volume(target, audio);
            return;
        }
        self.ramp = Some(MusicRamp {
            start_volume: self.volume,
            end_volume: target,
            start_time: now,
            duration,
        });
    }

    fn set_volume(&mut self, volume: i32, audio: &mut dyn AudioBackend) {
        self.volume = volume;
        if let Some(player) = self.player {
            audio.set_volume_balance(player, self.effective_volume(), 0);
        }
    }

    pub fn set_mute_disabled(&mut self, disabled: bool) {
        self.mute_disabled = disabled;
    }

    pub fn update(&mut self, now: u64, scores: &ScoreTable, audio: &mut dyn AudioBackend) {
        if let Some(ramp) = self.ramp {
            let elapsed = now.saturating_sub(ramp.start_time);
            if elapsed >= ramp.duration {
                self.ramp = None;
                self.set_volume(ramp.end_volume, audio);
            } else {
                let delta = (ramp.end_volume - ramp.start_volume) as i64 * elapsed as i64
                    / ramp.duration as i64;
                self.set_volume(ramp.start_volume + delta as i32, audio);
            }
        }

        if !self.score_track.is_empty() && now >= self.section_end {
            let next = scores
                .get(&self.score_track)
                .and_then(|sections| sections.get(&self.score_section))
                .map(|section| section.next.clone());
            match next {
                Some(next) => {
                    self.score_section = next;
                    self.start_section(now, scores, audio);
                }
                None => self.stop(audio),
            }
        }
    }

    pub fn track(&self) -> i32 {
        self.track
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn mute_disabled(&self) -> bool {
        self.mute_disabled
    }

    pub fn score(&self) -> (&str, &str) {
        (&self.score_track, &self.score_section)
    }

    /// Reinstates saved music settings without starting playback.
    pub fn restore_settings(&mut self, track: i32, volume: i32, mute_disabled: bool) {
        self.track = track;
        self.volume = volume.clamp(0, 100);
        self.mute_disabled = mute_disabled;
        self.ramp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{AudioEvent, RecordingAudioBackend};

    fn scores() -> ScoreTable {
        let json = r#"{"battle": {
            "intro": {"next": "loop", "file": "score-intro", "duration_ms": 500, "volume": 80},
            "loop": {"next": "loop", "duration_ms": 2000}
        }}"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn score_sections_chain_by_duration() {
        let mut audio = RecordingAudioBackend::new();
        audio.set_duration("score-intro", 1500);
        let scores = scores();
        let mut music = MusicPlayer::new(false);
        music.play_score("battle", "intro", 0, &scores, &mut audio);
        assert_eq!(music.score(), ("battle", "intro"));

        music.update(1000, &scores, &mut audio);
        assert_eq!(music.score(), ("battle", "intro"));
        music.update(1500, &scores, &mut audio);
        assert_eq!(music.score(), ("battle", "loop"));
        assert!(audio
            .events()
            .iter()
            .any(|event| matches!(event, AudioEvent::Play { volume: 80, .. })));
    }

    #[test]
    fn muted_music_keeps_state_without_playing() {
        let mut audio = RecordingAudioBackend::new();
        let mut music = MusicPlayer::new(true);
        music.play_track(4, &mut audio);
        assert!(music.is_active());
        assert_eq!(music.track(), 4);
        assert!(audio.events().is_empty());

        music.set_mute_disabled(true);
        music.play_track(5, &mut audio);
        assert_eq!(audio.live_players(), 1);
    }

    #[test]
    fn volume_ramps_linearly() {
        let mut audio = RecordingAudioBackend::new();
        let mut music = MusicPlayer::new(false);
        music.play_track(1, &mut audio);
        music.ramp_volume(1000, 0, 0, &mut audio);
        music.update(250, &ScoreTable::new(), &mut audio);
        assert_eq!(music.volume(), 75);
        music.update(2000, &ScoreTable::new(), &mut audio);
        assert_eq!(music.volume(), 0);
    }
}
