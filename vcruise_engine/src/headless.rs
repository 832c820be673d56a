//! Collaborators for headless runs: a manual clock, synthetic video, and
//! recorders that log every audio and presentation request.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::Serialize;

use crate::host::{
    AudioBackend, Clock, DecodedFrame, PlayerId, Presentation, StreamId, VideoSource, VideoStream,
};
use crate::types::Rect;

const DEFAULT_STREAM_DURATION_MS: u64 = 1000;

#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, millis: u64) {
        self.now.set(millis);
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u64 {
        self.now.get()
    }
}

/// Video source with no resources at all.
pub struct NullVideoSource;

impl VideoSource for NullVideoSource {
    fn load(&mut self, _resource: u32, _variant: bool) -> Option<Box<dyn VideoStream>> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct SyntheticResource {
    frame_count: u32,
    has_audio: bool,
}

/// Produces blank frames for registered resources, as fast as asked.
#[derive(Clone, Default)]
pub struct SyntheticVideoSource {
    resources: BTreeMap<(u32, bool), SyntheticResource>,
    width: u32,
    height: u32,
    loads: Rc<Cell<usize>>,
}

impl SyntheticVideoSource {
    pub fn new(width: u32, height: u32) -> Self {
        SyntheticVideoSource {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource: u32, frame_count: u32) -> Self {
        self.add_resource(resource, false, frame_count, false);
        self
    }

    pub fn add_resource(&mut self, resource: u32, variant: bool, frame_count: u32, has_audio: bool) {
        self.resources.insert(
            (resource, variant),
            SyntheticResource {
                frame_count,
                has_audio,
            },
        );
    }

    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl VideoSource for SyntheticVideoSource {
    fn load(&mut self, resource: u32, variant: bool) -> Option<Box<dyn VideoStream>> {
        let info = *self.resources.get(&(resource, variant))?;
        self.loads.set(self.loads.get() + 1);
        Some(Box::new(SyntheticStream {
            info,
            next_frame: 0,
            width: self.width,
            height: self.height,
            paused: false,
        }))
    }
}

struct SyntheticStream {
    info: SyntheticResource,
    next_frame: u32,
    width: u32,
    height: u32,
    paused: bool,
}

impl VideoStream for SyntheticStream {
    fn seek(&mut self, frame: u32) -> bool {
        if frame >= self.info.frame_count {
            return false;
        }
        self.next_frame = frame;
        true
    }

    fn time_to_next_frame(&self) -> u64 {
        if self.paused {
            u64::MAX
        } else {
            0
        }
    }

    fn decode_next_frame(&mut self) -> Option<DecodedFrame> {
        if self.next_frame >= self.info.frame_count {
            return None;
        }
        let frame = self.next_frame;
        self.next_frame += 1;
        Some(DecodedFrame {
            width: self.width,
            height: self.height,
            pixels: vec![(frame & 0xff) as u8],
        })
    }

    fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn has_audio(&self) -> bool {
        self.info.has_audio
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioEvent {
    CreateStream {
        name: String,
        looping: bool,
        stream: StreamId,
    },
    ReleaseStream {
        stream: StreamId,
    },
    Play {
        name: String,
        player: PlayerId,
        volume: i32,
        balance: i32,
        speech: bool,
    },
    SetVolumeBalance {
        player: PlayerId,
        volume: i32,
        balance: i32,
    },
    Stop {
        player: PlayerId,
    },
    EndLoop {
        player: PlayerId,
    },
}

#[derive(Default)]
struct AudioRecorder {
    events: Vec<AudioEvent>,
    streams: BTreeMap<StreamId, String>,
    playing: BTreeSet<PlayerId>,
    durations: BTreeMap<String, u64>,
    missing: BTreeSet<String>,
    next_stream: StreamId,
    next_player: PlayerId,
}

/// Audio backend that plays nothing and records every request.
#[derive(Clone, Default)]
pub struct RecordingAudioBackend {
    state: Rc<RefCell<AudioRecorder>>,
}

impl RecordingAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_duration(&self, name: &str, millis: u64) {
        self.state
            .borrow_mut()
            .durations
            .insert(name.to_ascii_lowercase(), millis);
    }

    pub fn mark_missing(&self, name: &str) {
        self.state
            .borrow_mut()
            .missing
            .insert(name.to_ascii_lowercase());
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn live_streams(&self) -> usize {
        self.state.borrow().streams.len()
    }

    pub fn live_players(&self) -> usize {
        self.state.borrow().playing.len()
    }

    /// Simulates a player reaching the end of its data.
    pub fn finish_player(&self, player: PlayerId) {
        self.state.borrow_mut().playing.remove(&player);
    }
}

impl AudioBackend for RecordingAudioBackend {
    fn create_stream(&mut self, name: &str, looping: bool) -> Option<StreamId> {
        let mut state = self.state.borrow_mut();
        let name = name.to_ascii_lowercase();
        if state.missing.contains(&name) {
            return None;
        }
        state.next_stream += 1;
        let stream = state.next_stream;
        state.streams.insert(stream, name.clone());
        state.events.push(AudioEvent::CreateStream {
            name,
            looping,
            stream,
        });
        Some(stream)
    }

    fn stream_duration_ms(&self, stream: StreamId) -> u64 {
        let state = self.state.borrow();
        state
            .streams
            .get(&stream)
            .and_then(|name| state.durations.get(name).copied())
            .unwrap_or(DEFAULT_STREAM_DURATION_MS)
    }

    fn release_stream(&mut self, stream: StreamId) {
        let mut state = self.state.borrow_mut();
        if state.streams.remove(&stream).is_some() {
            state.events.push(AudioEvent::ReleaseStream { stream });
        }
    }

    fn play(&mut self, stream: StreamId, volume: i32, balance: i32, is_speech: bool) -> PlayerId {
        let mut state = self.state.borrow_mut();
        state.next_player += 1;
        let player = state.next_player;
        state.playing.insert(player);
        let name = state.streams.get(&stream).cloned().unwrap_or_default();
        state.events.push(AudioEvent::Play {
            name,
            player,
            volume,
            balance,
            speech: is_speech,
        });
        player
    }

    fn set_volume_balance(&mut self, player: PlayerId, volume: i32, balance: i32) {
        self.state
            .borrow_mut()
            .events
            .push(AudioEvent::SetVolumeBalance {
                player,
                volume,
                balance,
            });
    }

    fn stop(&mut self, player: PlayerId) {
        let mut state = self.state.borrow_mut();
        if state.playing.remove(&player) {
            state.events.push(AudioEvent::Stop { player });
        }
    }

    fn end_loop(&mut self, player: PlayerId) {
        self.state
            .borrow_mut()
            .events
            .push(AudioEvent::EndLoop { player });
    }

    fn is_playing(&self, player: PlayerId) -> bool {
        self.state.borrow().playing.contains(&player)
    }
}

pub struct NullPresentation;

impl Presentation for NullPresentation {}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentationEvent {
    Commit { rect: Rect },
    Blit { rect: Rect },
    Cursor { cursor: Option<u32> },
    Tray { visible: bool },
    TraySlot { slot: usize, item: u32, highlighted: bool },
    Subtitle { lines: Vec<String>, color: [u8; 3] },
    ClearSubtitle,
}

#[derive(Clone, Default)]
pub struct RecordingPresentation {
    events: Rc<RefCell<Vec<PresentationEvent>>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    fn record(&self, event: PresentationEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Presentation for RecordingPresentation {
    fn commit_region(&mut self, rect: Rect) {
        self.record(PresentationEvent::Commit { rect });
    }

    fn blit_frame(&mut self, _frame: &DecodedFrame, rect: Rect) {
        self.record(PresentationEvent::Blit { rect });
    }

    fn set_cursor(&mut self, cursor: Option<u32>) {
        self.record(PresentationEvent::Cursor { cursor });
    }

    fn show_tray(&mut self, visible: bool) {
        self.record(PresentationEvent::Tray { visible });
    }

    fn draw_tray_slot(&mut self, slot: usize, item: u32, highlighted: bool) {
        self.record(PresentationEvent::TraySlot {
            slot,
            item,
            highlighted,
        });
    }

    fn show_subtitle(&mut self, lines: &[String], color: [u8; 3]) {
        self.record(PresentationEvent::Subtitle {
            lines: lines.to_vec(),
            color,
        });
    }

    fn clear_subtitle(&mut self) {
        self.record(PresentationEvent::ClearSubtitle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_backend_tracks_audio_events() {
        let mut backend = RecordingAudioBackend::new();
        backend.set_duration("0001door", 2500);
        backend.mark_missing("0002gone");

        let stream = backend.create_stream("0001Door", false).unwrap();
        assert!(backend.create_stream("0002gone", false).is_none());
        assert_eq!(backend.stream_duration_ms(stream), 2500);

        let player = backend.play(stream, 80, -10, false);
        assert!(backend.is_playing(player));
        backend.set_volume_balance(player, 40, 0);
        backend.stop(player);
        backend.stop(player);
        backend.release_stream(stream);

        assert_eq!(
            backend.events(),
            vec![
                AudioEvent::CreateStream {
                    name: "0001door".to_string(),
                    looping: false,
                    stream,
                },
                AudioEvent::Play {
                    name: "0001door".to_string(),
                    player,
                    volume: 80,
                    balance: -10,
                    speech: false,
                },
                AudioEvent::SetVolumeBalance {
                    player,
                    volume: 40,
                    balance: 0,
                },
                AudioEvent::Stop { player },
                AudioEvent::ReleaseStream { stream },
            ]
        );
        assert_eq!(backend.live_players(), 0);
        assert_eq!(backend.live_streams(), 0);
    }

    #[test]
    fn synthetic_streams_end_after_frame_count() {
        let mut source = SyntheticVideoSource::new(64, 48).with_resource(12, 2);
        assert!(source.load(13, false).is_none());
        let mut stream = source.load(12, false).unwrap();
        assert!(stream.decode_next_frame().is_some());
        assert!(stream.decode_next_frame().is_some());
        assert!(stream.decode_next_frame().is_none());
        assert!(stream.seek(0));
        assert!(!stream.seek(2));
        assert_eq!(source.load_count(), 1);
    }
}
