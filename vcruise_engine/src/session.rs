//! Headless sessions: a runtime wired to the recording collaborators and
//! stepped on a manual clock, as used by the CLI and the integration tests.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Serialize;

use crate::definitions::GameDefinitions;
use crate::events::{KeymappedEvent, OsEvent};
use crate::headless::{
    AudioEvent, ManualClock, PresentationEvent, RecordingAudioBackend, RecordingPresentation,
    SyntheticVideoSource,
};
use crate::host::{Clock, Host, MenuProvider};
use crate::runtime::{GameState, Runtime};
use crate::script::ScriptError;
use crate::types::Point;

/// A left click delivered at the start of `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledClick {
    pub frame: u32,
    pub pos: Point,
}

impl FromStr for ScheduledClick {
    type Err = anyhow::Error;

    /// Parses `frame:x:y`.
    fn from_str(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split(':').collect();
        let [frame, x, y] = parts.as_slice() else {
            bail!("expected frame:x:y, got '{text}'");
        };
        Ok(ScheduledClick {
            frame: frame
                .trim()
                .parse()
                .with_context(|| format!("parsing frame in '{text}'"))?,
            pos: Point::new(
                x.trim().parse().with_context(|| format!("parsing x in '{text}'"))?,
                y.trim().parse().with_context(|| format!("parsing y in '{text}'"))?,
            ),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub frames: u32,
    pub tick_ms: u64,
    pub clicks: Vec<ScheduledClick>,
    /// Frames at whose start an Escape key press is delivered.
    pub escapes: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub frames_run: u32,
    pub elapsed_ms: u64,
    pub final_state: String,
    pub room: u32,
    pub screen: u32,
    pub direction: u32,
    pub quit: bool,
}

#[derive(Debug, Serialize)]
pub struct EventLog {
    pub audio: Vec<AudioEvent>,
    pub presentation: Vec<PresentationEvent>,
}

pub struct HeadlessSession {
    pub runtime: Runtime,
    pub clock: ManualClock,
    pub audio: RecordingAudioBackend,
    pub presentation: RecordingPresentation,
    pub video: SyntheticVideoSource,
}

impl HeadlessSession {
    pub fn new(defs: GameDefinitions) -> Self {
        Self::with_menus(Rc::new(defs), None)
    }

    /// Builds a session whose video source knows every animation the
    /// definitions name, each resource sized to its furthest frame.
    pub fn with_menus(defs: Rc<GameDefinitions>, menus: Option<Box<dyn MenuProvider>>) -> Self {
        let clock = ManualClock::new();
        let audio = RecordingAudioBackend::new();
        let presentation = RecordingPresentation::new();
        let video = synthetic_video_for(&defs);
        let host = Host {
            clock: Box::new(clock.clone()),
            video: Box::new(video.clone()),
            audio: Box::new(audio.clone()),
            presentation: Box::new(presentation.clone()),
            menus,
        };
        HeadlessSession {
            runtime: Runtime::new(defs, host),
            clock,
            audio,
            presentation,
            video,
        }
    }

    /// Moves the clock forward and runs one frame.
    pub fn step(&mut self, tick_ms: u64) -> Result<bool, ScriptError> {
        self.clock.advance(tick_ms);
        self.runtime.run_frame()
    }

    /// Queues a full click (move, press, release) at `pos`.
    pub fn click(&mut self, pos: Point) {
        self.runtime.queue_event(OsEvent::MouseMove { pos });
        self.runtime.queue_event(OsEvent::MouseDown { pos });
        self.runtime.queue_event(OsEvent::MouseUp { pos });
    }

    pub fn press(&mut self, key: KeymappedEvent) {
        self.runtime.queue_event(OsEvent::Keymapped { key });
    }

    /// Steps frames until `done` holds or `max_frames` have run. Returns
    /// whether the condition was reached.
    pub fn run_until(
        &mut self,
        tick_ms: u64,
        max_frames: u32,
        mut done: impl FnMut(&Runtime) -> bool,
    ) -> Result<bool, ScriptError> {
        for _ in 0..max_frames {
            if done(&self.runtime) {
                return Ok(true);
            }
            if !self.step(tick_ms)? {
                break;
            }
        }
        Ok(done(&self.runtime))
    }

    pub fn run(&mut self, plan: &RunPlan) -> Result<RunSummary> {
        let start = self.clock.millis();
        let mut frames_run = 0;
        let mut quit = false;
        for frame in 0..plan.frames {
            for click in plan.clicks.iter().filter(|click| click.frame == frame) {
                debug!("frame {frame}: click at {:?}", click.pos);
                self.click(click.pos);
            }
            if plan.escapes.contains(&frame) {
                self.press(KeymappedEvent::Escape);
            }
            let running = self
                .step(plan.tick_ms)
                .with_context(|| format!("running frame {frame}"))?;
            frames_run += 1;
            if !running {
                quit = true;
                break;
            }
        }

        let location = self.runtime.location();
        let summary = RunSummary {
            frames_run,
            elapsed_ms: self.clock.millis() - start,
            final_state: format!("{:?}", self.runtime.state()),
            room: location.room,
            screen: location.screen,
            direction: location.direction,
            quit: quit || self.runtime.state() == GameState::Quit,
        };
        info!(
            "ran {} frames, ending in {} at room {} screen {:#x}",
            summary.frames_run, summary.final_state, summary.room, summary.screen
        );
        Ok(summary)
    }

    pub fn event_log(&self) -> EventLog {
        EventLog {
            audio: self.audio.events(),
            presentation: self.presentation.events(),
        }
    }
}

fn synthetic_video_for(defs: &GameDefinitions) -> SyntheticVideoSource {
    let config = &defs.config;
    let mut video = SyntheticVideoSource::new(config.screen_width, config.screen_height);
    let mut extents: BTreeMap<(u32, bool), u32> = BTreeMap::new();

    let rooms = defs.rooms.keys().chain(defs.room_duplicates.keys());
    for &room in rooms {
        let names = defs
            .room_duplicates
            .get(&room)
            .and_then(|origin| defs.room(*origin))
            .into_iter()
            .chain(defs.room(room))
            .flat_map(|def| def.animations.keys());
        for name in names {
            if let Some(anim) = defs.resolve_animation(room, name) {
                let extent = extents
                    .entry((anim.resource_number(), anim.is_variant()))
                    .or_default();
                *extent = (*extent).max(anim.last_frame + 1);
            }
        }
    }
    for ((resource, variant), frames) in extents {
        video.add_resource(resource, variant, frames, false);
    }
    video
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheduled_clicks() {
        let click: ScheduledClick = "12:320:-4".parse().unwrap();
        assert_eq!(click.frame, 12);
        assert_eq!(click.pos, Point::new(320, -4));

        assert!("12:320".parse::<ScheduledClick>().is_err());
        assert!("a:1:2".parse::<ScheduledClick>().is_err());
    }

    #[test]
    fn empty_definitions_run_to_completion() {
        let mut session = HeadlessSession::new(GameDefinitions::default());
        let plan = RunPlan {
            frames: 3,
            tick_ms: 10,
            ..RunPlan::default()
        };
        let summary = session.run(&plan).unwrap();
        assert_eq!(summary.frames_run, 3);
        assert_eq!(summary.elapsed_ms, 30);
        assert_eq!(summary.final_state, "Idle");
        assert!(!summary.quit);
    }
}
