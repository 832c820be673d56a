use log::{debug, warn};

use crate::definitions::AnimationDef;
use crate::host::{Presentation, VideoSource, VideoStream};
use crate::types::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const fn per_second(fps: u32) -> Self {
        FrameRate {
            numerator: fps,
            denominator: 1,
        }
    }
}

/// Where a non-looping animation stops: as soon as its last frame is shown,
/// or one frame period later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEnd {
    StartOfLastFrame,
    EndOfLastFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmittedFrame {
    pub frame: u32,
    /// Offset from the first frame of the playing range.
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Advance {
    pub ended: bool,
    pub frame: Option<AdmittedFrame>,
}

impl Advance {
    const ENDED: Advance = Advance {
        ended: true,
        frame: None,
    };
    const WAITING: Advance = Advance {
        ended: false,
        frame: None,
    };
}

struct LoadedAnimation {
    resource: u32,
    variant: bool,
    stream: Box<dyn VideoStream>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Stopped,
    Playing,
    Paused,
}

/// Advances the loaded video resource one admitted frame at a time.
pub struct AnimationDriver {
    loaded: Option<LoadedAnimation>,
    state: DecoderState,
    def: AnimationDef,
    pending_frame: u32,
    displaying_frame: u32,
    frame_rate: Option<FrameRate>,
    start_time: u64,
    frames_decoded: u64,
    stop_frame: Option<u32>,
    end_mode: AnimationEnd,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationDriver {
    pub fn new() -> Self {
        AnimationDriver {
            loaded: None,
            state: DecoderState::Stopped,
            def: AnimationDef::default(),
            pending_frame: 0,
            displaying_frame: 0,
            frame_rate: None,
            start_time: 0,
            frames_decoded: 0,
            stop_frame: None,
            end_mode: AnimationEnd::StartOfLastFrame,
        }
    }

    /// Prepares `def` for playback from `initial_frame`. The decoded resource
    /// is reused when the resource id is unchanged. Returns `false` when the
    /// resource is missing; advancing then reports the animation as ended.
    pub fn begin(
        &mut self,
        video: &mut dyn VideoSource,
        def: &AnimationDef,
        initial_frame: u32,
        end_mode: AnimationEnd,
    ) -> bool {
        let resource = def.resource_number();
        let variant = def.is_variant();
        let reuse = matches!(
            &self.loaded,
            Some(loaded) if loaded.resource == resource && loaded.variant == variant
        );
        if !reuse {
            self.loaded = None;
            match video.load(resource, variant) {
                Some(stream) => {
                    debug!("loaded animation resource {}", def.resource_id);
                    self.loaded = Some(LoadedAnimation {
                        resource,
                        variant,
                        stream,
                    });
                }
                None => warn!("animation resource {} is missing", def.resource_id),
            }
        }

        self.def = def.clone();
        self.pending_frame = initial_frame;
        self.displaying_frame = initial_frame;
        self.frame_rate = None;
        self.frames_decoded = 0;
        self.stop_frame = None;
        self.end_mode = end_mode;
        self.state = DecoderState::Stopped;

        match self.loaded.as_mut() {
            Some(loaded) => {
                if !loaded.stream.seek(initial_frame) {
                    warn!(
                        "animation resource {} cannot seek to frame {initial_frame}",
                        def.resource_id
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Runs one quantum: admits at most one frame and reports whether the
    /// animation has ended.
    pub fn advance(
        &mut self,
        now: u64,
        looping: bool,
        use_stop_frame: bool,
        presentation: &mut dyn Presentation,
        viewport: Rect,
    ) -> Advance {
        let Some(loaded) = self.loaded.as_mut() else {
            return Advance::ENDED;
        };

        let needs_first_frame = self.state != DecoderState::Playing;
        if needs_first_frame {
            loaded.stream.pause(false);
            self.state = DecoderState::Playing;
        }

        if looping && self.pending_frame > self.def.last_frame {
            if loaded.stream.seek(self.def.first_frame) {
                self.pending_frame = self.def.first_frame;
            } else {
                return Advance::ENDED;
            }
        }

        if !needs_first_frame && !Self::frame_due(
            self.frame_rate,
            now.saturating_sub(self.start_time),
            self.frames_decoded,
            loaded.stream.as_ref(),
        ) {
            return Advance::WAITING;
        }

        if self.pending_frame > self.def.last_frame {
            return Advance::ENDED;
        }

        let Some(frame) = loaded.stream.decode_next_frame() else {
            return Advance::ENDED;
        };

        if needs_first_frame {
            self.start_time = now;
            self.frames_decoded = 0;
        }
        self.frames_decoded += 1;

        let mut rect = Rect::sized(frame.width, frame.height).intersect(&viewport);
        if !self.def.constraint_rect.is_empty() {
            rect = rect.intersect(&self.def.constraint_rect);
        }
        if !rect.is_empty() {
            presentation.blit_frame(&frame, rect);
            presentation.commit_region(rect);
        }

        let admitted = AdmittedFrame {
            frame: self.pending_frame,
            offset: self.pending_frame.saturating_sub(self.def.first_frame),
        };
        self.displaying_frame = self.pending_frame;
        self.pending_frame += 1;

        let reached_end = !looping
            && self.end_mode == AnimationEnd::StartOfLastFrame
            && self.pending_frame > self.def.last_frame;
        let reached_stop = use_stop_frame && self.stop_frame == Some(self.displaying_frame);

        Advance {
            ended: reached_end || reached_stop,
            frame: Some(admitted),
        }
    }

    fn frame_due(
        rate: Option<FrameRate>,
        elapsed: u64,
        frames_decoded: u64,
        stream: &dyn VideoStream,
    ) -> bool {
        // A locked rate admits a frame only once its slot has been exceeded.
        match rate {
            Some(rate) => {
                elapsed * rate.numerator as u64 > frames_decoded * rate.denominator as u64 * 1000
            }
            None => stream.time_to_next_frame() == 0,
        }
    }

    pub fn pause(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.stream.pause(true);
            self.state = DecoderState::Paused;
        }
    }

    pub fn unload(&mut self) {
        self.loaded = None;
        self.state = DecoderState::Stopped;
    }

    pub fn lock_frame_rate(&mut self, rate: Option<FrameRate>) {
        self.frame_rate = rate;
    }

    pub fn set_stop_frame(&mut self, frame: Option<u32>) {
        self.stop_frame = frame;
    }

    pub fn set_last_frame(&mut self, frame: u32) {
        self.def.last_frame = frame;
    }

    pub fn set_range(&mut self, first: u32, last: u32) {
        self.def.first_frame = first;
        self.def.last_frame = last;
    }

    pub fn def(&self) -> &AnimationDef {
        &self.def
    }

    pub fn displaying_frame(&self) -> u32 {
        self.displaying_frame
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.stream.has_audio())
            .unwrap_or(false)
    }

    /// Signed resource id of the loaded animation, zero when none.
    pub fn loaded_resource_id(&self) -> i32 {
        match &self.loaded {
            Some(loaded) if loaded.variant => -(loaded.resource as i32),
            Some(loaded) => loaded.resource as i32,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{NullPresentation, RecordingPresentation, SyntheticVideoSource};
    use crate::headless::PresentationEvent;

    fn def(first: u32, last: u32) -> AnimationDef {
        AnimationDef {
            resource_id: 5,
            first_frame: first,
            last_frame: last,
            ..AnimationDef::default()
        }
    }

    fn quanta_until_end(end_mode: AnimationEnd) -> u64 {
        let mut video = SyntheticVideoSource::new(640, 480).with_resource(5, 10);
        let mut driver = AnimationDriver::new();
        assert!(driver.begin(&mut video, &def(0, 2), 0, end_mode));
        driver.lock_frame_rate(Some(FrameRate::per_second(15)));
        let mut presentation = NullPresentation;
        for quantum in 0..20u64 {
            let now = quantum * 100;
            if driver
                .advance(now, false, false, &mut presentation, Rect::sized(640, 480))
                .ended
            {
                return quantum;
            }
        }
        panic!("animation never ended");
    }

    #[test]
    fn start_of_last_frame_ends_one_frame_earlier() {
        let start = quanta_until_end(AnimationEnd::StartOfLastFrame);
        let end = quanta_until_end(AnimationEnd::EndOfLastFrame);
        assert_eq!(start, 2);
        assert_eq!(end, start + 1);
    }

    #[test]
    fn frame_rate_lock_holds_frames_until_due() {
        let mut video = SyntheticVideoSource::new(640, 480).with_resource(5, 10);
        let mut driver = AnimationDriver::new();
        driver.begin(&mut video, &def(0, 9), 0, AnimationEnd::StartOfLastFrame);
        driver.lock_frame_rate(Some(FrameRate::per_second(10)));
        let mut presentation = NullPresentation;
        let view = Rect::sized(640, 480);

        assert!(driver.advance(1000, false, false, &mut presentation, view).frame.is_some());
        assert!(driver.advance(1050, false, false, &mut presentation, view).frame.is_none());
        let second = driver.advance(1150, false, false, &mut presentation, view);
        assert_eq!(second.frame, Some(AdmittedFrame { frame: 1, offset: 1 }));
    }

    #[test]
    fn frame_exactly_on_its_slot_boundary_waits() {
        let mut video = SyntheticVideoSource::new(640, 480).with_resource(5, 10);
        let mut driver = AnimationDriver::new();
        driver.begin(&mut video, &def(0, 9), 0, AnimationEnd::StartOfLastFrame);
        driver.lock_frame_rate(Some(FrameRate::per_second(10)));
        let mut presentation = NullPresentation;
        let view = Rect::sized(640, 480);

        assert!(driver.advance(0, false, false, &mut presentation, view).frame.is_some());
        assert!(driver.advance(100, false, false, &mut presentation, view).frame.is_none());
        let next = driver.advance(101, false, false, &mut presentation, view);
        assert_eq!(next.frame, Some(AdmittedFrame { frame: 1, offset: 1 }));
        assert!(driver.advance(200, false, false, &mut presentation, view).frame.is_none());
    }

    #[test]
    fn looping_wraps_to_first_frame() {
        let mut video = SyntheticVideoSource::new(640, 480).with_resource(5, 10);
        let mut driver = AnimationDriver::new();
        driver.begin(&mut video, &def(3, 4), 4, AnimationEnd::StartOfLastFrame);
        let mut presentation = NullPresentation;
        let view = Rect::sized(640, 480);
        let first = driver.advance(0, true, false, &mut presentation, view);
        assert_eq!(first.frame.map(|f| f.frame), Some(4));
        assert!(!first.ended);
        let wrapped = driver.advance(1, true, false, &mut presentation, view);
        assert_eq!(wrapped.frame.map(|f| f.frame), Some(3));
    }

    #[test]
    fn stop_frame_ends_looping_playback() {
        let mut video = SyntheticVideoSource::new(640, 480).with_resource(5, 10);
        let mut driver = AnimationDriver::new();
        driver.begin(&mut video, &def(0, 7), 6, AnimationEnd::StartOfLastFrame);
        driver.set_stop_frame(Some(1));
        let mut presentation = NullPresentation;
        let view = Rect::sized(640, 480);
        let mut shown = Vec::new();
        for now in 0..10 {
            let step = driver.advance(now, true, true, &mut presentation, view);
            shown.extend(step.frame.map(|f| f.frame));
            if step.ended {
                break;
            }
        }
        assert_eq!(shown, vec![6, 7, 0, 1]);
    }

    #[test]
    fn blits_are_clipped_to_constraint_rect() {
        let mut video = SyntheticVideoSource::new(640, 480).with_resource(5, 10);
        let mut driver = AnimationDriver::new();
        let mut constrained = def(0, 1);
        constrained.constraint_rect = Rect::new(600, 100, 700, 200);
        driver.begin(&mut video, &constrained, 0, AnimationEnd::StartOfLastFrame);
        let mut presentation = RecordingPresentation::new();
        driver.advance(0, false, false, &mut presentation, Rect::sized(640, 480));
        assert_eq!(
            presentation.events(),
            vec![
                PresentationEvent::Blit {
                    rect: Rect::new(600, 100, 640, 200)
                },
                PresentationEvent::Commit {
                    rect: Rect::new(600, 100, 640, 200)
                },
            ]
        );
    }

    #[test]
    fn missing_resource_ends_immediately_and_same_resource_is_reused() {
        let mut video = SyntheticVideoSource::new(64, 48).with_resource(5, 10);
        let mut driver = AnimationDriver::new();
        let mut missing = def(0, 1);
        missing.resource_id = 9;
        assert!(!driver.begin(&mut video, &missing, 0, AnimationEnd::StartOfLastFrame));
        let mut presentation = NullPresentation;
        assert!(driver.advance(0, false, false, &mut presentation, Rect::sized(64, 48)).ended);

        driver.begin(&mut video, &def(0, 1), 0, AnimationEnd::StartOfLastFrame);
        driver.begin(&mut video, &def(2, 3), 2, AnimationEnd::StartOfLastFrame);
        assert_eq!(video.load_count(), 1);
        assert_eq!(driver.loaded_resource_id(), 5);
    }
}
