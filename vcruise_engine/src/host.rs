//! Collaborators the runtime drives but does not implement: time, video
//! decoding, audio mixing, presentation and menu pages.

use crate::events::OsEvent;
use crate::definitions::LabelDef;
use crate::types::{Point, Rect};

pub trait Clock {
    fn millis(&self) -> u64;
}

/// Decoded pixels are opaque to the runtime; only their size matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub trait VideoStream {
    /// Positions the decoder so the next decoded frame is `frame`.
    fn seek(&mut self, frame: u32) -> bool;
    fn time_to_next_frame(&self) -> u64;
    /// `None` once the stream has no more frames.
    fn decode_next_frame(&mut self) -> Option<DecodedFrame>;
    fn pause(&mut self, paused: bool);
    fn has_audio(&self) -> bool {
        false
    }
}

pub trait VideoSource {
    fn load(&mut self, resource: u32, variant: bool) -> Option<Box<dyn VideoStream>>;
}

pub type StreamId = u32;
pub type PlayerId = u32;

pub trait AudioBackend {
    /// `None` when the wave data is missing.
    fn create_stream(&mut self, name: &str, looping: bool) -> Option<StreamId>;
    fn stream_duration_ms(&self, stream: StreamId) -> u64;
    fn release_stream(&mut self, stream: StreamId);
    fn play(&mut self, stream: StreamId, volume: i32, balance: i32, is_speech: bool) -> PlayerId;
    fn set_volume_balance(&mut self, player: PlayerId, volume: i32, balance: i32);
    fn stop(&mut self, player: PlayerId);
    /// Lets a looping player finish its current iteration and then stop.
    fn end_loop(&mut self, player: PlayerId) {
        let _ = player;
    }
    fn is_playing(&self, player: PlayerId) -> bool;
}

pub trait Presentation {
    fn commit_region(&mut self, rect: Rect) {
        let _ = rect;
    }
    fn blit_frame(&mut self, frame: &DecodedFrame, rect: Rect) {
        let _ = (frame, rect);
    }
    fn set_cursor(&mut self, cursor: Option<u32>) {
        let _ = cursor;
    }
    fn show_tray(&mut self, visible: bool) {
        let _ = visible;
    }
    fn draw_tray_slot(&mut self, slot: usize, item: u32, highlighted: bool) {
        let _ = (slot, item, highlighted);
    }
    fn show_subtitle(&mut self, lines: &[String], color: [u8; 3]) {
        let _ = (lines, color);
    }
    fn clear_subtitle(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Main,
    Pause,
    Credits,
}

/// Services a menu page may call back into while it owns the quantum.
pub trait MenuInterface {
    fn commit_region(&mut self, rect: Rect);
    fn mouse_position(&self) -> Point;
    fn pop_event(&mut self) -> Option<OsEvent>;
    fn has_any_save(&self) -> bool;
    fn can_save(&self) -> bool;
    fn restart_game(&mut self);
    fn go_to_credits(&mut self);
    fn change_menu(&mut self, kind: MenuKind);
    fn close_menu(&mut self);
    fn quit_game(&mut self);
    fn reload_from_checkpoint(&mut self);
    fn label(&self, id: &str) -> Option<LabelDef>;
}

pub trait MenuPage {
    /// Runs one quantum. Returns `true` when the runtime should keep
    /// iterating in the same frame.
    fn run(&mut self, iface: &mut dyn MenuInterface) -> bool;
}

pub trait MenuProvider {
    fn create(&mut self, kind: MenuKind) -> Option<Box<dyn MenuPage>>;
}

/// Bundle of collaborators handed to the runtime.
pub struct Host {
    pub clock: Box<dyn Clock>,
    pub video: Box<dyn VideoSource>,
    pub audio: Box<dyn AudioBackend>,
    pub presentation: Box<dyn Presentation>,
    pub menus: Option<Box<dyn MenuProvider>>,
}
