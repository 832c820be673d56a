//! The runtime aggregate: script VM, game state machine and every
//! subsystem they drive.

mod dispatch;
mod menu;
mod ops;
mod snapshot;
mod states;

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use vcruise_formats::{
    PendingStaticAnimParams, SaveGameSnapshot, SoundParams3D, SwappableState, TriggeredOneShot,
};

use crate::animation::{AnimationDriver, AnimationEnd, FrameRate};
use crate::definitions::{AnimationDef, GameDefinitions, SubtitleDef, NUM_DIRECTIONS};
use crate::events::{EventQueue, OsEvent};
use crate::gyro::GyroState;
use crate::host::{Host, MenuKind, MenuPage};
use crate::script::{Instruction, Script, ScriptError};
use crate::sound::{MusicPlayer, SoundEngine, TriggerRequest};
use crate::types::{Point, Rect};
use crate::value::OperandStack;

pub const INVENTORY_SLOTS: usize = 6;

/// Interaction ids bound to panorama drags.
pub const PAN_LEFT_INTERACTION: u32 = 1;
pub const PAN_RIGHT_INTERACTION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Idle,
    Script,
    Delay,
    PanLeft,
    PanRight,
    WaitingForAnimation,
    WaitingForFacing,
    WaitingForFacingToAnim,
    GyroIdle,
    GyroAnimation,
    Menu,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub room: u32,
    pub screen: u32,
    pub direction: u32,
}

/// Per-activation flags a script can observe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptEnvironment {
    pub lmb: bool,
    pub lmb_drag: bool,
    pub esc: bool,
    pub pan_interaction: Option<PanDirection>,
    pub fps_override: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CallFrame {
    pub script: Rc<Script>,
    pub next_instruction: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryItem {
    pub item_id: u32,
    pub highlighted: bool,
}

/// Work deferred until the current script finishes or Idle is entered.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PendingActions {
    pub screen_change: bool,
    pub ambient_sounds: bool,
    pub pre_idle_actions: bool,
    pub return_to_idle: bool,
    pub completion_check: bool,
    pub hero_swap: bool,
    pub menu: Option<MenuKind>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PanoramaState {
    pub left: Option<AnimationDef>,
    pub right: Option<AnimationDef>,
    pub frame_rate: Option<u32>,
    pub anchor: Point,
    pub armed: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct IdleState {
    pub animations: [Option<AnimationDef>; NUM_DIRECTIONS as usize],
    pub playing: Option<u32>,
    pub hovered: Option<u32>,
    pub have_click: bool,
}

/// Two animations recorded by `SAnimX`. Playback of static animations is
/// not performed; the data is kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAnimation {
    pub animations: [AnimationDef; 2],
    pub flags: i32,
    pub params: PendingStaticAnimParams,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct HeroState {
    pub hero: u32,
    pub swap_out: Location,
    pub other: Option<SwappableState>,
}

pub struct Runtime {
    pub(crate) defs: Rc<GameDefinitions>,
    pub(crate) host: Host,
    pub(crate) state: GameState,
    pub(crate) menu_return_state: GameState,
    pub(crate) stack: OperandStack,
    pub(crate) call_stack: Vec<CallFrame>,
    pub(crate) env: ScriptEnvironment,
    pub(crate) events: EventQueue,
    pub(crate) mouse: Point,
    pub(crate) lmb_down: bool,
    pub(crate) room: u32,
    pub(crate) screen: u32,
    pub(crate) direction: u32,
    pub(crate) pending: PendingActions,
    pub(crate) anim: AnimationDriver,
    pub(crate) post_facing_anim: Option<AnimationDef>,
    pub(crate) pan: PanoramaState,
    pub(crate) idle: IdleState,
    pub(crate) delay_until: u64,
    pub(crate) gyros: GyroState,
    pub(crate) sounds: SoundEngine,
    pub(crate) music: MusicPlayer,
    pub(crate) inventory: [InventoryItem; INVENTORY_SLOTS],
    pub(crate) variables: BTreeMap<u32, i32>,
    pub(crate) globals: BTreeMap<u32, i32>,
    pub(crate) timers: BTreeMap<u32, u64>,
    pub(crate) triggered_one_shots: BTreeSet<TriggeredOneShot>,
    pub(crate) say_cycles: BTreeMap<u32, u32>,
    pub(crate) esc_armed: bool,
    pub(crate) rng: StdRng,
    pub(crate) anim_names: Vec<String>,
    pub(crate) pending_static_params: PendingStaticAnimParams,
    pub(crate) pending_sound_params: SoundParams3D,
    pub(crate) static_animation: Option<StaticAnimation>,
    pub(crate) anim_volume: i32,
    pub(crate) heroes: HeroState,
    pub(crate) checkpoint: Option<SaveGameSnapshot>,
    pub(crate) is_in_game: bool,
    pub(crate) saves_allowed: bool,
    pub(crate) menu: Option<Box<dyn MenuPage>>,
    pub(crate) subtitle_expiry: Option<u64>,
    pub(crate) tray_visible: bool,
    pub(crate) cursor: Option<u32>,
    /// Idle animation carried over from a restored snapshot.
    pub(crate) restored_idle: Option<AnimationDef>,
}

impl Runtime {
    pub fn new(defs: Rc<GameDefinitions>, host: Host) -> Self {
        let config = &defs.config;
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let start = Location {
            room: config.start_room,
            screen: config.start_screen,
            direction: config.start_direction,
        };
        let music = MusicPlayer::new(config.mute_music);
        Runtime {
            host,
            state: GameState::Idle,
            menu_return_state: GameState::Idle,
            stack: OperandStack::new(),
            call_stack: Vec::new(),
            env: ScriptEnvironment::default(),
            events: EventQueue::new(),
            mouse: Point::default(),
            lmb_down: false,
            room: start.room,
            screen: start.screen,
            direction: start.direction,
            pending: PendingActions::default(),
            anim: AnimationDriver::new(),
            post_facing_anim: None,
            pan: PanoramaState::default(),
            idle: IdleState::default(),
            delay_until: 0,
            gyros: GyroState::default(),
            sounds: SoundEngine::new(),
            music,
            inventory: [InventoryItem::default(); INVENTORY_SLOTS],
            variables: BTreeMap::new(),
            globals: BTreeMap::new(),
            timers: BTreeMap::new(),
            triggered_one_shots: BTreeSet::new(),
            say_cycles: BTreeMap::new(),
            esc_armed: false,
            rng,
            anim_names: Vec::new(),
            pending_static_params: PendingStaticAnimParams::default(),
            pending_sound_params: SoundParams3D::default(),
            static_animation: None,
            anim_volume: 100,
            heroes: HeroState::default(),
            checkpoint: None,
            is_in_game: false,
            saves_allowed: true,
            menu: None,
            subtitle_expiry: None,
            tray_visible: false,
            cursor: None,
            restored_idle: None,
            defs,
        }
    }

    /// Resets all game state and queues entry into the starting screen.
    pub fn start_new_game(&mut self) {
        info!("starting new game");
        let audio = self.host.audio.as_mut();
        self.sounds.clear(audio);
        self.sounds.ambient_mut().clear();
        self.music.stop(audio);

        self.stack.clear();
        self.call_stack.clear();
        self.env = ScriptEnvironment::default();
        self.pending = PendingActions::default();
        self.variables.clear();
        self.globals.clear();
        self.timers.clear();
        self.triggered_one_shots.clear();
        self.say_cycles.clear();
        self.heroes = HeroState::default();
        self.gyros.reset();
        self.checkpoint = None;
        self.static_animation = None;
        self.restored_idle = None;
        self.esc_armed = false;

        let config = &self.defs.config;
        self.room = config.start_room;
        self.screen = config.start_screen;
        self.direction = config.start_direction;

        for slot in 0..INVENTORY_SLOTS {
            self.inventory[slot] = InventoryItem::default();
            self.redraw_tray_slot(slot);
        }
        self.tray_visible = true;
        self.host.presentation.show_tray(true);

        self.is_in_game = true;
        self.saves_allowed = true;
        self.pending.screen_change = true;
        self.state = GameState::Idle;
    }

    pub fn queue_event(&mut self, event: OsEvent) {
        self.events.push(event);
    }

    /// Runs states until one yields, then discards unconsumed input.
    /// Returns `false` once the game has quit.
    pub fn run_frame(&mut self) -> Result<bool, ScriptError> {
        self.update_sounds_and_subtitles();

        loop {
            let more = match self.state {
                GameState::Idle => self.run_idle()?,
                GameState::Script => self.run_script()?,
                GameState::Delay => self.run_delay()?,
                GameState::PanLeft => self.run_horizontal_pan(false)?,
                GameState::PanRight => self.run_horizontal_pan(true)?,
                GameState::WaitingForAnimation => self.run_wait_for_animation()?,
                GameState::WaitingForFacing => self.run_wait_for_facing()?,
                GameState::WaitingForFacingToAnim => self.run_wait_for_facing_to_anim()?,
                GameState::GyroIdle => self.run_gyro_idle()?,
                GameState::GyroAnimation => self.run_gyro_animation()?,
                GameState::Menu => self.run_menu()?,
                GameState::Quit => return Ok(false),
            };
            if !more {
                break;
            }
        }

        while self.pop_event().is_some() {}
        self.update_sounds_and_subtitles();
        Ok(self.state != GameState::Quit)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn env(&self) -> &ScriptEnvironment {
        &self.env
    }

    pub fn location(&self) -> Location {
        Location {
            room: self.room,
            screen: self.screen,
            direction: self.direction,
        }
    }

    pub fn variable(&self, slot: u32) -> i32 {
        self.variables
            .get(&self.var_key(slot))
            .copied()
            .unwrap_or(0)
    }

    pub fn global(&self, slot: u32) -> i32 {
        self.globals.get(&slot).copied().unwrap_or(0)
    }

    pub fn sounds(&self) -> &SoundEngine {
        &self.sounds
    }

    pub fn music(&self) -> &MusicPlayer {
        &self.music
    }

    pub fn gyros(&self) -> &GyroState {
        &self.gyros
    }

    pub fn inventory(&self) -> &[InventoryItem] {
        &self.inventory
    }

    pub fn animation(&self) -> &AnimationDriver {
        &self.anim
    }

    pub fn checkpoint(&self) -> Option<&SaveGameSnapshot> {
        self.checkpoint.as_ref()
    }

    pub fn static_animation(&self) -> Option<&StaticAnimation> {
        self.static_animation.as_ref()
    }

    pub fn hero(&self) -> u32 {
        self.heroes.hero
    }

    pub fn mouse_position(&self) -> Point {
        self.mouse
    }

    pub fn is_in_game(&self) -> bool {
        self.is_in_game
    }

    pub(crate) fn now(&self) -> u64 {
        self.host.clock.millis()
    }

    pub(crate) fn var_key(&self, slot: u32) -> u32 {
        (self.room << 16) | (slot & 0xffff)
    }

    /// Next input event; mouse position and button state follow every
    /// event popped, consumed or not.
    pub(crate) fn pop_event(&mut self) -> Option<OsEvent> {
        let event = self.events.next()?;
        match event {
            OsEvent::MouseMove { pos } => self.mouse = pos,
            OsEvent::MouseDown { pos } => {
                self.mouse = pos;
                self.lmb_down = true;
            }
            OsEvent::MouseUp { pos } => {
                self.mouse = pos;
                self.lmb_down = false;
            }
            OsEvent::Keymapped { .. } => {}
        }
        Some(event)
    }

    fn update_sounds_and_subtitles(&mut self) {
        let now = self.now();
        let audio = self.host.audio.as_mut();
        self.sounds.update(now, audio);
        self.music.update(now, &self.defs.scores, audio);
        if let Some(expiry) = self.subtitle_expiry {
            if now >= expiry {
                self.subtitle_expiry = None;
                self.host.presentation.clear_subtitle();
            }
        }
    }

    /// Starts `script` from its first instruction with a fresh stack.
    pub fn activate_script(&mut self, script: Rc<Script>, env: ScriptEnvironment) {
        self.call_stack.clear();
        self.stack.clear();
        self.env = env;
        self.call_stack.push(CallFrame {
            script,
            next_instruction: 0,
        });
        self.state = GameState::Script;
    }

    /// Executes one instruction of the active script, popping exhausted
    /// frames and terminating the script once the call stack empties.
    pub fn step_script(&mut self) -> Result<(), ScriptError> {
        let Some(frame) = self.call_stack.last_mut() else {
            return self.terminate_script();
        };
        match frame.script.instructions.get(frame.next_instruction).copied() {
            Some(instruction) => {
                frame.next_instruction += 1;
                dispatch::execute(self, instruction)
            }
            None => {
                self.call_stack.pop();
                if self.call_stack.is_empty() {
                    self.terminate_script()
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Runs a one-off instruction sequence to completion or until it
    /// hands control to another state.
    pub fn run_instructions(&mut self, instructions: Vec<Instruction>) -> Result<(), ScriptError> {
        self.activate_script(Rc::new(Script::new(instructions)), ScriptEnvironment::default());
        while self.state == GameState::Script {
            self.step_script()?;
        }
        Ok(())
    }

    pub(crate) fn terminate_script(&mut self) -> Result<(), ScriptError> {
        self.call_stack.clear();
        if self.state == GameState::Script {
            self.state = GameState::Idle;
        }

        if self.pending.completion_check {
            self.pending.completion_check = false;
            if self.run_completion_check() {
                return Ok(());
            }
        }

        if self.pending.hero_swap {
            self.pending.hero_swap = false;
            self.swap_heroes();
        }

        if self.pending.screen_change {
            self.pending.screen_change = false;
            self.change_to_screen(self.room, self.screen);
        }

        if let Some(kind) = self.pending.menu.take() {
            self.open_menu(kind);
        }
        Ok(())
    }

    fn run_completion_check(&mut self) -> bool {
        let solved = self.gyros.all_solved();
        let id = if solved {
            self.gyros.complete_interaction
        } else {
            self.gyros.failure_interaction
        };
        debug!("gyro completion check: solved={solved}, interaction {id}");
        match self.interaction_script(id) {
            Some(script) => {
                self.activate_script(script, ScriptEnvironment::default());
                true
            }
            None => false,
        }
    }

    pub(crate) fn interaction_script(&self, id: u32) -> Option<Rc<Script>> {
        self.defs
            .scripts
            .interaction_script(self.room, self.screen, id)
    }

    pub(crate) fn detect_interaction(&self, pos: Point) -> Option<u32> {
        self.defs
            .screen(self.room, self.screen)?
            .hit_test(self.direction, pos)
    }

    /// Enters a screen: clears per-screen state, records a checkpoint and
    /// runs the screen's entry script.
    pub(crate) fn change_to_screen(&mut self, room: u32, screen: u32) {
        info!("entering room {room} screen {screen:#x}");
        self.room = room;
        self.screen = screen;

        self.gyros.reset();
        self.idle = IdleState::default();
        self.pan = PanoramaState::default();
        self.static_animation = None;
        if let Some(def) = self.restored_idle.take() {
            self.idle.animations[(self.direction % NUM_DIRECTIONS) as usize] = Some(def);
        }

        self.pending.ambient_sounds = true;
        self.pending.pre_idle_actions = true;
        self.pending.return_to_idle = true;

        if self.is_in_game {
            self.checkpoint = Some(self.capture_snapshot());
        }

        if let Some(script) = self.defs.scripts.entry_script(room, screen) {
            self.activate_script(script, ScriptEnvironment::default());
        }
    }

    pub(crate) fn trigger_ambient_sounds(&mut self) {
        let Some(ambient) = self.sounds.ambient_mut().on_scene_change() else {
            return;
        };
        let defs = Rc::clone(&self.defs);
        if let Some(index) = self.sounds.resolve_by_name(&ambient.name, true, &defs.waves) {
            let now = self.now();
            self.sounds.trigger(
                index,
                TriggerRequest::one_shot(ambient.volume, ambient.balance),
                now,
                self.host.audio.as_mut(),
            );
        }
    }

    /// Loads `def` into the frame driver starting at `initial_frame`.
    /// `consume_fps` applies and clears a pending `Speed` override.
    pub(crate) fn change_animation(&mut self, def: &AnimationDef, initial_frame: u32, consume_fps: bool) {
        self.idle.playing = None;
        let end_mode = if self.defs.terminates_at_start_of_frame(def.resource_number()) {
            AnimationEnd::StartOfLastFrame
        } else {
            AnimationEnd::EndOfLastFrame
        };
        self.anim
            .begin(self.host.video.as_mut(), def, initial_frame, end_mode);

        let fps = if consume_fps {
            self.env.fps_override.take()
        } else {
            None
        };
        let rate = match fps {
            Some(fps) => Some(FrameRate::per_second(fps)),
            None if self.anim.has_audio() => None,
            None => Some(FrameRate::per_second(self.defs.config.default_frame_rate)),
        };
        self.anim.lock_frame_rate(rate);
    }

    /// Advances the frame driver one quantum and fires per-frame events.
    pub(crate) fn advance_animation(&mut self, looping: bool, use_stop_frame: bool) -> bool {
        let now = self.now();
        let config = &self.defs.config;
        let viewport = Rect::sized(config.screen_width, config.screen_height);
        let step = self.anim.advance(
            now,
            looping,
            use_stop_frame,
            self.host.presentation.as_mut(),
            viewport,
        );
        if let Some(frame) = step.frame {
            self.on_frame_admitted(frame.frame, frame.offset, now);
        }
        step.ended
    }

    fn on_frame_admitted(&mut self, frame: u32, offset: u32, now: u64) {
        let defs = Rc::clone(&self.defs);
        let resource = self.anim.def().resource_number();

        if let Some(pose) = defs
            .animation_metadata
            .get(&resource)
            .and_then(|meta| meta.frame_positions.get(&frame))
        {
            self.sounds.set_listener(*pose, self.host.audio.as_mut());
        }

        if let Some(subtitle) = defs
            .animation_subtitles
            .get(&resource)
            .and_then(|frames| frames.get(&frame))
        {
            self.show_subtitle(subtitle, now);
        }

        let name = self.anim.def().name.to_ascii_lowercase();
        if let Some(entries) = defs.playlists.get(&name) {
            for entry in entries.iter().filter(|entry| entry.frame == offset) {
                let Some(index) = self
                    .sounds
                    .resolve_by_name(&entry.sound, !entry.is_update, &defs.waves)
                else {
                    continue;
                };
                let audio = self.host.audio.as_mut();
                if entry.is_update {
                    self.sounds.adjust(index, entry.volume, entry.balance, audio);
                } else {
                    self.sounds.trigger(
                        index,
                        TriggerRequest::one_shot(entry.volume, entry.balance),
                        now,
                        audio,
                    );
                }
            }
        }
    }

    pub(crate) fn show_subtitle(&mut self, subtitle: &SubtitleDef, now: u64) {
        let lines: Vec<String> = subtitle.text.lines().map(str::to_string).collect();
        self.host.presentation.show_subtitle(&lines, subtitle.color);
        self.subtitle_expiry = Some(now + subtitle.duration_ms as u64);
    }

    /// Plays the idle animation bound to the current direction, if any.
    pub(crate) fn advance_idle_animation(&mut self) {
        let direction = self.direction;
        let Some(def) = self.idle.animations[(direction % NUM_DIRECTIONS) as usize].clone() else {
            return;
        };
        if self.idle.playing != Some(direction) {
            self.change_animation(&def, def.first_frame, false);
            self.idle.playing = Some(direction);
        }
        self.advance_animation(true, false);
    }

    /// Turn animation from the current direction to `target`, preferring
    /// the shorter way round. Returns the animation, its first frame and the
    /// frame to stop on.
    pub(crate) fn face_direction_animation(&self, target: u32) -> Option<(AnimationDef, u32, u32)> {
        let target = target % NUM_DIRECTIONS;
        let current = self.direction % NUM_DIRECTIONS;
        if target == current {
            return None;
        }
        let right_steps = (target + NUM_DIRECTIONS - current) % NUM_DIRECTIONS;
        let left_steps = (current + NUM_DIRECTIONS - target) % NUM_DIRECTIONS;
        let use_right = match (&self.pan.left, &self.pan.right) {
            (_, Some(_)) if right_steps <= left_steps => true,
            (Some(_), _) => false,
            (None, Some(_)) => true,
            (None, None) => return None,
        };

        let slice_frame = |def: &AnimationDef, slice: u32| {
            def.first_frame + def.frame_count() * slice / NUM_DIRECTIONS
        };
        if use_right {
            let def = self.pan.right.clone()?;
            let initial = slice_frame(&def, current);
            let stop = slice_frame(&def, target);
            Some((def, initial, stop))
        } else {
            let def = self.pan.left.clone()?;
            let initial = slice_frame(&def, (NUM_DIRECTIONS - current) % NUM_DIRECTIONS);
            let stop = slice_frame(&def, (NUM_DIRECTIONS - target) % NUM_DIRECTIONS);
            Some((def, initial, stop))
        }
    }

    /// Starts a looping pan from the slice matching the current direction.
    pub(crate) fn begin_pan(&mut self, direction: PanDirection) -> bool {
        let def = match direction {
            PanDirection::Left => self.pan.left.clone(),
            PanDirection::Right => self.pan.right.clone(),
        };
        let Some(def) = def else {
            return false;
        };
        let slice = match direction {
            PanDirection::Right => self.direction % NUM_DIRECTIONS,
            PanDirection::Left => (NUM_DIRECTIONS - self.direction % NUM_DIRECTIONS) % NUM_DIRECTIONS,
        };
        let initial = def.first_frame + def.frame_count() * slice / NUM_DIRECTIONS;
        self.change_animation(&def, initial, false);
        if let Some(fps) = self.pan.frame_rate {
            self.anim.lock_frame_rate(Some(FrameRate::per_second(fps)));
        }
        self.state = match direction {
            PanDirection::Left => GameState::PanLeft,
            PanDirection::Right => GameState::PanRight,
        };
        debug!("panning {direction:?} from direction {}", self.direction);
        true
    }

    pub(crate) fn set_cursor(&mut self, cursor: Option<u32>) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.host.presentation.set_cursor(cursor);
        }
    }

    pub(crate) fn redraw_tray_slot(&mut self, slot: usize) {
        let item = self.inventory[slot];
        self.host
            .presentation
            .draw_tray_slot(slot, item.item_id, item.highlighted);
    }

    /// Hands the quantum to a menu page from the host's menu provider.
    pub(crate) fn open_menu(&mut self, kind: MenuKind) -> bool {
        let Some(provider) = self.host.menus.as_mut() else {
            debug!("no menu provider for {kind:?}");
            return false;
        };
        let Some(page) = provider.create(kind) else {
            return false;
        };
        if self.state != GameState::Menu {
            self.menu_return_state = self.state;
        }
        self.menu = Some(page);
        self.state = GameState::Menu;
        true
    }
}
