//! One scheduling quantum per game state. Each `run_*` returns `true` when
//! the driver should immediately run the (possibly new) state again.

use log::debug;

use super::{GameState, PanDirection, Runtime, ScriptEnvironment, PAN_LEFT_INTERACTION, PAN_RIGHT_INTERACTION};
use crate::definitions::{GameVariant, NUM_DIRECTIONS};
use crate::events::{KeymappedEvent, OsEvent};
use crate::host::MenuKind;
use crate::script::ScriptError;
use crate::types::Point;

type StateResult = Result<bool, ScriptError>;

impl Runtime {
    pub(crate) fn run_idle(&mut self) -> StateResult {
        if self.pending.screen_change {
            self.pending.screen_change = false;
            self.change_to_screen(self.room, self.screen);
            return Ok(true);
        }
        if self.pending.ambient_sounds {
            self.pending.ambient_sounds = false;
            self.trigger_ambient_sounds();
            return Ok(true);
        }
        if self.pending.return_to_idle {
            self.pending.return_to_idle = false;
            self.idle.hovered = None;
            self.idle.have_click = false;
            self.idle.playing = None;
            self.set_cursor(self.defs.config.default_cursor);
            return Ok(true);
        }
        if self.pending.pre_idle_actions {
            self.pending.pre_idle_actions = false;
            let pos = self.mouse;
            self.update_hover(pos);
            return Ok(true);
        }

        self.advance_idle_animation();

        while let Some(event) = self.pop_event() {
            match event {
                OsEvent::MouseMove { pos } => {
                    if self.lmb_down && self.pan.armed {
                        if let Some(direction) = self.pan_gesture(pos) {
                            self.start_pan_gesture(direction);
                        }
                    } else {
                        self.update_hover(pos);
                    }
                }
                OsEvent::MouseDown { pos } => {
                    if self.idle.have_click {
                        if let Some(id) = self.idle.hovered {
                            if let Some(script) = self.interaction_script(id) {
                                debug!("clicked interaction {id}");
                                let env = ScriptEnvironment {
                                    lmb: true,
                                    ..ScriptEnvironment::default()
                                };
                                self.activate_script(script, env);
                            }
                        }
                    } else {
                        self.pan.anchor = pos;
                        self.pan.armed = true;
                    }
                }
                OsEvent::MouseUp { .. } => self.pan.armed = false,
                OsEvent::Keymapped { key } => match key {
                    KeymappedEvent::Escape => {}
                    KeymappedEvent::Menu => {
                        self.open_menu(MenuKind::Pause);
                    }
                    KeymappedEvent::Quit => self.state = GameState::Quit,
                },
            }
            if self.state != GameState::Idle {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs the hover pass of the interaction under `pos` when it changes.
    fn update_hover(&mut self, pos: Point) {
        let hit = self.detect_interaction(pos);
        if hit == self.idle.hovered {
            return;
        }
        self.idle.hovered = hit;
        self.idle.have_click = false;
        self.set_cursor(self.defs.config.default_cursor);
        if let Some(script) = hit.and_then(|id| self.interaction_script(id)) {
            self.activate_script(script, ScriptEnvironment::default());
        }
    }

    fn pan_gesture(&self, pos: Point) -> Option<PanDirection> {
        let margin = self.defs.config.pan_margin;
        let dx = pos.x - self.pan.anchor.x;
        if dx <= -margin {
            Some(PanDirection::Left)
        } else if dx >= margin {
            Some(PanDirection::Right)
        } else {
            None
        }
    }

    /// A drag past the margin runs the screen's pan interaction, or pans
    /// directly when the screen binds none.
    fn start_pan_gesture(&mut self, direction: PanDirection) {
        let id = match direction {
            PanDirection::Left => PAN_LEFT_INTERACTION,
            PanDirection::Right => PAN_RIGHT_INTERACTION,
        };
        match self.interaction_script(id) {
            Some(script) => {
                let env = ScriptEnvironment {
                    lmb: true,
                    lmb_drag: true,
                    pan_interaction: Some(direction),
                    ..ScriptEnvironment::default()
                };
                self.activate_script(script, env);
            }
            None => {
                if !self.begin_pan(direction) {
                    self.pan.armed = false;
                }
            }
        }
    }

    pub(crate) fn run_script(&mut self) -> StateResult {
        while self.state == GameState::Script {
            self.step_script()?;
        }
        Ok(true)
    }

    pub(crate) fn run_delay(&mut self) -> StateResult {
        if self.now() >= self.delay_until {
            self.state = GameState::Script;
            return Ok(true);
        }
        self.advance_idle_animation();
        Ok(false)
    }

    pub(crate) fn run_horizontal_pan(&mut self, is_right: bool) -> StateResult {
        let direction = if is_right {
            PanDirection::Right
        } else {
            PanDirection::Left
        };

        let mut stop = !self.lmb_down;
        while !stop {
            let Some(event) = self.pop_event() else {
                break;
            };
            match event {
                OsEvent::MouseUp { .. } => stop = true,
                OsEvent::MouseMove { pos } => stop = self.pan_gesture(pos) != Some(direction),
                _ => {}
            }
        }

        if stop {
            self.finish_pan(direction);
            return Ok(true);
        }
        self.advance_animation(true, false);
        Ok(false)
    }

    /// Lets the pan run on to the next direction boundary and adopts that
    /// direction.
    fn finish_pan(&mut self, direction: PanDirection) {
        let def = self.anim.def().clone();
        let frames = def.frame_count();
        let offset = self.anim.displaying_frame().saturating_sub(def.first_frame);
        let slice = (offset * NUM_DIRECTIONS + frames - 1) / frames;
        let stop_frame = (def.first_frame + frames * slice / NUM_DIRECTIONS).min(def.last_frame);
        let slice = slice % NUM_DIRECTIONS;

        self.direction = match direction {
            PanDirection::Right => slice,
            PanDirection::Left => (NUM_DIRECTIONS - slice) % NUM_DIRECTIONS,
        };
        debug!("pan settles on frame {stop_frame}, direction {}", self.direction);

        self.anim.set_last_frame(stop_frame);
        self.pan.armed = false;
        self.pending.return_to_idle = true;
        self.pending.pre_idle_actions = true;
        self.state = GameState::WaitingForAnimation;
    }

    /// Escape interrupts the wait when armed. Returns `true` if it did.
    fn check_escape(&mut self) -> bool {
        while let Some(event) = self.pop_event() {
            if event == (OsEvent::Keymapped { key: KeymappedEvent::Escape }) && self.esc_armed {
                debug!("animation skipped");
                self.anim.pause();
                self.post_facing_anim = None;
                self.env.esc = true;
                self.state = GameState::Script;
                return true;
            }
        }
        false
    }

    pub(crate) fn run_wait_for_animation(&mut self) -> StateResult {
        if self.check_escape() {
            return Ok(true);
        }
        if self.advance_animation(false, false) {
            self.state = GameState::Script;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn run_wait_for_facing(&mut self) -> StateResult {
        if self.check_escape() {
            return Ok(true);
        }
        if self.advance_animation(true, true) {
            self.anim.set_stop_frame(None);
            self.state = GameState::Script;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn run_wait_for_facing_to_anim(&mut self) -> StateResult {
        if self.check_escape() {
            return Ok(true);
        }
        if self.advance_animation(true, true) {
            self.anim.set_stop_frame(None);
            match self.post_facing_anim.take() {
                Some(def) => {
                    self.change_animation(&def, def.first_frame, true);
                    self.state = GameState::WaitingForAnimation;
                }
                None => self.state = GameState::Script,
            }
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn run_gyro_idle(&mut self) -> StateResult {
        let mut released = !self.lmb_down;
        while !released {
            match self.pop_event() {
                Some(OsEvent::MouseUp { .. }) => released = true,
                Some(_) => {}
                None => break,
            }
        }

        if released {
            debug!("gyro {} released at state {}", self.gyros.active_gyro, self.gyros.active().current_state);
            self.pending.completion_check = true;
            self.state = GameState::Script;
            if self.defs.config.variant == GameVariant::Schizm {
                self.terminate_script()?;
            }
            return Ok(true);
        }

        let pos = self.mouse;
        if let Some(step) = self.gyros.drag_step(pos) {
            debug!(
                "gyro {} stepped {:?} to {}",
                self.gyros.active_gyro,
                step.direction,
                self.gyros.active().current_state
            );
            self.change_animation(&step.animation, step.animation.first_frame, false);
            self.state = GameState::GyroAnimation;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn run_gyro_animation(&mut self) -> StateResult {
        if self.advance_animation(false, false) {
            self.state = GameState::GyroIdle;
            return Ok(true);
        }
        Ok(false)
    }
}
