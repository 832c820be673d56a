use std::collections::BTreeMap;
use std::rc::Rc;

use log::{info, warn};

use super::{GameState, Runtime};
use crate::definitions::LabelDef;
use crate::events::{EventQueue, OsEvent};
use crate::host::{MenuInterface, MenuKind, Presentation};
use crate::script::ScriptError;
use crate::types::{Point, Rect};

/// What a menu page asked for during its quantum.
#[derive(Debug, Clone, Copy, Default)]
struct MenuRequests {
    restart: bool,
    credits: bool,
    change: Option<MenuKind>,
    close: bool,
    quit: bool,
    reload: bool,
}

struct MenuBridge<'a> {
    presentation: &'a mut dyn Presentation,
    events: &'a mut EventQueue,
    mouse: &'a mut Point,
    lmb_down: &'a mut bool,
    has_save: bool,
    can_save: bool,
    labels: &'a BTreeMap<String, LabelDef>,
    requests: MenuRequests,
}

impl MenuInterface for MenuBridge<'_> {
    fn commit_region(&mut self, rect: Rect) {
        self.presentation.commit_region(rect);
    }

    fn mouse_position(&self) -> Point {
        *self.mouse
    }

    fn pop_event(&mut self) -> Option<OsEvent> {
        let event = self.events.next()?;
        if let Some(pos) = event.position() {
            *self.mouse = pos;
        }
        match event {
            OsEvent::MouseDown { .. } => *self.lmb_down = true,
            OsEvent::MouseUp { .. } => *self.lmb_down = false,
            _ => {}
        }
        Some(event)
    }

    fn has_any_save(&self) -> bool {
        self.has_save
    }

    fn can_save(&self) -> bool {
        self.can_save
    }

    fn restart_game(&mut self) {
        self.requests.restart = true;
    }

    fn go_to_credits(&mut self) {
        self.requests.credits = true;
    }

    fn change_menu(&mut self, kind: MenuKind) {
        self.requests.change = Some(kind);
    }

    fn close_menu(&mut self) {
        self.requests.close = true;
    }

    fn quit_game(&mut self) {
        self.requests.quit = true;
    }

    fn reload_from_checkpoint(&mut self) {
        self.requests.reload = true;
    }

    fn label(&self, id: &str) -> Option<LabelDef> {
        self.labels.get(id).cloned()
    }
}

impl Runtime {
    pub(crate) fn run_menu(&mut self) -> Result<bool, ScriptError> {
        let Some(mut page) = self.menu.take() else {
            self.close_menu();
            return Ok(true);
        };

        let defs = Rc::clone(&self.defs);
        let mut bridge = MenuBridge {
            presentation: self.host.presentation.as_mut(),
            events: &mut self.events,
            mouse: &mut self.mouse,
            lmb_down: &mut self.lmb_down,
            has_save: self.checkpoint.is_some(),
            can_save: self.saves_allowed && self.is_in_game,
            labels: &defs.labels,
            requests: MenuRequests::default(),
        };
        let keep_running = page.run(&mut bridge);
        let requests = bridge.requests;
        self.menu = Some(page);

        if requests.quit {
            info!("quit requested from menu");
            self.menu = None;
            self.state = GameState::Quit;
            return Ok(false);
        }
        if requests.restart {
            self.menu = None;
            self.start_new_game();
            return Ok(true);
        }
        if requests.reload {
            match self.checkpoint.clone() {
                Some(snapshot) => {
                    self.menu = None;
                    self.restore_snapshot(&snapshot);
                    return Ok(true);
                }
                None => warn!("no checkpoint to reload"),
            }
        }
        if requests.credits {
            self.open_menu(MenuKind::Credits);
            return Ok(true);
        }
        if let Some(kind) = requests.change {
            self.open_menu(kind);
            return Ok(true);
        }
        if requests.close {
            self.close_menu();
            return Ok(true);
        }
        Ok(keep_running)
    }

    fn close_menu(&mut self) {
        self.menu = None;
        self.state = match self.menu_return_state {
            GameState::Menu => GameState::Idle,
            state => state,
        };
    }
}
