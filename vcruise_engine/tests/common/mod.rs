#![allow(dead_code)]

use std::path::PathBuf;
use std::rc::Rc;

use vcruise_engine::definitions::{AnimationDef, GameDefinitions, InteractionRegion};
use vcruise_engine::session::HeadlessSession;
use vcruise_engine::{Instruction, Rect, Script, ScriptOp};

pub const ROOM: u32 = 1;
pub const SCREEN: u32 = 0xa0;
pub const TICK_MS: u64 = 100;
pub const DEFAULT_CURSOR: u32 = 1;
pub const INTERACTIVE_CURSOR: u32 = 2;

pub fn ops(list: &[(ScriptOp, i32)]) -> Rc<Script> {
    Rc::new(Script::new(
        list.iter()
            .map(|&(op, arg)| Instruction::new(op, arg))
            .collect(),
    ))
}

pub fn instructions(list: &[(ScriptOp, i32)]) -> Vec<Instruction> {
    list.iter()
        .map(|&(op, arg)| Instruction::new(op, arg))
        .collect()
}

/// One room with one empty screen, a fixed seed and both cursors set.
pub fn base_defs() -> GameDefinitions {
    let mut defs = GameDefinitions::default();
    defs.config.start_room = ROOM;
    defs.config.start_screen = SCREEN;
    defs.config.start_direction = 0;
    defs.config.default_cursor = Some(DEFAULT_CURSOR);
    defs.config.interactive_cursor = Some(INTERACTIVE_CURSOR);
    defs.config.random_seed = Some(42);
    defs.rooms.entry(ROOM).or_default().screens.entry(SCREEN).or_default();
    defs
}

pub fn add_string(defs: &mut GameDefinitions, text: &str) -> i32 {
    defs.scripts.strings.push(text.to_string());
    (defs.scripts.strings.len() - 1) as i32
}

/// Registers an animation and returns the string index `AnimName` needs.
pub fn add_animation(defs: &mut GameDefinitions, name: &str, resource: i32, first: u32, last: u32) -> i32 {
    defs.rooms.entry(ROOM).or_default().animations.insert(
        name.to_string(),
        AnimationDef {
            resource_id: resource,
            first_frame: first,
            last_frame: last,
            name: name.to_string(),
            ..AnimationDef::default()
        },
    );
    add_string(defs, name)
}

pub fn set_entry(defs: &mut GameDefinitions, screen: u32, script: Rc<Script>) {
    defs.rooms.entry(ROOM).or_default().screens.entry(screen).or_default();
    defs.scripts
        .rooms
        .entry(ROOM)
        .or_default()
        .screens
        .entry(screen)
        .or_default()
        .entry_script = Some(script);
}

/// Binds `script` to interaction `id`, hit-testable at `rect` when `rect`
/// is given (pan interactions have no region).
pub fn add_interaction(defs: &mut GameDefinitions, screen: u32, id: u32, rect: Option<Rect>, script: Rc<Script>) {
    let screen_def = defs.rooms.entry(ROOM).or_default().screens.entry(screen).or_default();
    if let Some(rect) = rect {
        screen_def.interactions.push(InteractionRegion {
            id,
            direction: 0,
            rect,
        });
    }
    defs.scripts
        .rooms
        .entry(ROOM)
        .or_default()
        .screens
        .entry(screen)
        .or_default()
        .interaction_scripts
        .insert(id, script);
}

/// Starts a new game and runs the first frame, which enters the start screen.
pub fn started(defs: GameDefinitions) -> HeadlessSession {
    let mut session = HeadlessSession::new(defs);
    session.runtime.start_new_game();
    session.step(TICK_MS).expect("first frame runs");
    session
}

pub fn sample_pack_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("sample_pack.json")
}
