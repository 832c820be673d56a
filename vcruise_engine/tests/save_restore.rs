mod common;

use anyhow::Result;
use common::{add_interaction, add_string, base_defs, instructions, ops, started, ROOM, SCREEN, TICK_MS};
use tempfile::tempdir;
use vcruise_engine::headless::AudioEvent;
use vcruise_engine::session::HeadlessSession;
use vcruise_engine::sound::LoopingState;
use vcruise_engine::{GameDefinitions, GameState, Point, Rect, ScriptOp::*, StackValue};
use vcruise_formats::{read_save_file, write_save_file, SaveGameSnapshot};

const OTHER_SCREEN: u32 = 0xa1;
const DOOR: Rect = Rect::new(200, 100, 440, 380);
const INSIDE: Point = Point::new(300, 200);

fn progress_defs() -> GameDefinitions {
    let mut defs = base_defs();
    defs.waves.insert("0002_wind".to_string());
    let wind = add_string(&mut defs, "0002_wind");
    defs.rooms.entry(ROOM).or_default().screens.entry(OTHER_SCREEN).or_default();
    add_interaction(
        &mut defs,
        SCREEN,
        5,
        Some(DOOR),
        ops(&[
            (LMB, 0),
            (Number, 77),
            (Number, 4),
            (VarStore, 0),
            (Number, 11),
            (Number, 5),
            (VarGlobalStore, 0),
            (Number, 31),
            (ItemAdd, 0),
            (Number, 3),
            (Number, 60),
            (SetTimer, 0),
            (String, wind),
            (Number, 80),
            (SoundL2, 0),
            (Number, OTHER_SCREEN as i32),
            (ChangeL, 0),
        ]),
    );
    defs
}

fn timer_done(session: &mut HeadlessSession) -> bool {
    session
        .runtime
        .run_instructions(instructions(&[(Number, 3), (GetTimer, 0)]))
        .unwrap();
    session.runtime.stack().values() == [StackValue::Integer(1)]
}

fn played(session: &HeadlessSession, wave: &str) -> bool {
    session
        .audio
        .events()
        .iter()
        .any(|event| matches!(event, AudioEvent::Play { name, .. } if name == wave))
}

#[test]
fn checkpoint_survives_a_save_file_round_trip() -> Result<()> {
    let mut session = started(progress_defs());
    session.click(INSIDE);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.location().screen, OTHER_SCREEN);

    let checkpoint = session.runtime.save_snapshot().expect("checkpoint after screen change");
    let state = checkpoint.active_state().expect("hero state");
    assert_eq!(state.screen_number, OTHER_SCREEN);
    assert_eq!(state.inventory[0].item_id, 31);
    assert_eq!(state.sounds.len(), 1);
    assert_eq!(state.sounds[0].volume, 80);
    assert_eq!(checkpoint.timers.get(&3), Some(&60_000));

    let dir = tempdir()?;
    let path = dir.path().join("slot1.sav");
    write_save_file(&path, &checkpoint)?;
    let loaded = read_save_file(&path)?;
    assert_eq!(loaded, checkpoint);

    let mut restored = HeadlessSession::new(progress_defs());
    restored.runtime.restore_snapshot(&loaded);
    restored.step(TICK_MS)?;

    assert_eq!(restored.runtime.state(), GameState::Idle);
    assert_eq!(restored.runtime.location().screen, OTHER_SCREEN);
    assert_eq!(restored.runtime.variable(4), 77);
    assert_eq!(restored.runtime.global(5), 11);
    assert_eq!(restored.runtime.inventory()[0].item_id, 31);
    assert!(restored
        .runtime
        .sounds()
        .sounds()
        .iter()
        .any(|sound| sound.name == "0002_wind" && sound.looping == LoopingState::Looping));
    assert!(played(&restored, "0002_wind"));

    assert!(!timer_done(&mut restored));
    restored.clock.advance(60_000);
    assert!(timer_done(&mut restored));
    Ok(())
}

#[test]
fn restore_discards_the_running_game() -> Result<()> {
    let mut session = started(progress_defs());
    let fresh = session.runtime.capture_snapshot();

    session.click(INSIDE);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.variable(4), 77);

    session.runtime.restore_snapshot(&fresh);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.location().screen, SCREEN);
    assert_eq!(session.runtime.variable(4), 0);
    assert_eq!(session.runtime.inventory()[0].item_id, 0);
    assert!(session.runtime.sounds().sounds().iter().all(|sound| sound.looping != LoopingState::Looping));
    Ok(())
}

#[test]
fn snapshot_without_hero_state_keeps_the_running_game() -> Result<()> {
    let mut session = started(progress_defs());
    session.click(INSIDE);
    session.step(TICK_MS)?;

    let mut empty = session.runtime.capture_snapshot();
    empty.states.clear();
    session.runtime.restore_snapshot(&empty);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.location().screen, OTHER_SCREEN);
    assert_eq!(session.runtime.variable(4), 77);
    assert_eq!(session.runtime.inventory()[0].item_id, 31);
    Ok(())
}

#[test]
fn older_save_versions_restore_with_defaults() -> Result<()> {
    let mut session = started(progress_defs());
    session.click(INSIDE);
    session.step(TICK_MS)?;
    let checkpoint = session.runtime.save_snapshot().expect("checkpoint");

    let mut bytes = Vec::new();
    checkpoint.write_versioned(&mut bytes, 5)?;
    let old = SaveGameSnapshot::from_bytes(&bytes)?;
    assert!(old.global_variables.is_empty());
    assert_eq!(old.states.len(), 1);

    let mut restored = HeadlessSession::new(progress_defs());
    restored.runtime.restore_snapshot(&old);
    restored.step(TICK_MS)?;
    assert_eq!(restored.runtime.location().screen, OTHER_SCREEN);
    assert_eq!(restored.runtime.variable(4), 77);
    assert_eq!(restored.runtime.global(5), 0);
    assert_eq!(restored.runtime.hero(), 0);
    Ok(())
}

fn hero_defs() -> GameDefinitions {
    let mut defs = base_defs();
    defs.rooms.entry(ROOM).or_default().screens.entry(OTHER_SCREEN).or_default();
    add_interaction(
        &mut defs,
        SCREEN,
        5,
        Some(DOOR),
        ops(&[
            (LMB, 0),
            (HeroGet, 0),
            (Number, 0),
            (CmpEq, 0),
            (ItemAdd, 0),
            (Number, ROOM as i32),
            (Number, OTHER_SCREEN as i32),
            (Number, 4),
            (HeroOut, 0),
        ]),
    );
    defs
}

#[test]
fn hero_swap_exchanges_location_and_inventory() -> Result<()> {
    let mut session = started(hero_defs());

    // Hero 0 picks up item 1 and parks at the other screen.
    session.click(INSIDE);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.hero(), 1);
    assert_eq!(session.runtime.location().screen, SCREEN);

    // Hero 1 adds nothing (HeroGet != 0) and swaps back.
    session.click(INSIDE);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.hero(), 0);
    let location = session.runtime.location();
    assert_eq!((location.screen, location.direction), (OTHER_SCREEN, 4));
    assert_eq!(session.runtime.inventory()[0].item_id, 1);

    let snapshot = session.runtime.capture_snapshot();
    assert_eq!(snapshot.states.len(), 2);
    assert_eq!(snapshot.states[1].screen_number, OTHER_SCREEN);
    assert!(snapshot.states[1].have_pending_post_swap_screen_reset);
    Ok(())
}
