mod common;

use anyhow::Result;
use common::{sample_pack_path, TICK_MS};
use vcruise_engine::headless::{AudioEvent, PresentationEvent};
use vcruise_engine::session::{HeadlessSession, RunPlan, ScheduledClick};
use vcruise_engine::sound::LoopingState;
use vcruise_engine::{load_definitions, GameState, KeymappedEvent, Point, Runtime};

const HALL: u32 = 160;
const CELLAR: u32 = 161;
const DOOR: Point = Point::new(300, 200);
const STAIRS: Point = Point::new(320, 440);
const DOOR_STATE: u32 = 3;

fn sample_session() -> Result<HeadlessSession> {
    let defs = load_definitions(&sample_pack_path())?;
    let mut session = HeadlessSession::new(defs);
    session.runtime.start_new_game();
    session.step(TICK_MS)?;
    Ok(session)
}

fn plays(session: &HeadlessSession, wave: &str) -> Vec<i32> {
    session
        .audio
        .events()
        .into_iter()
        .filter_map(|event| match event {
            AudioEvent::Play { name, volume, .. } if name == wave => Some(volume),
            _ => None,
        })
        .collect()
}

fn settled_at(screen: u32) -> impl FnMut(&Runtime) -> bool {
    move |runtime: &Runtime| runtime.location().screen == screen && runtime.state() == GameState::Idle
}

#[test]
fn start_screen_runs_its_entry_script() -> Result<()> {
    let session = sample_session()?;
    let location = session.runtime.location();
    assert_eq!((location.room, location.screen), (1, HALL));
    assert_eq!(session.runtime.state(), GameState::Idle);
    assert_eq!(session.runtime.global(0), 1);
    assert_eq!(session.runtime.variable(DOOR_STATE), 0);
    assert_eq!(plays(&session, "0002_wind"), vec![80]);
    assert!(session
        .presentation
        .events()
        .contains(&PresentationEvent::Cursor { cursor: Some(1) }));
    Ok(())
}

#[test]
fn opening_the_door_leads_to_the_cellar() -> Result<()> {
    let mut session = sample_session()?;
    session.click(DOOR);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.state(), GameState::WaitingForAnimation);
    assert_eq!(plays(&session, "0003_creak").len(), 1);

    assert!(session.run_until(TICK_MS, 60, settled_at(CELLAR))?);
    assert_eq!(session.runtime.variable(DOOR_STATE), 1);
    assert_eq!(session.runtime.global(0), 2);
    // The door playlist fires the creak again on its fifth frame.
    assert_eq!(plays(&session, "0003_creak").last(), Some(&70));
    assert!(session.presentation.events().iter().any(|event| matches!(
        event,
        PresentationEvent::Subtitle { lines, .. } if lines == &["The door grinds open.".to_string()]
    )));
    // Entering the cellar stops the looping wind.
    assert!(session
        .runtime
        .sounds()
        .sounds()
        .iter()
        .all(|sound| sound.looping != LoopingState::Looping));

    let checkpoint = session.runtime.checkpoint().expect("cellar checkpoint");
    assert_eq!(checkpoint.active_state().unwrap().screen_number, CELLAR);

    session.click(STAIRS);
    assert!(session.run_until(TICK_MS, 10, settled_at(HALL))?);
    assert_eq!(session.runtime.global(0), 3);
    Ok(())
}

#[test]
fn escape_skips_the_door_animation() -> Result<()> {
    let mut session = sample_session()?;
    session.click(DOOR);
    session.step(TICK_MS)?;
    assert_eq!(session.runtime.state(), GameState::WaitingForAnimation);

    session.press(KeymappedEvent::Escape);
    session.step(TICK_MS)?;
    assert!(session.run_until(TICK_MS, 3, settled_at(CELLAR))?);
    assert_eq!(session.runtime.variable(DOOR_STATE), 1);
    Ok(())
}

#[test]
fn scripted_run_reports_the_final_location() -> Result<()> {
    let defs = load_definitions(&sample_pack_path())?;
    let mut session = HeadlessSession::new(defs);
    session.runtime.start_new_game();
    let plan = RunPlan {
        frames: 40,
        tick_ms: TICK_MS,
        clicks: vec![ScheduledClick { frame: 2, pos: DOOR }],
        escapes: Vec::new(),
    };
    let summary = session.run(&plan)?;
    assert_eq!(summary.frames_run, 40);
    assert_eq!(summary.elapsed_ms, 40 * TICK_MS);
    assert_eq!(summary.screen, CELLAR);
    assert_eq!(summary.final_state, "Idle");
    assert!(!summary.quit);

    let log = session.event_log();
    assert!(!log.audio.is_empty());
    assert!(!log.presentation.is_empty());
    Ok(())
}
