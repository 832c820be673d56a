use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use vcruise_engine::load_definitions;
use vcruise_engine::session::{HeadlessSession, RunPlan};
use vcruise_formats::{read_save_file, write_save_file};

mod cli;
use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    args.validate()?;

    let defs = load_definitions(&args.definitions)?;
    info!(
        "loaded {} rooms ({:?}) from {}",
        defs.rooms.len(),
        defs.config.variant,
        args.definitions.display()
    );

    let mut session = HeadlessSession::with_menus(Rc::new(defs), None);
    match args.load.as_ref() {
        Some(path) => {
            let snapshot = read_save_file(path)?;
            session.runtime.restore_snapshot(&snapshot);
        }
        None => session.runtime.start_new_game(),
    }

    let plan = RunPlan {
        frames: args.frames,
        tick_ms: args.tick_ms,
        clicks: args.clicks.clone(),
        escapes: args.escapes.clone(),
    };
    let summary = session.run(&plan)?;
    println!(
        "{} frames | state {} | room {} screen {:#x} direction {}",
        summary.frames_run, summary.final_state, summary.room, summary.screen, summary.direction
    );

    if let Some(path) = args.save_out.as_ref() {
        match session.runtime.save_snapshot() {
            Some(snapshot) => {
                write_save_file(path, &snapshot)?;
                println!("Saved checkpoint to {}", path.display());
            }
            None => warn!("no checkpoint recorded; skipping {}", path.display()),
        }
    }
    if let Some(path) = args.audio_log_json.as_ref() {
        write_json(path, &session.event_log())?;
        println!("Saved event log to {}", path.display());
    }
    if let Some(path) = args.summary_json.as_ref() {
        write_json(path, &summary)?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing JSON report")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
