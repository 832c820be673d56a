use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use vcruise_formats::{SaveGameSnapshot, read_save_file};

/// Print a save-game snapshot as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Save file to decode
    save: PathBuf,

    /// Optional path to write the JSON dump to instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Only print a one-line summary per hero state
    #[arg(long)]
    summary: bool,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let snapshot = read_save_file(&args.save)?;
    log::debug!(
        "decoded {} with {} hero state(s)",
        args.save.display(),
        snapshot.states.len()
    );

    if args.summary {
        print_summary(&snapshot);
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&snapshot).context("serializing snapshot to JSON")?;
    match args.output.as_ref() {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Saved snapshot dump to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_summary(snapshot: &SaveGameSnapshot) {
    println!(
        "hero {} | {} variables | {} timers | {} one-shots",
        snapshot.hero,
        snapshot.variables.len(),
        snapshot.timers.len(),
        snapshot.triggered_one_shots.len()
    );
    for (index, state) in snapshot.states.iter().enumerate() {
        println!(
            "  state {index}: room {:>3} screen {:#04x} dir {} | anim {} @ {} | {} items | {} sounds",
            state.room_number,
            state.screen_number,
            state.direction,
            state.loaded_animation,
            state.anim_displaying_frame,
            state.inventory.iter().filter(|item| item.item_id != 0).count(),
            state.sounds.len()
        );
    }
}
