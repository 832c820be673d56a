use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use vcruise_engine::session::ScheduledClick;

#[derive(Parser, Debug)]
#[command(
    about = "Headless host that runs a definition pack on a manual clock",
    version
)]
pub struct Args {
    /// Path to the JSON definition pack
    #[arg(long)]
    pub definitions: PathBuf,

    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Milliseconds the clock advances per frame
    #[arg(long, default_value_t = 16)]
    pub tick_ms: u64,

    /// Deliver a click at the start of a frame, as frame:x:y (repeatable)
    #[arg(long = "click")]
    pub clicks: Vec<ScheduledClick>,

    /// Deliver an Escape key press at the start of a frame (repeatable)
    #[arg(long = "escape")]
    pub escapes: Vec<u32>,

    /// Resume from this save file instead of starting a new game
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Write the last checkpoint to this path after the run
    #[arg(long)]
    pub save_out: Option<PathBuf>,

    /// Path to write the audio and presentation event log as JSON
    #[arg(long)]
    pub audio_log_json: Option<PathBuf>,

    /// Path to write the run summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            bail!("--tick-ms must be greater than zero");
        }
        if let Some(click) = self.clicks.iter().find(|click| click.frame >= self.frames) {
            bail!(
                "click at frame {} is beyond the last frame ({})",
                click.frame,
                self.frames
            );
        }
        Ok(())
    }
}
