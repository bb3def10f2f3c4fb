use anyhow::Result;
use atom_shorts::init;
use atom_shorts::render::{run_render, RenderOptions};
use clap::Parser;
use std::path::PathBuf;

/// Lay out and time a short-form video script from an atom JSON file.
#[derive(Debug, Parser)]
#[command(name = "atom-render", version, about)]
struct Args {
    /// Atom JSON with `category` and `script.{hook,body,cta}`
    atom: PathBuf,

    /// Settings file (defaults to ./config.json when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (defaults to <work_dir>/out)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Directory holding page_NN.wav narration clips
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// Synthesize narration per page before timing
    #[arg(long)]
    narrate: bool,

    /// Also write captions.srt
    #[arg(long)]
    srt: bool,

    /// Also write narration.m4a padded to the page windows
    #[arg(long)]
    narration_track: bool,

    /// Override the atom's category when picking the CTA preset
    #[arg(long)]
    category: Option<String>,

    /// Override the target total duration in seconds
    #[arg(long)]
    total_seconds: Option<u32>,
}

impl From<Args> for RenderOptions {
    fn from(args: Args) -> Self {
        RenderOptions {
            atom_path: args.atom,
            config_path: args.config,
            out_dir: args.out,
            audio_dir: args.audio_dir,
            narrate: args.narrate,
            write_srt: args.srt,
            narration_track: args.narration_track,
            category: args.category,
            total_seconds: args.total_seconds,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let needs_audio = args.narrate || args.narration_track || args.audio_dir.is_some();
    if needs_audio && !init::check_ffmpeg().await {
        eprintln!(
            "[WARNING] FFmpeg not found in PATH. Audio timing will fall back to word counts."
        );
    }

    let outcome = run_render(&args.into()).await?;

    println!(
        "{} pages, {}s total ({:?} timing, {} warning(s))",
        outcome.timeline.windows.len(),
        outcome.timeline.total_duration_seconds,
        outcome.timeline.timing_source,
        outcome.timeline.warnings.len()
    );
    println!("timeline: {}", outcome.timeline_path.display());
    if let Some(path) = &outcome.srt_path {
        println!("captions: {}", path.display());
    }
    if let Some(path) = &outcome.narration_path {
        println!("narration: {}", path.display());
    }
    Ok(())
}
