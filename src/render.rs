use crate::api::tts::{NarrationSynth, OpenAiTts};
use crate::config::{Config, CtaPreset};
use crate::engine::{build_segments, timeline_for};
use crate::error::TimingWarning;
use crate::ffmpeg;
use crate::init;
use crate::script::Atom;
use crate::segment::Segments;
use crate::srt;
use crate::timeline::{RenderTimeline, TimelineEntry, TimingSource};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub atom_path: PathBuf,
    pub config_path: Option<PathBuf>,
    /// Overrides `<work_dir>/out`.
    pub out_dir: Option<PathBuf>,
    /// Directory of pre-rendered `page_NN.wav` clips to time against.
    pub audio_dir: Option<PathBuf>,
    /// Synthesize per-page narration before timing.
    pub narrate: bool,
    pub write_srt: bool,
    pub narration_track: bool,
    pub category: Option<String>,
    pub total_seconds: Option<u32>,
}

#[derive(Debug)]
pub struct RenderOutcome {
    pub timeline: RenderTimeline,
    pub timeline_path: PathBuf,
    pub srt_path: Option<PathBuf>,
    pub narration_path: Option<PathBuf>,
    pub preset: CtaPreset,
}

/// What the compositor reads.
#[derive(Debug, Serialize)]
struct TimelineDocument<'a> {
    generated_at: DateTime<Utc>,
    category: &'a str,
    cta_preset: &'static str,
    total_duration_seconds: u32,
    timing_source: TimingSource,
    entries: Vec<TimelineEntry>,
    warnings: &'a [TimingWarning],
}

pub fn page_audio_path(dir: &Path, position: usize) -> PathBuf {
    dir.join(format!("page_{:02}.wav", position + 1))
}

fn narration_text(page_text: &str) -> String {
    page_text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Synthesizes every page concurrently. Results land in their page slot, so
/// completion order never matters.
async fn narrate_pages(
    synth: Arc<dyn NarrationSynth>,
    texts: Vec<String>,
    dir: &Path,
) -> Vec<Option<PathBuf>> {
    let mut slots: Vec<Option<PathBuf>> = vec![None; texts.len()];
    let mut set = JoinSet::new();

    for (position, text) in texts.into_iter().enumerate() {
        let synth = Arc::clone(&synth);
        let path = page_audio_path(dir, position);
        set.spawn(async move {
            if text.is_empty() {
                return (position, None);
            }
            match synth.synthesize(&text, &path).await {
                Ok(true) => (position, Some(path)),
                Ok(false) => (position, None),
                Err(err) => {
                    logw(format!("TTS page {} failed: {:#}", position + 1, err));
                    (position, None)
                }
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((position, path)) => slots[position] = path,
            Err(err) => logw(format!("TTS task aborted: {}", err)),
        }
    }

    slots
}

fn existing_clips(dir: &Path, pages: usize) -> Vec<Option<PathBuf>> {
    (0..pages)
        .map(|position| {
            let path = page_audio_path(dir, position);
            path.is_file().then_some(path)
        })
        .collect()
}

async fn probe_clips(clips: &[Option<PathBuf>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(clips.len());
    for (position, clip) in clips.iter().enumerate() {
        let duration = match clip {
            Some(path) => match ffmpeg::ffprobe_duration_seconds(path).await {
                Ok(secs) => Some(secs),
                Err(err) => {
                    logw(format!("Bad narration duration for page {}: {}", position + 1, err));
                    None
                }
            },
            None => None,
        };
        out.push(duration);
    }
    out
}

/// Pads each clip to its window and joins them into one track.
async fn build_narration_track(
    timeline: &RenderTimeline,
    clips: &[Option<PathBuf>],
    audio_dir: &Path,
    out_path: &Path,
) -> Result<bool> {
    let list_path = audio_dir.join("narration_list.txt");
    let mut list = fs::File::create(&list_path)
        .await
        .with_context(|| format!("create concat list: {}", list_path.display()))?;

    for (position, (window, clip)) in timeline.windows.iter().zip(clips).enumerate() {
        let Some(clip) = clip else {
            logw(format!("No clip for page {}; skipping narration track", position + 1));
            return Ok(false);
        };
        let padded_name = format!("page_{:02}_padded.m4a", position + 1);
        let padded = audio_dir.join(&padded_name);
        if !ffmpeg::ffmpeg_pad_audio(clip, window.duration(), &padded).await? {
            return Ok(false);
        }
        list.write_all(format!("file '{}'\n", padded_name).as_bytes())
            .await?;
    }
    list.flush().await?;

    ffmpeg::ffmpeg_concat_audio(&list_path, out_path).await
}

async fn write_timeline(
    path: &Path,
    atom: &Atom,
    preset: CtaPreset,
    timeline: &RenderTimeline,
) -> Result<()> {
    let doc = TimelineDocument {
        generated_at: Utc::now(),
        category: &atom.category,
        cta_preset: preset.name(),
        total_duration_seconds: timeline.total_duration_seconds,
        timing_source: timeline.timing_source,
        entries: timeline.entries(),
        warnings: &timeline.warnings,
    };
    let json = serde_json::to_string_pretty(&doc).context("serialize timeline")?;
    fs::write(path, json)
        .await
        .with_context(|| format!("write timeline: {}", path.display()))?;
    Ok(())
}

fn describe_pages(segments: &Segments) -> String {
    let body = segments
        .body
        .pages
        .iter()
        .map(|p| p.word_count.to_string())
        .collect::<Vec<_>>()
        .join("+");
    format!(
        "hook {}w, body {} page(s) [{}]w, cta {}w",
        segments.hook.word_count(),
        segments.body.pages.len(),
        body,
        segments.cta.word_count()
    )
}

pub async fn run_render(opts: &RenderOptions) -> Result<RenderOutcome> {
    let mut cfg = match &opts.config_path {
        Some(path) => Config::load(path).await?,
        None => Config::load_or_default("config.json").await?,
    };
    if let Some(total) = opts.total_seconds {
        cfg.engine.total_duration_seconds = total;
    }

    init::ensure_directories(&cfg.work_dir).await?;
    let out_dir = opts
        .out_dir
        .clone()
        .unwrap_or_else(|| init::out_dir(&cfg.work_dir));
    fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create dir {}", out_dir.display()))?;

    let atom = Atom::load(&opts.atom_path).await?;
    logok(format!(
        "Loaded atom: {} (category: {})",
        opts.atom_path.display(),
        if atom.category.is_empty() { "none" } else { atom.category.as_str() }
    ));

    let label = opts.category.as_deref().unwrap_or(&atom.category);
    let preset = CtaPreset::from_label(label);
    let engine_cfg = if cfg.cta_bounds_pinned {
        logi("CTA bounds set in config; category preset not applied");
        cfg.engine.clone()
    } else {
        cfg.engine.clone().with_cta_preset(preset)
    };
    logi(format!(
        "CTA preset: {} ({}-{}s), target {}s",
        preset.name(),
        engine_cfg.cta_min_seconds,
        engine_cfg.cta_max_seconds,
        engine_cfg.total_duration_seconds
    ));

    let segments = build_segments(&atom.script, &engine_cfg).context("invalid engine settings")?;
    logi(format!("Paginated script: {}", describe_pages(&segments)));

    let page_count = segments.page_count();
    let clips = if opts.narrate {
        let audio_dir = match &opts.audio_dir {
            Some(dir) => {
                fs::create_dir_all(dir).await?;
                let stale = init::remove_render_artifacts(dir).await?;
                if stale > 0 {
                    logi(format!("Removed {} stale clip file(s) from {}", stale, dir.display()));
                }
                dir.clone()
            }
            None => {
                let dir = init::audio_dir(&cfg.work_dir);
                fs::create_dir_all(&dir).await?;
                init::clear_directory_contents(&dir).await?;
                dir
            }
        };

        let tts = OpenAiTts::new(cfg.narration.clone(), atom.voice.as_deref())?;
        logi(format!(
            "Synthesizing narration for {} pages (voice {})...",
            page_count,
            tts.voice()
        ));
        let texts = segments
            .pages()
            .map(|(_, page)| narration_text(&page.text))
            .collect();
        let clips = narrate_pages(Arc::new(tts), texts, &audio_dir).await;
        let made = clips.iter().filter(|c| c.is_some()).count();
        logok(format!("Narration clips produced: {}/{}", made, page_count));
        Some((audio_dir, clips))
    } else {
        opts.audio_dir
            .as_ref()
            .map(|dir| (dir.clone(), existing_clips(dir, page_count)))
    };

    let durations = match &clips {
        Some((_, clips)) => Some(probe_clips(clips).await),
        None => None,
    };
    let timeline = timeline_for(&segments, &engine_cfg, durations.as_deref());

    for warning in &timeline.warnings {
        logw(format!("Quality warning: {}", warning));
    }
    for window in &timeline.windows {
        logi(format!(
            "{:>4} page {} [{:>3}s -> {:>3}s] {}",
            window.segment.as_str(),
            window.page.index + 1,
            window.start,
            window.end,
            narration_text(&window.page.text)
        ));
    }

    let timeline_path = out_dir.join("timeline.json");
    write_timeline(&timeline_path, &atom, preset, &timeline).await?;
    logok(format!(
        "Timeline written: {} ({}s, {:?} timing)",
        timeline_path.display(),
        timeline.total_duration_seconds,
        timeline.timing_source
    ));

    let srt_path = if opts.write_srt {
        let path = out_dir.join("captions.srt");
        srt::write_srt(&timeline, &path).await?;
        logok(format!("Captions written: {}", path.display()));
        Some(path)
    } else {
        None
    };

    let narration_path = match (&clips, opts.narration_track) {
        (Some((audio_dir, clips)), true) if timeline.timing_source == TimingSource::Audio => {
            let path = out_dir.join("narration.m4a");
            if build_narration_track(&timeline, clips, audio_dir, &path).await? {
                logok(format!("Narration track written: {}", path.display()));
                Some(path)
            } else {
                logw("Narration track could not be built".to_string());
                None
            }
        }
        (_, true) => {
            logw("Narration track needs audio-timed pages; skipped".to_string());
            None
        }
        _ => None,
    };

    Ok(RenderOutcome {
        timeline,
        timeline_path,
        srt_path,
        narration_path,
        preset,
    })
}
