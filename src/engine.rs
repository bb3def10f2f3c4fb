//! Pure entry point: script text and settings in, display timeline out.

use crate::allocate::allocate_with;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::layout::{paginate, Page};
use crate::script::ScriptText;
use crate::segment::{Segment, SegmentKind, Segments};
use crate::timeline::{reconcile_with, RenderTimeline};

/// Wraps and paginates the script. Hook and cta always get exactly one page;
/// the body gets up to `max_body_pages`.
pub fn build_segments(script: &ScriptText, cfg: &EngineConfig) -> Result<Segments, EngineError> {
    cfg.validate()?;

    let body_pages = paginate(
        &script.body,
        cfg.wrap_width_body,
        cfg.max_lines_per_page,
        cfg.max_body_pages,
        cfg.anti_orphan_min_words,
    );

    Ok(Segments {
        hook: Segment::new(
            SegmentKind::Hook,
            vec![single_page(&script.hook, cfg.wrap_width_hook)],
            cfg.hook_min_seconds,
            cfg.hook_max_seconds,
        )?,
        body: Segment::new(
            SegmentKind::Body,
            body_pages,
            cfg.body_min_seconds,
            cfg.total_duration_seconds.max(cfg.body_min_seconds),
        )?,
        cta: Segment::new(
            SegmentKind::Cta,
            vec![single_page(&script.cta, cfg.wrap_width_cta)],
            cfg.cta_min_seconds,
            cfg.cta_max_seconds,
        )?,
    })
}

fn single_page(text: &str, width: usize) -> Page {
    paginate(text, width, usize::MAX, 1, 0)
        .into_iter()
        .next()
        .unwrap_or_else(|| Page::empty(0))
}

/// Allocates and resolves a timeline for already-built segments. `audio`,
/// when given, holds one measured duration per page in playback order.
pub fn timeline_for(
    segments: &Segments,
    cfg: &EngineConfig,
    audio: Option<&[Option<f64>]>,
) -> RenderTimeline {
    let plan = allocate_with(
        segments,
        cfg.body_page_min_seconds,
        cfg.total_duration_seconds,
        cfg.borrow_order,
    );
    reconcile_with(
        segments,
        &plan,
        audio,
        cfg.audio_pad_seconds,
        cfg.body_page_min_seconds,
        cfg.borrow_order,
    )
}

pub fn build_timeline(
    script: &ScriptText,
    cfg: &EngineConfig,
    audio: Option<&[Option<f64>]>,
) -> Result<RenderTimeline, EngineError> {
    let segments = build_segments(script, cfg)?;
    Ok(timeline_for(&segments, cfg, audio))
}
