//! Turns per-page seconds into absolute display windows, optionally re-timed
//! against measured narration.

use crate::allocate::{spread, BorrowOrder, DurationPlan};
use crate::error::TimingWarning;
use crate::layout::Page;
use crate::segment::{SegmentKind, Segments};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Visibility interval `[start, end)` of one page, in seconds from video start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineWindow {
    pub segment: SegmentKind,
    pub page: Page,
    pub start: u32,
    pub end: u32,
}

impl TimelineWindow {
    pub fn duration(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingSource {
    WordCount,
    Audio,
}

/// One window as handed to the compositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub segment: SegmentKind,
    pub page_index: usize,
    pub page_text: String,
    pub start_seconds: u32,
    pub end_seconds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTimeline {
    pub windows: Vec<TimelineWindow>,
    pub total_duration_seconds: u32,
    pub timing_source: TimingSource,
    pub warnings: Vec<TimingWarning>,
}

impl RenderTimeline {
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.windows
            .iter()
            .map(|w| TimelineEntry {
                segment: w.segment,
                page_index: w.page.index,
                page_text: w.page.text.clone(),
                start_seconds: w.start,
                end_seconds: w.end,
            })
            .collect()
    }
}

/// Lays the plan's pages end to end starting at 0. Pages and seconds are
/// paired in playback order; the plan must come from the same `segments`.
pub fn resolve(segments: &Segments, plan: &DurationPlan) -> Vec<TimelineWindow> {
    cursor_pass(segments, &plan.page_seconds())
}

fn cursor_pass(segments: &Segments, seconds: &[u32]) -> Vec<TimelineWindow> {
    let mut cursor = 0u32;
    segments
        .pages()
        .zip(seconds)
        .map(|((kind, page), &secs)| {
            let start = cursor;
            cursor += secs;
            TimelineWindow {
                segment: kind,
                page: page.clone(),
                start,
                end: cursor,
            }
        })
        .collect()
}

/// Builds the final timeline, preferring measured narration when every page
/// has a usable duration.
///
/// Each page must hold for `ceil(audio + pad_seconds)`: at least 1s for the
/// hook and cta, at least `page_min_seconds` for body pages. Pages start from
/// their planned seconds and only grow to meet their hold, so hook and cta
/// stay inside their bounds whenever their narration fits. If `audio` is
/// present but incomplete the word-count plan is used for every page.
pub fn reconcile(
    segments: &Segments,
    plan: &DurationPlan,
    audio: Option<&[Option<f64>]>,
    pad_seconds: f64,
    page_min_seconds: u32,
) -> RenderTimeline {
    reconcile_with(
        segments,
        plan,
        audio,
        pad_seconds,
        page_min_seconds,
        BorrowOrder::default(),
    )
}

pub fn reconcile_with(
    segments: &Segments,
    plan: &DurationPlan,
    audio: Option<&[Option<f64>]>,
    pad_seconds: f64,
    page_min_seconds: u32,
    order: BorrowOrder,
) -> RenderTimeline {
    let mut warnings = plan.warnings.clone();

    let Some(audio) = audio else {
        return word_timeline(segments, plan, warnings);
    };

    let planned = plan.page_seconds();
    let usable = usable_durations(audio, segments.page_count()).and_then(|durations| {
        if planned.len() == durations.len() {
            Ok(durations)
        } else {
            Err(format!(
                "plan covers {} pages, narration {}",
                planned.len(),
                durations.len()
            ))
        }
    });
    let durations = match usable {
        Ok(durations) => durations,
        Err(reason) => {
            warn!(%reason, "falling back to word-count timing");
            warnings.push(TimingWarning::AudioFallback { reason });
            return word_timeline(segments, plan, warnings);
        }
    };

    let holds: Vec<u32> = segments
        .pages()
        .zip(&durations)
        .map(|((kind, _), &secs)| {
            let floor = match kind {
                SegmentKind::Body => page_min_seconds,
                SegmentKind::Hook | SegmentKind::Cta => 1,
            };
            ((secs + pad_seconds).ceil() as u32).max(floor)
        })
        .collect();

    let seconds = fit_holds(segments, &planned, &holds, plan.total_seconds, order);
    let total: u32 = seconds.iter().sum();
    debug!(
        planned = plan.total_seconds,
        held = holds.iter().sum::<u32>(),
        total,
        "reconciled timeline against narration"
    );

    RenderTimeline {
        windows: cursor_pass(segments, &seconds),
        total_duration_seconds: total,
        timing_source: TimingSource::Audio,
        warnings,
    }
}

/// Hook and cta pages take `max(planned, hold)`; the body gets whatever is left
/// of `total`, split by the planned body seconds with the holds as floors.
/// When the body holds do not fit, time is taken back from the donors in
/// `order`, first down to their segment minimum and then down to their own
/// hold. Only then does the total grow, to exactly the summed holds.
fn fit_holds(
    segments: &Segments,
    planned: &[u32],
    holds: &[u32],
    total: u32,
    order: BorrowOrder,
) -> Vec<u32> {
    let hook_len = segments.hook.pages.len();
    let body = hook_len..hook_len + segments.body.pages.len();
    let cta = body.end..holds.len();

    let mut seconds: Vec<u32> = planned.iter().zip(holds).map(|(&p, &h)| p.max(h)).collect();

    let need = i64::from(holds[body.clone()].iter().sum::<u32>());
    let fixed: u32 = seconds[..body.start].iter().chain(&seconds[cta.clone()]).sum();
    let mut room = i64::from(total) - i64::from(fixed);

    for keep_minimum in [true, false] {
        for donor in order.donors() {
            let (pages, min) = match donor {
                SegmentKind::Cta => (cta.clone(), segments.cta.min_seconds),
                _ => (0..hook_len, segments.hook.min_seconds),
            };
            for i in pages {
                if room >= need {
                    break;
                }
                let floor = if keep_minimum { holds[i].max(min) } else { holds[i] };
                let give = i64::from(seconds[i].saturating_sub(floor)).min(need - room);
                seconds[i] -= give as u32;
                room += give;
            }
        }
    }

    let body_seconds = room.max(need) as u32;
    let weights: Vec<u64> = planned[body.clone()].iter().map(|&s| u64::from(s)).collect();
    let (split, _) = spread(body_seconds, &weights, &holds[body.clone()]);
    seconds[body].copy_from_slice(&split);
    seconds
}

fn word_timeline(
    segments: &Segments,
    plan: &DurationPlan,
    warnings: Vec<TimingWarning>,
) -> RenderTimeline {
    RenderTimeline {
        windows: resolve(segments, plan),
        total_duration_seconds: plan.total_seconds,
        timing_source: TimingSource::WordCount,
        warnings,
    }
}

fn usable_durations(audio: &[Option<f64>], pages: usize) -> Result<Vec<f64>, String> {
    if audio.len() != pages {
        return Err(format!(
            "expected {} narration clips, got {}",
            pages,
            audio.len()
        ));
    }

    audio
        .iter()
        .enumerate()
        .map(|(i, secs)| match secs {
            None => Err(format!("page {} has no narration", i + 1)),
            Some(s) if !s.is_finite() || *s <= 0.0 => {
                Err(format!("page {} has unusable duration {}", i + 1, s))
            }
            Some(s) => Ok(*s),
        })
        .collect()
}
