//! Splits a fixed video length across hook, body pages and cta.
//!
//! All arithmetic is on whole seconds with integer division, so the same
//! inputs always produce the same plan.

use crate::error::TimingWarning;
use crate::segment::{Segment, SegmentKind, Segments};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which segments give up time, and in what order, when the body is short of
/// its minimum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowOrder {
    #[default]
    HookThenCta,
    CtaThenHook,
}

impl BorrowOrder {
    pub(crate) fn donors(self) -> [SegmentKind; 2] {
        match self {
            BorrowOrder::HookThenCta => [SegmentKind::Hook, SegmentKind::Cta],
            BorrowOrder::CtaThenHook => [SegmentKind::Cta, SegmentKind::Hook],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentPlan {
    pub kind: SegmentKind,
    pub pages_seconds: Vec<u32>,
}

impl SegmentPlan {
    pub fn total(&self) -> u32 {
        self.pages_seconds.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationPlan {
    pub segments: Vec<SegmentPlan>,
    pub total_seconds: u32,
    pub warnings: Vec<TimingWarning>,
}

impl DurationPlan {
    /// Seconds for every page in playback order.
    pub fn page_seconds(&self) -> Vec<u32> {
        self.segments
            .iter()
            .flat_map(|s| s.pages_seconds.iter().copied())
            .collect()
    }

    pub fn segment_seconds(&self, kind: SegmentKind) -> u32 {
        self.segments
            .iter()
            .filter(|s| s.kind == kind)
            .map(SegmentPlan::total)
            .sum()
    }
}

pub fn allocate(
    segments: &Segments,
    body_page_min_seconds: u32,
    total_seconds: u32,
) -> DurationPlan {
    allocate_with(
        segments,
        body_page_min_seconds,
        total_seconds,
        BorrowOrder::default(),
    )
}

pub fn allocate_with(
    segments: &Segments,
    body_page_min_seconds: u32,
    total_seconds: u32,
    order: BorrowOrder,
) -> DurationPlan {
    let mut warnings = Vec::new();
    let total = i64::from(total_seconds);
    let total_words = segments.iter().map(Segment::word_count).sum::<usize>() as u64;

    let required = segments.min_total();
    if required > total_seconds {
        warn!(
            required,
            available = total_seconds,
            "total duration below segment minimums"
        );
        warnings.push(TimingWarning::UnderCapacity {
            required,
            available: total_seconds,
        });
    }

    let seed = |seg: &Segment| -> i64 {
        let raw = if total_words == 0 {
            0
        } else {
            (u64::from(total_seconds) * seg.word_count() as u64 / total_words) as i64
        };
        raw.clamp(i64::from(seg.min_seconds), i64::from(seg.max_seconds))
    };

    let mut hook = seed(&segments.hook);
    let mut cta = seed(&segments.cta);
    let mut body = total - hook - cta;

    let body_min = i64::from(segments.body.min_seconds);
    if body < body_min {
        let mut shortfall = body_min - body;
        for donor in order.donors() {
            let (secs, floor) = match donor {
                SegmentKind::Cta => (&mut cta, i64::from(segments.cta.min_seconds)),
                _ => (&mut hook, i64::from(segments.hook.min_seconds)),
            };
            let give = (*secs - floor).clamp(0, shortfall);
            *secs -= give;
            body += give;
            shortfall -= give;
        }
        debug!(hook, cta, body, "borrowed time for body minimum");
    }

    // Only reachable when hook + cta minimums alone exceed the total.
    if body < 0 {
        let mut deficit = -body;
        for donor in order.donors() {
            let secs = match donor {
                SegmentKind::Cta => &mut cta,
                _ => &mut hook,
            };
            let give = (*secs).clamp(0, deficit);
            *secs -= give;
            deficit -= give;
        }
        body = 0;
    }

    let body_seconds = body as u32;
    let body_pages = split_body(
        &segments.body,
        body_seconds,
        body_page_min_seconds,
        &mut warnings,
    );

    DurationPlan {
        segments: vec![
            SegmentPlan {
                kind: SegmentKind::Hook,
                pages_seconds: vec![hook as u32],
            },
            SegmentPlan {
                kind: SegmentKind::Body,
                pages_seconds: body_pages,
            },
            SegmentPlan {
                kind: SegmentKind::Cta,
                pages_seconds: vec![cta as u32],
            },
        ],
        total_seconds,
        warnings,
    }
}

fn split_body(
    body: &Segment,
    body_seconds: u32,
    page_min_seconds: u32,
    warnings: &mut Vec<TimingWarning>,
) -> Vec<u32> {
    if body.pages.len() <= 1 {
        return vec![body_seconds];
    }

    let weights: Vec<u64> = body.pages.iter().map(|p| p.word_count as u64).collect();
    let floors: Vec<u32> = (0..body.pages.len())
        .map(|i| if i == 0 { 1 } else { page_min_seconds })
        .collect();

    let (seconds, compressed) = spread(body_seconds, &weights, &floors);
    if compressed {
        warn!(
            body_seconds,
            pages = seconds.len(),
            "body pages pushed below their floor"
        );
        warnings.push(TimingWarning::BodyPagesCompressed {
            body_seconds,
            pages: seconds.len(),
        });
    }
    seconds
}

/// Splits `total` proportionally to `weights` (evenly if they are all zero),
/// raising each share to its floor, then settles the difference one second at
/// a time cycling from the first slot. Removal skips slots at their floor;
/// the returned flag is set when every slot was at its floor and some still
/// had to give. The result always sums to `total`.
pub(crate) fn spread(total: u32, weights: &[u64], floors: &[u32]) -> (Vec<u32>, bool) {
    let n = weights.len();
    if n == 0 {
        return (Vec::new(), false);
    }

    let weight_sum: u64 = weights.iter().sum();
    let mut out: Vec<u32> = weights
        .iter()
        .zip(floors)
        .map(|(&w, &floor)| {
            let share = if weight_sum == 0 {
                u64::from(total) / n as u64
            } else {
                u64::from(total) * w / weight_sum
            };
            (share as u32).max(floor)
        })
        .collect();

    let target = u64::from(total);
    let mut assigned: u64 = out.iter().map(|&s| u64::from(s)).sum();

    let mut cursor = 0usize;
    while assigned < target {
        out[cursor % n] += 1;
        assigned += 1;
        cursor += 1;
    }

    let mut compressed = false;
    let mut cursor = 0usize;
    let ring = |start: usize| (0..n).map(move |k| (start + k) % n);
    while assigned > target {
        let slot = match ring(cursor).find(|&k| out[k] > floors[k]) {
            Some(k) => k,
            None => {
                compressed = true;
                match ring(cursor).find(|&k| out[k] > 0) {
                    Some(k) => k,
                    None => break,
                }
            }
        };
        out[slot] -= 1;
        assigned -= 1;
        cursor = slot + 1;
    }

    (out, compressed)
}
