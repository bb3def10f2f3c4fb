use crate::error::EngineError;
use crate::layout::Page;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Hook,
    Body,
    Cta,
}

impl SegmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Hook => "hook",
            SegmentKind::Body => "body",
            SegmentKind::Cta => "cta",
        }
    }
}

/// A phase of the script with its own pacing bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub pages: Vec<Page>,
    pub min_seconds: u32,
    pub max_seconds: u32,
}

impl Segment {
    pub fn new(
        kind: SegmentKind,
        pages: Vec<Page>,
        min_seconds: u32,
        max_seconds: u32,
    ) -> Result<Self, EngineError> {
        if min_seconds > max_seconds {
            return Err(EngineError::InvertedBounds {
                field: kind.as_str(),
                min: min_seconds,
                max: max_seconds,
            });
        }
        let pages = if pages.is_empty() {
            vec![Page::empty(0)]
        } else {
            pages
        };
        Ok(Self {
            kind,
            pages,
            min_seconds,
            max_seconds,
        })
    }

    pub fn word_count(&self) -> usize {
        self.pages.iter().map(|p| p.word_count).sum()
    }

    pub fn page_words(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.word_count).collect()
    }
}

/// The fixed hook / body / cta triple every render works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    pub hook: Segment,
    pub body: Segment,
    pub cta: Segment,
}

impl Segments {
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        [&self.hook, &self.body, &self.cta].into_iter()
    }

    /// Every page in playback order, tagged with its segment.
    pub fn pages(&self) -> impl Iterator<Item = (SegmentKind, &Page)> {
        self.iter()
            .flat_map(|seg| seg.pages.iter().map(move |p| (seg.kind, p)))
    }

    pub fn page_count(&self) -> usize {
        self.iter().map(|s| s.pages.len()).sum()
    }

    pub fn min_total(&self) -> u32 {
        self.iter().map(|s| s.min_seconds).sum()
    }
}
