//! Word wrapping and screen pagination for caption text.
//!
//! Widths are counted in `char`s. Paragraphs (separated by a blank line) are
//! wrapped on their own and kept apart by a single empty line, so a page break
//! may land between paragraphs.

use serde::Serialize;
use tracing::debug;

/// One screen of wrapped text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Position inside the owning segment, starting at 0.
    pub index: usize,
    pub text: String,
    pub line_count: usize,
    pub word_count: usize,
}

impl Page {
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            text: String::new(),
            line_count: 0,
            word_count: 0,
        }
    }

    fn from_lines(index: usize, lines: &[String]) -> Self {
        let first = lines.iter().position(|l| !l.trim().is_empty());
        let last = lines.iter().rposition(|l| !l.trim().is_empty());
        let kept = match (first, last) {
            (Some(a), Some(b)) => &lines[a..=b],
            _ => return Self::empty(index),
        };

        let text = kept.join("\n");
        Self {
            index,
            word_count: count_words(&text),
            line_count: kept.len(),
            text,
        }
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Greedy word-boundary wrap. Words wider than `width` get a line of their
/// own and are never broken.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for (i, paragraph) in paragraphs(text).into_iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        wrap_paragraph(&paragraph, width, &mut lines);
    }

    lines
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line.trim());
    }
    if !current.is_empty() {
        out.push(current);
    }

    out
}

fn wrap_paragraph(paragraph: &str, width: usize, lines: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in paragraph.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
}

/// Wraps `text` and splits it into at most `max_pages` pages.
///
/// Lines are grouped `max_lines_per_page` at a time. When that would produce
/// too many pages the per-page line budget is raised to
/// `ceil(lines / max_pages)` once, which always fits. Afterwards a trailing
/// page with fewer than `orphan_min_words` words is folded into the page
/// before it and re-wrapped. Empty text still yields one (empty) page.
pub fn paginate(
    text: &str,
    wrap_width: usize,
    max_lines_per_page: usize,
    max_pages: usize,
    orphan_min_words: usize,
) -> Vec<Page> {
    let width = wrap_width.max(1);
    let lines = wrap_text(text, width);
    if lines.is_empty() {
        return vec![Page::empty(0)];
    }

    let max_pages = max_pages.max(1);
    let mut per_page = max_lines_per_page.max(1);
    if lines.len().div_ceil(per_page) > max_pages {
        let widened = lines.len().div_ceil(max_pages);
        debug!(
            lines = lines.len(),
            per_page, widened, max_pages, "page cap exceeded, widening pages"
        );
        per_page = widened;
    }

    let mut pages: Vec<Page> = lines
        .chunks(per_page)
        .enumerate()
        .map(|(i, chunk)| Page::from_lines(i, chunk))
        .collect();

    merge_orphan(&mut pages, width, orphan_min_words);
    pages
}

fn merge_orphan(pages: &mut Vec<Page>, width: usize, min_words: usize) {
    if pages.len() < 2 {
        return;
    }
    let Some(last) = pages.last() else {
        return;
    };
    if last.word_count >= min_words {
        return;
    }

    let (Some(orphan), Some(prev)) = (pages.pop(), pages.pop()) else {
        return;
    };
    debug!(
        words = orphan.word_count,
        min_words, "merging short trailing page into previous page"
    );

    let merged = format!("{} {}", prev.text, orphan.text);
    let lines = wrap_text(merged.trim(), width);
    pages.push(Page::from_lines(prev.index, &lines));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (1..=n)
            .map(|i| format!("w{:03}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn all_words(pages: &[Page]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|p| p.text.split_whitespace().map(str::to_string))
            .collect()
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps over", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over"]);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        let lines = wrap_text("a supercalifragilistic b", 8);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);

        let single = wrap_text("incomprehensibilities", 5);
        assert_eq!(single, vec!["incomprehensibilities"]);
    }

    #[test]
    fn hyphenated_words_are_not_split() {
        let lines = wrap_text("well-known fact", 6);
        assert_eq!(lines, vec!["well-known", "fact"]);
    }

    #[test]
    fn paragraphs_are_separated_by_blank_line() {
        let lines = wrap_text("first   para\n\n\nsecond\npara", 40);
        assert_eq!(lines, vec!["first para", "", "second para"]);
    }

    #[test]
    fn width_counts_chars_not_bytes() {
        let lines = wrap_text("ééé ééé", 7);
        assert_eq!(lines, vec!["ééé ééé"]);
    }

    #[test]
    fn empty_text_yields_one_empty_page() {
        let pages = paginate("", 42, 9, 3, 5);
        assert_eq!(pages, vec![Page::empty(0)]);

        let pages = paginate("   \n\n  ", 42, 9, 3, 5);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].word_count, 0);
    }

    #[test]
    fn groups_lines_into_pages() {
        // 4-char words, two per 9-column line: 16 words -> 8 lines -> 4 pages of 2.
        let pages = paginate(&numbered_words(16), 9, 2, 10, 0);
        assert_eq!(pages.len(), 4);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.index, i);
            assert_eq!(page.line_count, 2);
            assert_eq!(page.word_count, 4);
        }
    }

    #[test]
    fn widens_pages_when_over_cap() {
        // 10 lines at 2 per page would be 5 pages; cap 3 widens to 4 lines.
        let pages = paginate(&numbered_words(20), 9, 2, 3, 0);
        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages.iter().map(|p| p.line_count).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );
    }

    #[test]
    fn widening_then_orphan_merge() {
        let pages = paginate(&numbered_words(20), 9, 2, 3, 5);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].word_count, 12);
        assert_eq!(all_words(&pages), numbered_words(20).split(' ').collect::<Vec<_>>());
    }

    #[test]
    fn short_trailing_page_is_merged() {
        // 11 words -> 6 lines -> pages of 4, 4, 3 words.
        let naive = paginate(&numbered_words(11), 9, 2, 10, 0);
        assert_eq!(naive.len(), 3);
        assert_eq!(naive[2].word_count, 3);

        let merged = paginate(&numbered_words(11), 9, 2, 10, 5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].index, 1);
        assert_eq!(merged[1].word_count, 7);
        assert_eq!(merged[1].line_count, 4);
        assert_eq!(all_words(&merged), all_words(&naive));
    }

    #[test]
    fn merge_happens_only_once() {
        // Pages of 1 word each; only the last is folded.
        let pages = paginate("aa bb cc dd", 2, 1, 10, 5);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].text, "cc\ndd");
        assert_eq!(pages[2].word_count, 2);
    }

    #[test]
    fn single_page_is_never_merged() {
        let pages = paginate("one two", 40, 9, 3, 5);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "one two");
    }

    #[test]
    fn words_survive_pagination_for_many_shapes() {
        let text = numbered_words(57);
        for width in [1, 4, 9, 14, 30, 80] {
            for max_lines in 1..6 {
                for max_pages in 1..5 {
                    let pages = paginate(&text, width, max_lines, max_pages, 5);
                    assert!(pages.len() <= max_pages);
                    assert!(!pages.is_empty());
                    assert_eq!(
                        all_words(&pages),
                        text.split(' ').collect::<Vec<_>>(),
                        "width={width} lines={max_lines} pages={max_pages}"
                    );
                }
            }
        }
    }
}
