//! Paragraph segmentation of one page's lines.
//!
//! Paragraphs never continue across pages: each page starts with an empty
//! draft and flushes whatever it holds at the end.

use std::sync::OnceLock;

use regex::Regex;

use super::lines::{Line, PageLines};

/// A downward gap wider than this many average glyph heights always starts
/// a new paragraph.
pub const PARAGRAPH_GAP_RATIO: f32 = 1.8;

/// Smaller gap threshold that only applies when the draft ends a sentence
/// and the next line starts with a capital letter.
pub const SENTENCE_GAP_RATIO: f32 = 1.2;

/// Bullet glyphs and dashes recognized as list markers.
const BULLET_MARKERS: &[char] = &['•', '●', '○', '▪', '▸', '►', '-', '–', '—'];

/// The paragraph being accumulated and the `y` of its last line.
#[derive(Debug, Default)]
struct ParagraphDraft {
    text: String,
    last_y: Option<f32>,
}

impl ParagraphDraft {
    fn starting_with(line: &Line) -> Self {
        ParagraphDraft {
            text: line.text.clone(),
            last_y: Some(line.y),
        }
    }

    fn append(&mut self, line: &Line) {
        if self.text.ends_with('-') {
            // Word broken across the wrap: drop the hyphen, no space.
            self.text.pop();
        } else if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&line.text);
        self.last_y = Some(line.y);
    }
}

/// Whether a line opens with a bullet or an `N.` / `N)` enumerator.
pub fn starts_with_list_marker(text: &str) -> bool {
    static RE_NUMBERED: OnceLock<Regex> = OnceLock::new();
    let re = RE_NUMBERED.get_or_init(|| Regex::new(r"^\d+[.)]").unwrap());

    text.starts_with(BULLET_MARKERS) || re.is_match(text)
}

/// Whether accumulated text ends with `.`, `!` or `?`, optionally followed by
/// a closing quote.
pub fn ends_sentence(text: &str) -> bool {
    let mut tail = text.chars().rev();
    match tail.next() {
        Some('.' | '!' | '?') => true,
        Some('"' | '\'' | '\u{201D}' | '\u{2019}') => matches!(tail.next(), Some('.' | '!' | '?')),
        _ => false,
    }
}

fn starts_uppercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

/// Decide whether `line` opens a new paragraph after `draft`.
fn is_boundary(draft: &ParagraphDraft, line: &Line, avg_height: f32) -> bool {
    let gap = draft.last_y.map(|y| line.y - y);

    let large_gap = gap.is_some_and(|g| g > avg_height * PARAGRAPH_GAP_RATIO);
    let list_item = starts_with_list_marker(&line.text);
    let sentence_break = ends_sentence(&draft.text)
        && starts_uppercase(&line.text)
        && gap.is_some_and(|g| g > avg_height * SENTENCE_GAP_RATIO);

    large_gap || list_item || sentence_break
}

/// Split a page's lines into raw (uncleaned) paragraph strings.
pub fn segment_page(page: &PageLines) -> Vec<String> {
    let (mut paragraphs, last) = page.lines.iter().fold(
        (Vec::new(), ParagraphDraft::default()),
        |(mut done, mut draft), line| {
            if draft.text.is_empty() {
                draft.append(line);
            } else if is_boundary(&draft, line, page.avg_height) {
                done.push(std::mem::replace(&mut draft, ParagraphDraft::starting_with(line)).text);
            } else {
                draft.append(line);
            }
            (done, draft)
        },
    );

    if !last.text.is_empty() {
        paragraphs.push(last.text);
    }

    paragraphs
}
