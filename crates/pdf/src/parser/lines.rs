//! Line assembly: text runs of one page into ordered, flattened lines.
//!
//! All thresholds are multiples of the page's mean run height so the same
//! rules hold for any font size or page scale.

use crate::types::TextRun;

/// Two consecutive runs (in top-to-bottom order) whose `y` differ by more
/// than this many average glyph heights belong to different lines.
pub const LINE_Y_TOLERANCE: f32 = 0.5;

/// A horizontal gap wider than this many average glyph heights between two
/// runs of a line is rendered as a single space.
pub const WORD_GAP_RATIO: f32 = 0.3;

/// Runs sharing a vertical band, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub runs: Vec<TextRun>,
    /// `y` of the first run in top-to-bottom order.
    pub y: f32,
    pub text: String,
}

/// The assembled lines of one page and the height unit they were built with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLines {
    pub lines: Vec<Line>,
    pub avg_height: f32,
}

impl PageLines {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Group a page's runs into lines.
///
/// Runs with blank text are ignored. A page without any remaining runs yields
/// no lines.
pub fn assemble_lines(runs: Vec<TextRun>) -> PageLines {
    let mut runs: Vec<TextRun> = runs
        .into_iter()
        .filter(|r| !r.text.trim().is_empty())
        .collect();

    if runs.is_empty() {
        return PageLines::default();
    }

    let avg_height = runs.iter().map(|r| r.height).sum::<f32>() / runs.len() as f32;

    runs.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let tolerance = avg_height * LINE_Y_TOLERANCE;
    let mut groups: Vec<Vec<TextRun>> = Vec::new();
    let mut anchor_y = f32::NAN;

    for run in runs {
        match groups.last_mut() {
            Some(group) if (run.y - anchor_y).abs() <= tolerance => {
                anchor_y = run.y;
                group.push(run);
            }
            _ => {
                anchor_y = run.y;
                groups.push(vec![run]);
            }
        }
    }

    let lines = groups
        .into_iter()
        .map(|group| build_line(group, avg_height))
        .filter(|line| !line.text.is_empty())
        .collect();

    PageLines { lines, avg_height }
}

fn build_line(mut runs: Vec<TextRun>, avg_height: f32) -> Line {
    let y = runs[0].y;
    runs.sort_by(|a, b| a.x.total_cmp(&b.x));
    let text = flatten_runs(&runs, avg_height);
    Line { runs, y, text }
}

/// Concatenate left-to-right runs, inserting a space where the gap after the
/// previous run is wide enough to be a word break.
pub fn flatten_runs(runs: &[TextRun], avg_height: f32) -> String {
    let gap_threshold = avg_height * WORD_GAP_RATIO;
    let mut text = String::new();
    let mut prev: Option<&TextRun> = None;

    for run in runs {
        if let Some(p) = prev {
            let gap = run.x - (p.x + p.width);
            if gap > gap_threshold && !text.is_empty() {
                text.push(' ');
            }
        }
        text.push_str(&run.text);
        prev = Some(run);
    }

    text.trim().to_string()
}
