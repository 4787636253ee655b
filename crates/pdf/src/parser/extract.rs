//! Content-stream walk producing positioned text items.
//!
//! Implements the subset of the PDF text-rendering state machine needed to
//! place text: text and line matrices, the graphics-state CTM (`q`/`Q`/`cm`),
//! font selection, spacing and the text-showing operators. Glyph advances
//! come from the font's width table; fonts without one fall back to an
//! estimate from the font size.

use super::backend::{decode_run_bytes, ContentOp, FontResource, PageId, PdfBackend, PdfValue};
use crate::types::{RawTextItem, TextRun};
use crate::PdfError;

/// Glyph advance, as a fraction of the font size, for fonts without widths.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// A `TJ` kerning displacement larger than this fraction of an average glyph
/// advance is taken as a word break.
const TJ_SPACE_RATIO: f32 = 0.3;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Multiply two affine matrices in PDF row-vector convention (`m1 × m2`).
fn multiply(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn matrix_operands(op: &ContentOp) -> Option<[f32; 6]> {
    let mut m = [0.0; 6];
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = op.number(i)?;
    }
    Some(m)
}

/// Text and graphics state of the walk. `q`/`Q` save and restore all of it
/// except the text and line matrices.
#[derive(Debug, Clone)]
struct TextState<'f> {
    font: Option<&'f FontResource<'f>>,
    /// Key of the selected font, kept even when the page does not define it.
    font_key: Option<Vec<u8>>,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    ctm: [f32; 6],
    /// `Tz / 100`.
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState<'_> {
    fn default() -> Self {
        Self {
            font: None,
            font_key: None,
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            ctm: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState<'_> {
    /// Text rendering matrix: `[Tfs·Th 0 0 Tfs 0 Trise] × Tm × CTM`.
    fn render_matrix(&self) -> [f32; 6] {
        let params = [
            self.font_size * self.horiz_scale,
            0.0,
            0.0,
            self.font_size,
            0.0,
            self.text_rise,
        ];
        multiply(&params, &multiply(&self.text_matrix, &self.ctm))
    }

    /// Horizontal scale of text space in user space.
    fn user_scale_x(&self) -> f32 {
        let m = multiply(&self.text_matrix, &self.ctm);
        (m[0] * m[0] + m[1] * m[1]).sqrt()
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// Text-space advance of a shown string under the current state.
    ///
    /// Uses the font's widths per character code when it has them, and
    /// estimates per decoded character otherwise.
    fn advance_of(&self, bytes: &[u8], text: &str) -> f32 {
        let font = self.font.filter(|f| f.widths.is_some());
        match font {
            Some(font) => font
                .codes(bytes)
                .into_iter()
                .map(|code| {
                    let glyph = font
                        .widths
                        .as_ref()
                        .and_then(|w| w.advance(code))
                        .unwrap_or(APPROX_CHAR_WIDTH_RATIO);
                    let word = if code == 32 && !font.two_byte {
                        self.word_spacing
                    } else {
                        0.0
                    };
                    (glyph * self.font_size + self.char_spacing + word) * self.horiz_scale
                })
                .sum(),
            None => {
                let glyph = self.font_size * APPROX_CHAR_WIDTH_RATIO;
                text.chars()
                    .map(|ch| {
                        let word = if ch == ' ' { self.word_spacing } else { 0.0 };
                        (glyph + self.char_spacing + word) * self.horiz_scale
                    })
                    .sum()
            }
        }
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, dx, 0.0], &self.text_matrix);
    }

    fn font_name(&self) -> Option<String> {
        self.font
            .and_then(|f| f.base_font.clone())
            .or_else(|| self.font_key.as_ref().map(|k| String::from_utf8_lossy(k).into_owned()))
    }

    fn decode(&self, bytes: &[u8]) -> String {
        decode_run_bytes(self.font, bytes)
    }
}

/// Walk a page's operations and collect positioned text items.
///
/// | Operator | Action |
/// |----------|--------|
/// | `q` `Q` `cm` | Graphics-state save/restore, CTM concat |
/// | `BT` | Reset text and line matrices |
/// | `Tf` | Select font and size |
/// | `Tm` `Td` `TD` `T*` `TL` | Positioning and leading |
/// | `Tc` `Tw` `Tz` `Ts` | Spacing, scaling, rise |
/// | `Tj` `TJ` `'` `"` | Show text |
pub fn extract_items<'f>(ops: &[ContentOp], fonts: &'f [FontResource<'f>]) -> Vec<RawTextItem> {
    let mut state = TextState::default();
    let mut saved: Vec<TextState> = Vec::new();
    let mut items = Vec::new();

    for op in ops {
        match op.operator.as_str() {
            "q" => saved.push(state.clone()),
            "Q" => {
                if let Some(mut restored) = saved.pop() {
                    restored.text_matrix = state.text_matrix;
                    restored.line_matrix = state.line_matrix;
                    state = restored;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(op) {
                    state.ctm = multiply(&m, &state.ctm);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => {
                let key = match op.operands.first() {
                    Some(PdfValue::Name(n)) => n.clone(),
                    _ => continue,
                };
                state.font_size = op.number(1).unwrap_or(0.0);
                state.font = fonts.iter().find(|f| f.key == key);
                state.font_key = Some(key);
            }
            "Tm" => {
                if let Some(m) = matrix_operands(op) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => state.leading = op.number(0).unwrap_or(state.leading),
            "Tc" => state.char_spacing = op.number(0).unwrap_or(state.char_spacing),
            "Tw" => state.word_spacing = op.number(0).unwrap_or(state.word_spacing),
            "Tz" => {
                if let Some(v) = op.number(0) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => state.text_rise = op.number(0).unwrap_or(state.text_rise),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    show(bytes, &mut state, &mut items);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(elements)) = op.operands.first() {
                    show_array(elements, &mut state, &mut items);
                }
            }
            "'" => {
                state.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    show(bytes, &mut state, &mut items);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(PdfValue::Str(bytes))) =
                    (op.number(0), op.number(1), op.operands.get(2))
                {
                    state.word_spacing = aw;
                    state.char_spacing = ac;
                    state.next_line();
                    show(bytes, &mut state, &mut items);
                }
            }
            _ => {}
        }
    }

    items
}

/// Emit one item at the current position and advance past it.
fn show(bytes: &[u8], state: &mut TextState, items: &mut Vec<RawTextItem>) {
    let text = state.decode(bytes);
    if text.is_empty() {
        return;
    }
    let transform = state.render_matrix();
    let advance = state.advance_of(bytes, &text);
    items.push(RawTextItem {
        width: Some(advance * state.user_scale_x()),
        height: None,
        font_name: state.font_name(),
        transform,
        text,
    });
    state.advance_x(advance);
}

/// `TJ`: strings interleaved with kerning adjustments in thousandths of a
/// text-space unit. Fragments are merged into one item; large negative
/// adjustments become spaces.
fn show_array(elements: &[PdfValue], state: &mut TextState, items: &mut Vec<RawTextItem>) {
    let mut buf = String::new();
    let mut start: Option<[f32; 6]> = None;
    let mut advance = 0.0;
    let space_threshold =
        state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * TJ_SPACE_RATIO;

    for element in elements {
        if let PdfValue::Str(bytes) = element {
            let fragment = state.decode(bytes);
            if fragment.is_empty() {
                continue;
            }
            if start.is_none() {
                start = Some(state.render_matrix());
            }
            let dx = state.advance_of(bytes, &fragment);
            buf.push_str(&fragment);
            state.advance_x(dx);
            advance += dx;
        } else if let Some(adj) = element.as_f32() {
            let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
            if dx > space_threshold && !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
            state.advance_x(dx);
            if start.is_some() {
                advance += dx;
            }
        }
    }

    let text = buf.trim_end();
    if let Some(transform) = start.filter(|_| !text.is_empty()) {
        items.push(RawTextItem {
            text: text.to_string(),
            transform,
            width: Some(advance * state.user_scale_x()),
            height: None,
            font_name: state.font_name(),
        });
    }
}

/// A document that can hand out the text runs of each page.
///
/// Pages are addressed by 0-based index.
pub trait TextRunSource {
    fn page_count(&self) -> usize;

    fn page_runs(&self, index: usize) -> Result<Vec<TextRun>, PdfError>;
}

/// [`TextRunSource`] over any [`PdfBackend`].
pub struct BackendRunSource<'a> {
    backend: &'a dyn PdfBackend,
    page_ids: Vec<PageId>,
}

impl<'a> BackendRunSource<'a> {
    pub fn new(backend: &'a dyn PdfBackend) -> Self {
        let page_ids = backend.pages().into_values().collect();
        Self { backend, page_ids }
    }

    fn page_id(&self, index: usize) -> Result<PageId, PdfError> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(PdfError::PageNotFound(index + 1))
    }
}

impl TextRunSource for BackendRunSource<'_> {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_runs(&self, index: usize) -> Result<Vec<TextRun>, PdfError> {
        let page = self.page_id(index)?;
        let ops = self.backend.page_ops(page)?;
        let fonts = self.backend.page_fonts(page).unwrap_or_else(|e| {
            log::warn!("page {}: fonts unavailable, decoding without them: {}", index + 1, e);
            Vec::new()
        });
        let height = self.backend.page_height(page)?;

        Ok(extract_items(&ops, &fonts)
            .into_iter()
            .map(|item| TextRun::from_raw(item, height))
            .collect())
    }
}
