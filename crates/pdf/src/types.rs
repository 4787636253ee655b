use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Glyph height used when an extracted item carries neither an explicit
/// height nor a usable vertical scale in its transform.
pub const FALLBACK_RUN_HEIGHT: f32 = 12.0;

/// A text item as it comes out of the content-stream walk, before any
/// geometry normalization.
///
/// `transform` is `[a, b, c, d, e, f]` in PDF user space (origin at the
/// bottom-left corner of the page).
#[derive(Debug, Clone, PartialEq)]
pub struct RawTextItem {
    pub text: String,
    pub transform: [f32; 6],
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub font_name: Option<String>,
}

/// A positioned run of text with `y` growing downward from the top edge of
/// the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
}

impl TextRun {
    /// Build a run from an extracted item, flipping the y axis against
    /// `page_height` and resolving missing width/height once.
    ///
    /// Height resolution order: explicit positive height, then the magnitude
    /// of the vertical scale component `transform[3]`, then
    /// [`FALLBACK_RUN_HEIGHT`].
    pub fn from_raw(item: RawTextItem, page_height: f32) -> Self {
        let height = item
            .height
            .filter(|h| *h > 0.0)
            .or_else(|| Some(item.transform[3].abs()).filter(|h| *h > 0.0))
            .unwrap_or(FALLBACK_RUN_HEIGHT);

        TextRun {
            text: normalize_run_text(&item.text),
            x: item.transform[4],
            y: page_height - item.transform[5],
            width: item.width.unwrap_or(0.0),
            height,
            font_name: item.font_name,
        }
    }
}

/// NFC-normalize, expand typographic ligatures, and drop replacement
/// characters.
pub fn normalize_run_text(text: &str) -> String {
    let ligatures = [
        ('\u{FB00}', "ff"),
        ('\u{FB01}', "fi"),
        ('\u{FB02}', "fl"),
        ('\u{FB03}', "ffi"),
        ('\u{FB04}', "ffl"),
    ];

    let mut out = String::with_capacity(text.len());
    for ch in text.nfc() {
        if ch == '\u{FFFD}' {
            continue;
        }
        match ligatures.iter().find(|(lig, _)| *lig == ch) {
            Some((_, expanded)) => out.push_str(expanded),
            None => out.push(ch),
        }
    }
    out
}

/// A finished paragraph, ready to be read one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub id: String,
    pub index: usize,
    pub text: String,
    pub html: String,
}

impl Paragraph {
    /// PDF paragraphs carry no markup, so `html` mirrors `text`.
    pub fn plain(index: usize, text: String) -> Self {
        Paragraph {
            id: format!("p-{}", index),
            index,
            html: text.clone(),
            text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Pdf => write!(f, "pdf"),
        }
    }
}

/// The article shape shared by every ingestion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedArticle {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub paragraphs: Vec<Paragraph>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    pub page_count: usize,
    pub source_type: SourceType,
}

/// Document-level metadata from the trailer `Info` dictionary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, transform: [f32; 6]) -> RawTextItem {
        RawTextItem {
            text: text.to_string(),
            transform,
            width: None,
            height: None,
            font_name: None,
        }
    }

    #[test]
    fn test_from_raw_flips_y() {
        let run = TextRun::from_raw(item("a", [10.0, 0.0, 0.0, 10.0, 72.0, 700.0]), 792.0);
        assert!((run.x - 72.0).abs() < 0.01);
        assert!((run.y - 92.0).abs() < 0.01);
    }

    #[test]
    fn test_from_raw_width_defaults_to_zero() {
        let run = TextRun::from_raw(item("a", [10.0, 0.0, 0.0, 10.0, 0.0, 0.0]), 100.0);
        assert_eq!(run.width, 0.0);
    }

    #[test]
    fn test_from_raw_height_prefers_explicit() {
        let mut raw = item("a", [10.0, 0.0, 0.0, 10.0, 0.0, 0.0]);
        raw.height = Some(9.0);
        assert_eq!(TextRun::from_raw(raw, 100.0).height, 9.0);
    }

    #[test]
    fn test_from_raw_height_uses_transform_scale() {
        let run = TextRun::from_raw(item("a", [-14.0, 0.0, 0.0, -14.0, 0.0, 0.0]), 100.0);
        assert_eq!(run.height, 14.0);
    }

    #[test]
    fn test_from_raw_height_fallback() {
        let mut raw = item("a", [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        raw.height = Some(0.0);
        assert_eq!(TextRun::from_raw(raw, 100.0).height, FALLBACK_RUN_HEIGHT);
    }

    #[test]
    fn test_normalize_ligatures() {
        assert_eq!(normalize_run_text("\u{FB01}nd a\u{FB04}e"), "find affle");
    }

    #[test]
    fn test_normalize_drops_replacement_char() {
        assert_eq!(normalize_run_text("Hello\u{FFFD}World"), "HelloWorld");
    }

    #[test]
    fn test_normalize_nfc() {
        assert_eq!(normalize_run_text("caf\u{0065}\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn test_paragraph_plain() {
        let p = Paragraph::plain(3, "text".to_string());
        assert_eq!(p.id, "p-3");
        assert_eq!(p.index, 3);
        assert_eq!(p.html, p.text);
    }

    #[test]
    fn test_article_serializes_camel_case() {
        let article = ParsedArticle {
            title: "doc".to_string(),
            byline: None,
            site_name: None,
            excerpt: None,
            paragraphs: vec![],
            url: "pdf:doc.pdf".to_string(),
            word_count: Some(0),
            page_count: 1,
            source_type: SourceType::Pdf,
        };
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["sourceType"], "pdf");
        assert_eq!(json["pageCount"], 1);
        assert_eq!(json["wordCount"], 0);
        assert!(json.get("byline").is_none());
    }

    #[test]
    fn test_source_type_display() {
        assert_eq!(format!("{}", SourceType::Pdf), "pdf");
        assert_eq!(serde_json::to_value(SourceType::Pdf).unwrap(), "pdf");
    }
}
