use crate::types::{Paragraph, ParsedArticle, SourceType};

/// Title shown for an uploaded PDF: the filename without its `.pdf`
/// extension.
pub fn title_from_filename(filename: &str) -> String {
    let name = filename.trim();
    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") => {
            &name[..cut]
        }
        _ => name,
    };

    if stem.trim().is_empty() {
        name.to_string()
    } else {
        stem.to_string()
    }
}

/// Whitespace-delimited tokens across all paragraphs.
pub fn word_count(paragraphs: &[Paragraph]) -> usize {
    paragraphs
        .iter()
        .map(|p| p.text.split_whitespace().count())
        .sum()
}

/// Wrap reconstructed paragraphs in the shared article shape.
pub fn pdf_article(filename: &str, paragraphs: Vec<Paragraph>, page_count: usize) -> ParsedArticle {
    ParsedArticle {
        title: title_from_filename(filename),
        byline: None,
        site_name: None,
        excerpt: None,
        word_count: Some(word_count(&paragraphs)),
        url: format!("pdf:{}", filename),
        paragraphs,
        page_count,
        source_type: SourceType::Pdf,
    }
}
