//! Reading-order paragraphs from PDF text.
//!
//! PDF content streams only place glyph runs at coordinates; they carry no
//! notion of lines, paragraphs or reading order. This crate rebuilds them for
//! single-column documents:
//!
//! 1. Walk each page's content stream into positioned [`TextRun`]s.
//! 2. Group runs into lines by vertical proximity ([`parser::lines`]).
//! 3. Split lines into paragraphs on gaps, list markers and sentence breaks,
//!    repairing hyphenated wraps ([`parser::segment`]).
//! 4. Normalize spacing and drop page numbers and fragments
//!    ([`render::cleanup`]).
//!
//! Pages are handled strictly one after another and paragraphs never span a
//! page boundary.

use std::path::Path;

use thiserror::Error;

use parser::backend::LopdfBackend;
use parser::extract::{BackendRunSource, TextRunSource};

pub mod article;
pub mod parser;
pub mod render;
pub mod types;

pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page not found: {0}")]
    PageNotFound(usize),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Core pipeline
// ---------------------------------------------------------------------------

/// Raw paragraph strings of one page, before cleaning.
pub fn page_paragraphs(runs: Vec<TextRun>) -> Vec<String> {
    let lines = parser::lines::assemble_lines(runs);
    if lines.is_empty() {
        return Vec::new();
    }
    parser::segment::segment_page(&lines)
}

/// Rebuild the paragraphs of every page of `source`, in order.
///
/// A page whose runs cannot be read contributes nothing; the rest of the
/// document is still processed.
pub fn extract_paragraphs(source: &dyn TextRunSource) -> Vec<Paragraph> {
    let mut raw: Vec<String> = Vec::new();

    for index in 0..source.page_count() {
        let runs = match source.page_runs(index) {
            Ok(runs) => runs,
            Err(e) => {
                log::warn!("skipping page {}: {}", index + 1, e);
                continue;
            }
        };
        let run_count = runs.len();
        let paragraphs = page_paragraphs(runs);
        log::debug!(
            "page {}: {} runs, {} raw paragraphs",
            index + 1,
            run_count,
            paragraphs.len()
        );
        raw.extend(paragraphs);
    }

    render::cleanup::finalize_paragraphs(raw)
}

/// Build the full article for any run source.
pub fn parse_article(source: &dyn TextRunSource, filename: &str) -> ParsedArticle {
    let paragraphs = extract_paragraphs(source);
    article::pdf_article(filename, paragraphs, source.page_count())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded PDF. Parsing the bytes once lets callers ask for the article,
/// metadata and per-page lines without re-reading the file.
pub struct PdfDocument {
    backend: LopdfBackend,
}

impl PdfDocument {
    /// Load PDF bytes. Unreadable and encrypted documents fail here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(PdfDocument {
            backend: LopdfBackend::load_bytes(bytes)?,
        })
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    pub fn article(&self, filename: &str) -> ParsedArticle {
        parse_article(&BackendRunSource::new(&self.backend), filename)
    }

    pub fn info(&self) -> DocumentInfo {
        let mut raw = self.backend.info_entries();
        DocumentInfo {
            title: raw.remove("Title"),
            author: raw.remove("Author"),
            creator: raw.remove("Creator"),
            producer: raw.remove("Producer"),
            page_count: self.backend.page_count(),
        }
    }

    /// Assembled line texts of a 1-based page.
    pub fn page_lines(&self, page: usize) -> Result<Vec<String>, PdfError> {
        let index = page.checked_sub(1).ok_or(PdfError::PageNotFound(page))?;
        let runs = BackendRunSource::new(&self.backend).page_runs(index)?;
        Ok(parser::lines::assemble_lines(runs)
            .lines
            .into_iter()
            .map(|line| line.text)
            .collect())
    }
}

/// Parse PDF bytes into an article named after `filename`.
pub fn parse_pdf(bytes: &[u8], filename: &str) -> Result<ParsedArticle, PdfError> {
    Ok(PdfDocument::from_bytes(bytes)?.article(filename))
}

/// Read and parse a PDF file, naming the article after the file.
pub fn parse_pdf_file(path: &Path) -> Result<ParsedArticle, PdfError> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_pdf(&bytes, &filename)
}

/// Document metadata without extracting any text.
pub fn info(bytes: &[u8]) -> Result<DocumentInfo, PdfError> {
    Ok(PdfDocument::from_bytes(bytes)?.info())
}

/// Line texts of one 1-based page.
pub fn page_lines(bytes: &[u8], page: usize) -> Result<Vec<String>, PdfError> {
    PdfDocument::from_bytes(bytes)?.page_lines(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        pages: Vec<Result<Vec<TextRun>, String>>,
    }

    impl TextRunSource for FakeSource {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_runs(&self, index: usize) -> Result<Vec<TextRun>, PdfError> {
            match &self.pages[index] {
                Ok(runs) => Ok(runs.clone()),
                Err(msg) => Err(PdfError::Parse(msg.clone())),
            }
        }
    }

    fn run(text: &str, x: f32, y: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            y,
            width: text.chars().count() as f32 * 5.0,
            height: 10.0,
            font_name: Some("Helvetica".to_string()),
        }
    }

    #[test]
    fn test_two_paragraphs_end_to_end() {
        let source = FakeSource {
            pages: vec![Ok(vec![
                run("Para one continues across a long enough line", 72.0, 100.0),
                run("Para two starts here and is long enough too.", 72.0, 140.0),
            ])],
        };

        let article = parse_article(&source, "two.pdf");
        let texts: Vec<&str> = article.paragraphs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Para one continues across a long enough line",
                "Para two starts here and is long enough too."
            ]
        );
        assert_eq!(article.paragraphs[0].index, 0);
        assert_eq!(article.paragraphs[1].index, 1);
        assert_eq!(article.paragraphs[1].id, "p-1");
        assert_eq!(article.word_count, Some(8 + 9));
        assert_eq!(article.page_count, 1);
        assert_eq!(article.title, "two");
    }

    #[test]
    fn test_empty_page_contributes_nothing() {
        let source = FakeSource {
            pages: vec![
                Ok(vec![]),
                Ok(vec![run("   ", 0.0, 10.0)]),
                Ok(vec![run("The only paragraph in this whole document.", 72.0, 100.0)]),
            ],
        };
        let paragraphs = extract_paragraphs(&source);
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].index, 0);
    }

    #[test]
    fn test_failed_page_is_skipped() {
        let source = FakeSource {
            pages: vec![
                Err("corrupt stream".to_string()),
                Ok(vec![run("Text that survives a broken page before it.", 72.0, 100.0)]),
            ],
        };
        let article = parse_article(&source, "broken.pdf");
        assert_eq!(article.paragraphs.len(), 1);
        assert_eq!(article.page_count, 2);
    }

    #[test]
    fn test_no_paragraph_spans_pages() {
        let source = FakeSource {
            pages: vec![
                Ok(vec![run("This sentence is split over the page break and", 72.0, 700.0)]),
                Ok(vec![run("continues at the top of the following page.", 72.0, 72.0)]),
            ],
        };
        assert_eq!(extract_paragraphs(&source).len(), 2);
    }

    #[test]
    fn test_page_numbers_filtered() {
        let source = FakeSource {
            pages: vec![Ok(vec![
                run("A body paragraph long enough to be kept around.", 72.0, 100.0),
                run("Page 4", 280.0, 760.0),
            ])],
        };
        let paragraphs = extract_paragraphs(&source);
        assert_eq!(paragraphs.len(), 1);
    }

    #[test]
    fn test_indices_contiguous() {
        let mut runs = Vec::new();
        for i in 0..6 {
            let text = if i % 2 == 0 {
                format!("{}", i)
            } else {
                format!("Paragraph number {} is long enough to keep.", i)
            };
            runs.push(run(&text, 72.0, 100.0 + i as f32 * 50.0));
        }
        let paragraphs = extract_paragraphs(&FakeSource { pages: vec![Ok(runs)] });
        assert_eq!(paragraphs.len(), 3);
        for (i, p) in paragraphs.iter().enumerate() {
            assert_eq!(p.index, i);
            assert_eq!(p.id, format!("p-{}", i));
        }
    }

    #[test]
    fn test_parse_pdf_rejects_garbage() {
        assert!(matches!(
            parse_pdf(b"%PDF-nonsense", "x.pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_pdf_file_missing() {
        let result = parse_pdf_file(Path::new("/nonexistent/lectern/missing.pdf"));
        assert!(matches!(result, Err(PdfError::Io(_))));
    }

    #[test]
    fn test_info_rejects_empty() {
        assert!(info(&[]).is_err());
    }
}
