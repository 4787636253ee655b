use std::path::{Path, PathBuf};
use std::time::Instant;

use colored::Colorize;
use lectern_pdf::{ParsedArticle, PdfDocument};

use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Parser)]
#[command(name = "pdf")]
#[command(about = "Rebuild paragraphs from PDF documents")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Print the reading-order paragraphs of a document
    Paragraphs {
        /// Path to the PDF file
        path: PathBuf,
        /// Output the full article as JSON
        #[arg(long, env = "LECTERN_PDF_JSON")]
        json: bool,
    },
    /// Print the assembled text lines of one page
    Lines {
        /// Path to the PDF file
        path: PathBuf,
        /// Page number (1-indexed)
        #[arg(short, long, default_value = "1")]
        page: usize,
    },
    /// Print document metadata
    Info {
        /// Path to the PDF file
        path: PathBuf,
    },
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let started = Instant::now();

    match app.command {
        Commands::Paragraphs { path, json } => {
            let article = blocking(move || load_article(&path)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&article)?);
            } else {
                print!("{}", format_article_text(&article));
            }
        }
        Commands::Lines { path, page } => {
            let lines = blocking(move || load_page_lines(&path, page)).await?;
            print!("{}", format_lines(&lines));
        }
        Commands::Info { path } => {
            let info = blocking(move || {
                let bytes = read_pdf(&path)?;
                lectern_pdf::info(&bytes).map_err(|e| eyre!(e))
            })
            .await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    if global.verbose {
        eprintln!("Done in {:.2?}", started.elapsed());
    }

    Ok(())
}

/// Run CPU-bound parsing off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Reject paths that do not carry a `.pdf` extension.
pub fn ensure_pdf_path(path: &Path) -> Result<(), Error> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        Ok(())
    } else {
        Err(Error::NotAPdf(path.display().to_string()))
    }
}

/// Read a PDF file into memory after checking its extension.
pub fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    ensure_pdf_path(path)?;
    std::fs::read(path).with_context(|| f!("Failed to read {}", path.display()))
}

pub fn load_article(path: &Path) -> Result<ParsedArticle> {
    ensure_pdf_path(path)?;
    lectern_pdf::parse_pdf_file(path).with_context(|| f!("Failed to load {}", path.display()))
}

fn load_page_lines(path: &Path, page: usize) -> Result<Vec<String>> {
    let bytes = read_pdf(path)?;
    let document = PdfDocument::from_bytes(&bytes).map_err(|e| eyre!(e))?;
    validate_page(page, document.page_count())?;
    document.page_lines(page).map_err(|e| eyre!(e))
}

/// Check a 1-based page number against the document's page count.
pub fn validate_page(page: usize, count: usize) -> Result<(), Error> {
    if page == 0 || page > count {
        return Err(Error::InvalidPage { page, count });
    }
    Ok(())
}

fn format_article_text(article: &ParsedArticle) -> String {
    let mut result = String::new();

    result.push_str(&f!("\n{}\n", article.title.bright_cyan().bold()));
    result.push_str(&f!(
        "{} paragraphs, {} words, {} pages\n\n",
        article.paragraphs.len(),
        article.word_count.unwrap_or(0),
        article.page_count
    ));

    if article.paragraphs.is_empty() {
        result.push_str(&f!("{}\n", "No paragraphs found.".yellow()));
        return result;
    }

    let mut table = new_table();
    for paragraph in &article.paragraphs {
        table.add_row(prettytable::row![paragraph.id.dimmed(), paragraph.text]);
    }
    result.push_str(&table.to_string());

    result
}

fn format_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return f!("{}\n", "No text on this page.".yellow());
    }

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| f!("{:>4}  {}\n", (i + 1).to_string().dimmed(), line))
        .collect()
}
