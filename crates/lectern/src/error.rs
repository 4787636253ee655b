#[derive(thiserror::Error, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Not a PDF file: {0}")]
    NotAPdf(String),

    #[error("Page {page} is out of range (document has {count} pages)")]
    InvalidPage { page: usize, count: usize },
}
