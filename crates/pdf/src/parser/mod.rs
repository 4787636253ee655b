//! PDF page content to paragraph text.
//!
//! ```text
//! content ops -> RawTextItem[] -> TextRun[] -> Line[] -> paragraph strings
//!                 extract          from_raw    lines      segment
//! ```

pub mod backend;
pub mod extract;
pub mod lines;
pub mod segment;
