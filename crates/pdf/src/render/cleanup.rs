use std::sync::OnceLock;

use regex::Regex;

use crate::types::Paragraph;

/// Paragraphs of this many characters or fewer are dropped as noise.
pub const MIN_PARAGRAPH_CHARS: usize = 30;

/// Normalize spacing in a finished paragraph.
///
/// Collapses whitespace, joins words still split by a hyphen and a space,
/// tightens the space before `.,;:!?` and guarantees one after them when a
/// letter follows. Applying it twice gives the same result as applying it
/// once.
pub fn clean_paragraph(text: &str) -> String {
    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    static RE_HYPHEN: OnceLock<Regex> = OnceLock::new();
    static RE_SPACE_BEFORE_PUNCT: OnceLock<Regex> = OnceLock::new();
    static RE_SPACE_AFTER_PUNCT: OnceLock<Regex> = OnceLock::new();

    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    let re_hyphen = RE_HYPHEN.get_or_init(|| Regex::new(r"(?i)([a-z])-\s+([a-z])").unwrap());
    let re_before = RE_SPACE_BEFORE_PUNCT.get_or_init(|| Regex::new(r"\s+([.,;:!?])").unwrap());
    let re_after =
        RE_SPACE_AFTER_PUNCT.get_or_init(|| Regex::new(r"([.,;:!?])\s*([A-Za-z])").unwrap());

    let mut result = re_spaces.replace_all(text, " ").into_owned();
    // Matches can share a letter ("a- b- c"), so repeat until none are left.
    while re_hyphen.is_match(&result) {
        result = re_hyphen.replace_all(&result, "$1$2").into_owned();
    }
    let result = re_before.replace_all(&result, "$1");
    let result = re_after.replace_all(&result, "$1 $2");

    result.trim().to_string()
}

/// Whether a cleaned paragraph is too short or only a page number.
pub fn is_noise(text: &str) -> bool {
    static RE_PAGE_LABEL: OnceLock<Regex> = OnceLock::new();
    static RE_NUMERAL: OnceLock<Regex> = OnceLock::new();

    let re_page = RE_PAGE_LABEL
        .get_or_init(|| Regex::new(r"(?i)^(page\s+)?\d+(\s+of\s+\d+)?$").unwrap());
    let re_numeral = RE_NUMERAL.get_or_init(|| Regex::new(r"^\d+$").unwrap());

    text.chars().count() <= MIN_PARAGRAPH_CHARS
        || re_page.is_match(text)
        || re_numeral.is_match(text)
}

/// Clean every raw paragraph, drop noise, and number the survivors from 0.
pub fn finalize_paragraphs<I>(raw: I) -> Vec<Paragraph>
where
    I: IntoIterator<Item = String>,
{
    raw.into_iter()
        .map(|text| clean_paragraph(&text))
        .filter(|text| !is_noise(text))
        .enumerate()
        .map(|(index, text)| Paragraph::plain(index, text))
        .collect()
}
