use std::collections::BTreeMap;

use lopdf::content::Content;

use crate::PdfError;

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// Page height used when a page has no resolvable MediaBox (US Letter).
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Guards the `Parent` walk against cyclic page trees.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Glyph units per text-space unit in font width tables.
const GLYPH_UNITS: f32 = 1000.0;

/// Default CID advance when a descendant font has no `/DW`.
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// A font entry from a page's resource dictionary.
#[derive(Debug, Default)]
pub struct FontResource<'a> {
    /// Resource key as used by `Tf` (e.g. `b"F1"`).
    pub key: Vec<u8>,
    pub base_font: Option<String>,
    /// Byte-to-Unicode mapping resolved by lopdf (WinAnsi, MacRoman,
    /// ToUnicode CMap, ...).
    pub encoding: Option<lopdf::Encoding<'a>>,
    /// Character codes are two bytes wide (`Type0` / `Identity-*` fonts).
    pub two_byte: bool,
    pub widths: Option<GlyphWidths>,
}

impl FontResource<'_> {
    /// Split string bytes into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| c.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        }
    }
}

/// Glyph advances in thousandths of a text-space unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphWidths {
    explicit: BTreeMap<u32, f32>,
    /// `(first, last, width)` ranges from a CID font `/W` array.
    ranges: Vec<(u32, u32, f32)>,
    default: Option<f32>,
}

impl GlyphWidths {
    /// Simple font: `/FirstChar` plus the `/Widths` array, with
    /// `/MissingWidth` for codes outside it.
    pub fn simple(first_char: u32, widths: &[PdfValue], missing: Option<f32>) -> Self {
        let explicit = widths
            .iter()
            .enumerate()
            .filter_map(|(i, w)| Some((first_char + i as u32, w.as_f32()?)))
            .collect();
        GlyphWidths {
            explicit,
            ranges: Vec::new(),
            default: missing,
        }
    }

    /// CID font: the `/W` array (`c [w1 w2 ...]` and `c_first c_last w`
    /// entries) and `/DW`.
    pub fn cid(w: &[PdfValue], default: f32) -> Self {
        let mut widths = GlyphWidths {
            default: Some(default),
            ..Default::default()
        };

        let mut i = 0;
        while let Some(first) = w.get(i).and_then(PdfValue::as_f32) {
            let first = first as u32;
            match w.get(i + 1) {
                Some(PdfValue::Array(list)) => {
                    for (k, value) in list.iter().enumerate() {
                        if let Some(width) = value.as_f32() {
                            widths.explicit.insert(first + k as u32, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) =
                        (last.as_f32(), w.get(i + 2).and_then(PdfValue::as_f32))
                    else {
                        break;
                    };
                    widths.ranges.push((first, last as u32, width));
                    i += 3;
                }
                None => break,
            }
        }

        widths
    }

    /// Advance of `code` in text-space units, if the font knows it.
    pub fn advance(&self, code: u32) -> Option<f32> {
        self.explicit
            .get(&code)
            .copied()
            .or_else(|| {
                self.ranges
                    .iter()
                    .find(|(first, last, _)| (*first..=*last).contains(&code))
                    .map(|(_, _, w)| *w)
            })
            .or(self.default)
            .map(|w| w / GLYPH_UNITS)
    }
}

/// A lopdf-independent PDF value, so the text walk can run on plain data.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value of an `Integer` or `Real`.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&lopdf::Object> for PdfValue {
    fn from(obj: &lopdf::Object) -> Self {
        match obj {
            lopdf::Object::Null => PdfValue::Null,
            lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
            lopdf::Object::Integer(i) => PdfValue::Integer(*i),
            lopdf::Object::Real(f) => PdfValue::Real(*f),
            lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
            lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
            lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(PdfValue::from).collect()),
            // Dictionaries, streams and references never carry text operands.
            _ => PdfValue::Other,
        }
    }
}

/// One content-stream operation.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn number(&self, i: usize) -> Option<f32> {
        self.operands.get(i).and_then(PdfValue::as_f32)
    }
}

/// Best-effort decoding of PDF string bytes: UTF-16BE with BOM, then UTF-8,
/// then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, payload @ ..] = bytes {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Decode the operand bytes of a text-showing operator through the font's
/// encoding, falling back to [`decode_text_simple`] when there is none or it
/// cannot handle the bytes.
///
/// Two-byte fonts without a usable mapping are tried as UTF-16BE, which is
/// what many producers emit for `Identity-H`.
pub fn decode_run_bytes(font: Option<&FontResource>, bytes: &[u8]) -> String {
    if let Some(encoding) = font.and_then(|f| f.encoding.as_ref()) {
        match lopdf::Document::decode_text(encoding, bytes) {
            Ok(text) => return text,
            Err(e) => log::debug!("font encoding cannot decode run, using fallback: {}", e),
        }
    }

    let two_byte = font.is_some_and(|f| f.two_byte);
    if two_byte && !bytes.is_empty() && bytes.len() % 2 == 0 {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        let decoded = String::from_utf16_lossy(&units);
        if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
            return decoded;
        }
    }

    decode_text_simple(bytes)
}

/// What the text walk needs from a PDF parser.
///
/// Kept as a trait so the extraction state machine can be exercised with
/// hand-built operator lists.
pub trait PdfBackend {
    /// 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Fonts of the page's resources, with encodings and widths resolved.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource<'_>>, PdfError>;

    /// Decoded content-stream operations of a page.
    fn page_ops(&self, page: PageId) -> Result<Vec<ContentOp>, PdfError>;

    /// Rendered page height, used to flip y so it grows downward.
    fn page_height(&self, page: PageId) -> Result<f32, PdfError>;
}

/// [`PdfBackend`] over an in-memory [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from bytes. Encrypted documents are rejected.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// String entries of the trailer `Info` dictionary, keyed by name.
    pub fn info_entries(&self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();

        let info = match self.doc.trailer.get(b"Info") {
            Ok(lopdf::Object::Reference(id)) => self.doc.get_object(*id).ok(),
            Ok(obj) => Some(obj),
            Err(_) => None,
        };
        let Some(dict) = info.and_then(|obj| obj.as_dict().ok()) else {
            return entries;
        };

        for (key, value) in dict.iter() {
            let value = match value {
                lopdf::Object::String(bytes, _) => decode_text_simple(bytes),
                lopdf::Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                _ => continue,
            };
            entries.insert(String::from_utf8_lossy(key).into_owned(), value);
        }

        entries
    }

    fn font_resource<'a>(&'a self, key: Vec<u8>, dict: &'a lopdf::Dictionary) -> FontResource<'a> {
        let encoding = match dict.get_font_encoding(&self.doc) {
            Ok(encoding) => Some(encoding),
            Err(e) => {
                log::debug!(
                    "font {} has no usable encoding: {}",
                    String::from_utf8_lossy(&key),
                    e
                );
                None
            }
        };
        let two_byte = name_entry(dict, b"Subtype").as_deref() == Some("Type0")
            || name_entry(dict, b"Encoding").is_some_and(|enc| enc.starts_with("Identity"));
        let widths = if two_byte {
            self.cid_widths(dict)
        } else {
            self.simple_widths(dict)
        };

        FontResource {
            base_font: name_entry(dict, b"BaseFont"),
            key,
            encoding,
            two_byte,
            widths,
        }
    }

    fn simple_widths(&self, dict: &lopdf::Dictionary) -> Option<GlyphWidths> {
        let first_char = self.number(dict, b"FirstChar")?;
        let widths = match PdfValue::from(self.resolve(dict.get(b"Widths").ok()?)) {
            PdfValue::Array(values) => values,
            _ => return None,
        };
        let missing = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|obj| self.resolve(obj).as_dict().ok())
            .and_then(|descriptor| self.number(descriptor, b"MissingWidth"));

        Some(GlyphWidths::simple(first_char as u32, &widths, missing))
    }

    fn cid_widths(&self, dict: &lopdf::Dictionary) -> Option<GlyphWidths> {
        let descendant = self
            .resolve(dict.get(b"DescendantFonts").ok()?)
            .as_array()
            .ok()?
            .first()
            .map(|obj| self.resolve(obj))?
            .as_dict()
            .ok()?;
        let default = self.number(descendant, b"DW").unwrap_or(DEFAULT_CID_WIDTH);
        let w = match descendant.get(b"W").map(|obj| PdfValue::from(self.resolve(obj))) {
            Ok(PdfValue::Array(values)) => values,
            _ => Vec::new(),
        };

        Some(GlyphWidths::cid(&w, default))
    }

    fn number(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Option<f32> {
        dict.get(key)
            .ok()
            .and_then(|obj| PdfValue::from(self.resolve(obj)).as_f32())
    }

    /// Find the MediaBox of a page, walking up `Parent` links for inherited
    /// boxes.
    fn media_box(&self, page: PageId) -> Option<Vec<f32>> {
        let mut dict = self.doc.get_object(page).ok()?.as_dict().ok()?;

        for _ in 0..MAX_PAGE_TREE_DEPTH {
            if let Ok(obj) = dict.get(b"MediaBox") {
                let arr = self.resolve(obj).as_array().ok()?;
                return arr
                    .iter()
                    .map(|o| PdfValue::from(self.resolve(o)).as_f32())
                    .collect();
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        }

        None
    }

    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> &'a lopdf::Object {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }
}

fn name_entry(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource<'_>>, PdfError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts
            .into_iter()
            .map(|(key, dict)| self.font_resource(key, dict))
            .collect())
    }

    fn page_ops(&self, page: PageId) -> Result<Vec<ContentOp>, PdfError> {
        let data = self
            .doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))?;
        let content = Content::decode(&data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(PdfValue::from).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn page_height(&self, page: PageId) -> Result<f32, PdfError> {
        match self.media_box(page).as_deref() {
            Some([_, lly, _, ury, ..]) => Ok((ury - lly).abs()),
            _ => {
                log::debug!("page {:?} has no usable MediaBox, assuming letter size", page);
                Ok(DEFAULT_PAGE_HEIGHT)
            }
        }
    }
}
