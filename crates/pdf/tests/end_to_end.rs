use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use lectern_pdf::{PdfDocument, PdfError, SourceType};

/// One positioned line of text: `(x, y, text)` in PDF user space.
type Placed<'a> = (f32, f32, &'a str);

/// One positioned run of raw string bytes.
type PlacedBytes = (f32, f32, Vec<u8>);

fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    }
}

/// Build a US-Letter PDF with one page per entry, each line placed with its
/// own `Tm` in 12pt Helvetica.
fn build_pdf(pages: &[Vec<Placed>]) -> Vec<u8> {
    let pages: Vec<Vec<PlacedBytes>> = pages
        .iter()
        .map(|lines| {
            lines
                .iter()
                .map(|(x, y, text)| (*x, *y, text.as_bytes().to_vec()))
                .collect()
        })
        .collect();
    build_pdf_with_font(helvetica(), &pages)
}

/// Same as [`build_pdf`] with a caller-supplied font dictionary and raw
/// string bytes for every run.
fn build_pdf_with_font(font: Dictionary, pages: &[Vec<PlacedBytes>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(font);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
        ];
        for (x, y, bytes) in lines {
            operations.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    (*x).into(),
                    (*y).into(),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(bytes.clone())],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Reading Notes"),
        "Author" => Object::string_literal("A. Reader"),
    });
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn sample_page() -> Vec<Placed<'static>> {
    vec![
        (72.0, 700.0, "Lectern rebuilds paragraphs from positioned runs"),
        (72.0, 686.0, "of text and repairs hyphen-"),
        (72.0, 672.0, "ated words across line breaks."),
        (72.0, 632.0, "A second paragraph begins after a wide gap."),
        (300.0, 40.0, "1"),
    ]
}

#[test]
fn test_parse_pdf_single_page() {
    let bytes = build_pdf(&[sample_page()]);
    let article = lectern_pdf::parse_pdf(&bytes, "notes.pdf").unwrap();

    let texts: Vec<&str> = article.paragraphs.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Lectern rebuilds paragraphs from positioned runs of text and repairs \
             hyphenated words across line breaks.",
            "A second paragraph begins after a wide gap.",
        ]
    );
    assert_eq!(article.title, "notes");
    assert_eq!(article.url, "pdf:notes.pdf");
    assert_eq!(article.page_count, 1);
    assert_eq!(article.source_type, SourceType::Pdf);
    assert_eq!(article.word_count, Some(15 + 8));
}

#[test]
fn test_paragraphs_restart_on_each_page() {
    let bytes = build_pdf(&[
        vec![(72.0, 100.0, "The closing line of the first page runs on and")],
        vec![(72.0, 700.0, "the opening line of the second page continues it.")],
    ]);
    let article = lectern_pdf::parse_pdf(&bytes, "two-pages.pdf").unwrap();

    assert_eq!(article.page_count, 2);
    assert_eq!(article.paragraphs.len(), 2);
    assert_eq!(article.paragraphs[1].id, "p-1");
}

#[test]
fn test_page_without_text() {
    let bytes = build_pdf(&[vec![]]);
    let article = lectern_pdf::parse_pdf(&bytes, "blank.pdf").unwrap();

    assert!(article.paragraphs.is_empty());
    assert_eq!(article.word_count, Some(0));
    assert_eq!(article.page_count, 1);
}

#[test]
fn test_info_reads_metadata() {
    let bytes = build_pdf(&[sample_page(), sample_page()]);
    let info = lectern_pdf::info(&bytes).unwrap();

    assert_eq!(info.title.as_deref(), Some("Reading Notes"));
    assert_eq!(info.author.as_deref(), Some("A. Reader"));
    assert_eq!(info.creator, None);
    assert_eq!(info.page_count, 2);
}

#[test]
fn test_page_lines_in_reading_order() {
    let bytes = build_pdf(&[sample_page()]);
    let lines = lectern_pdf::page_lines(&bytes, 1).unwrap();

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Lectern rebuilds paragraphs from positioned runs");
    assert_eq!(lines[1], "of text and repairs hyphen-");
    assert_eq!(lines[4], "1");
}

#[test]
fn test_page_lines_out_of_range() {
    let document = PdfDocument::from_bytes(&build_pdf(&[sample_page()])).unwrap();

    assert!(matches!(document.page_lines(0), Err(PdfError::PageNotFound(0))));
    assert!(matches!(document.page_lines(2), Err(PdfError::PageNotFound(2))));
}

#[test]
fn test_win_ansi_bullet_opens_paragraph() {
    let font = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    };
    let mut bullet = vec![0x95];
    bullet.extend_from_slice(b" The first bullet item is long enough to keep");
    let bytes = build_pdf_with_font(
        font,
        &[vec![
            (72.0, 700.0, b"An introductory line that is long enough to keep".to_vec()),
            (72.0, 686.0, bullet),
        ]],
    );
    let article = lectern_pdf::parse_pdf(&bytes, "list.pdf").unwrap();

    assert_eq!(article.paragraphs.len(), 2);
    assert_eq!(
        article.paragraphs[0].text,
        "An introductory line that is long enough to keep"
    );
    assert!(article.paragraphs[1].text.starts_with('\u{2022}'));
}

#[test]
fn test_glyph_widths_place_adjacent_runs() {
    // Every printable glyph is a full em wide.
    let widths: Vec<Object> = (32..127).map(|_| Object::Integer(1000)).collect();
    let font = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => widths,
    };
    let bytes = build_pdf_with_font(
        font,
        &[vec![
            (72.0, 700.0, b"Hel".to_vec()),
            (108.0, 700.0, b"lo".to_vec()),
        ]],
    );
    let lines = lectern_pdf::page_lines(&bytes, 1).unwrap();

    assert_eq!(lines, vec!["Hello"]);
}
