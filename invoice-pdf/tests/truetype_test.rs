use invoice_pdf::{
    wrap_text, BuiltinFont, Cell, CellStyle, FontError, FontRef, PdfDocument, Rect, Row, Table, TableCursor, TextStyle,
};

const DEJAVU_SANS: &[u8] = include_bytes!("fixtures/DejaVuSans.ttf");

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn doc_with_font() -> (PdfDocument<Vec<u8>>, FontRef) {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    let font = doc.load_font_bytes(DEJAVU_SANS.to_vec()).unwrap();
    (doc, font)
}

#[test]
fn loaded_face_gets_the_next_resource_name() {
    let (mut doc, font) = doc_with_font();
    assert!(matches!(font, FontRef::TrueType(_)));
    assert_eq!(doc.truetype_fonts()[0].postscript_name(), "DejaVuSans");

    doc.begin_page(595.28, 841.89).unwrap();
    doc.place_text("Łukasz Wójcik", 40.0, 700.0, &TextStyle::new(font, 12.0));
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"/F4 12 Tf"));
    assert!(contains(&bytes, b"/Font << /F1 3 0 R /F2 4 0 R /F3 5 0 R /F4 "));
}

#[test]
fn embedded_face_is_a_type0_font() {
    let (mut doc, font) = doc_with_font();
    doc.set_compression(false);
    doc.begin_page(595.28, 841.89).unwrap();
    doc.place_text("Fee ₹1,200", 40.0, 700.0, &TextStyle::new(font, 10.0));
    let bytes = doc.end_document().unwrap();

    for needle in [
        &b"/Subtype /Type0"[..],
        b"/Encoding /Identity-H",
        b"/Subtype /CIDFontType2",
        b"/CIDToGIDMap /Identity",
        b"/Type /FontDescriptor",
        b"/FontName /DejaVuSans",
        b"/FontFile2 ",
        b"/Length1 ",
        b"beginbfchar",
        b"<20B9>",
    ] {
        assert!(contains(&bytes, needle), "missing {}", String::from_utf8_lossy(needle));
    }
    // Glyph ids, not a WinAnsi literal with '?' in place of the rupee sign.
    assert!(contains(&bytes, b"> Tj"));
    assert!(!contains(&bytes, b"?1,200"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[test]
fn builtin_only_documents_embed_nothing() {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    doc.begin_page(595.28, 841.89).unwrap();
    doc.place_text("Invoice", 40.0, 700.0, &TextStyle::new(BuiltinFont::Helvetica, 10.0));
    let bytes = doc.end_document().unwrap();
    assert!(!contains(&bytes, b"/Type0"));
    assert!(!contains(&bytes, b"/F4"));
}

#[test]
fn invalid_font_bytes_are_an_error() {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    let err = doc.load_font_bytes(vec![0; 64]).unwrap_err();
    assert!(matches!(err, FontError::Parse(_)));
    assert!(doc.truetype_fonts().is_empty());
}

#[test]
fn wrapping_and_tables_measure_with_the_embedded_face() {
    let (mut doc, font) = doc_with_font();
    let style = TextStyle::new(font, 10.0);
    let text = "Zażółć gęślą jaźń, kurs zaawansowany";
    let lines = wrap_text(text, 82.0, &style, doc.truetype_fonts());
    assert!(lines.len() > 1);
    for line in &lines {
        assert!(style.width_of(line, doc.truetype_fonts()) <= 82.0);
    }

    let table = Table::new(vec![90.0]);
    let row = Row::new(vec![Cell::styled(text, CellStyle { text: style, ..CellStyle::default() })]);
    let height = table.row_height(&row, doc.truetype_fonts());
    assert_eq!(height, lines.len() as f64 * 12.0 + 8.0);

    doc.begin_page(595.28, 841.89).unwrap();
    let mut cursor = TableCursor::new(&Rect { x: 40.0, y: 800.0, width: 90.0, height: 700.0 });
    doc.fit_row(&table, &row, &mut cursor);
    assert_eq!(cursor.current_y(), 800.0 - height);
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"/F4 10 Tf"));
}
