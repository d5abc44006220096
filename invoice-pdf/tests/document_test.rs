use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use invoice_pdf::{BuiltinFont, Color, FitResult, PdfDocument, Rect, TextAlign, TextFlow, TextStyle};

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn new_doc() -> PdfDocument<Vec<u8>> {
    PdfDocument::new(Vec::new()).unwrap()
}

#[test]
fn empty_page_is_a_complete_pdf() {
    let mut doc = new_doc();
    doc.begin_page(595.28, 841.89).unwrap();
    let bytes = doc.end_document().unwrap();
    assert!(bytes.starts_with(b"%PDF-1.7"));
    assert!(contains(&bytes, b"/Type /Catalog"));
    assert!(contains(&bytes, b"/Count 1"));
    assert!(contains(&bytes, b"/MediaBox [0 0 595.28 841.89]"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[test]
fn fonts_declare_win_ansi_encoding() {
    let bytes = new_doc().end_document().unwrap();
    assert_eq!(count(&bytes, b"/Encoding /WinAnsiEncoding"), 3);
    assert!(contains(&bytes, b"/BaseFont /Helvetica-Bold"));
}

#[test]
fn info_entries_are_written() {
    let mut doc = new_doc();
    doc.set_info("Title", "Invoice INV-1").set_info("Creator", "invoice-pdf");
    doc.begin_page(612.0, 792.0).unwrap();
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"/Title (Invoice INV-1)"));
    assert!(contains(&bytes, b"/Info "));
}

#[test]
fn styled_text_uses_font_color_and_position() {
    let mut doc = new_doc();
    doc.begin_page(612.0, 792.0).unwrap();
    let style = TextStyle::new(BuiltinFont::HelveticaBold, 22.0).with_color(Color::WHITE);
    doc.place_text("INVOICE", 40.0, 780.0, &style);
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"/F2 22 Tf"));
    assert!(contains(&bytes, b"1 1 1 rg"));
    assert!(contains(&bytes, b"1 0 0 1 40 780 Tm\n(INVOICE) Tj"));
}

#[test]
fn right_aligned_text_ends_at_the_edge() {
    let mut doc = new_doc();
    doc.begin_page(612.0, 792.0).unwrap();
    let style = TextStyle::new(BuiltinFont::Helvetica, 10.0);
    // "10" is 11.12pt wide at 10pt.
    doc.place_text_aligned("10", 100.0, 500.0, 100.0, TextAlign::Right, &style);
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"1 0 0 1 188.88 500 Tm\n(10) Tj"));
}

#[test]
fn graphics_operators() {
    let mut doc = new_doc();
    doc.begin_page(612.0, 792.0).unwrap();
    doc.fill_rect(0.0, 742.0, 612.0, 50.0, Color::rgb(0.0, 0.5, 1.0));
    doc.line((40.0, 600.0), (572.0, 600.0), Color::gray(0.5), 0.75);
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"q\n0 0.5 1 rg\n0 742 612 50 re\nf\nQ\n"));
    assert!(contains(&bytes, b"0.5 0.5 0.5 RG\n0.75 w\n40 600 m\n572 600 l\nS\nQ\n"));
}

#[test]
fn text_flow_spills_to_a_second_page() {
    let text = "lorem ipsum dolor sit amet ".repeat(600);
    let mut flow = TextFlow::new(&text, TextStyle::default());
    let rect = Rect { x: 40.0, y: 780.0, width: 500.0, height: 700.0 };

    let mut doc = new_doc();
    let mut pages = 0;
    loop {
        doc.begin_page(612.0, 792.0).unwrap();
        pages += 1;
        match doc.fit_textflow(&mut flow, &rect) {
            FitResult::Stop => break,
            FitResult::BoxFull => continue,
            FitResult::BoxEmpty => panic!("rect should fit a line"),
        }
    }
    assert_eq!(doc.page_count(), pages);
    let bytes = doc.end_document().unwrap();
    assert!(pages >= 2);
    assert!(contains(&bytes, format!("/Count {}", pages).as_bytes()));
}

#[test]
fn compression_shrinks_content_streams() {
    let render = |compress: bool| {
        let mut doc = new_doc();
        doc.set_compression(compress);
        doc.begin_page(612.0, 792.0).unwrap();
        for i in 0..50 {
            doc.place_text("Repeated line of invoice text", 40.0, 700.0 - i as f64 * 12.0, &TextStyle::default());
        }
        doc.end_document().unwrap()
    };
    let plain = render(false);
    let packed = render(true);
    assert!(contains(&packed, b"/Filter /FlateDecode"));
    assert!(packed.len() < plain.len());
}

#[test]
fn identical_input_gives_identical_bytes() {
    let render = || {
        let mut doc = new_doc();
        doc.set_compression(true).set_info("Title", "same");
        doc.begin_page(612.0, 792.0).unwrap();
        doc.place_text("deterministic", 40.0, 700.0, &TextStyle::default());
        doc.end_document().unwrap()
    };
    assert_eq!(render(), render());
}

/// Page content is held in memory until the page ends, then flushed.
#[test]
fn end_page_flushes_to_writer() {
    struct Tracking {
        written: Rc<RefCell<usize>>,
    }

    impl Write for Tracking {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            *self.written.borrow_mut() += buf.len();
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let written = Rc::new(RefCell::new(0));
    let mut doc = PdfDocument::new(Tracking { written: written.clone() }).unwrap();
    let after_header = *written.borrow();

    doc.begin_page(612.0, 792.0).unwrap();
    doc.place_text("Hello", 20.0, 20.0, &TextStyle::default());
    assert_eq!(*written.borrow(), after_header);

    doc.end_page().unwrap();
    assert!(*written.borrow() > after_header);
}
