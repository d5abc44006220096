use invoice_pdf::{ImageError, PdfDocument, Rect};

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn encode_png(width: u32, height: u32, color: png::ColorType, pixel: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data: Vec<u8> = pixel
            .iter()
            .copied()
            .cycle()
            .take(pixel.len() * (width * height) as usize)
            .collect();
        writer.write_image_data(&data).unwrap();
    }
    buf
}

fn logo_rect() -> Rect {
    Rect { x: 40.0, y: 800.0, width: 60.0, height: 60.0 }
}

#[test]
fn rgb_png_becomes_an_image_xobject() {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    let id = doc
        .load_image_bytes(encode_png(4, 2, png::ColorType::Rgb, &[41, 128, 185]))
        .unwrap();
    doc.begin_page(595.28, 841.89).unwrap();
    doc.place_image(id, &logo_rect());
    let bytes = doc.end_document().unwrap();

    assert!(contains(&bytes, b"/Subtype /Image"));
    assert!(contains(&bytes, b"/Width 4"));
    assert!(contains(&bytes, b"/ColorSpace /DeviceRGB"));
    assert!(contains(&bytes, b"/XObject << /Im0 "));
    // 4x2 scaled into 60x60 is 60x30, hanging from the top edge.
    assert!(contains(&bytes, b"q\n60 0 0 30 40 770 cm\n/Im0 Do\nQ\n"));
    assert!(!contains(&bytes, b"/SMask"));
}

#[test]
fn rgba_png_gets_a_soft_mask() {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    doc.load_image_bytes(encode_png(3, 3, png::ColorType::Rgba, &[255, 0, 0, 128]))
        .unwrap();
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"/SMask "));
    assert!(contains(&bytes, b"/ColorSpace /DeviceGray"));
}

#[test]
fn grayscale_png_keeps_one_channel() {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    doc.load_image_bytes(encode_png(2, 2, png::ColorType::Grayscale, &[200]))
        .unwrap();
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"/ColorSpace /DeviceGray"));
    assert!(contains(&bytes, b"/Length 4"));
}

#[test]
fn jpeg_is_passed_through_with_dct_filter() {
    // SOI, SOF0 for an 8x8 three-component frame, EOI.
    let jpeg = vec![
        0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x08, 0x00, 0x08, 0x03, 0x01, 0x11,
        0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01, 0xFF, 0xD9,
    ];
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    let id = doc.load_image_bytes(jpeg.clone()).unwrap();
    doc.begin_page(612.0, 792.0).unwrap();
    doc.place_image(id, &logo_rect());
    let bytes = doc.end_document().unwrap();
    assert!(contains(&bytes, b"/Filter /DCTDecode"));
    assert!(contains(&bytes, &jpeg));
}

#[test]
fn image_is_listed_only_on_pages_that_use_it() {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    let id = doc
        .load_image_bytes(encode_png(1, 1, png::ColorType::Rgb, &[0, 0, 0]))
        .unwrap();
    doc.begin_page(612.0, 792.0).unwrap();
    doc.place_image(id, &logo_rect());
    doc.begin_page(612.0, 792.0).unwrap();
    let bytes = doc.end_document().unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert_eq!(text.matches("/XObject <<").count(), 1);
    assert!(text.contains("/Count 2"));
}

#[test]
fn invalid_data_is_an_error() {
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    assert!(matches!(
        doc.load_image_bytes(b"not an image".to_vec()),
        Err(ImageError::UnsupportedFormat)
    ));
    assert!(matches!(doc.load_image_bytes(vec![0x89]), Err(ImageError::TooShort(1))));
}

#[test]
fn truncated_png_is_a_decode_error() {
    let mut png_bytes = encode_png(4, 4, png::ColorType::Rgb, &[1, 2, 3]);
    png_bytes.truncate(20);
    let mut doc = PdfDocument::new(Vec::new()).unwrap();
    assert!(doc.load_image_bytes(png_bytes).is_err());
}
