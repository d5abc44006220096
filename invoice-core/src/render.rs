//! Invoice layout on top of the PDF engine.
//!
//! One A4 page to start with; the items table, the totals block and the
//! notes/terms sections continue onto further pages as needed. Every page
//! carries the same footer. Output depends only on the invoice and the
//! [`RenderOptions`], so two calls with equal inputs give equal bytes.

use std::io;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use invoice_pdf::fonts::line_height;
use invoice_pdf::{
    wrap_text, BuiltinFont, Cell, CellStyle, Color, FitResult, FontRef, ImageError, ImageId, PdfDocument, Rect, Row,
    Table, TableCursor, TextAlign, TextFlow, TextStyle, TrueTypeFont,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{CurrencyConfig, Settings};
use crate::error::InvoiceError;
use crate::model::{ContactInfo, InvoiceData, InvoiceItem, InvoiceStatus};
use crate::money::{format_money, format_percent};

pub const PAGE_W: f64 = 595.28;
pub const PAGE_H: f64 = 841.89;
const MARGIN: f64 = 40.0;
const RIGHT: f64 = PAGE_W - MARGIN;
const CONTENT_W: f64 = RIGHT - MARGIN;
const HEADER_H: f64 = 90.0;
/// Content stays above this line; the footer lives below it.
const FOOTER_TOP: f64 = 70.0;
const CONTINUED_TOP: f64 = PAGE_H - MARGIN;
const LOGO_SIZE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub currency: CurrencyConfig,
    /// Date printed in the footer.
    pub generated_on: NaiveDate,
    pub compress: bool,
    /// TrueType face embedded for body text. Without one the layout uses
    /// Helvetica, which only prints WinAnsi characters.
    pub font: Option<Arc<[u8]>>,
    /// Face for headings and totals; falls back to `font`.
    pub bold_font: Option<Arc<[u8]>>,
}

impl RenderOptions {
    pub fn new(currency: CurrencyConfig, generated_on: NaiveDate) -> Self {
        RenderOptions {
            currency,
            generated_on,
            compress: true,
            font: None,
            bold_font: None,
        }
    }

    /// Reads the font files named in `[pdf]`.
    pub fn from_settings(settings: &Settings, generated_on: NaiveDate) -> crate::Result<Self> {
        Ok(RenderOptions {
            currency: settings.currency.clone(),
            generated_on,
            compress: settings.pdf.compress,
            font: read_font(settings.pdf.font.as_deref())?,
            bold_font: read_font(settings.pdf.bold_font.as_deref())?,
        })
    }
}

fn read_font(path: Option<&Path>) -> crate::Result<Option<Arc<[u8]>>> {
    path.map(|path| {
        std::fs::read(path)
            .map(Arc::from)
            .map_err(|source| InvoiceError::FontFile {
                path: path.to_path_buf(),
                source,
            })
    })
    .transpose()
}

// -------------------------------------------------------
// Styles
// -------------------------------------------------------

/// The three faces the layout draws with.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Faces {
    regular: FontRef,
    bold: FontRef,
    oblique: FontRef,
}

impl Faces {
    const HELVETICA: Faces = Faces {
        regular: FontRef::Builtin(BuiltinFont::Helvetica),
        bold: FontRef::Builtin(BuiltinFont::HelveticaBold),
        oblique: FontRef::Builtin(BuiltinFont::HelveticaOblique),
    };

    /// Embeds the configured TrueType faces. A face that does not parse
    /// is logged and Helvetica is used instead.
    fn load(doc: &mut PdfDocument<Vec<u8>>, options: &RenderOptions) -> Faces {
        let Some(bytes) = &options.font else {
            return Faces::HELVETICA;
        };
        let regular = match doc.load_font_bytes(bytes.to_vec()) {
            Ok(font) => font,
            Err(e) => {
                warn!(error = %e, "font unusable, drawing with Helvetica");
                return Faces::HELVETICA;
            }
        };
        let bold = match options.bold_font.as_ref().map(|bytes| doc.load_font_bytes(bytes.to_vec())) {
            Some(Ok(font)) => font,
            Some(Err(e)) => {
                warn!(error = %e, "bold font unusable, using the regular face");
                regular
            }
            None => regular,
        };
        Faces {
            regular,
            bold,
            oblique: regular,
        }
    }

    fn regular(&self, size: f64) -> TextStyle {
        TextStyle::new(self.regular, size)
    }

    fn bold(&self, size: f64) -> TextStyle {
        TextStyle::new(self.bold, size)
    }

    fn oblique(&self, size: f64) -> TextStyle {
        TextStyle::new(self.oblique, size)
    }

    fn covers(&self, text: &str, tt_fonts: &[TrueTypeFont]) -> bool {
        self.regular.covers(text, tt_fonts) && self.bold.covers(text, tt_fonts)
    }
}

/// The currency symbol when the faces can print it, else the PDF-safe
/// prefix (`INR ` for `₹` under Helvetica).
fn money_prefix(currency: &CurrencyConfig, faces: &Faces, tt_fonts: &[TrueTypeFont]) -> String {
    let symbol = currency.display_prefix();
    if !symbol.is_empty() && faces.covers(&symbol, tt_fonts) {
        symbol
    } else {
        currency.pdf_prefix()
    }
}

/// Fields holding characters the faces have no glyph for. Helvetica
/// prints those as `?`.
fn unprintable_fields(invoice: &InvoiceData, faces: &Faces, tt_fonts: &[TrueTypeFont]) -> Vec<&'static str> {
    let contact_text = |c: &ContactInfo| {
        [&c.name, &c.address, &c.city, &c.state, &c.zip_code, &c.country, &c.email, &c.phone, &c.website]
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let descriptions = invoice
        .items()
        .iter()
        .map(|item| item.description.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let fields = [
        ("invoice number", invoice.invoice_number.clone()),
        ("company", contact_text(&invoice.company_info)),
        ("client", contact_text(&invoice.client_info)),
        ("items", descriptions),
        ("notes", invoice.notes.clone()),
        ("terms", invoice.terms.clone()),
    ];
    fields
        .into_iter()
        .filter(|(_, text)| !faces.covers(text, tt_fonts))
        .map(|(label, _)| label)
        .collect()
}

fn accent() -> Color {
    Color::rgb8(41, 128, 185)
}

fn ink() -> Color {
    Color::rgb8(44, 62, 80)
}

fn muted() -> Color {
    Color::gray(0.45)
}

fn panel() -> Color {
    Color::rgb8(244, 246, 248)
}

fn stripe() -> Color {
    Color::rgb8(249, 250, 251)
}

/// Text color of the status value in the metadata strip.
pub fn status_color(status: InvoiceStatus) -> Color {
    match status {
        InvoiceStatus::Paid => Color::rgb8(39, 174, 96),
        InvoiceStatus::Overdue => Color::rgb8(192, 57, 43),
        InvoiceStatus::Sent => Color::rgb8(230, 126, 34),
        InvoiceStatus::Draft => Color::rgb8(127, 140, 141),
    }
}

/// `January 15, 2024`.
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

// -------------------------------------------------------
// Entry point
// -------------------------------------------------------

pub fn generate_invoice_pdf(invoice: &InvoiceData, options: &RenderOptions) -> io::Result<Vec<u8>> {
    let mut doc = PdfDocument::new(Vec::new())?;
    doc.set_compression(options.compress)
        .set_info("Title", &format!("Invoice {}", invoice.invoice_number))
        .set_info("Creator", "invoice-core");
    let logo = load_logo(&mut doc, invoice.company_info.logo.as_deref());
    let faces = Faces::load(&mut doc, options);
    let unprintable = unprintable_fields(invoice, &faces, doc.truetype_fonts());
    if !unprintable.is_empty() {
        warn!(
            invoice_number = %invoice.invoice_number,
            fields = ?unprintable,
            "text has characters the PDF font cannot draw; set pdf.font to a TrueType file that covers them"
        );
    }
    let prefix = money_prefix(&options.currency, &faces, doc.truetype_fonts());

    let mut layout = Layout {
        doc,
        faces,
        y: CONTINUED_TOP,
        generated_on: options.generated_on,
    };
    layout.new_page()?;
    draw_header(&mut layout.doc, faces, invoice, logo);
    layout.y = PAGE_H - HEADER_H - 25.0;

    draw_parties(&mut layout, invoice);
    draw_metadata(&mut layout, invoice);
    draw_items(&mut layout, invoice.items(), &prefix)?;
    draw_totals(&mut layout, invoice, &prefix)?;
    draw_section(&mut layout, "Notes", &invoice.notes)?;
    draw_section(&mut layout, "Terms & Conditions", &invoice.terms)?;

    let pages = layout.doc.page_count();
    let bytes = layout.doc.end_document()?;
    info!(
        invoice_number = %invoice.invoice_number,
        pages,
        bytes = bytes.len(),
        "invoice PDF generated"
    );
    Ok(bytes)
}

/// Drawing state: the document and the top of the free space on the
/// current page.
struct Layout {
    doc: PdfDocument<Vec<u8>>,
    faces: Faces,
    y: f64,
    generated_on: NaiveDate,
}

impl Layout {
    fn new_page(&mut self) -> io::Result<()> {
        self.doc.begin_page(PAGE_W, PAGE_H)?;
        draw_footer(&mut self.doc, self.faces, self.generated_on);
        self.y = CONTINUED_TOP;
        Ok(())
    }

    fn at_page_top(&self) -> bool {
        self.y >= CONTINUED_TOP
    }

    /// Free space from the current position down to the footer.
    fn area(&self) -> Rect {
        Rect {
            x: MARGIN,
            y: self.y,
            width: CONTENT_W,
            height: self.y - FOOTER_TOP,
        }
    }
}

// -------------------------------------------------------
// Logo
// -------------------------------------------------------

#[derive(Debug, Error)]
enum LogoError {
    #[error("logo is not a base64 data URL")]
    NotDataUrl,
    #[error("logo base64 is invalid: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, LogoError> {
    let rest = url.trim().strip_prefix("data:").ok_or(LogoError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(LogoError::NotDataUrl)?;
    if !meta.ends_with(";base64") {
        return Err(LogoError::NotDataUrl);
    }
    Ok(STANDARD.decode(payload.trim())?)
}

/// A logo that cannot be decoded is left out; the invoice still renders.
fn load_logo(doc: &mut PdfDocument<Vec<u8>>, logo: Option<&str>) -> Option<ImageId> {
    let url = logo?;
    let loaded = decode_data_url(url).and_then(|bytes| Ok(doc.load_image_bytes(bytes)?));
    match loaded {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "logo skipped");
            None
        }
    }
}

// -------------------------------------------------------
// Page furniture
// -------------------------------------------------------

fn draw_header(doc: &mut PdfDocument<Vec<u8>>, faces: Faces, invoice: &InvoiceData, logo: Option<ImageId>) {
    doc.fill_rect(0.0, PAGE_H - HEADER_H, PAGE_W, HEADER_H, accent());
    if let Some(id) = logo {
        let slot = Rect {
            x: MARGIN,
            y: PAGE_H - (HEADER_H - LOGO_SIZE) / 2.0,
            width: LOGO_SIZE,
            height: LOGO_SIZE,
        };
        doc.place_image(id, &slot);
    }
    let white = |style: TextStyle| style.with_color(Color::WHITE);
    doc.place_text_aligned("INVOICE", MARGIN, PAGE_H - 48.0, CONTENT_W, TextAlign::Right, &white(faces.bold(26.0)));
    doc.place_text_aligned(
        &format!("# {}", invoice.invoice_number),
        MARGIN,
        PAGE_H - 68.0,
        CONTENT_W,
        TextAlign::Right,
        &white(faces.regular(11.0)),
    );
}

fn draw_footer(doc: &mut PdfDocument<Vec<u8>>, faces: Faces, generated_on: NaiveDate) {
    doc.line((MARGIN, 58.0), (RIGHT, 58.0), Color::gray(0.8), 0.5);
    doc.place_text_aligned(
        "Thank you for your business!",
        MARGIN,
        42.0,
        CONTENT_W,
        TextAlign::Center,
        &faces.oblique(10.0).with_color(accent()),
    );
    doc.place_text_aligned(
        &format!("Generated on {}", long_date(generated_on)),
        MARGIN,
        28.0,
        CONTENT_W,
        TextAlign::Center,
        &faces.regular(8.0).with_color(muted()),
    );
}

// -------------------------------------------------------
// From / bill to
// -------------------------------------------------------

fn draw_parties(layout: &mut Layout, invoice: &InvoiceData) {
    let column = CONTENT_W / 2.0;
    let top = layout.y;
    let faces = layout.faces;
    let from = draw_contact(&mut layout.doc, faces, "From", &invoice.company_info, MARGIN, top, column - 15.0);
    let to = draw_contact(&mut layout.doc, faces, "Bill To", &invoice.client_info, MARGIN + column, top, column - 15.0);
    layout.y = top - from.max(to) - 12.0;
}

/// Draws one address block and returns the height it took.
fn draw_contact(
    doc: &mut PdfDocument<Vec<u8>>,
    faces: Faces,
    heading: &str,
    contact: &ContactInfo,
    x: f64,
    top: f64,
    width: f64,
) -> f64 {
    doc.place_text(heading, x, top - 11.0, &faces.bold(11.0).with_color(accent()));
    let mut baseline = top - 30.0;
    for (line, style) in contact_lines(contact, faces) {
        for wrapped in wrap_text(&line, width, &style, doc.truetype_fonts()) {
            doc.place_text(&wrapped, x, baseline, &style);
            baseline -= 13.0;
        }
    }
    top - baseline
}

fn contact_lines(contact: &ContactInfo, faces: Faces) -> Vec<(String, TextStyle)> {
    let body = faces.regular(9.0).with_color(ink());
    let mut locality = [contact.city.as_str(), contact.state.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if !contact.zip_code.is_empty() {
        if !locality.is_empty() {
            locality.push(' ');
        }
        locality.push_str(&contact.zip_code);
    }

    let mut lines = Vec::new();
    if !contact.name.is_empty() {
        lines.push((contact.name.clone(), faces.bold(10.0).with_color(ink())));
    }
    for text in [
        contact.address.clone(),
        locality,
        contact.country.clone(),
        contact.email.clone(),
        contact.phone.clone(),
        contact.website.clone(),
    ] {
        if !text.is_empty() {
            lines.push((text, body));
        }
    }
    lines
}

// -------------------------------------------------------
// Metadata strip
// -------------------------------------------------------

fn draw_metadata(layout: &mut Layout, invoice: &InvoiceData) {
    let height = 40.0;
    let top = layout.y;
    layout.doc.fill_rect(MARGIN, top - height, CONTENT_W, height, panel());

    let cells = [
        ("ISSUE DATE", long_date(invoice.issue_date), ink()),
        ("DUE DATE", long_date(invoice.due_date), ink()),
        ("STATUS", invoice.status.label().to_string(), status_color(invoice.status)),
    ];
    let column = CONTENT_W / cells.len() as f64;
    for (i, (label, value, color)) in cells.iter().enumerate() {
        let x = MARGIN + 10.0 + i as f64 * column;
        let faces = layout.faces;
        layout.doc.place_text(label, x, top - 14.0, &faces.regular(8.0).with_color(muted()));
        layout.doc.place_text(value, x, top - 30.0, &faces.bold(10.0).with_color(*color));
    }
    layout.y = top - height - 20.0;
}

// -------------------------------------------------------
// Items table
// -------------------------------------------------------

const DESCRIPTION_W: f64 = CONTENT_W - 240.0;
const CELL_PADDING: f64 = 5.0;

fn items_table() -> Table {
    let mut table = Table::new(vec![DESCRIPTION_W, 60.0, 90.0, 90.0]);
    table.border_color = Color::gray(0.85);
    table
}

fn header_row(faces: Faces) -> Row {
    let left = CellStyle {
        background: Some(accent()),
        text: faces.bold(10.0).with_color(Color::WHITE),
        padding: 5.0,
        align: TextAlign::Left,
    };
    let center = CellStyle { align: TextAlign::Center, ..left };
    let right = CellStyle { align: TextAlign::Right, ..left };
    Row::new(vec![
        Cell::styled("Description", left),
        Cell::styled("Qty", center),
        Cell::styled("Rate", right),
        Cell::styled("Amount", right),
    ])
}

/// Rows for one item, none taller than `max_height`. A description that
/// would not fit is split over continuation rows; quantity, rate and
/// amount go on the first.
fn item_rows(
    index: usize,
    item: &InvoiceItem,
    prefix: &str,
    max_height: f64,
    faces: Faces,
    tt_fonts: &[TrueTypeFont],
) -> Vec<Row> {
    let left = CellStyle {
        text: faces.regular(10.0).with_color(ink()),
        padding: CELL_PADDING,
        ..CellStyle::default()
    };
    let center = CellStyle { align: TextAlign::Center, ..left };
    let right = CellStyle { align: TextAlign::Right, ..left };

    let lines = wrap_text(&item.description, DESCRIPTION_W - 2.0 * CELL_PADDING, &left.text, tt_fonts);
    let per_row = (((max_height - 2.0 * CELL_PADDING) / line_height(left.text.size)).floor() as usize).max(1);
    let chunks: Vec<String> = if lines.len() > per_row {
        lines.chunks(per_row).map(|chunk| chunk.join("\n")).collect()
    } else {
        vec![item.description.clone()]
    };

    chunks
        .into_iter()
        .enumerate()
        .map(|(part, description)| {
            let figures = if part == 0 {
                [
                    item.quantity().to_string(),
                    format_money(item.rate(), prefix),
                    format_money(item.amount(), prefix),
                ]
            } else {
                Default::default()
            };
            let [quantity, rate, amount] = figures;
            let row = Row::new(vec![
                Cell::styled(description, left),
                Cell::styled(quantity, center),
                Cell::styled(rate, right),
                Cell::styled(amount, right),
            ]);
            if index % 2 == 1 {
                row.with_background(stripe())
            } else {
                row
            }
        })
        .collect()
}

/// Rows go onto the current page until it fills, then onto fresh pages,
/// each starting with the header row.
fn draw_items(layout: &mut Layout, items: &[InvoiceItem], prefix: &str) -> io::Result<()> {
    let table = items_table();
    let header = header_row(layout.faces);
    let mut cursor = TableCursor::new(&layout.area());
    let header_height = table.row_height(&header, layout.doc.truetype_fonts());
    let page_room = CONTINUED_TOP - FOOTER_TOP - header_height;

    let rows: Vec<Row> = items
        .iter()
        .enumerate()
        .flat_map(|(i, item)| item_rows(i, item, prefix, page_room, layout.faces, layout.doc.truetype_fonts()))
        .collect();
    for row in &rows {
        let mut needed = table.row_height(row, layout.doc.truetype_fonts());
        if cursor.is_first_row() {
            needed += header_height;
        }
        let fresh = cursor.is_first_row() && layout.at_page_top();
        if cursor.current_y() - needed < FOOTER_TOP && !fresh {
            layout.new_page()?;
            cursor.reset(&layout.area());
        }
        if cursor.is_first_row() {
            layout.doc.fit_row(&table, &header, &mut cursor);
        }
        let placed = layout.doc.fit_row(&table, row, &mut cursor);
        debug_assert_eq!(placed, FitResult::Stop, "item rows are sized to fit an empty page");
    }
    if items.is_empty() {
        layout.doc.fit_row(&table, &header, &mut cursor);
    }
    layout.y = cursor.current_y();
    Ok(())
}

// -------------------------------------------------------
// Totals
// -------------------------------------------------------

fn draw_totals(layout: &mut Layout, invoice: &InvoiceData, prefix: &str) -> io::Result<()> {
    let mut table = Table::new(vec![120.0, 100.0]);
    table.border_width = 0.0;

    let faces = layout.faces;
    let label = CellStyle {
        text: faces.regular(10.0).with_color(muted()),
        padding: 5.0,
        ..CellStyle::default()
    };
    let value = CellStyle {
        text: faces.regular(10.0).with_color(ink()),
        align: TextAlign::Right,
        ..label
    };
    let total_label = CellStyle {
        text: faces.bold(11.0).with_color(Color::WHITE),
        ..label
    };
    let total_value = CellStyle {
        text: faces.bold(11.0).with_color(Color::WHITE),
        ..value
    };
    let rows = [
        Row::new(vec![
            Cell::styled("Subtotal", label),
            Cell::styled(format_money(invoice.subtotal(), prefix), value),
        ]),
        Row::new(vec![
            Cell::styled(format!("Tax ({}%)", format_percent(invoice.tax_rate())), label),
            Cell::styled(format_money(invoice.tax(), prefix), value),
        ]),
        Row::new(vec![
            Cell::styled("Total", total_label),
            Cell::styled(format_money(invoice.total(), prefix), total_value),
        ])
        .with_background(accent()),
    ];

    let gap = 10.0;
    let height: f64 = rows
        .iter()
        .map(|row| table.row_height(row, layout.doc.truetype_fonts()))
        .sum::<f64>()
        + gap;
    if layout.y - height < FOOTER_TOP {
        layout.new_page()?;
    }
    let top = layout.y - gap;
    let area = Rect {
        x: RIGHT - table.width(),
        y: top,
        width: table.width(),
        height: top - FOOTER_TOP,
    };
    let mut cursor = TableCursor::new(&area);
    for row in &rows {
        layout.doc.fit_row(&table, row, &mut cursor);
    }
    layout.y = cursor.current_y() - 20.0;
    Ok(())
}

// -------------------------------------------------------
// Notes / terms
// -------------------------------------------------------

/// Heading plus word-wrapped body, skipped when `body` is blank.
fn draw_section(layout: &mut Layout, title: &str, body: &str) -> io::Result<()> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(());
    }
    if layout.y - 40.0 < FOOTER_TOP {
        layout.new_page()?;
    }
    layout
        .doc
        .place_text(title, MARGIN, layout.y - 11.0, &layout.faces.bold(11.0).with_color(accent()));
    layout.y -= 18.0;

    let mut flow = TextFlow::new(body, layout.faces.regular(9.5).with_color(ink()));
    loop {
        let area = layout.area();
        match layout.doc.fit_textflow(&mut flow, &area) {
            FitResult::Stop => {
                layout.y -= flow.last_height() + 14.0;
                return Ok(());
            }
            FitResult::BoxEmpty if layout.at_page_top() => {
                warn!(section = title, "section does not fit on a page");
                return Ok(());
            }
            FitResult::BoxFull | FitResult::BoxEmpty => layout.new_page()?,
        }
    }
}
