use std::collections::BTreeSet;
use std::io::{self, Write};

use crate::fonts::{BuiltinFont, FontId, FontRef};
use crate::graphics::Color;
use crate::images::{fit_within, load_image, ImageError, ImageFormat, ImageId};
use crate::objects::{ObjId, PdfObject};
use crate::tables::{Row, Table, TableCursor};
use crate::textflow::{aligned_x, text_block_ops, FitResult, Rect, TextAlign, TextFlow, TextStyle};
use crate::truetype::{FontError, TrueTypeFont};
use crate::writer::{format_number, PdfWriter};

const CATALOG_OBJ: ObjId = ObjId(1);
const PAGES_OBJ: ObjId = ObjId(2);
const FIRST_FONT_OBJ: u32 = 3;

/// Streaming PDF builder.
///
/// Standard fonts are written up front, images when they are loaded and
/// each page when `end_page` is called, so only the open page's content
/// is held in memory. Embedded TrueType faces are written last, once the
/// glyphs they need are known. Works over any `Write`: a file, or a
/// `Vec<u8>` for blobs.
pub struct PdfDocument<W: Write> {
    writer: PdfWriter<W>,
    info: Vec<(String, String)>,
    page_ids: Vec<ObjId>,
    page: Option<PageBuilder>,
    images: Vec<LoadedImage>,
    tt_fonts: Vec<TrueTypeFont>,
    /// Type0 object of each TrueType face, reserved at load time so pages
    /// can reference it.
    tt_font_objs: Vec<ObjId>,
    next_obj: u32,
}

struct LoadedImage {
    obj: ObjId,
    width: u32,
    height: u32,
}

struct PageBuilder {
    width: f64,
    height: f64,
    ops: Vec<u8>,
    images: BTreeSet<usize>,
}

impl<W: Write> PdfDocument<W> {
    pub fn new(writer: W) -> io::Result<Self> {
        let mut writer = PdfWriter::new(writer);
        writer.write_header()?;
        for (i, font) in BuiltinFont::ALL.iter().enumerate() {
            let dict = PdfObject::dict(vec![
                ("Type", PdfObject::name("Font")),
                ("Subtype", PdfObject::name("Type1")),
                ("BaseFont", PdfObject::name(font.base_name())),
                ("Encoding", PdfObject::name("WinAnsiEncoding")),
            ]);
            writer.write_object(ObjId(FIRST_FONT_OBJ + i as u32), &dict)?;
        }
        Ok(PdfDocument {
            writer,
            info: Vec::new(),
            page_ids: Vec::new(),
            page: None,
            images: Vec::new(),
            tt_fonts: Vec::new(),
            tt_font_objs: Vec::new(),
            next_obj: FIRST_FONT_OBJ + BuiltinFont::ALL.len() as u32,
        })
    }

    /// Document info entry such as `Title` or `Creator`.
    pub fn set_info(&mut self, key: &str, value: &str) -> &mut Self {
        self.info.push((key.to_string(), value.to_string()));
        self
    }

    /// Deflate page content and image samples written after this call.
    pub fn set_compression(&mut self, enabled: bool) -> &mut Self {
        self.writer.set_compression(enabled);
        self
    }

    fn alloc(&mut self) -> ObjId {
        let id = ObjId(self.next_obj);
        self.next_obj += 1;
        id
    }

    /// Pages finished so far plus the open one.
    pub fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(self.page.is_some())
    }

    /// Open a new page; an already open page is finished first.
    pub fn begin_page(&mut self, width: f64, height: f64) -> io::Result<&mut Self> {
        if self.page.is_some() {
            self.end_page()?;
        }
        self.page = Some(PageBuilder {
            width,
            height,
            ops: Vec::new(),
            images: BTreeSet::new(),
        });
        Ok(self)
    }

    fn current(&mut self) -> &mut PageBuilder {
        self.page
            .as_mut()
            .expect("drawing operation called with no open page")
    }

    fn push_ops(&mut self, ops: &[u8]) -> &mut Self {
        self.current().ops.extend_from_slice(ops);
        self
    }

    // -- text ------------------------------------------------------------

    /// Parse a TrueType face for embedding. Resource names continue after
    /// the standard fonts (`F4`, `F5`, ...).
    pub fn load_font_bytes(&mut self, data: Vec<u8>) -> Result<FontRef, FontError> {
        let name = format!("F{}", BuiltinFont::ALL.len() + self.tt_fonts.len() + 1);
        let font = TrueTypeFont::from_bytes(data, name)?;
        let obj = self.alloc();
        self.tt_fonts.push(font);
        self.tt_font_objs.push(obj);
        Ok(FontRef::TrueType(FontId(self.tt_fonts.len() - 1)))
    }

    /// Loaded TrueType faces, for measuring and wrapping text outside the
    /// document (`wrap_text`, `Table::row_height`).
    pub fn truetype_fonts(&self) -> &[TrueTypeFont] {
        &self.tt_fonts
    }

    /// Single line of text with its baseline at `(x, y)`.
    pub fn place_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) -> &mut Self {
        self.place_text_aligned(text, x, y, 0.0, TextAlign::Left, style)
    }

    /// Single line aligned inside `[x, x + width]`, baseline at `y`.
    pub fn place_text_aligned(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        width: f64,
        align: TextAlign,
        style: &TextStyle,
    ) -> &mut Self {
        let left = aligned_x(align, x, width, style.width_of(text, &self.tt_fonts));
        // text_block_ops takes the top of the line, not the baseline.
        let ops = text_block_ops(
            &[text.to_string()],
            left,
            y + style.size,
            0.0,
            style,
            TextAlign::Left,
            &mut self.tt_fonts,
        );
        self.push_ops(&ops)
    }

    /// Continue a text flow inside `rect`.
    pub fn fit_textflow(&mut self, flow: &mut TextFlow, rect: &Rect) -> FitResult {
        let (ops, result) = flow.generate_ops(rect, &mut self.tt_fonts);
        self.push_ops(&ops);
        result
    }

    /// Place one table row at the cursor. `BoxFull` means the caller
    /// should start a new page, reset the cursor and retry the row.
    pub fn fit_row(&mut self, table: &Table, row: &Row, cursor: &mut TableCursor) -> FitResult {
        let (ops, result) = table.generate_row_ops(row, cursor, &mut self.tt_fonts);
        self.push_ops(&ops);
        result
    }

    // -- graphics --------------------------------------------------------

    pub fn save_state(&mut self) -> &mut Self {
        self.push_ops(b"q\n")
    }

    pub fn restore_state(&mut self) -> &mut Self {
        self.push_ops(b"Q\n")
    }

    pub fn set_fill_color(&mut self, color: Color) -> &mut Self {
        self.push_ops(color.fill_op().as_bytes())
    }

    pub fn set_stroke_color(&mut self, color: Color) -> &mut Self {
        self.push_ops(color.stroke_op().as_bytes())
    }

    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        self.push_ops(format!("{} w\n", format_number(width)).as_bytes())
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.push_ops(format!("{} {} m\n", format_number(x), format_number(y)).as_bytes())
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.push_ops(format!("{} {} l\n", format_number(x), format_number(y)).as_bytes())
    }

    /// Rectangle path with `(x, y)` as its bottom-left corner.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.push_ops(
            format!(
                "{} {} {} {} re\n",
                format_number(x),
                format_number(y),
                format_number(width),
                format_number(height)
            )
            .as_bytes(),
        )
    }

    pub fn fill(&mut self) -> &mut Self {
        self.push_ops(b"f\n")
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.push_ops(b"S\n")
    }

    /// Filled rectangle in an isolated graphics state.
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) -> &mut Self {
        self.save_state()
            .set_fill_color(color)
            .rect(x, y, width, height)
            .fill()
            .restore_state()
    }

    /// Straight stroked line in an isolated graphics state.
    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64) -> &mut Self {
        self.save_state()
            .set_stroke_color(color)
            .set_line_width(width)
            .move_to(from.0, from.1)
            .line_to(to.0, to.1)
            .stroke()
            .restore_state()
    }

    // -- images ----------------------------------------------------------

    /// Decode a PNG or JPEG and write it as an image XObject. The returned
    /// id can be placed on any number of pages.
    pub fn load_image_bytes(&mut self, data: Vec<u8>) -> Result<ImageId, ImageError> {
        let image = load_image(data)?;

        let smask = match &image.alpha {
            Some(alpha) => {
                let id = self.alloc();
                let obj = PdfObject::stream(
                    image_dict(image.width, image.height, "DeviceGray"),
                    alpha.clone(),
                );
                self.writer.write_object(id, &obj)?;
                Some(id)
            }
            None => None,
        };

        let mut dict = image_dict(image.width, image.height, image.color_space.pdf_name());
        if image.format == ImageFormat::Jpeg {
            dict.push(("Filter", PdfObject::name("DCTDecode")));
        }
        if let Some(smask) = smask {
            dict.push(("SMask", smask.reference()));
        }
        let id = self.alloc();
        self.writer.write_object(id, &PdfObject::stream(dict, image.data))?;

        self.images.push(LoadedImage {
            obj: id,
            width: image.width,
            height: image.height,
        });
        Ok(ImageId(self.images.len() - 1))
    }

    /// Draw a loaded image scaled to fit `rect`, top-left aligned.
    pub fn place_image(&mut self, image: ImageId, rect: &Rect) -> &mut Self {
        let loaded = &self.images[image.0];
        let p = fit_within(loaded.width, loaded.height, rect);
        self.current().images.insert(image.0);
        self.push_ops(
            format!(
                "q\n{} 0 0 {} {} {} cm\n/Im{} Do\nQ\n",
                format_number(p.width),
                format_number(p.height),
                format_number(p.x),
                format_number(p.y),
                image.0
            )
            .as_bytes(),
        )
    }

    // -- finishing -------------------------------------------------------

    /// Write the open page's content stream and page dictionary.
    pub fn end_page(&mut self) -> io::Result<()> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        let content_id = self.alloc();
        let page_id = self.alloc();

        self.writer
            .write_object(content_id, &PdfObject::stream(vec![], page.ops))?;

        let builtin = BuiltinFont::ALL
            .iter()
            .enumerate()
            .map(|(i, f)| (f.pdf_name().to_string(), ObjId(FIRST_FONT_OBJ + i as u32).reference()));
        let embedded = self
            .tt_fonts
            .iter()
            .zip(&self.tt_font_objs)
            .map(|(font, obj)| (font.resource_name.clone(), obj.reference()));
        let fonts = builtin.chain(embedded).collect();
        let mut resources = vec![("Font", PdfObject::Dictionary(fonts))];
        if !page.images.is_empty() {
            let names: Vec<(String, PdfObject)> = page
                .images
                .iter()
                .map(|&i| (format!("Im{}", i), self.images[i].obj.reference()))
                .collect();
            resources.push(("XObject", PdfObject::Dictionary(names)));
        }

        let dict = PdfObject::dict(vec![
            ("Type", PdfObject::name("Page")),
            ("Parent", PAGES_OBJ.reference()),
            ("MediaBox", PdfObject::rect(0.0, 0.0, page.width, page.height)),
            ("Contents", content_id.reference()),
            ("Resources", PdfObject::dict(resources)),
        ]);
        self.writer.write_object(page_id, &dict)?;
        self.page_ids.push(page_id);
        Ok(())
    }

    /// Close any open page, write the page tree, catalog, info and xref,
    /// and hand back the underlying writer.
    pub fn end_document(mut self) -> io::Result<W> {
        self.end_page()?;
        self.write_truetype_fonts()?;

        let info_id = if self.info.is_empty() {
            None
        } else {
            let id = self.alloc();
            let entries = self
                .info
                .iter()
                .map(|(k, v)| (k.clone(), PdfObject::text(v)))
                .collect();
            self.writer.write_object(id, &PdfObject::Dictionary(entries))?;
            Some(id)
        };

        let kids = self.page_ids.iter().map(|id| id.reference()).collect();
        let pages = PdfObject::dict(vec![
            ("Type", PdfObject::name("Pages")),
            ("Kids", PdfObject::Array(kids)),
            ("Count", PdfObject::Integer(self.page_ids.len() as i64)),
        ]);
        self.writer.write_object(PAGES_OBJ, &pages)?;

        let catalog = PdfObject::dict(vec![
            ("Type", PdfObject::name("Catalog")),
            ("Pages", PAGES_OBJ.reference()),
        ]);
        self.writer.write_object(CATALOG_OBJ, &catalog)?;
        self.writer.write_xref_and_trailer(CATALOG_OBJ, info_id)?;
        Ok(self.writer.into_inner())
    }
}

impl<W: Write> PdfDocument<W> {
    /// Each face becomes a Type0 font over a CIDFontType2 descendant with
    /// the whole font program in `/FontFile2`.
    fn write_truetype_fonts(&mut self) -> io::Result<()> {
        let fonts = std::mem::take(&mut self.tt_fonts);
        let objs = std::mem::take(&mut self.tt_font_objs);
        for (mut font, type0_id) in fonts.into_iter().zip(objs) {
            let file_id = self.alloc();
            let descriptor_id = self.alloc();
            let cid_id = self.alloc();
            let cmap_id = self.alloc();

            let program = PdfObject::stream(
                vec![("Length1", PdfObject::Integer(font.data.len() as i64))],
                std::mem::take(&mut font.data),
            );
            self.writer.write_object(file_id, &program)?;

            let [x0, y0, x1, y1] = font.bbox.map(|v| PdfObject::Integer(font.scale(v as i32)));
            let descriptor = PdfObject::dict(vec![
                ("Type", PdfObject::name("FontDescriptor")),
                ("FontName", PdfObject::name(&font.postscript_name)),
                ("Flags", PdfObject::Integer(font.flags as i64)),
                ("FontBBox", PdfObject::Array(vec![x0, y0, x1, y1])),
                ("ItalicAngle", PdfObject::Real(font.italic_angle)),
                ("Ascent", PdfObject::Integer(font.scale(font.ascent as i32))),
                ("Descent", PdfObject::Integer(font.scale(font.descent as i32))),
                ("CapHeight", PdfObject::Integer(font.scale(font.cap_height as i32))),
                ("StemV", PdfObject::Integer(font.stem_v as i64)),
                ("FontFile2", file_id.reference()),
            ]);
            self.writer.write_object(descriptor_id, &descriptor)?;

            let cid_font = PdfObject::dict(vec![
                ("Type", PdfObject::name("Font")),
                ("Subtype", PdfObject::name("CIDFontType2")),
                ("BaseFont", PdfObject::name(&font.postscript_name)),
                (
                    "CIDSystemInfo",
                    PdfObject::dict(vec![
                        ("Registry", PdfObject::text("Adobe")),
                        ("Ordering", PdfObject::text("Identity")),
                        ("Supplement", PdfObject::Integer(0)),
                    ]),
                ),
                ("FontDescriptor", descriptor_id.reference()),
                ("DW", PdfObject::Integer(font.default_width())),
                ("W", PdfObject::Array(font.widths_array())),
                ("CIDToGIDMap", PdfObject::name("Identity")),
            ]);
            self.writer.write_object(cid_id, &cid_font)?;

            self.writer
                .write_object(cmap_id, &PdfObject::stream(vec![], font.to_unicode_cmap()))?;

            let type0 = PdfObject::dict(vec![
                ("Type", PdfObject::name("Font")),
                ("Subtype", PdfObject::name("Type0")),
                ("BaseFont", PdfObject::name(&font.postscript_name)),
                ("Encoding", PdfObject::name("Identity-H")),
                ("DescendantFonts", PdfObject::Array(vec![cid_id.reference()])),
                ("ToUnicode", cmap_id.reference()),
            ]);
            self.writer.write_object(type0_id, &type0)?;
        }
        Ok(())
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Vec<(&'static str, PdfObject)> {
    vec![
        ("Type", PdfObject::name("XObject")),
        ("Subtype", PdfObject::name("Image")),
        ("Width", PdfObject::Integer(width as i64)),
        ("Height", PdfObject::Integer(height as i64)),
        ("ColorSpace", PdfObject::name(color_space)),
        ("BitsPerComponent", PdfObject::Integer(8)),
    ]
}
