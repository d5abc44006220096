use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::objects::PdfObject;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("font could not be parsed: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),
    #[error("font has no Unicode cmap")]
    NoUnicodeCmap,
}

/// An embedded TrueType face. Text drawn with it is written as 2-byte
/// glyph ids (Identity-H), so any character the face covers prints.
pub struct TrueTypeFont {
    pub(crate) postscript_name: String,
    pub(crate) data: Vec<u8>,
    units_per_em: u16,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) bbox: [i16; 4],
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: f64,
    pub(crate) flags: u32,
    pub(crate) stem_v: i16,
    /// Unicode scalar to glyph id.
    cmap: BTreeMap<u32, u16>,
    /// Advance widths indexed by glyph id, in font units.
    advances: Vec<u16>,
    /// First code point seen for each glyph, for the ToUnicode map.
    unicode_of: BTreeMap<u16, u32>,
    used: BTreeSet<u16>,
    pub(crate) resource_name: String,
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("postscript_name", &self.postscript_name)
            .field("resource_name", &self.resource_name)
            .field("glyphs", &self.advances.len())
            .finish()
    }
}

impl TrueTypeFont {
    /// Parse `.ttf` bytes. `resource_name` is the `/Font` resource key
    /// the face is drawn with, e.g. `F4`.
    pub fn from_bytes(data: Vec<u8>, resource_name: String) -> Result<Self, FontError> {
        let face = ttf_parser::Face::parse(&data, 0)?;

        let mut cmap = BTreeMap::new();
        let mut unicode_of = BTreeMap::new();
        let subtables = face.tables().cmap.ok_or(FontError::NoUnicodeCmap)?.subtables;
        for subtable in subtables.into_iter().filter(|s| s.is_unicode()) {
            subtable.codepoints(|cp| {
                if let Some(gid) = subtable.glyph_index(cp) {
                    cmap.entry(cp).or_insert(gid.0);
                    unicode_of.entry(gid.0).or_insert(cp);
                }
            });
        }
        if cmap.is_empty() {
            return Err(FontError::NoUnicodeCmap);
        }

        let advances = (0..face.number_of_glyphs())
            .map(|gid| face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0))
            .collect();

        let family = name_entry(&face, ttf_parser::name_id::FAMILY).unwrap_or_else(|| "Embedded".to_string());
        let postscript_name =
            name_entry(&face, ttf_parser::name_id::POST_SCRIPT_NAME).unwrap_or_else(|| family.replace(' ', ""));

        let bbox = face.global_bounding_box();
        let ascent = face.ascender();
        Ok(TrueTypeFont {
            postscript_name,
            units_per_em: face.units_per_em(),
            ascent,
            descent: face.descender(),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            cap_height: face.capital_height().unwrap_or(ascent),
            italic_angle: face.italic_angle() as f64,
            flags: descriptor_flags(&face),
            stem_v: stem_v(face.weight().to_number()),
            cmap,
            advances,
            unicode_of,
            used: BTreeSet::new(),
            resource_name,
            data,
        })
    }

    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    /// True when every printable character of `text` has a glyph.
    pub fn covers(&self, text: &str) -> bool {
        text.chars()
            .filter(|c| !c.is_control())
            .all(|c| self.cmap.contains_key(&(c as u32)))
    }

    fn gid(&self, ch: char) -> u16 {
        self.cmap.get(&(ch as u32)).copied().unwrap_or(0)
    }

    /// Font units scaled to 1/1000 em.
    pub(crate) fn scale(&self, value: i32) -> i64 {
        value as i64 * 1000 / self.units_per_em as i64
    }

    fn glyph_width(&self, gid: u16) -> i64 {
        let raw = self.advances.get(gid as usize).copied().unwrap_or(0);
        self.scale(raw as i32)
    }

    /// Width of `text` in points at `size`. Missing characters measure
    /// as `.notdef`.
    pub fn measure(&self, text: &str, size: f64) -> f64 {
        let units: i64 = text.chars().map(|c| self.glyph_width(self.gid(c))).sum();
        units as f64 * size / 1000.0
    }

    /// `<0041004F>` glyph string for `Tj`. Records the glyphs so the
    /// width and ToUnicode tables cover them.
    pub(crate) fn encode_hex(&mut self, text: &str) -> String {
        let mut hex = String::with_capacity(text.len() * 4 + 2);
        hex.push('<');
        for ch in text.chars() {
            let gid = self.gid(ch);
            self.used.insert(gid);
            hex.push_str(&format!("{:04X}", gid));
        }
        hex.push('>');
        hex
    }

    pub(crate) fn default_width(&self) -> i64 {
        self.glyph_width(0)
    }

    /// `/W` entries for the glyphs drawn so far, one `start [w ...]`
    /// pair per run of consecutive ids.
    pub(crate) fn widths_array(&self) -> Vec<PdfObject> {
        let mut out = Vec::new();
        let mut run: Option<(u16, Vec<PdfObject>)> = None;
        let mut previous = None;
        for &gid in &self.used {
            let consecutive = previous.is_some_and(|p: u16| p.checked_add(1) == Some(gid));
            if !consecutive {
                if let Some((start, widths)) = run.take() {
                    out.push(PdfObject::Integer(start as i64));
                    out.push(PdfObject::Array(widths));
                }
                run = Some((gid, Vec::new()));
            }
            if let Some((_, widths)) = run.as_mut() {
                widths.push(PdfObject::Integer(self.glyph_width(gid)));
            }
            previous = Some(gid);
        }
        if let Some((start, widths)) = run {
            out.push(PdfObject::Integer(start as i64));
            out.push(PdfObject::Array(widths));
        }
        out
    }

    /// ToUnicode CMap so copied text comes back as the original characters.
    pub(crate) fn to_unicode_cmap(&self) -> Vec<u8> {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        let pairs: Vec<(u16, u32)> = self
            .used
            .iter()
            .filter_map(|gid| self.unicode_of.get(gid).map(|&cp| (*gid, cp)))
            .collect();
        // At most 100 entries per bfchar block.
        for chunk in pairs.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &(gid, cp) in chunk {
                cmap.push_str(&format!("<{:04X}> <{}>\n", gid, utf16_hex(cp)));
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap.into_bytes()
    }
}

fn utf16_hex(cp: u32) -> String {
    char::from_u32(cp)
        .map(|c| {
            let mut buf = [0u16; 2];
            c.encode_utf16(&mut buf).iter().map(|u| format!("{:04X}", u)).collect()
        })
        .unwrap_or_else(|| "FFFD".to_string())
}

fn name_entry(face: &ttf_parser::Face, id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .find(|name| name.name_id == id && name.is_unicode())
        .and_then(|name| name.to_string())
}

/// FontDescriptor `/Flags`: FixedPitch (1), Nonsymbolic (32), Italic (64).
fn descriptor_flags(face: &ttf_parser::Face) -> u32 {
    let mut flags = 32;
    if face.is_monospaced() {
        flags |= 1;
    }
    if face.is_italic() {
        flags |= 64;
    }
    flags
}

/// Approximate `/StemV` from the OS/2 weight class.
fn stem_v(weight: u16) -> i16 {
    let w = weight as f64 / 1000.0;
    (10.0 + 220.0 * w * w) as i16
}
