use crate::truetype::TrueTypeFont;
use crate::writer::is_win_ansi;

/// Index of a TrueType face loaded into a `PdfDocument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub usize);

/// Either a standard font or an embedded TrueType face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontRef {
    Builtin(BuiltinFont),
    TrueType(FontId),
}

impl From<BuiltinFont> for FontRef {
    fn from(font: BuiltinFont) -> Self {
        FontRef::Builtin(font)
    }
}

impl FontRef {
    /// Width of `text` in points. `tt_fonts` is the document's face list
    /// that `FontRef::TrueType` ids index into.
    pub fn measure(&self, text: &str, size: f64, tt_fonts: &[TrueTypeFont]) -> f64 {
        match self {
            FontRef::Builtin(font) => font.measure(text, size),
            FontRef::TrueType(id) => tt_fonts[id.0].measure(text, size),
        }
    }

    /// Whether `text` prints without substitutions: WinAnsi for the
    /// standard fonts, cmap coverage for an embedded face.
    pub fn covers(&self, text: &str, tt_fonts: &[TrueTypeFont]) -> bool {
        match self {
            FontRef::Builtin(_) => is_win_ansi(text),
            FontRef::TrueType(id) => tt_fonts[id.0].covers(text),
        }
    }

    pub(crate) fn resource_name(&self, tt_fonts: &[TrueTypeFont]) -> String {
        match self {
            FontRef::Builtin(font) => font.pdf_name().to_string(),
            FontRef::TrueType(id) => tt_fonts[id.0].resource_name.clone(),
        }
    }
}

/// The standard Type1 fonts the invoice layout draws with. They are
/// available in every viewer, so nothing is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl BuiltinFont {
    pub const ALL: [BuiltinFont; 3] = [
        BuiltinFont::Helvetica,
        BuiltinFont::HelveticaBold,
        BuiltinFont::HelveticaOblique,
    ];

    /// Resource name used in content streams.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "F1",
            BuiltinFont::HelveticaBold => "F2",
            BuiltinFont::HelveticaOblique => "F3",
        }
    }

    /// `/BaseFont` value.
    pub fn base_name(&self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
            BuiltinFont::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    /// Advance width of `ch` in 1/1000 em.
    pub fn char_width(&self, ch: char) -> u16 {
        let table = match self {
            BuiltinFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
            // Oblique shares the upright metrics.
            BuiltinFont::Helvetica | BuiltinFont::HelveticaOblique => &HELVETICA_WIDTHS,
        };
        match ch as u32 {
            code @ 32..=126 => table[(code - 32) as usize],
            _ => NON_ASCII_WIDTH,
        }
    }

    /// Width of `text` in points at `size`.
    pub fn measure(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f64 * size / 1000.0
    }
}

/// Baseline-to-baseline distance for a font size.
pub fn line_height(size: f64) -> f64 {
    size * 1.2
}

/// Used for WinAnsi characters above ASCII (currency signs, accented
/// letters). Close to the average Helvetica glyph.
const NON_ASCII_WIDTH: u16 = 556;

// Adobe AFM advance widths for ASCII 32..=126, sixteen per row.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_tabular() {
        let w = BuiltinFont::Helvetica.measure("0123456789", 10.0);
        assert!((w - 55.6).abs() < 1e-9);
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let text = "Invoice total";
        assert!(
            BuiltinFont::HelveticaBold.measure(text, 12.0) > BuiltinFont::Helvetica.measure(text, 12.0)
        );
    }

    #[test]
    fn oblique_matches_regular_metrics() {
        assert_eq!(
            BuiltinFont::HelveticaOblique.measure("Notes", 9.0),
            BuiltinFont::Helvetica.measure("Notes", 9.0)
        );
    }

    #[test]
    fn resource_names_are_distinct() {
        let names: Vec<_> = BuiltinFont::ALL.iter().map(|f| f.pdf_name()).collect();
        assert_eq!(names, vec!["F1", "F2", "F3"]);
    }

    #[test]
    fn builtin_coverage_is_win_ansi() {
        let font = FontRef::from(BuiltinFont::Helvetica);
        assert!(font.covers("Café €5", &[]));
        assert!(!font.covers("Łukasz", &[]));
        assert_eq!(font.measure("10", 10.0, &[]), BuiltinFont::Helvetica.measure("10", 10.0));
    }
}
