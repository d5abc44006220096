use crate::fonts::{line_height, BuiltinFont, FontRef};
use crate::graphics::Color;
use crate::truetype::TrueTypeFont;
use crate::writer::{escape_text, format_number};

/// Outcome of placing content into a bounded area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitResult {
    /// Everything was placed.
    Stop,
    /// The area filled up; more content remains for the next page.
    BoxFull,
    /// Not even the first line or row fits in the area.
    BoxEmpty,
}

/// Layout box. `(x, y)` is the top-left corner in PDF page coordinates
/// (origin bottom-left), so the box spans `y - height ..= y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.y - self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontRef,
    pub size: f64,
    pub color: Color,
}

impl TextStyle {
    pub fn new(font: impl Into<FontRef>, size: f64) -> Self {
        TextStyle {
            font: font.into(),
            size,
            color: Color::BLACK,
        }
    }

    pub fn with_color(self, color: Color) -> Self {
        TextStyle { color, ..self }
    }

    pub fn width_of(&self, text: &str, tt_fonts: &[TrueTypeFont]) -> f64 {
        self.font.measure(text, self.size, tt_fonts)
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle::new(BuiltinFont::Helvetica, 10.0)
    }
}

/// Left edge for a line of `line_width` aligned inside `[x, x + width]`.
pub(crate) fn aligned_x(align: TextAlign, x: f64, width: f64, line_width: f64) -> f64 {
    match align {
        TextAlign::Left => x,
        TextAlign::Center => x + (width - line_width) / 2.0,
        TextAlign::Right => x + width - line_width,
    }
}

/// Greedy word wrap. Newlines start new paragraphs; a word wider than
/// `width` on its own is split between characters.
pub fn wrap_text(text: &str, width: f64, style: &TextStyle, tt_fonts: &[TrueTypeFont]) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if style.width_of(&candidate, tt_fonts) <= width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if style.width_of(word, tt_fonts) <= width {
                current = word.to_string();
            } else {
                let mut pieces = break_word(word, width, style, tt_fonts);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        lines.push(current);
    }
    lines
}

/// Split a single word into pieces that each fit `width`. Every piece
/// holds at least one character so progress is guaranteed.
fn break_word(word: &str, width: f64, style: &TextStyle, tt_fonts: &[TrueTypeFont]) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for ch in word.chars() {
        piece.push(ch);
        if style.width_of(&piece, tt_fonts) > width && piece.chars().count() > 1 {
            piece.pop();
            pieces.push(std::mem::replace(&mut piece, ch.to_string()));
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Emit one `BT ... ET` block drawing `lines` from `top` downwards.
/// Standard fonts take WinAnsi literals, embedded faces hex glyph ids.
pub(crate) fn text_block_ops(
    lines: &[String],
    x: f64,
    top: f64,
    width: f64,
    style: &TextStyle,
    align: TextAlign,
    tt_fonts: &mut [TrueTypeFont],
) -> Vec<u8> {
    let mut out = Vec::new();
    if lines.iter().all(|l| l.is_empty()) {
        return out;
    }
    let lh = line_height(style.size);
    out.extend_from_slice(b"BT\n");
    out.extend_from_slice(style.color.fill_op().as_bytes());
    let resource = style.font.resource_name(tt_fonts);
    out.extend_from_slice(format!("/{} {} Tf\n", resource, format_number(style.size)).as_bytes());
    let mut baseline = top - style.size;
    for line in lines {
        if !line.is_empty() {
            let lx = aligned_x(align, x, width, style.width_of(line, tt_fonts));
            // Tm sets an absolute position so each line aligns on its own.
            out.extend_from_slice(
                format!("1 0 0 1 {} {} Tm\n", format_number(lx), format_number(baseline)).as_bytes(),
            );
            match style.font {
                FontRef::Builtin(_) => {
                    out.push(b'(');
                    out.extend_from_slice(&escape_text(line));
                    out.push(b')');
                }
                FontRef::TrueType(id) => out.extend_from_slice(tt_fonts[id.0].encode_hex(line).as_bytes()),
            }
            out.extend_from_slice(b" Tj\n");
        }
        baseline -= lh;
    }
    out.extend_from_slice(b"ET\n");
    out
}

/// Word-wrapped text that flows through one or more boxes, e.g. a long
/// notes section that continues on the next page.
#[derive(Debug, Clone)]
pub struct TextFlow {
    text: String,
    style: TextStyle,
    /// Wrapped on first use with the width of the first box.
    lines: Option<Vec<String>>,
    cursor: usize,
    last_height: f64,
}

impl TextFlow {
    pub fn new(text: &str, style: TextStyle) -> Self {
        TextFlow {
            text: text.to_string(),
            style,
            lines: None,
            cursor: 0,
            last_height: 0.0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.lines
            .as_ref()
            .is_some_and(|lines| self.cursor >= lines.len())
    }

    /// Height consumed by the most recent fit.
    pub fn last_height(&self) -> f64 {
        self.last_height
    }

    pub(crate) fn generate_ops(&mut self, rect: &Rect, tt_fonts: &mut [TrueTypeFont]) -> (Vec<u8>, FitResult) {
        let style = self.style;
        let lines = self
            .lines
            .get_or_insert_with(|| wrap_text(&self.text, rect.width, &style, tt_fonts));
        self.last_height = 0.0;
        if self.cursor >= lines.len() {
            return (Vec::new(), FitResult::Stop);
        }
        let lh = line_height(style.size);
        let capacity = (rect.height / lh).floor() as usize;
        if capacity == 0 {
            return (Vec::new(), FitResult::BoxEmpty);
        }
        let end = (self.cursor + capacity).min(lines.len());
        let ops = text_block_ops(
            &lines[self.cursor..end],
            rect.x,
            rect.y,
            rect.width,
            &style,
            TextAlign::Left,
            tt_fonts,
        );
        self.last_height = (end - self.cursor) as f64 * lh;
        self.cursor = end;
        let result = if end == lines.len() {
            FitResult::Stop
        } else {
            FitResult::BoxFull
        };
        (ops, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> TextStyle {
        TextStyle::default()
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap_text("Hello world", 200.0, &style(), &[]), vec!["Hello world"]);
    }

    #[test]
    fn wraps_at_width() {
        let lines = wrap_text("alpha beta gamma delta", 60.0, &style(), &[]);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(style().width_of(line, &[]) <= 60.0);
        }
        assert_eq!(lines.join(" "), "alpha beta gamma delta");
    }

    #[test]
    fn newline_starts_paragraph_and_blank_lines_survive() {
        let lines = wrap_text("one\n\ntwo", 200.0, &style(), &[]);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn long_word_is_broken() {
        let lines = wrap_text(&"W".repeat(40), 50.0, &style(), &[]);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "W".repeat(40));
    }

    #[test]
    fn aligned_positions() {
        assert_eq!(aligned_x(TextAlign::Left, 10.0, 100.0, 40.0), 10.0);
        assert_eq!(aligned_x(TextAlign::Center, 10.0, 100.0, 40.0), 40.0);
        assert_eq!(aligned_x(TextAlign::Right, 10.0, 100.0, 40.0), 70.0);
    }

    #[test]
    fn flow_continues_across_boxes() {
        let text = (0..30).map(|i| format!("line{}", i)).collect::<Vec<_>>().join("\n");
        let mut flow = TextFlow::new(&text, style());
        let rect = Rect { x: 0.0, y: 100.0, width: 300.0, height: 60.0 };
        let (_, first) = flow.generate_ops(&rect, &mut []);
        assert_eq!(first, FitResult::BoxFull);
        assert!((flow.last_height() - 60.0).abs() < 1e-9);
        let big = Rect { height: 1000.0, ..rect };
        let (ops, second) = flow.generate_ops(&big, &mut []);
        assert_eq!(second, FitResult::Stop);
        assert!(flow.is_finished());
        assert!(String::from_utf8_lossy(&ops).contains("(line29) Tj"));
    }

    #[test]
    fn flow_reports_box_empty() {
        let mut flow = TextFlow::new("text", style());
        let rect = Rect { x: 0.0, y: 100.0, width: 300.0, height: 5.0 };
        assert_eq!(flow.generate_ops(&rect, &mut []).1, FitResult::BoxEmpty);
        assert!(!flow.is_finished());
    }
}
