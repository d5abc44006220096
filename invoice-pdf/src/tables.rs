use crate::fonts::line_height;
use crate::graphics::Color;
use crate::textflow::{text_block_ops, wrap_text, FitResult, Rect, TextAlign, TextStyle};
use crate::truetype::TrueTypeFont;
use crate::writer::format_number;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStyle {
    /// Fill behind the cell; overrides the row background.
    pub background: Option<Color>,
    pub text: TextStyle,
    /// Applied on all four sides, in points.
    pub padding: f64,
    pub align: TextAlign,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle {
            background: None,
            text: TextStyle::default(),
            padding: 4.0,
            align: TextAlign::Left,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub text: String,
    pub style: CellStyle,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Cell::styled(text, CellStyle::default())
    }

    pub fn styled(text: impl Into<String>, style: CellStyle) -> Self {
        Cell {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub background: Option<Color>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row {
            cells,
            background: None,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }
}

/// Column geometry and border style. Rows are supplied one at a time
/// through `PdfDocument::fit_row`; heights grow to fit wrapped text.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<f64>,
    pub border_color: Color,
    /// `0.0` disables borders.
    pub border_width: f64,
}

impl Table {
    pub fn new(columns: Vec<f64>) -> Self {
        Table {
            columns,
            border_color: Color::gray(0.8),
            border_width: 0.5,
        }
    }

    pub fn width(&self) -> f64 {
        self.columns.iter().sum()
    }

    /// Height a row needs: the tallest wrapped cell plus padding.
    pub fn row_height(&self, row: &Row, tt_fonts: &[TrueTypeFont]) -> f64 {
        self.columns
            .iter()
            .zip(&row.cells)
            .map(|(&width, cell)| {
                let lines = wrap_text(&cell.text, cell_inner_width(cell, width), &cell.style.text, tt_fonts);
                lines.len() as f64 * line_height(cell.style.text.size) + 2.0 * cell.style.padding
            })
            .fold(0.0_f64, f64::max)
    }

    pub(crate) fn generate_row_ops(
        &self,
        row: &Row,
        cursor: &mut TableCursor,
        tt_fonts: &mut [TrueTypeFont],
    ) -> (Vec<u8>, FitResult) {
        let height = self.row_height(row, tt_fonts);
        if cursor.current_y - height < cursor.rect.bottom() {
            let result = if cursor.first_row {
                FitResult::BoxEmpty
            } else {
                FitResult::BoxFull
            };
            return (Vec::new(), result);
        }

        let top = cursor.current_y;
        let bottom = top - height;
        let mut out = Vec::new();

        if let Some(bg) = row.background {
            push_fill(&mut out, bg, cursor.rect.x, bottom, self.width(), height);
        }
        let mut x = cursor.rect.x;
        for (&width, cell) in self.columns.iter().zip(&row.cells) {
            if let Some(bg) = cell.style.background {
                push_fill(&mut out, bg, x, bottom, width, height);
            }
            x += width;
        }

        let mut x = cursor.rect.x;
        for (&width, cell) in self.columns.iter().zip(&row.cells) {
            let inner = cell_inner_width(cell, width);
            let lines = wrap_text(&cell.text, inner, &cell.style.text, tt_fonts);
            out.extend_from_slice(&text_block_ops(
                &lines,
                x + cell.style.padding,
                top - cell.style.padding,
                inner,
                &cell.style.text,
                cell.style.align,
                tt_fonts,
            ));
            x += width;
        }

        if self.border_width > 0.0 {
            self.push_borders(&mut out, cursor.rect.x, top, height);
        }

        cursor.current_y = bottom;
        cursor.first_row = false;
        (out, FitResult::Stop)
    }

    fn push_borders(&self, out: &mut Vec<u8>, x: f64, top: f64, height: f64) {
        let bottom = top - height;
        out.extend_from_slice(b"q\n");
        out.extend_from_slice(self.border_color.stroke_op().as_bytes());
        out.extend_from_slice(format!("{} w\n", format_number(self.border_width)).as_bytes());
        out.extend_from_slice(
            format!(
                "{} {} {} {} re\nS\n",
                format_number(x),
                format_number(bottom),
                format_number(self.width()),
                format_number(height)
            )
            .as_bytes(),
        );
        let mut divider = x;
        for width in &self.columns[..self.columns.len().saturating_sub(1)] {
            divider += width;
            out.extend_from_slice(
                format!(
                    "{x} {top} m\n{x} {bottom} l\nS\n",
                    x = format_number(divider),
                    top = format_number(top),
                    bottom = format_number(bottom)
                )
                .as_bytes(),
            );
        }
        out.extend_from_slice(b"Q\n");
    }
}

fn cell_inner_width(cell: &Cell, column: f64) -> f64 {
    (column - 2.0 * cell.style.padding).max(1.0)
}

fn push_fill(out: &mut Vec<u8>, color: Color, x: f64, y: f64, w: f64, h: f64) {
    out.extend_from_slice(color.fill_op().as_bytes());
    out.extend_from_slice(
        format!(
            "{} {} {} {} re\nf\n",
            format_number(x),
            format_number(y),
            format_number(w),
            format_number(h)
        )
        .as_bytes(),
    );
}

/// Placement state for one table area. `reset` it with the next page's
/// rect when a row comes back `BoxFull`; `is_first_row` then tells the
/// caller to repeat the header.
#[derive(Debug, Clone)]
pub struct TableCursor {
    pub(crate) rect: Rect,
    pub(crate) current_y: f64,
    pub(crate) first_row: bool,
}

impl TableCursor {
    pub fn new(rect: &Rect) -> Self {
        TableCursor {
            rect: *rect,
            current_y: rect.y,
            first_row: true,
        }
    }

    pub fn reset(&mut self, rect: &Rect) {
        *self = TableCursor::new(rect);
    }

    pub fn is_first_row(&self) -> bool {
        self.first_row
    }

    /// Bottom edge of the last placed row.
    pub fn current_y(&self) -> f64 {
        self.current_y
    }
}
