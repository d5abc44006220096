pub mod document;
pub mod fonts;
pub mod graphics;
pub mod images;
pub mod objects;
pub mod tables;
pub mod textflow;
pub mod truetype;
pub mod writer;

pub use document::PdfDocument;
pub use fonts::{BuiltinFont, FontId, FontRef};
pub use graphics::Color;
pub use images::{ImageError, ImageId};
pub use tables::{Cell, CellStyle, Row, Table, TableCursor};
pub use textflow::{wrap_text, FitResult, Rect, TextAlign, TextFlow, TextStyle};
pub use truetype::{FontError, TrueTypeFont};
pub use writer::is_win_ansi;
