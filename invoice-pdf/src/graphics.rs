use crate::writer::format_number;

/// RGB fill or stroke color, components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color { r, g, b }
    }

    /// From 0–255 channel values, as design palettes are usually given.
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Color {
            r: round3(r as f64 / 255.0),
            g: round3(g as f64 / 255.0),
            b: round3(b as f64 / 255.0),
        }
    }

    pub fn gray(level: f64) -> Self {
        Color::rgb(level, level, level)
    }

    /// `r g b rg` (non-stroking) operator.
    pub(crate) fn fill_op(&self) -> String {
        format!("{} rg\n", self.components())
    }

    /// `r g b RG` (stroking) operator.
    pub(crate) fn stroke_op(&self) -> String {
        format!("{} RG\n", self.components())
    }

    fn components(&self) -> String {
        format!(
            "{} {} {}",
            format_number(self.r),
            format_number(self.g),
            format_number(self.b)
        )
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
