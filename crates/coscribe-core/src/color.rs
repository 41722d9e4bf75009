//! RGBA8 annotation color.

use peniko::Color as PenikoColor;
use serde::{Deserialize, Serialize};

/// Annotation color (RGBA8, `a` is opacity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Default pen blue, matching a classic journal pen.
    pub fn pen_blue() -> Self {
        Self::new(0, 0, 128, 255)
    }

    /// Channels normalized to 0.0..=1.0, as drawing backends expect.
    pub fn to_normalized(self) -> (f64, f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
            self.a as f64 / 255.0,
        )
    }
}

impl From<PenikoColor> for Color {
    fn from(color: PenikoColor) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<Color> for PenikoColor {
    fn from(color: Color) -> Self {
        PenikoColor::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peniko_roundtrip() {
        let color = Color::new(12, 34, 56, 78);
        let back: Color = PenikoColor::from(color).into();
        assert_eq!(color, back);
    }

    #[test]
    fn test_normalized() {
        let (r, g, b, a) = Color::new(255, 0, 0, 255).to_normalized();
        assert!((r - 1.0).abs() < f64::EPSILON);
        assert!(g.abs() < f64::EPSILON);
        assert!(b.abs() < f64::EPSILON);
        assert!((a - 1.0).abs() < f64::EPSILON);
    }
}
