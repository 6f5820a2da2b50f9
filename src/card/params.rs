//! Parameter types for drawing operations.
//!
//! These describe *what* to draw, not *how*. The [`Surface`](super::surface::Surface)
//! implementation decides how a [`TextStyle`] maps onto real fonts and how an
//! [`Rgba`] is composited.

/// A straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `0.0..=1.0`.
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with opacity multiplied by `alpha`.
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (self.a * alpha).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Parse `#rgb` or `#rrggbb`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                Some(Self::rgb(digit(0)?, digit(1)?, digit(2)?))
            }
            6 => {
                let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?))
            }
            _ => None,
        }
    }

    /// Parse a color already checked by config validation, falling back to
    /// `fallback` so rendering never fails on a bad value.
    pub fn parse_or(s: &str, fallback: Rgba) -> Self {
        Self::parse_hex(s).unwrap_or(fallback)
    }
}

/// Font face roles used on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Serif,
    SerifItalic,
    Sans,
}

/// A font request: role + pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: Face,
    pub size: f32,
}

impl TextStyle {
    pub fn new(face: Face, size: f32) -> Self {
        Self { face, size }
    }
}

/// Horizontal anchoring of a text run relative to its `x` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// An axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Vignette gradient: an elliptical radial ramp centered at a fraction of
/// the surface, darkening outward.
#[derive(Debug, Clone, PartialEq)]
pub struct Vignette {
    /// Center as fractions of surface width/height.
    pub center: (f32, f32),
    /// Ellipse scale applied to the circular gradient.
    pub scale: (f32, f32),
    /// Radius as a multiple of the longer surface edge.
    pub radius_factor: f32,
    /// `(offset, color)` stops, offsets in `0.0..=1.0`.
    pub stops: Vec<(f32, Rgba)>,
}

impl Default for Vignette {
    fn default() -> Self {
        Self {
            center: (0.50, 0.42),
            scale: (0.70, 1.05),
            radius_factor: 2.6,
            stops: vec![
                (0.00, Rgba::rgba(20, 13, 14, 0.38)),
                (0.45, Rgba::rgba(20, 13, 14, 0.64)),
                (1.00, Rgba::rgba(20, 13, 14, 0.90)),
            ],
        }
    }
}

/// Soft drop shadow approximated by stacked translucent offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba,
    pub offset_y: f32,
    pub spread: f32,
    pub layers: u32,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            color: Rgba::rgba(0, 0, 0, 0.06),
            offset_y: 18.0,
            spread: 24.0,
            layers: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_long_hex() {
        assert_eq!(Rgba::parse_hex("#0f1212"), Some(Rgba::rgb(15, 18, 18)));
        assert_eq!(Rgba::parse_hex("#FFFFFF"), Some(Rgba::rgb(255, 255, 255)));
    }

    #[test]
    fn parse_short_hex_expands_digits() {
        assert_eq!(Rgba::parse_hex("#f0a"), Some(Rgba::rgb(255, 0, 170)));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(Rgba::parse_hex("0f1212"), None);
        assert_eq!(Rgba::parse_hex("#12345"), None);
        assert_eq!(Rgba::parse_hex("#zzzzzz"), None);
        assert_eq!(Rgba::parse_hex("#ééé"), None);
    }

    #[test]
    fn with_alpha_multiplies_and_clamps() {
        let c = Rgba::rgba(1, 2, 3, 0.5).with_alpha(0.5);
        assert_eq!(c.a, 0.25);
        assert_eq!(Rgba::rgb(0, 0, 0).with_alpha(4.0).a, 1.0);
    }

    #[test]
    fn rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.bottom(), 70.0);
        assert_eq!(r.center_x(), 60.0);
    }
}
