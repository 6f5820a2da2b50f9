//! Drawing surface trait.
//!
//! The card renderer never touches pixels directly. It issues draw calls
//! against a [`Surface`], so layout decisions (wrapping, auto-fit, placement)
//! can be tested against a recording surface while the production
//! [`RasterSurface`](super::raster::RasterSurface) turns the same calls into
//! pixels.

use super::params::{Align, Rect, Rgba, TextStyle, Vignette};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} surface")]
    InvalidSize { width: u32, height: u32 },
    #[error("PNG encode failed: {0}")]
    Encode(String),
}

/// Text measurement, split out so pure layout code can depend on it alone.
pub trait TextMeasure {
    /// Advance width in pixels of `text` set on a single line in `style`.
    fn measure(&mut self, style: &TextStyle, text: &str) -> f32;
}

/// Output sink for one card render.
///
/// Every operation is infallible: a surface that cannot honor a call (missing
/// glyphs, degenerate geometry) skips it rather than failing the render.
pub trait Surface: TextMeasure {
    /// Surface dimensions in pixels.
    fn size(&self) -> (u32, u32);

    /// Fill the whole surface, discarding previous contents.
    fn clear(&mut self, color: Rgba);

    fn fill_rect(&mut self, rect: Rect, color: Rgba);

    /// Draw `image` scaled into `dest`. `dest` may extend past the surface.
    fn draw_image(&mut self, image: &RgbaImage, dest: Rect, opacity: f32);

    fn fill_vignette(&mut self, vignette: &Vignette);

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Rgba);

    /// Draw one line of text whose top edge sits at `top`. `x` is the left
    /// edge, center, or right edge depending on `align`.
    fn fill_text(
        &mut self,
        style: &TextStyle,
        text: &str,
        x: f32,
        top: f32,
        align: Align,
        color: Rgba,
    );
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Fixed-advance measurer: every char is `size * ratio` wide.
    pub struct FixedAdvance {
        pub ratio: f32,
    }

    impl TextMeasure for FixedAdvance {
        fn measure(&mut self, style: &TextStyle, text: &str) -> f32 {
            text.chars().count() as f32 * style.size * self.ratio
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawOp {
        Clear(Rgba),
        FillRect(Rect, Rgba),
        DrawImage {
            width: u32,
            height: u32,
            dest: Rect,
            opacity: f32,
        },
        Vignette,
        RoundedRect(Rect, f32, Rgba),
        Text {
            style: TextStyle,
            text: String,
            x: f32,
            top: f32,
            align: Align,
            color: Rgba,
        },
    }

    /// Surface that records draw calls instead of rasterizing them.
    pub struct RecordingSurface {
        pub width: u32,
        pub height: u32,
        pub measure: FixedAdvance,
        pub ops: Vec<DrawOp>,
    }

    impl RecordingSurface {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                measure: FixedAdvance { ratio: 0.5 },
                ops: Vec::new(),
            }
        }

        pub fn texts(&self) -> Vec<&DrawOp> {
            self.ops
                .iter()
                .filter(|op| matches!(op, DrawOp::Text { .. }))
                .collect()
        }
    }

    impl TextMeasure for RecordingSurface {
        fn measure(&mut self, style: &TextStyle, text: &str) -> f32 {
            self.measure.measure(style, text)
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn clear(&mut self, color: Rgba) {
            self.ops.clear();
            self.ops.push(DrawOp::Clear(color));
        }

        fn fill_rect(&mut self, rect: Rect, color: Rgba) {
            self.ops.push(DrawOp::FillRect(rect, color));
        }

        fn draw_image(&mut self, image: &RgbaImage, dest: Rect, opacity: f32) {
            self.ops.push(DrawOp::DrawImage {
                width: image.width(),
                height: image.height(),
                dest,
                opacity,
            });
        }

        fn fill_vignette(&mut self, _vignette: &Vignette) {
            self.ops.push(DrawOp::Vignette);
        }

        fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Rgba) {
            self.ops.push(DrawOp::RoundedRect(rect, radius, color));
        }

        fn fill_text(
            &mut self,
            style: &TextStyle,
            text: &str,
            x: f32,
            top: f32,
            align: Align,
            color: Rgba,
        ) {
            self.ops.push(DrawOp::Text {
                style: *style,
                text: text.to_string(),
                x,
                top,
                align,
                color,
            });
        }
    }

    #[test]
    fn clear_resets_recording() {
        let mut s = RecordingSurface::new(10, 10);
        s.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba::rgb(0, 0, 0));
        s.clear(Rgba::rgb(1, 1, 1));
        assert_eq!(s.ops, vec![DrawOp::Clear(Rgba::rgb(1, 1, 1))]);
    }

    #[test]
    fn fixed_advance_scales_with_size() {
        use crate::card::params::Face;
        let mut m = FixedAdvance { ratio: 0.5 };
        assert_eq!(m.measure(&TextStyle::new(Face::Serif, 10.0), "abcd"), 20.0);
        assert_eq!(m.measure(&TextStyle::new(Face::Serif, 20.0), "abcd"), 40.0);
    }
}
