//! Raster surface: tiny-skia pixmap + cosmic-text glyphs.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Fills, rounded rects | `tiny_skia::Pixmap::fill_rect` / `fill_path` |
//! | Vignette | `tiny_skia::RadialGradient` with an elliptical transform |
//! | Image compositing | `tiny_skia::Pixmap::draw_pixmap` (bilinear) |
//! | Shaping + measuring | `cosmic_text::Buffer` layout runs |
//! | Glyph rasterization | `cosmic_text::SwashCache`, blended source-over by hand |
//! | PNG encode | `tiny_skia::Pixmap::encode_png` |
//!
//! DejaVu Serif (regular and italic) is compiled in and loaded into every
//! surface, so text always paints even on a machine with no fonts installed.
//! A configured family the font database does not know resolves to it.

use super::params::{Align, Face, Rect, Rgba, TextStyle, Vignette};
use super::surface::{RenderError, Surface, TextMeasure};
use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, SwashCache};
use image::RgbaImage;
use std::path::Path;
use tiny_skia::{
    Color, FillRule, FilterQuality, GradientStop, IntSize, Paint, PathBuilder, Pixmap,
    PixmapPaint, Point, RadialGradient, SpreadMode, Transform,
};

/// Font family names for each [`Face`] role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFamilies {
    pub serif: String,
    pub sans: String,
}

impl Default for FontFamilies {
    fn default() -> Self {
        Self {
            serif: "Playfair Display".to_string(),
            sans: "Inter".to_string(),
        }
    }
}

/// Family name of the compiled-in fallback faces.
pub const BUNDLED_FAMILY: &str = "DejaVu Serif";

const BUNDLED_FONTS: [&[u8]; 2] = [
    include_bytes!("fonts/DejaVuSerif.ttf"),
    include_bytes!("fonts/DejaVuSerif-Italic.ttf"),
];

/// Pixel surface reused across renders.
pub struct RasterSurface {
    pixmap: Pixmap,
    fonts: FontSystem,
    glyphs: SwashCache,
    /// As configured.
    families: FontFamilies,
    /// As used for shaping: configured names the database knows, else
    /// [`BUNDLED_FAMILY`].
    active: FontFamilies,
}

impl RasterSurface {
    /// Allocate a surface with system fonts plus the bundled fallback.
    pub fn new(width: u32, height: u32, families: FontFamilies) -> Result<Self, RenderError> {
        Self::with_font_system(width, height, families, FontSystem::new())
    }

    pub fn with_font_system(
        width: u32,
        height: u32,
        families: FontFamilies,
        mut fonts: FontSystem,
    ) -> Result<Self, RenderError> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;
        for data in BUNDLED_FONTS {
            fonts.db_mut().load_font_data(data.to_vec());
        }
        let mut surface = Self {
            pixmap,
            fonts,
            glyphs: SwashCache::new(),
            active: families.clone(),
            families,
        };
        surface.resolve_families();
        Ok(surface)
    }

    /// Add a font file to the font database. Returns `false` when the file
    /// cannot be read; the configured family then falls back.
    pub fn load_font_file(&mut self, path: &Path) -> bool {
        match self.fonts.db_mut().load_font_file(path) {
            Ok(()) => {
                self.resolve_families();
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "font load failed");
                false
            }
        }
    }

    /// Families text is actually shaped with.
    pub fn active_families(&self) -> &FontFamilies {
        &self.active
    }

    fn resolve_families(&mut self) {
        let resolve = |name: &str| {
            let known = self
                .fonts
                .db()
                .faces()
                .any(|face| face.families.iter().any(|(family, _)| family == name));
            if known {
                name.to_string()
            } else {
                tracing::debug!(family = name, fallback = BUNDLED_FAMILY, "font family not found");
                BUNDLED_FAMILY.to_string()
            }
        };
        self.active = FontFamilies {
            serif: resolve(&self.families.serif),
            sans: resolve(&self.families.sans),
        };
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        self.pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }

    /// Straight RGBA at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Shape `text` on a single unbounded line. `None` when there is
    /// nothing to shape.
    fn shape(&mut self, style: &TextStyle, text: &str) -> Option<Buffer> {
        if style.size <= 0.0 || text.is_empty() {
            return None;
        }
        let attrs = face_attrs(&self.active, style.face);
        let metrics = Metrics::new(style.size, style.size * 1.2);
        let mut buffer = Buffer::new(&mut self.fonts, metrics);
        buffer.set_size(&mut self.fonts, None, None);
        buffer.set_text(&mut self.fonts, text, attrs, Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.fonts, false);
        Some(buffer)
    }
}

fn face_attrs(families: &FontFamilies, face: Face) -> Attrs<'_> {
    match face {
        Face::Serif => Attrs::new().family(Family::Name(&families.serif)),
        Face::SerifItalic => Attrs::new()
            .family(Family::Name(&families.serif))
            .style(Style::Italic),
        Face::Sans => Attrs::new().family(Family::Name(&families.sans)),
    }
}

fn skia_color(c: Rgba) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, (c.a.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn solid(c: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(c));
    paint.anti_alias = true;
    paint
}

fn skia_rect(r: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(r.x, r.y, r.width, r.height)
}

/// Rounded rectangle path; the radius is clamped to half the shorter side.
fn rounded_rect_path(r: Rect, radius: f32) -> Option<tiny_skia::Path> {
    let rr = radius.min(r.width / 2.0).min(r.height / 2.0).max(0.0);
    // Cubic approximation of a quarter circle.
    let k = rr * 0.552_284_8;
    let (x, y, w, h) = (r.x, r.y, r.width, r.height);
    let mut pb = PathBuilder::new();
    pb.move_to(x + rr, y);
    pb.line_to(x + w - rr, y);
    pb.cubic_to(x + w - rr + k, y, x + w, y + rr - k, x + w, y + rr);
    pb.line_to(x + w, y + h - rr);
    pb.cubic_to(x + w, y + h - rr + k, x + w - rr + k, y + h, x + w - rr, y + h);
    pb.line_to(x + rr, y + h);
    pb.cubic_to(x + rr - k, y + h, x, y + h - rr + k, x, y + h - rr);
    pb.line_to(x, y + rr);
    pb.cubic_to(x, y + rr - k, x + rr - k, y, x + rr, y);
    pb.close();
    pb.finish()
}

/// Convert straight RGBA into a premultiplied pixmap.
fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut data = image.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    let size = IntSize::from_wh(image.width(), image.height())?;
    Pixmap::from_vec(data, size)
}

/// Source-over blend of a straight color into premultiplied RGBA bytes.
fn blend_into(dst: &mut [u8], color: [u8; 3], alpha: f32) {
    let sa = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - sa;
    for i in 0..3 {
        dst[i] = (color[i] as f32 * sa + dst[i] as f32 * inv).round() as u8;
    }
    dst[3] = (255.0 * sa + dst[3] as f32 * inv).round() as u8;
}

impl TextMeasure for RasterSurface {
    fn measure(&mut self, style: &TextStyle, text: &str) -> f32 {
        self.shape(style, text)
            .map(|buffer| {
                buffer
                    .layout_runs()
                    .map(|run| run.line_w)
                    .fold(0.0_f32, f32::max)
            })
            .unwrap_or(0.0)
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn clear(&mut self, color: Rgba) {
        self.pixmap.fill(skia_color(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        if let Some(r) = skia_rect(rect) {
            self.pixmap
                .fill_rect(r, &solid(color), Transform::identity(), None);
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect, opacity: f32) {
        let Some(src) = to_pixmap(image) else {
            return;
        };
        let sx = dest.width / image.width() as f32;
        let sy = dest.height / image.height() as f32;
        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0),
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            src.as_ref(),
            &paint,
            Transform::from_row(sx, 0.0, 0.0, sy, dest.x, dest.y),
            None,
        );
    }

    fn fill_vignette(&mut self, vignette: &Vignette) {
        let (w, h) = (self.pixmap.width() as f32, self.pixmap.height() as f32);
        let radius = w.max(h) * vignette.radius_factor;
        let stops = vignette
            .stops
            .iter()
            .map(|(pos, c)| GradientStop::new(*pos, skia_color(*c)))
            .collect();
        let transform = Transform::from_row(
            vignette.scale.0,
            0.0,
            0.0,
            vignette.scale.1,
            w * vignette.center.0,
            h * vignette.center.1,
        );
        let Some(shader) = RadialGradient::new(
            Point::from_xy(0.0, 0.0),
            Point::from_xy(0.0, 0.0),
            radius,
            stops,
            SpreadMode::Pad,
            transform,
        ) else {
            return;
        };
        let paint = Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        };
        if let Some(r) = tiny_skia::Rect::from_xywh(0.0, 0.0, w, h) {
            self.pixmap
                .fill_rect(r, &paint, Transform::identity(), None);
        }
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Rgba) {
        if let Some(path) = rounded_rect_path(rect, radius) {
            self.pixmap.fill_path(
                &path,
                &solid(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
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
        let Some(buffer) = self.shape(style, text) else {
            return;
        };
        let width = buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0_f32, f32::max);
        let left = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        let (ox, oy) = (left.round() as i32, top.round() as i32);
        let (pw, ph) = (self.pixmap.width() as i32, self.pixmap.height() as i32);
        let rgb = [color.r, color.g, color.b];
        let opacity = color.a.clamp(0.0, 1.0);
        let text_color = cosmic_text::Color::rgba(color.r, color.g, color.b, 255);

        let data = self.pixmap.data_mut();
        buffer.draw(
            &mut self.fonts,
            &mut self.glyphs,
            text_color,
            |gx, gy, gw, gh, coverage| {
                let alpha = coverage.a() as f32 / 255.0 * opacity;
                if alpha <= 0.0 {
                    return;
                }
                for dy in 0..gh as i32 {
                    for dx in 0..gw as i32 {
                        let (px, py) = (ox + gx + dx, oy + gy + dy);
                        if px < 0 || py < 0 || px >= pw || py >= ph {
                            continue;
                        }
                        let idx = ((py * pw + px) * 4) as usize;
                        blend_into(&mut data[idx..idx + 4], rgb, alpha);
                    }
                }
            },
        );
    }
}
