//! High-level card rendering.
//!
//! Combines layout calculations with surface calls. Given the same style,
//! assets and quote, [`render_card`] issues the same draw calls every time.

use super::assets::CardAssets;
use super::calculations::{CardGeometry, CardLayout, FitBounds, FittedText, cover_fit, fit_text};
use super::params::{Align, Face, Rect, Rgba, Shadow, TextStyle, Vignette};
use super::raster::{FontFamilies, RasterSurface};
use super::surface::{RenderError, Surface};
use crate::config::AppConfig;

/// Everything about a card that does not change between quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct CardStyle {
    pub width: u32,
    pub height: u32,
    pub geometry: CardGeometry,
    pub fit: FitBounds,
    pub vignette: Vignette,
    pub shadow: Shadow,
    pub base: Rgba,
    pub fallback_background: Rgba,
    pub panel: Rgba,
    pub kicker: Rgba,
    pub quote: Rgba,
    pub footer_color: Rgba,
    pub footer: String,
}

impl CardStyle {
    pub fn from_config(config: &AppConfig) -> Self {
        let card = &config.card;
        let defaults = CardStyle::default();
        Self {
            width: card.width,
            height: card.height,
            geometry: CardGeometry {
                margin: card.margin as f32,
                radius: card.radius as f32,
                ..CardGeometry::default()
            },
            fit: FitBounds {
                min_size: config.text.min_size,
                max_size: config.text.max_size,
                line_height: config.text.line_height,
            },
            base: Rgba::parse_or(&card.base_color, defaults.base),
            fallback_background: Rgba::parse_or(
                &card.fallback_background,
                defaults.fallback_background,
            ),
            panel: Rgba::parse_or(&card.panel_color, defaults.panel),
            kicker: Rgba::parse_or(&card.kicker_color, defaults.kicker),
            quote: Rgba::parse_or(&card.quote_color, defaults.quote),
            footer_color: Rgba::parse_or(&card.footer_color, defaults.footer_color),
            footer: config.site.footer.clone(),
            ..defaults
        }
    }
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1350,
            geometry: CardGeometry::default(),
            fit: FitBounds {
                min_size: 28,
                max_size: 64,
                line_height: 1.23,
            },
            vignette: Vignette::default(),
            shadow: Shadow::default(),
            base: Rgba::rgb(0x0f, 0x12, 0x12),
            fallback_background: Rgba::rgb(0x11, 0x13, 0x15),
            panel: Rgba::rgb(0xff, 0xff, 0xff),
            kicker: Rgba::rgb(0x20, 0x1a, 0x15),
            quote: Rgba::rgb(0x14, 0x15, 0x16),
            footer_color: Rgba::rgb(0, 0, 0),
            footer: "marketeraffirmations.com".to_string(),
        }
    }
}

/// Paint one card onto `surface` and return the fitted quote block.
///
/// Never fails: missing assets fall back to flat fills, and an overlong quote
/// is truncated rather than overflowing the panel.
pub fn render_card(
    surface: &mut dyn Surface,
    style: &CardStyle,
    assets: &CardAssets,
    area_label: &str,
    text: &str,
) -> FittedText {
    let size = surface.size();
    let geometry = &style.geometry;
    let layout = CardLayout::compute(size, geometry);

    surface.clear(style.base);
    match &assets.background {
        Some(bg) => surface.draw_image(bg, cover_fit(bg.dimensions(), size), 1.0),
        None => surface.fill_rect(
            Rect::new(0.0, 0.0, size.0 as f32, size.1 as f32),
            style.fallback_background,
        ),
    }
    surface.fill_vignette(&style.vignette);

    draw_panel(surface, style, &layout);

    if let Some(sticker) = &assets.sticker {
        let dest = layout.sticker_rect(sticker.dimensions(), geometry);
        surface.draw_image(sticker, dest, geometry.sticker_opacity);
    }

    let panel_center = layout.panel.center_x();
    surface.fill_text(
        &TextStyle::new(Face::SerifItalic, geometry.kicker_size),
        &format!("Filed under: {area_label}"),
        panel_center,
        layout.kicker_top,
        Align::Center,
        style.kicker.with_alpha(geometry.kicker_opacity),
    );

    let fitted = fit_text(
        &mut *surface,
        Face::Serif,
        text,
        (layout.text_area.width, layout.text_area.height),
        style.fit,
    );
    let quote_style = TextStyle::new(Face::Serif, fitted.size as f32);
    let top = layout.block_top(fitted.block_height());
    for (i, line) in fitted.lines.iter().enumerate() {
        // Center each line inside its line box.
        let leading = (fitted.line_height - quote_style.size) / 2.0;
        surface.fill_text(
            &quote_style,
            line,
            panel_center,
            top + i as f32 * fitted.line_height + leading,
            Align::Center,
            style.quote,
        );
    }

    surface.fill_text(
        &TextStyle::new(Face::Sans, geometry.footer_size),
        &style.footer,
        panel_center,
        layout.footer_top,
        Align::Center,
        style.footer_color.with_alpha(geometry.footer_opacity),
    );

    fitted
}

/// Shadow layers first, widest and faintest at the back, then the panel.
fn draw_panel(surface: &mut dyn Surface, style: &CardStyle, layout: &CardLayout) {
    let shadow = &style.shadow;
    let radius = style.geometry.radius;
    for layer in (1..=shadow.layers).rev() {
        let t = layer as f32 / shadow.layers as f32;
        let grow = shadow.spread * t;
        let rect = Rect::new(
            layout.panel.x - grow / 2.0,
            layout.panel.y + shadow.offset_y * t - grow / 2.0,
            layout.panel.width + grow,
            layout.panel.height + grow,
        );
        surface.fill_rounded_rect(rect, radius + grow / 2.0, shadow.color);
    }
    surface.fill_rounded_rect(layout.panel, radius, style.panel);
}

/// Allocate a raster surface for `style`, loading `font_files` before the
/// first paint.
pub fn raster_surface(
    style: &CardStyle,
    families: FontFamilies,
    font_files: &[std::path::PathBuf],
) -> Result<RasterSurface, RenderError> {
    let mut surface = RasterSurface::new(style.width, style.height, families)?;
    let loaded = font_files
        .iter()
        .filter(|path| surface.load_font_file(path))
        .count();
    tracing::debug!(loaded, requested = font_files.len(), "fonts ready");
    Ok(surface)
}

/// Render a card and encode it as PNG bytes.
pub fn render_png(
    surface: &mut RasterSurface,
    style: &CardStyle,
    assets: &CardAssets,
    area_label: &str,
    text: &str,
) -> Result<Vec<u8>, RenderError> {
    let fitted = render_card(surface, style, assets, area_label, text);
    tracing::debug!(
        size = fitted.size,
        lines = fitted.lines.len(),
        truncated = fitted.truncated,
        "card rendered"
    );
    surface.encode_png()
}
