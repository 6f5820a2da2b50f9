//! Pure layout math for the card.
//!
//! Nothing here draws. Functions take a [`TextMeasure`] where they need text
//! widths, so every rule (cover-fit, word wrap, auto-fit, vertical centering,
//! sticker anchoring) is unit-testable with a fixed-advance measurer.

use super::params::{Face, Rect, TextStyle};
use super::surface::TextMeasure;

const ELLIPSIS: &str = "…";

/// Destination rect that covers `target` with `source`, preserving aspect
/// ratio and centering the overflow.
///
/// Scale is `max(tw/sw, th/sh)`: no letterboxing, one axis may be cropped.
pub fn cover_fit(source: (u32, u32), target: (u32, u32)) -> Rect {
    let (sw, sh) = (source.0.max(1) as f32, source.1.max(1) as f32);
    let (tw, th) = (target.0 as f32, target.1 as f32);
    let scale = (tw / sw).max(th / sh);
    let (w, h) = (sw * scale, sh * scale);
    Rect::new((tw - w) / 2.0, (th - h) / 2.0, w, h)
}

/// Greedy word wrap.
///
/// Words accumulate into a line while the measured width stays within
/// `max_width`; the next word that would overflow starts a new line. A word
/// wider than `max_width` on its own still gets its own line.
pub fn wrap_words<M: TextMeasure + ?Sized>(
    measure: &mut M,
    style: &TextStyle,
    text: &str,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word}");
        if measure.measure(style, &candidate) <= max_width {
            line = candidate;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Result of auto-fitting a quote into a box.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedText {
    pub size: u32,
    pub line_height: f32,
    pub lines: Vec<String>,
    /// True when even the minimum size overflowed and lines were dropped.
    pub truncated: bool,
}

impl FittedText {
    pub fn block_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Font-size bounds and line spacing for [`fit_text`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBounds {
    pub min_size: u32,
    pub max_size: u32,
    /// Line height as a multiple of font size.
    pub line_height: f32,
}

/// Find the largest integer font size in `bounds` at which `text` wraps into
/// `area` without overflowing either axis.
///
/// Binary search assumes monotonicity: if size `s` fits, every smaller size
/// fits too. When nothing fits, the minimum size is used and the line list is
/// cut to what the height allows, ending in an ellipsis.
pub fn fit_text<M: TextMeasure + ?Sized>(
    measure: &mut M,
    face: Face,
    text: &str,
    area: (f32, f32),
    bounds: FitBounds,
) -> FittedText {
    let (max_width, max_height) = area;
    let mut lo = bounds.min_size;
    let mut hi = bounds.max_size.max(bounds.min_size);
    let mut best: Option<(u32, Vec<String>)> = None;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let style = TextStyle::new(face, mid as f32);
        let lines = wrap_words(measure, &style, text, max_width);
        let line_height = mid as f32 * bounds.line_height;
        let fits = lines.len() as f32 * line_height <= max_height
            && lines.iter().all(|l| measure.measure(&style, l) <= max_width);

        if fits {
            best = Some((mid, lines));
            lo = mid + 1;
        } else if mid == 0 {
            break;
        } else {
            hi = mid - 1;
        }
    }

    if let Some((size, lines)) = best {
        return FittedText {
            size,
            line_height: size as f32 * bounds.line_height,
            lines,
            truncated: false,
        };
    }

    let size = bounds.min_size;
    let style = TextStyle::new(face, size as f32);
    let line_height = size as f32 * bounds.line_height;
    let mut lines = wrap_words(measure, &style, text, max_width);
    let capacity = (max_height / line_height).floor() as usize;
    let truncated = lines.len() > capacity;
    if truncated {
        lines.truncate(capacity);
        if let Some(last) = lines.pop() {
            lines.push(with_ellipsis(measure, &style, &last, max_width));
        }
    }
    FittedText {
        size,
        line_height,
        lines,
        truncated,
    }
}

/// Append an ellipsis, dropping trailing words until the result fits.
fn with_ellipsis<M: TextMeasure + ?Sized>(
    measure: &mut M,
    style: &TextStyle,
    line: &str,
    max_width: f32,
) -> String {
    let mut words: Vec<&str> = line.split(' ').collect();
    while !words.is_empty() {
        let candidate = format!("{}{ELLIPSIS}", words.join(" "));
        if measure.measure(style, &candidate) <= max_width {
            return candidate;
        }
        words.pop();
    }
    ELLIPSIS.to_string()
}

/// Fixed card geometry, in pixels, relative to the card panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardGeometry {
    pub margin: f32,
    pub radius: f32,
    pub kicker_offset: f32,
    pub kicker_size: f32,
    pub quote_max_width: f32,
    pub quote_side_padding: f32,
    pub footer_offset: f32,
    pub footer_size: f32,
    /// Breathing room between the quote block and kicker/footer.
    pub gap: f32,
    pub sticker_width: f32,
    pub sticker_inset: f32,
    pub sticker_opacity: f32,
    pub footer_opacity: f32,
    pub kicker_opacity: f32,
}

impl Default for CardGeometry {
    fn default() -> Self {
        Self {
            margin: 90.0,
            radius: 28.0,
            kicker_offset: 70.0,
            kicker_size: 28.0,
            quote_max_width: 860.0,
            quote_side_padding: 70.0,
            footer_offset: 30.0,
            footer_size: 22.0,
            gap: 40.0,
            sticker_width: 260.0,
            sticker_inset: 34.0,
            sticker_opacity: 0.45,
            footer_opacity: 0.4,
            kicker_opacity: 0.78,
        }
    }
}

/// Resolved positions of every card element for one surface size.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub panel: Rect,
    pub kicker_top: f32,
    /// Box the quote block must fit in.
    pub text_area: Rect,
    pub footer_top: f32,
}

impl CardLayout {
    pub fn compute(surface: (u32, u32), geometry: &CardGeometry) -> Self {
        let (w, h) = (surface.0 as f32, surface.1 as f32);
        let m = geometry.margin;
        let panel = Rect::new(m, m, (w - 2.0 * m).max(0.0), (h - 2.0 * m).max(0.0));

        let kicker_top = panel.y + geometry.kicker_offset;
        let footer_top = panel.bottom() - geometry.footer_offset - geometry.footer_size;

        let text_width = geometry
            .quote_max_width
            .min(panel.width - 2.0 * geometry.quote_side_padding)
            .max(0.0);
        let text_top = kicker_top + geometry.kicker_size + geometry.gap;
        let text_bottom = footer_top - geometry.gap;
        let text_area = Rect::new(
            panel.center_x() - text_width / 2.0,
            text_top,
            text_width,
            (text_bottom - text_top).max(0.0),
        );

        Self {
            panel,
            kicker_top,
            text_area,
            footer_top,
        }
    }

    /// Top of a vertically centered block of `height` inside the text area.
    pub fn block_top(&self, height: f32) -> f32 {
        self.text_area.y + (self.text_area.height - height) / 2.0
    }

    /// Sticker destination: fixed width, aspect-preserving height, anchored
    /// to the panel's bottom-right corner.
    pub fn sticker_rect(&self, sticker: (u32, u32), geometry: &CardGeometry) -> Rect {
        let sw = geometry.sticker_width;
        let sh = sticker.1 as f32 / sticker.0.max(1) as f32 * sw;
        Rect::new(
            self.panel.right() - sw - geometry.sticker_inset,
            self.panel.bottom() - sh - geometry.sticker_inset,
            sw,
            sh,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::surface::tests::FixedAdvance;

    fn measurer() -> FixedAdvance {
        FixedAdvance { ratio: 0.5 }
    }

    // =========================================================================
    // cover_fit
    // =========================================================================

    #[test]
    fn cover_fit_wider_source_crops_sides() {
        // 1920x1080 onto 1080x1350: height drives the scale.
        let r = cover_fit((1920, 1080), (1080, 1350));
        assert_eq!(r.height, 1350.0);
        assert_eq!(r.width, 2400.0);
        assert_eq!(r.x, -660.0);
        assert_eq!(r.y, 0.0);
    }

    #[test]
    fn cover_fit_taller_source_crops_top_and_bottom() {
        let r = cover_fit((100, 400), (200, 200));
        assert_eq!(r.width, 200.0);
        assert_eq!(r.height, 800.0);
        assert_eq!(r.y, -300.0);
    }

    #[test]
    fn cover_fit_never_letterboxes() {
        for source in [(1, 1), (3000, 10), (10, 3000), (1080, 1350)] {
            let r = cover_fit(source, (1080, 1350));
            assert!(r.x <= 0.0 && r.y <= 0.0);
            assert!(r.right() >= 1080.0 - 1e-3 && r.bottom() >= 1350.0 - 1e-3);
        }
    }

    // =========================================================================
    // wrap_words
    // =========================================================================

    #[test]
    fn wrap_breaks_before_overflow() {
        let style = TextStyle::new(Face::Serif, 10.0);
        // each char is 5px; max 50px = 10 chars
        let lines = wrap_words(&mut measurer(), &style, "aaaa bbbb cccc dd", 50.0);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc dd"]);
    }

    #[test]
    fn wrap_keeps_long_word_on_its_own_line() {
        let style = TextStyle::new(Face::Serif, 10.0);
        let lines = wrap_words(&mut measurer(), &style, "hi supercalifragilistic yo", 50.0);
        assert_eq!(lines, vec!["hi", "supercalifragilistic", "yo"]);
    }

    #[test]
    fn wrap_collapses_whitespace_and_handles_empty() {
        let style = TextStyle::new(Face::Serif, 10.0);
        assert!(wrap_words(&mut measurer(), &style, "   ", 50.0).is_empty());
        let lines = wrap_words(&mut measurer(), &style, "a   b\n c", 50.0);
        assert_eq!(lines, vec!["a b c"]);
    }

    // =========================================================================
    // fit_text
    // =========================================================================

    const BOUNDS: FitBounds = FitBounds {
        min_size: 20,
        max_size: 64,
        line_height: 1.25,
    };

    #[test]
    fn short_text_gets_max_size() {
        let fitted = fit_text(&mut measurer(), Face::Serif, "Ship it.", (860.0, 800.0), BOUNDS);
        assert_eq!(fitted.size, 64);
        assert_eq!(fitted.lines, vec!["Ship it."]);
        assert!(!fitted.truncated);
    }

    #[test]
    fn chosen_size_is_the_largest_that_fits() {
        let text = "Your funnel is not broken it is just shy and needs a little encouragement";
        let area = (400.0, 300.0);
        let mut m = measurer();
        let fitted = fit_text(&mut m, Face::Serif, text, area, BOUNDS);
        assert!(fitted.block_height() <= area.1);

        // One size up must not fit.
        let bigger = TextStyle::new(Face::Serif, (fitted.size + 1) as f32);
        let lines = wrap_words(&mut m, &bigger, text, area.0);
        let overflow_h = lines.len() as f32 * bigger.size * BOUNDS.line_height > area.1;
        let overflow_w = lines.iter().any(|l| m.measure(&bigger, l) > area.0);
        assert!(overflow_h || overflow_w);
    }

    #[test]
    fn very_long_quote_never_exceeds_block_height() {
        let text = "metrics ".repeat(400);
        let area = (860.0, 700.0);
        let fitted = fit_text(&mut measurer(), Face::Serif, &text, area, BOUNDS);
        assert_eq!(fitted.size, BOUNDS.min_size);
        assert!(fitted.truncated);
        assert!(fitted.block_height() <= area.1);
        assert!(fitted.lines.last().unwrap().ends_with(ELLIPSIS));
    }

    #[test]
    fn box_shorter_than_one_line_gets_no_lines() {
        let fitted = fit_text(&mut measurer(), Face::Serif, "Ship it.", (260.0, 0.0), BOUNDS);
        assert!(fitted.lines.is_empty());
        assert!(fitted.truncated);
        assert_eq!(fitted.block_height(), 0.0);
    }

    #[test]
    fn long_quote_on_default_card_fits_text_area() {
        let layout = CardLayout::compute((1080, 1350), &CardGeometry::default());
        let text = "Attribution is a story we tell ourselves. ".repeat(60);
        let fitted = fit_text(
            &mut measurer(),
            Face::Serif,
            &text,
            (layout.text_area.width, layout.text_area.height),
            FitBounds {
                min_size: 28,
                max_size: 64,
                line_height: 1.23,
            },
        );
        assert!(fitted.block_height() <= layout.text_area.height);
    }

    #[test]
    fn ellipsis_drops_words_until_it_fits() {
        let style = TextStyle::new(Face::Serif, 10.0);
        // "aaaa bbbb…" = 10 chars = 50px fits; "aaaa bbbb cc…" does not.
        let line = with_ellipsis(&mut measurer(), &style, "aaaa bbbb cc", 50.0);
        assert_eq!(line, "aaaa bbbb…");
        assert_eq!(with_ellipsis(&mut measurer(), &style, "zzzzzzzzzzzz", 50.0), "…");
    }

    // =========================================================================
    // CardLayout
    // =========================================================================

    #[test]
    fn layout_matches_default_geometry() {
        let layout = CardLayout::compute((1080, 1350), &CardGeometry::default());
        assert_eq!(layout.panel, Rect::new(90.0, 90.0, 900.0, 1170.0));
        assert_eq!(layout.kicker_top, 160.0);
        // min(860, 900 - 140) = 760, centered on 540
        assert_eq!(layout.text_area.width, 760.0);
        assert_eq!(layout.text_area.x, 160.0);
        assert_eq!(layout.footer_top, 1260.0 - 30.0 - 22.0);
        assert_eq!(layout.text_area.y, 160.0 + 28.0 + 40.0);
        assert_eq!(layout.text_area.bottom(), layout.footer_top - 40.0);
    }

    #[test]
    fn block_is_vertically_centered() {
        let layout = CardLayout::compute((1080, 1350), &CardGeometry::default());
        let top = layout.block_top(100.0);
        let above = top - layout.text_area.y;
        let below = layout.text_area.bottom() - (top + 100.0);
        assert!((above - below).abs() < 1e-3);
    }

    #[test]
    fn sticker_anchors_bottom_right() {
        let geometry = CardGeometry::default();
        let layout = CardLayout::compute((1080, 1350), &geometry);
        let r = layout.sticker_rect((520, 260), &geometry);
        assert_eq!(r.width, 260.0);
        assert_eq!(r.height, 130.0);
        assert_eq!(r.right(), layout.panel.right() - 34.0);
        assert_eq!(r.bottom(), layout.panel.bottom() - 34.0);
    }
}
