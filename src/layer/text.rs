//! Text overlay layer configuration and application.

use super::paste::paste_with_mask;
use super::{LayerEffect, RenderContext};
use crate::font::MarkerFont;
use crate::request::TextPosition;
use image::{GrayImage, Rgba, RgbaImage};

// ============================================================================
// TextOverlayConfig
// ============================================================================

/// Configuration for a single line of solid-colour text.
///
/// The text is HTML-escaped before it is measured and drawn, so markup in
/// caller-supplied text shows up literally (`<b>` renders as `&lt;b&gt;`).
#[derive(Debug, Clone)]
pub struct TextOverlayConfig {
    /// The raw, unescaped text.
    pub text: String,

    /// Top-left of the text box; unset axes are centered.
    pub position: TextPosition,

    /// Font size in pixels per em.
    pub size: u32,

    /// Fill colour.
    pub colour: [u8; 3],

    /// Face used for measuring and drawing.
    pub font: MarkerFont,
}

/// A rendered text layer, ready to paste at the origin through `alpha`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    /// Fill colour wherever any coverage exists, black elsewhere, with the
    /// anti-aliased coverage as alpha.
    pub overlay: RgbaImage,

    /// Anti-aliased glyph coverage.
    pub alpha: GrayImage,

    /// Where the text box was placed.
    pub origin: (i32, i32),
}

impl TextOverlayConfig {
    /// Returns the escaped text that is actually drawn.
    pub fn display_text(&self) -> String {
        escape_html(&self.text)
    }

    /// Resolves the text box origin on a `canvas` of the given size.
    pub fn origin(&self, canvas: (u32, u32)) -> (i32, i32) {
        let text_box = self.font.measure(&self.display_text(), self.size);
        self.position.resolve(canvas, text_box)
    }

    /// Renders the overlay and its alpha mask for a canvas of `canvas` size.
    pub fn render(&self, canvas: (u32, u32)) -> TextLayer {
        let text = self.display_text();
        let text_box = self.font.measure(&text, self.size);
        let origin = self.position.resolve(canvas, text_box);

        // White-on-black coverage doubles as the alpha channel.
        let alpha = self.font.rasterize(&text, self.size, canvas, origin);

        let [r, g, b] = self.colour;
        let overlay = RgbaImage::from_fn(canvas.0, canvas.1, |x, y| {
            let a = alpha.get_pixel(x, y)[0];
            if a != 0 { Rgba([r, g, b, a]) } else { Rgba([0, 0, 0, 0]) }
        });

        TextLayer {
            overlay,
            alpha,
            origin,
        }
    }
}

impl LayerEffect for TextOverlayConfig {
    fn name(&self) -> &'static str {
        "text"
    }

    fn is_noop(&self) -> bool {
        self.text.is_empty()
    }

    fn transform(&self, ctx: &mut RenderContext) {
        let layer = self.render(ctx.image.dimensions());
        paste_with_mask(&mut ctx.image, &layer.overlay, &layer.alpha);
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Escapes `&`, `<`, `>`, `"` and `'` as HTML entities.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &str, position: TextPosition) -> TextOverlayConfig {
        TextOverlayConfig {
            text: text.to_string(),
            position,
            size: 14,
            colour: [0x12, 0x34, 0x56],
            font: MarkerFont::bundled().unwrap(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain 12"), "plain 12");
    }

    #[test]
    fn escaped_text_is_what_gets_measured() {
        let cfg = config("<", TextPosition::CENTERED);
        let raw = cfg.font.measure("<", 14);
        let escaped = cfg.font.measure("&lt;", 14);
        assert!(escaped.0 > raw.0);
        assert_eq!(
            cfg.origin((100, 100)),
            TextPosition::CENTERED.resolve((100, 100), escaped)
        );
    }

    #[test]
    fn overlay_colour_follows_coverage() {
        let layer = config("W", TextPosition::CENTERED).render((40, 30));
        assert_eq!(layer.overlay.dimensions(), (40, 30));
        assert_eq!(layer.alpha.dimensions(), (40, 30));

        let mut covered = 0;
        for (x, y, a) in layer.alpha.enumerate_pixels() {
            let px = layer.overlay.get_pixel(x, y);
            assert_eq!(px[3], a[0]);
            if a[0] > 0 {
                covered += 1;
                assert_eq!(&px.0[..3], &[0x12, 0x34, 0x56]);
            } else {
                assert_eq!(&px.0[..3], &[0, 0, 0]);
            }
        }
        assert!(covered > 0);
    }

    #[test]
    fn explicit_position_is_respected() {
        let cfg = config("1", TextPosition::new(Some(2), Some(3)));
        let layer = cfg.render((60, 60));
        assert_eq!(layer.origin, (2, 3));
        // Nothing drawn far right of a single narrow glyph at x=2.
        assert!(
            layer
                .alpha
                .enumerate_pixels()
                .all(|(x, _, a)| a[0] == 0 || x < 30)
        );
    }

    #[test]
    fn transform_leaves_uncovered_pixels_alone() {
        let base = RgbaImage::from_pixel(40, 30, Rgba([200, 10, 10, 255]));
        let mut ctx = RenderContext::new(base.clone());
        let cfg = config("i", TextPosition::new(Some(0), Some(0)));
        cfg.transform(&mut ctx);

        assert_ne!(ctx.image, base);
        assert_eq!(ctx.image.get_pixel(39, 29), base.get_pixel(39, 29));
    }

    #[test]
    fn empty_text_is_a_noop() {
        assert!(config("", TextPosition::CENTERED).is_noop());
        assert!(!config(" ", TextPosition::CENTERED).is_noop());
    }
}
