//! Font loading, text measurement and glyph coverage rasterization.

use std::fmt;
use std::path::Path;

use ab_glyph::{Font, FontArc, GlyphId, PxScale, Rect, ScaleFont};
use image::{GrayImage, Luma};

use crate::error::{MarkerError, MarkerResult};

/// Bold sans-serif face shipped with the crate (DejaVu Sans Bold).
const BUNDLED_FONT_DATA: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

/// The face used for every text overlay.
#[derive(Clone)]
pub struct MarkerFont {
    font: FontArc,
}

impl fmt::Debug for MarkerFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerFont")
            .field("glyph_count", &self.font.glyph_count())
            .finish()
    }
}

impl MarkerFont {
    /// Loads the bundled face.
    pub fn bundled() -> MarkerResult<Self> {
        let font = FontArc::try_from_slice(BUNDLED_FONT_DATA)
            .map_err(|e| MarkerError::font(format!("bundled font: {e}")))?;
        Ok(Self { font })
    }

    /// Loads a TrueType/OpenType face from disk.
    pub fn from_path(path: &Path) -> MarkerResult<Self> {
        let data = std::fs::read(path).map_err(|e| MarkerError::io(path, e))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| MarkerError::font(format!("{}: {e}", path.display())))?;
        Ok(Self { font })
    }

    /// Loads `path` when given, the bundled face otherwise.
    pub fn load(path: Option<&Path>) -> MarkerResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::bundled(),
        }
    }

    /// Scale at which one em spans `size` pixels.
    fn scale(&self, size: u32) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(2048.0);
        PxScale::from(size as f32 * self.font.height_unscaled() / units_per_em)
    }

    /// Size of the text box: total advance by ascent-to-descent height.
    pub fn measure(&self, text: &str, size: u32) -> (u32, u32) {
        let scaled = self.font.as_scaled(self.scale(size));
        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }

        let height = scaled.ascent() - scaled.descent();
        (width.max(0.0).ceil() as u32, height.ceil() as u32)
    }

    /// Draws `text` white-on-black onto a `width x height` coverage canvas,
    /// with the top of the text box at `origin`.
    ///
    /// Pixels outside the canvas are clipped. Where glyphs overlap, the
    /// stronger coverage wins.
    pub fn rasterize(
        &self,
        text: &str,
        size: u32,
        (width, height): (u32, u32),
        origin: (i32, i32),
    ) -> GrayImage {
        let mut canvas = GrayImage::new(width, height);
        let scale = self.scale(size);
        let scaled = self.font.as_scaled(scale);
        let baseline = origin.1 as f32 + scaled.ascent();
        let mut cursor = origin.0 as f32;
        let mut prev: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor, baseline));
            // draw() allocates coverage for the whole glyph, so glyphs that
            // cannot touch the canvas are never drawn.
            let outlined = self
                .font
                .outline_glyph(glyph)
                .filter(|g| overlaps_canvas(g.px_bounds(), width, height));
            if let Some(outlined) = outlined {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let x = bounds.min.x as i32 + gx as i32;
                    let y = bounds.min.y as i32 + gy as i32;
                    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                        return;
                    }
                    let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                    if value > pixel[0] {
                        *pixel = Luma([value]);
                    }
                });
            }

            cursor += scaled.h_advance(id);
            prev = Some(id);
        }

        canvas
    }
}

fn overlaps_canvas(bounds: Rect, width: u32, height: u32) -> bool {
    bounds.max.x > 0.0
        && bounds.max.y > 0.0
        && bounds.min.x < width as f32
        && bounds.min.y < height as f32
}
