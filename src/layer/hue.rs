//! Hue replacement layer.

use super::{LayerEffect, RenderContext};
use image::RgbaImage;
use palette::{Hsv, IntoColor, Srgb};
use rayon::prelude::*;

// ============================================================================
// HueReplacementConfig
// ============================================================================

/// Recolours a template by giving every pixel the same hue.
///
/// Saturation, value and alpha are kept, so shading and transparency of the
/// template survive while its colour changes. This replaces the hue outright
/// rather than rotating it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueReplacementConfig {
    /// Target hue in degrees.
    pub degrees: f32,
}

impl HueReplacementConfig {
    /// Creates a config for `degrees`, normalized to 0-360.
    pub fn new(degrees: f32) -> Self {
        Self {
            degrees: degrees.rem_euclid(360.0),
        }
    }
}

impl LayerEffect for HueReplacementConfig {
    fn name(&self) -> &'static str {
        "hue"
    }

    fn transform(&self, ctx: &mut RenderContext) {
        ctx.image = apply_hue_replacement(&ctx.image, self);
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Returns a copy of `image` with every pixel's hue set to `config.degrees`.
///
/// Rows are processed in parallel; the result is independent of scheduling.
pub fn apply_hue_replacement(image: &RgbaImage, config: &HueReplacementConfig) -> RgbaImage {
    let mut result = image.clone();
    let row_len = result.width() as usize * 4;
    if row_len == 0 {
        return result;
    }

    result.par_chunks_mut(row_len).for_each(|row| {
        for pixel in row.chunks_exact_mut(4) {
            let [r, g, b] = replace_hue([pixel[0], pixel[1], pixel[2]], config.degrees);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }
    });

    result
}

/// Replaces the hue of one RGB colour.
fn replace_hue([r, g, b]: [u8; 3], degrees: f32) -> [u8; 3] {
    let rgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let mut hsv: Hsv = rgb.into_color();
    hsv.hue = degrees.into();
    let replaced: Srgb = hsv.into_color();

    [
        (replaced.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (replaced.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (replaced.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}
