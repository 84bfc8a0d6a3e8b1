//! Base layer: the template on a transparent canvas at uniform opacity.

use super::paste::paste_with_mask;
use super::{LayerEffect, RenderContext};
use image::{GrayImage, Luma, RgbaImage};

/// Blends the template into a fresh transparent canvas of the same size
/// through a mask holding one grey level everywhere.
///
/// The mask ignores the template's own alpha; it scales whatever the
/// template already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpacityConfig {
    /// Mask level, 0 (invisible) to 255 (unchanged).
    pub level: u8,
}

impl OpacityConfig {
    pub fn new(level: u8) -> Self {
        Self { level }
    }

    /// Builds the uniform mask for a canvas of `width x height`.
    pub fn mask(&self, width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([self.level]))
    }
}

impl LayerEffect for OpacityConfig {
    fn name(&self) -> &'static str {
        "opacity"
    }

    fn transform(&self, ctx: &mut RenderContext) {
        ctx.image = compose_base(&ctx.image, self);
    }
}

/// Returns the base image: a transparent canvas with `template` pasted
/// through the uniform opacity mask.
pub fn compose_base(template: &RgbaImage, config: &OpacityConfig) -> RgbaImage {
    let (width, height) = template.dimensions();
    let mut base = RgbaImage::new(width, height);
    paste_with_mask(&mut base, template, &config.mask(width, height));
    base
}
