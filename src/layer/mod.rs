//! Layer infrastructure for marker compositing.
//!
//! A marker is built from a template image by a short, fixed sequence of
//! layers. Each layer config implements [`LayerEffect`], which defines how it
//! transforms the image held in a [`RenderContext`] and whether it has
//! anything to do at all.
//!
//! # Architecture
//!
//! ```text
//! Template image
//!     │
//!     ▼
//! ┌─────────┐
//! │   Hue   │ ◄── Only when a hue is requested; cached separately as a
//! └────┬────┘     working artifact keyed by (template, hue)
//!      │
//!      ▼
//! ┌─────────┐
//! │ Opacity │ ◄── Transparent canvas + template through a uniform mask
//! └────┬────┘
//!      │
//!      ▼
//! ┌─────────┐
//! │  Text   │ ◄── Skipped for empty text
//! └────┬────┘
//!      │
//!      ▼
//!   Marker
//! ```
//!
//! The hue layer runs on its own because its output is persisted and shared
//! between markers; [`LayerPipeline`] covers the opacity and text layers that
//! produce the final raster.

pub mod hue;
pub mod opacity;
pub mod paste;
pub mod text;

pub use hue::HueReplacementConfig;
pub use opacity::OpacityConfig;
pub use text::{TextLayer, TextOverlayConfig};

use image::RgbaImage;

// ============================================================================
// Render Context
// ============================================================================

/// Context that flows through the layers.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// The current image being processed.
    pub image: RgbaImage,

    /// Names of the layers that ran, in order.
    applied: Vec<&'static str>,
}

impl RenderContext {
    /// Creates a new render context with the given starting image.
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            applied: Vec::new(),
        }
    }

    /// Layers that transformed the image, in order.
    pub fn applied(&self) -> &[&'static str] {
        &self.applied
    }

    /// Whether the named layer ran.
    pub fn was_applied(&self, name: &str) -> bool {
        self.applied.iter().any(|applied| *applied == name)
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

// ============================================================================
// Layer Trait
// ============================================================================

/// Trait for layer configurations that know how to apply themselves.
pub trait LayerEffect {
    /// Short stable name, used in logs and in [`RenderContext::applied`].
    fn name(&self) -> &'static str;

    /// Returns true when applying the layer would not change anything.
    fn is_noop(&self) -> bool {
        false
    }

    /// Transforms `ctx.image`.
    fn transform(&self, ctx: &mut RenderContext);

    /// Runs [`transform`](Self::transform) unless the layer is a no-op, and
    /// records it. Returns whether the layer ran.
    fn apply(&self, ctx: &mut RenderContext) -> bool {
        if self.is_noop() {
            tracing::trace!(layer = self.name(), "skipping no-op layer");
            return false;
        }
        self.transform(ctx);
        ctx.applied.push(self.name());
        true
    }
}

// ============================================================================
// Layer Pipeline
// ============================================================================

/// The layers that turn a (possibly recoloured) template into a marker.
#[derive(Debug, Clone)]
pub struct LayerPipeline {
    /// Uniform template opacity.
    pub opacity: OpacityConfig,

    /// Text overlay, if any.
    pub text: Option<TextOverlayConfig>,
}

impl LayerPipeline {
    pub fn new(opacity: OpacityConfig, text: Option<TextOverlayConfig>) -> Self {
        Self { opacity, text }
    }

    /// Applies every layer in order to `template`.
    pub fn render(&self, template: RgbaImage) -> RenderContext {
        let mut ctx = RenderContext::new(template);
        self.opacity.apply(&mut ctx);
        if let Some(text) = &self.text {
            text.apply(&mut ctx);
        }
        ctx
    }
}
