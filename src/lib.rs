//! marker-renderer: on-demand map markers with a content-addressed cache
//!
//! A marker is a template image, optionally recoloured to a single hue,
//! blended at a uniform opacity onto a transparent canvas, with an optional
//! line of text on top. Every rendered marker is stored as a PNG named after
//! the MD5 fingerprint of its parameters, so identical requests are served
//! from disk without re-rendering.
//!
//! # Example
//!
//! ```no_run
//! use marker_renderer::{MarkerParams, MarkerService, MarkerSettings};
//!
//! let settings = MarkerSettings::new("/srv/media")
//!     .with_media_url("/media/")
//!     .with_template_root("/srv/static");
//! let service = MarkerService::new(settings)?;
//!
//! let params = MarkerParams::new("markers/pin.png")
//!     .with_hue(210)
//!     .with_opacity(0.9)
//!     .with_text("12")
//!     .with_text_colour("ffffff");
//!
//! let marker = service.create(&params)?;
//! let url = marker.url()?; // "/media/cache/markers/<md5>.png"
//! # Ok::<(), marker_renderer::MarkerError>(())
//! ```
//!
//! # Cache layout
//!
//! ```text
//! <media_root>/cache/markers/<fingerprint>.png
//! <media_root>/cache/markers/_workspace/<md5 of template and hue>.png
//! ```

mod cache;
mod error;
mod fingerprint;
mod font;
mod layer;
mod marker;
mod request;
mod settings;
mod stats;
mod template;

pub use cache::{CacheLookup, CachedRaster, MarkerCache, Namespace, ensure_dir};
pub use error::{MarkerError, MarkerResult, ValidationError};
pub use fingerprint::Fingerprint;
pub use font::MarkerFont;
pub use layer::hue::apply_hue_replacement;
pub use layer::opacity::compose_base;
pub use layer::paste::paste_with_mask;
pub use layer::text::escape_html;
pub use layer::{
    HueReplacementConfig, LayerEffect, LayerPipeline, OpacityConfig, RenderContext, TextLayer,
    TextOverlayConfig,
};
pub use marker::{Marker, MarkerService};
pub use request::{
    MAX_TEXT_SIZE, MarkerParams, MarkerRequest, TextColour, TextPosition, opacity_level,
};
pub use settings::MarkerSettings;
pub use stats::{RenderCounters, RenderStats};
pub use template::{SearchPathResolver, TemplateResolver};
