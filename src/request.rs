//! Marker request parameters and their validated form.
//!
//! [`MarkerParams`] is the serializable boundary type: named fields with
//! documented defaults, suitable for JSON or a query-string adapter.
//! [`MarkerRequest`] is the validated, immutable value built from it. A
//! `MarkerRequest` can only be obtained through [`MarkerRequest::new`], so one
//! is never observably invalid.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "template": "markers/pin.png",
//!   "hue": 120,
//!   "opacity": 0.8,
//!   "text": "12",
//!   "text_x": null,
//!   "text_y": 4,
//!   "text_size": 11,
//!   "text_colour": "ffffff"
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fingerprint::Fingerprint;
use crate::template::TemplateResolver;

/// Highest accepted hue, inclusive.
pub const MAX_HUE: i64 = 360;

/// Largest accepted font size in pixels per em, inclusive.
pub const MAX_TEXT_SIZE: u32 = 1024;

// ============================================================================
// MarkerParams
// ============================================================================

/// Unvalidated marker parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerParams {
    /// Logical template name, resolved against the configured search roots.
    pub template: String,

    /// Target hue in degrees, 0 to 360. 0 disables colourization.
    pub hue: i64,

    /// Template opacity, 0.0 to 1.0. Does not affect the text.
    pub opacity: f64,

    /// Text to draw. Empty means no text layer.
    pub text: String,

    /// Horizontal text offset. `None` centers the text horizontally.
    pub text_x: Option<i32>,

    /// Vertical text offset. `None` centers the text vertically.
    pub text_y: Option<i32>,

    /// Font size in pixels per em.
    pub text_size: u32,

    /// Six hex digits, case-insensitive, no leading `#`.
    pub text_colour: String,
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            template: String::new(),
            hue: 0,
            opacity: 1.0,
            text: String::new(),
            text_x: None,
            text_y: None,
            text_size: 10,
            text_colour: "000000".to_string(),
        }
    }
}

impl MarkerParams {
    /// Parameters for `template` with every other field at its default.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn with_hue(mut self, hue: i64) -> Self {
        self.hue = hue;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_text_position(mut self, x: Option<i32>, y: Option<i32>) -> Self {
        self.text_x = x;
        self.text_y = y;
        self
    }

    pub fn with_text_size(mut self, size: u32) -> Self {
        self.text_size = size;
        self
    }

    pub fn with_text_colour(mut self, colour: impl Into<String>) -> Self {
        self.text_colour = colour.into();
        self
    }

    /// Serializes the parameters to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes parameters from a JSON string; absent fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// TextColour
// ============================================================================

/// A validated RGB text colour, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextColour(String);

impl TextColour {
    /// Parses exactly six hex digits, either case.
    pub fn parse(hex: &str) -> Result<Self, ValidationError> {
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidColour(hex.to_string()));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Canonical lowercase hex form.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// The colour as an `[r, g, b]` triple.
    pub fn rgb(&self) -> [u8; 3] {
        let channel = |i: usize| u8::from_str_radix(&self.0[i..i + 2], 16).unwrap_or(0);
        [channel(0), channel(2), channel(4)]
    }
}

impl fmt::Display for TextColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TextPosition
// ============================================================================

/// Text placement with optional per-axis coordinates.
///
/// An unset axis is centered on the canvas when the text layer is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextPosition {
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl TextPosition {
    pub const CENTERED: Self = Self { x: None, y: None };

    pub fn new(x: Option<i32>, y: Option<i32>) -> Self {
        Self { x, y }
    }

    /// Resolves unset axes to `(canvas - text) / 2`, rounding toward
    /// negative infinity when the text is larger than the canvas.
    pub fn resolve(&self, canvas: (u32, u32), text: (u32, u32)) -> (i32, i32) {
        let center = |canvas: u32, text: u32| (i64::from(canvas) - i64::from(text)).div_euclid(2) as i32;
        (
            self.x.unwrap_or_else(|| center(canvas.0, text.0)),
            self.y.unwrap_or_else(|| center(canvas.1, text.1)),
        )
    }
}

impl fmt::Display for TextPosition {
    /// Renders as `[x, y]` with `None` for unset axes; part of the
    /// fingerprint input.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis = |v: Option<i32>| v.map_or_else(|| "None".to_string(), |v| v.to_string());
        write!(f, "[{}, {}]", axis(self.x), axis(self.y))
    }
}

// ============================================================================
// MarkerRequest
// ============================================================================

/// A fully validated marker request.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRequest {
    template: PathBuf,
    hue: u16,
    opacity: u8,
    text: String,
    text_position: TextPosition,
    text_size: u32,
    text_colour: TextColour,
}

impl MarkerRequest {
    /// Validates `params`, resolving the template through `resolver`.
    ///
    /// Checks run in the order hue, colour, opacity, text size, template, and
    /// the first failure is returned.
    pub fn new(
        params: &MarkerParams,
        resolver: &dyn TemplateResolver,
    ) -> Result<Self, ValidationError> {
        let hue = validate_hue(params.hue)?;
        let text_colour = TextColour::parse(&params.text_colour)?;
        let opacity = opacity_level(params.opacity)?;
        if !(1..=MAX_TEXT_SIZE).contains(&params.text_size) {
            return Err(ValidationError::InvalidTextSize(params.text_size));
        }
        let template = resolver
            .resolve(&params.template)
            .ok_or_else(|| ValidationError::InvalidTemplate(params.template.clone()))?;

        Ok(Self {
            template,
            hue,
            opacity,
            text: params.text.clone(),
            text_position: TextPosition::new(params.text_x, params.text_y),
            text_size: params.text_size,
            text_colour,
        })
    }

    /// Resolved path of the source template.
    pub fn template(&self) -> &Path {
        &self.template
    }

    /// Target hue in degrees; 0 means no colourization.
    pub fn hue(&self) -> u16 {
        self.hue
    }

    /// Whether the template is recoloured before compositing.
    pub fn colourizes(&self) -> bool {
        self.hue != 0
    }

    /// Uniform template alpha, `floor(opacity * 255)`.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_position(&self) -> TextPosition {
        self.text_position
    }

    pub fn text_size(&self) -> u32 {
        self.text_size
    }

    pub fn text_colour(&self) -> &TextColour {
        &self.text_colour
    }

    /// Content address of the final composited marker.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_fields(&[
            self.template.to_string_lossy().into_owned(),
            self.hue.to_string(),
            self.opacity.to_string(),
            self.text.clone(),
            self.text_position.to_string(),
            self.text_size.to_string(),
            self.text_colour.to_string(),
        ])
    }

    /// Content address of the colourized working template.
    pub fn working_fingerprint(&self) -> Fingerprint {
        Fingerprint::working(&self.template.to_string_lossy(), self.hue)
    }
}

fn validate_hue(hue: i64) -> Result<u16, ValidationError> {
    if (0..=MAX_HUE).contains(&hue) {
        Ok(hue as u16)
    } else {
        Err(ValidationError::InvalidHue(hue))
    }
}

/// Maps a 0.0..=1.0 opacity to the 0..=255 mask level by truncation.
pub fn opacity_level(opacity: f64) -> Result<u8, ValidationError> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(ValidationError::InvalidOpacity(opacity));
    }
    Ok((opacity * 255.0) as u8)
}

// ============================================================================
// Tests
// ============================================================================
