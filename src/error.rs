//! Error types for marker validation and rendering.

use std::path::PathBuf;

/// Result alias used throughout the rendering pipeline.
pub type MarkerResult<T> = Result<T, MarkerError>;

/// A request field failed validation.
///
/// Raised from [`MarkerRequest::new`](crate::MarkerRequest::new) before any
/// rendering happens. Each variant names exactly one offending field.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("hue must be an integer between 0 and 360, got {0}")]
    InvalidHue(i64),

    #[error("{0:?} does not appear to be a hex colour")]
    InvalidColour(String),

    #[error("opacity must be a number between 0 and 1, got {0}")]
    InvalidOpacity(f64),

    #[error("{0:?} is not a known template")]
    InvalidTemplate(String),

    #[error("text size must be between 1 and 1024, got {0}")]
    InvalidTextSize(u32),
}

/// Errors raised while rendering, caching or serving a marker.
#[derive(thiserror::Error, Debug)]
pub enum MarkerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("font error: {0}")]
    Font(String),

    #[error("settings error: {0}")]
    Settings(String),
}

impl MarkerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font(msg.into())
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Returns the validation failure, if this error is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}
