//! Service configuration.
//!
//! ```json
//! {
//!   "media_root": "/srv/media",
//!   "media_url": "https://cdn.example.org/media/",
//!   "template_roots": ["/srv/static", "/usr/share/markers"],
//!   "font_path": null
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarkerError, MarkerResult};

/// Where markers are read from, cached to and served from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSettings {
    /// Directory holding `cache/markers/`.
    pub media_root: PathBuf,

    /// Public prefix substituted for `media_root` in served locations.
    pub media_url: String,

    /// Template search roots, in priority order.
    pub template_roots: Vec<PathBuf>,

    /// Replaces the bundled bold sans-serif face when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("media"),
            media_url: "/media/".to_string(),
            template_roots: Vec::new(),
            font_path: None,
        }
    }
}

impl MarkerSettings {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
            ..Self::default()
        }
    }

    pub fn with_media_url(mut self, url: impl Into<String>) -> Self {
        self.media_url = url.into();
        self
    }

    pub fn with_template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_roots.push(root.into());
        self
    }

    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Base of the cache tree, `<media_root>/cache`.
    pub fn cache_root(&self) -> PathBuf {
        self.media_root.join("cache")
    }

    /// Rewrites a path under `media_root` to its public URL.
    ///
    /// Paths outside the media root are returned unchanged.
    pub fn public_url(&self, path: &Path) -> String {
        match path.strip_prefix(&self.media_root) {
            Ok(relative) => {
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if self.media_url.ends_with('/') {
                    format!("{}{}", self.media_url, relative)
                } else {
                    format!("{}/{}", self.media_url, relative)
                }
            }
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads settings from a JSON file.
    pub fn from_file(path: &Path) -> MarkerResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| MarkerError::io(path, e))?;
        Self::from_json(&json)
            .map_err(|e| MarkerError::settings(format!("{}: {e}", path.display())))
    }
}
