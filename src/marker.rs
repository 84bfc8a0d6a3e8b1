//! Marker creation and the render-or-fetch entry point.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::cache::{CacheLookup, CachedRaster, MarkerCache, Namespace};
use crate::error::{MarkerError, MarkerResult, ValidationError};
use crate::fingerprint::Fingerprint;
use crate::font::MarkerFont;
use crate::layer::{
    HueReplacementConfig, LayerEffect, LayerPipeline, OpacityConfig, RenderContext,
    TextOverlayConfig,
};
use crate::request::{MarkerParams, MarkerRequest};
use crate::settings::MarkerSettings;
use crate::stats::{RenderCounters, RenderStats};
use crate::template::{SearchPathResolver, TemplateResolver};

// ============================================================================
// MarkerService
// ============================================================================

/// Validates marker parameters and hands out [`Marker`]s bound to one cache.
///
/// The service holds configuration only; every request gets its own
/// immutable [`MarkerRequest`]. It is `Sync`, so one instance can serve
/// concurrent callers.
pub struct MarkerService {
    settings: MarkerSettings,
    resolver: Box<dyn TemplateResolver>,
    cache: MarkerCache,
    font: MarkerFont,
    counters: RenderCounters,
}

impl std::fmt::Debug for MarkerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerService")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("font", &self.font)
            .finish_non_exhaustive()
    }
}

impl MarkerService {
    /// Builds a service that searches `settings.template_roots` in order.
    pub fn new(settings: MarkerSettings) -> MarkerResult<Self> {
        let resolver = SearchPathResolver::new(settings.template_roots.iter().cloned());
        Self::with_resolver(settings, resolver)
    }

    /// Builds a service with a custom template resolver.
    pub fn with_resolver(
        settings: MarkerSettings,
        resolver: impl TemplateResolver + 'static,
    ) -> MarkerResult<Self> {
        let font = MarkerFont::load(settings.font_path.as_deref())?;
        let cache = MarkerCache::new(settings.cache_root());
        Ok(Self {
            settings,
            resolver: Box::new(resolver),
            cache,
            font,
            counters: RenderCounters::new(),
        })
    }

    pub fn settings(&self) -> &MarkerSettings {
        &self.settings
    }

    pub fn cache(&self) -> &MarkerCache {
        &self.cache
    }

    /// Counters accumulated over every marker this service has produced.
    pub fn stats(&self) -> RenderStats {
        self.counters.snapshot()
    }

    /// Validates `params` and returns a marker ready to render.
    ///
    /// Nothing is read or written until the marker's raster is requested.
    pub fn create(&self, params: &MarkerParams) -> Result<Marker<'_>, ValidationError> {
        let request = MarkerRequest::new(params, self.resolver.as_ref())?;
        let fingerprint = request.fingerprint();
        tracing::debug!(%fingerprint, template = %request.template().display(), "created marker");
        Ok(Marker {
            service: self,
            request,
            fingerprint,
        })
    }

    /// Returns the marker's public URL, or an empty string when the
    /// parameters are invalid.
    ///
    /// Suited to template helpers that must never fail a page render over a
    /// bad marker argument. Rendering and I/O failures still propagate.
    pub fn url_or_empty(&self, params: &MarkerParams) -> MarkerResult<String> {
        match self.create(params) {
            Ok(marker) => marker.url(),
            Err(err) => {
                tracing::debug!(error = %err, "invalid marker parameters");
                Ok(String::new())
            }
        }
    }
}

// ============================================================================
// Marker
// ============================================================================

/// A validated marker request bound to the service that created it.
#[derive(Debug)]
pub struct Marker<'a> {
    service: &'a MarkerService,
    request: MarkerRequest,
    fingerprint: Fingerprint,
}

impl Marker<'_> {
    pub fn request(&self) -> &MarkerRequest {
        &self.request
    }

    /// Content address of the final raster.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Where the final raster is (or will be) cached.
    pub fn cache_path(&self) -> PathBuf {
        self.service.cache.path(Namespace::Markers, &self.fingerprint)
    }

    /// Returns the marker, rendering and caching it first if needed.
    pub fn raster(&self) -> MarkerResult<RgbaImage> {
        Ok(self.cached()?.image)
    }

    /// Public URL of the cached PNG, rendering it first if needed.
    ///
    /// An existing entry is not decoded, only located.
    pub fn url(&self) -> MarkerResult<String> {
        let cache = &self.service.cache;
        let path = match cache.locate(Namespace::Markers, &self.fingerprint) {
            Some(path) => {
                self.service.counters.cache_hit();
                path
            }
            None => self.cached()?.path,
        };
        Ok(self.service.settings.public_url(&path))
    }

    /// The cached PNG file's bytes, for an `image/png` response body.
    pub fn png_bytes(&self) -> MarkerResult<Vec<u8>> {
        let cache = &self.service.cache;
        if let Some(bytes) = cache.read(Namespace::Markers, &self.fingerprint)? {
            self.service.counters.cache_hit();
            return Ok(bytes);
        }
        let raster = self.cached()?;
        std::fs::read(&raster.path).map_err(|e| MarkerError::io(&raster.path, e))
    }

    /// Read-through access to the final raster.
    #[tracing::instrument(level = "debug", skip(self), fields(fingerprint = %self.fingerprint))]
    fn cached(&self) -> MarkerResult<CachedRaster> {
        let cache = &self.service.cache;
        if let CacheLookup::Hit(raster) = cache.fetch(Namespace::Markers, &self.fingerprint)? {
            tracing::debug!("cache hit");
            self.service.counters.cache_hit();
            return Ok(raster);
        }

        tracing::info!("cache miss, rendering");
        self.service.counters.cache_miss();
        let image = self.render()?;
        cache.store(Namespace::Markers, &self.fingerprint, &image)
    }

    /// Renders the marker from scratch (apart from a cached working template).
    fn render(&self) -> MarkerResult<RgbaImage> {
        let template = if self.request.colourizes() {
            self.working_template()?
        } else {
            load_template(self.request.template())?
        };

        let text = (!self.request.text().is_empty()).then(|| TextOverlayConfig {
            text: self.request.text().to_string(),
            position: self.request.text_position(),
            size: self.request.text_size(),
            colour: self.request.text_colour().rgb(),
            font: self.service.font.clone(),
        });
        let pipeline = LayerPipeline::new(OpacityConfig::new(self.request.opacity()), text);

        let ctx = pipeline.render(template);
        self.record(&ctx);
        Ok(ctx.into_image())
    }

    /// The hue-replaced template, from the workspace or freshly computed.
    fn working_template(&self) -> MarkerResult<RgbaImage> {
        let cache = &self.service.cache;
        let key = self.request.working_fingerprint();
        if let CacheLookup::Hit(raster) = cache.fetch(Namespace::Workspace, &key)? {
            tracing::debug!(working = %key, "working template hit");
            self.service.counters.working_hit();
            return Ok(raster.image);
        }

        let mut ctx = RenderContext::new(load_template(self.request.template())?);
        HueReplacementConfig::new(f32::from(self.request.hue())).apply(&mut ctx);
        self.record(&ctx);
        tracing::info!(working = %key, hue = self.request.hue(), "colourized template");
        Ok(cache.store(Namespace::Workspace, &key, &ctx.image)?.image)
    }

    fn record(&self, ctx: &RenderContext) {
        for name in ctx.applied() {
            self.service.counters.layer_applied(name);
        }
    }
}

fn load_template(path: &Path) -> MarkerResult<RgbaImage> {
    let image = image::open(path).map_err(|e| MarkerError::image(path, e))?;
    Ok(image.into_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    struct Fixture {
        _media: TempDir,
        _static: TempDir,
        service: MarkerService,
    }

    fn fixture() -> Fixture {
        let media = tempfile::tempdir().unwrap();
        let statics = tempfile::tempdir().unwrap();
        let pin = RgbaImage::from_fn(50, 50, |x, y| {
            Rgba([200, (x * 4) as u8, (y * 4) as u8, 255])
        });
        pin.save(statics.path().join("pin.png")).unwrap();

        let settings = MarkerSettings::new(media.path())
            .with_media_url("/media/")
            .with_template_root(statics.path());
        let service = MarkerService::new(settings).unwrap();
        Fixture {
            _media: media,
            _static: statics,
            service,
        }
    }

    #[test]
    fn invalid_params_fail_before_rendering() {
        let fx = fixture();
        let err = fx
            .service
            .create(&MarkerParams::new("pin.png").with_hue(361))
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidHue(361));
        assert!(!fx.service.cache().markers_dir().exists());
    }

    #[test]
    fn oversized_text_never_reaches_the_rasterizer() {
        let fx = fixture();
        let err = fx
            .service
            .create(&MarkerParams::new("pin.png").with_text("W").with_text_size(400_000))
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidTextSize(400_000));

        let raster = fx
            .service
            .create(
                &MarkerParams::new("pin.png")
                    .with_text("W")
                    .with_text_size(crate::request::MAX_TEXT_SIZE),
            )
            .unwrap()
            .raster()
            .unwrap();
        assert_eq!(raster.dimensions(), (50, 50));
    }

    #[test]
    fn second_request_reads_from_cache() {
        let fx = fixture();
        let params = MarkerParams::new("pin.png").with_hue(120).with_text("5");

        let first = fx.service.create(&params).unwrap().raster().unwrap();
        let after_first = fx.service.stats();
        assert_eq!(after_first.cache_misses, 1);
        assert_eq!(after_first.colourizations, 1);
        assert_eq!(after_first.base_composites, 1);
        assert_eq!(after_first.text_layers, 1);

        let second = fx.service.create(&params).unwrap().raster().unwrap();
        let after_second = fx.service.stats();
        assert_eq!(after_second.cache_hits, 1);
        assert_eq!(after_second.layers_run(), after_first.layers_run());
        assert_eq!(first, second);
    }

    #[test]
    fn zero_hue_skips_colourization() {
        let fx = fixture();
        fx.service
            .create(&MarkerParams::new("pin.png"))
            .unwrap()
            .raster()
            .unwrap();
        let stats = fx.service.stats();
        assert_eq!(stats.colourizations, 0);
        assert_eq!(stats.text_layers, 0);
        assert!(!fx.service.cache().dir(Namespace::Workspace).exists());
    }

    #[test]
    fn url_rewrites_media_root() {
        let fx = fixture();
        let marker = fx.service.create(&MarkerParams::new("pin.png")).unwrap();
        assert_eq!(
            marker.url().unwrap(),
            format!("/media/cache/markers/{}", marker.fingerprint().file_name())
        );
    }

    #[test]
    fn url_or_empty_swallows_validation_only() {
        let fx = fixture();
        assert_eq!(
            fx.service
                .url_or_empty(&MarkerParams::new("missing.png"))
                .unwrap(),
            ""
        );
        assert!(
            fx.service
                .url_or_empty(&MarkerParams::new("pin.png"))
                .unwrap()
                .starts_with("/media/cache/markers/")
        );
    }

    #[test]
    fn png_bytes_are_the_cached_file() {
        let fx = fixture();
        let marker = fx.service.create(&MarkerParams::new("pin.png")).unwrap();
        let bytes = marker.png_bytes().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(bytes, std::fs::read(marker.cache_path()).unwrap());
    }

    #[test]
    fn serving_a_hit_skips_decoding() {
        let fx = fixture();
        let marker = fx.service.create(&MarkerParams::new("pin.png")).unwrap();
        let first_url = marker.url().unwrap();

        // A stand-in that would fail to decode proves only the file is touched.
        std::fs::write(marker.cache_path(), b"opaque").unwrap();
        let before = fx.service.stats();
        assert_eq!(marker.url().unwrap(), first_url);
        assert_eq!(marker.png_bytes().unwrap(), b"opaque");

        let after = fx.service.stats();
        assert_eq!(after.cache_hits, before.cache_hits + 2);
        assert_eq!(after.cache_misses, before.cache_misses);
    }

    #[test]
    fn unreadable_template_is_fatal_at_render_time() {
        let fx = fixture();
        std::fs::write(
            fx.service.settings().template_roots[0].join("broken.png"),
            b"garbage",
        )
        .unwrap();
        let marker = fx.service.create(&MarkerParams::new("broken.png")).unwrap();
        assert!(matches!(marker.raster(), Err(MarkerError::Image { .. })));
    }

    #[test]
    fn missing_font_fails_service_construction() {
        let media = tempfile::tempdir().unwrap();
        let settings = MarkerSettings::new(media.path()).with_font_path("/no/such/font.ttf");
        assert!(matches!(
            MarkerService::new(settings),
            Err(MarkerError::Io { .. })
        ));
    }
}
