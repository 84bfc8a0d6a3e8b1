//! Render and cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters shared by every marker a service creates.
#[derive(Debug, Default)]
pub struct RenderCounters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    working_hits: AtomicU64,
    colourizations: AtomicU64,
    base_composites: AtomicU64,
    text_layers: AtomicU64,
}

/// A point-in-time copy of [`RenderCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Final markers served straight from disk.
    pub cache_hits: u64,
    /// Final markers that had to be rendered.
    pub cache_misses: u64,
    /// Colourized templates reused from the workspace.
    pub working_hits: u64,
    /// Hue replacements computed.
    pub colourizations: u64,
    /// Base canvases composited.
    pub base_composites: u64,
    /// Text layers rasterized and merged.
    pub text_layers: u64,
}

impl RenderCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn working_hit(&self) {
        self.working_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one run of the named layer.
    pub(crate) fn layer_applied(&self, name: &str) {
        let counter = match name {
            "hue" => &self.colourizations,
            "opacity" => &self.base_composites,
            "text" => &self.text_layers,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RenderStats {
        RenderStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            working_hits: self.working_hits.load(Ordering::Relaxed),
            colourizations: self.colourizations.load(Ordering::Relaxed),
            base_composites: self.base_composites.load(Ordering::Relaxed),
            text_layers: self.text_layers.load(Ordering::Relaxed),
        }
    }
}

impl RenderStats {
    /// Number of layer executions of any kind.
    pub fn layers_run(&self) -> u64 {
        self.colourizations + self.base_composites + self.text_layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_map_to_their_counters() {
        let counters = RenderCounters::new();
        counters.layer_applied("hue");
        counters.layer_applied("opacity");
        counters.layer_applied("opacity");
        counters.layer_applied("text");
        counters.layer_applied("unknown");

        let stats = counters.snapshot();
        assert_eq!(stats.colourizations, 1);
        assert_eq!(stats.base_composites, 2);
        assert_eq!(stats.text_layers, 1);
        assert_eq!(stats.layers_run(), 4);
    }

    #[test]
    fn cache_counters_accumulate() {
        let counters = RenderCounters::new();
        counters.cache_miss();
        counters.cache_hit();
        counters.cache_hit();
        counters.working_hit();
        assert_eq!(
            counters.snapshot(),
            RenderStats {
                cache_hits: 2,
                cache_misses: 1,
                working_hits: 1,
                ..RenderStats::default()
            }
        );
    }
}
