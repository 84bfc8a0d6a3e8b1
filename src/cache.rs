//! Content-addressed PNG cache on disk.
//!
//! Layout under the cache root:
//!
//! ```text
//! <cache-root>/markers/<fingerprint>.png              final markers
//! <cache-root>/markers/_workspace/<fingerprint>.png   colourized templates
//! ```
//!
//! Entries are never modified after they are written. Two writers racing on
//! the same fingerprint produce identical bytes, so whichever rename lands
//! last is as good as the first.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::{ImageFormat, RgbaImage};

use crate::error::{MarkerError, MarkerResult};
use crate::fingerprint::Fingerprint;

/// Directory of final markers, relative to the cache root.
pub const MARKERS_DIR: &str = "markers";

/// Directory of colourized templates, relative to the markers directory.
pub const WORKSPACE_DIR: &str = "_workspace";

/// Distinguishes temporary files of concurrent writers within one process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Which set of artifacts an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Final composited markers.
    Markers,
    /// Intermediate colourized templates.
    Workspace,
}

/// A decoded cache entry together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRaster {
    pub path: PathBuf,
    pub image: RgbaImage,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedRaster),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Creates `dir` and its parents if absent.
///
/// Succeeds when the directory already exists, including when another
/// process creates it concurrently. Any other failure is returned.
pub fn ensure_dir(dir: &Path) -> MarkerResult<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(MarkerError::io(dir, e)),
    }
}

/// Read-through PNG store keyed by [`Fingerprint`].
#[derive(Debug, Clone)]
pub struct MarkerCache {
    root: PathBuf,
}

impl MarkerCache {
    /// A cache rooted at `cache_root` (the directory containing `markers/`).
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            root: cache_root.into(),
        }
    }

    /// The `markers/` directory.
    pub fn markers_dir(&self) -> PathBuf {
        self.root.join(MARKERS_DIR)
    }

    pub fn dir(&self, namespace: Namespace) -> PathBuf {
        match namespace {
            Namespace::Markers => self.markers_dir(),
            Namespace::Workspace => self.markers_dir().join(WORKSPACE_DIR),
        }
    }

    /// Where the entry for `fingerprint` lives, whether or not it exists.
    pub fn path(&self, namespace: Namespace, fingerprint: &Fingerprint) -> PathBuf {
        self.dir(namespace).join(fingerprint.file_name())
    }

    /// The entry's path if a file is present, without reading it.
    pub fn locate(&self, namespace: Namespace, fingerprint: &Fingerprint) -> Option<PathBuf> {
        let path = self.path(namespace, fingerprint);
        path.is_file().then_some(path)
    }

    /// Raw PNG bytes of an entry, or `None` when it is absent.
    pub fn read(
        &self,
        namespace: Namespace,
        fingerprint: &Fingerprint,
    ) -> MarkerResult<Option<Vec<u8>>> {
        let path = self.path(namespace, fingerprint);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MarkerError::io(&path, e)),
        }
    }

    /// Looks up and decodes an entry.
    ///
    /// A missing file is a miss. So is a file that no longer decodes as a
    /// PNG; it gets re-rendered over. Any other read failure is an error.
    pub fn fetch(
        &self,
        namespace: Namespace,
        fingerprint: &Fingerprint,
    ) -> MarkerResult<CacheLookup> {
        let Some(bytes) = self.read(namespace, fingerprint)? else {
            return Ok(CacheLookup::Miss);
        };
        let path = self.path(namespace, fingerprint);

        match image::load_from_memory_with_format(&bytes, ImageFormat::Png) {
            Ok(image) => Ok(CacheLookup::Hit(CachedRaster {
                path,
                image: image.into_rgba8(),
            })),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache entry, re-rendering");
                Ok(CacheLookup::Miss)
            }
        }
    }

    /// Writes `image` as the entry for `fingerprint` and returns it as read
    /// back from disk.
    ///
    /// The PNG is written to a temporary sibling and renamed into place, so
    /// readers never observe a partial file.
    pub fn store(
        &self,
        namespace: Namespace,
        fingerprint: &Fingerprint,
        image: &RgbaImage,
    ) -> MarkerResult<CachedRaster> {
        let dir = self.dir(namespace);
        ensure_dir(&dir)?;

        let path = self.path(namespace, fingerprint);
        let tmp = dir.join(format!(
            ".{}.{}-{}.tmp",
            fingerprint,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = image.save_with_format(&tmp, ImageFormat::Png) {
            let _ = fs::remove_file(&tmp);
            return Err(MarkerError::image(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(MarkerError::io(&path, e));
        }
        tracing::info!(path = %path.display(), "stored cache entry");

        match self.fetch(namespace, fingerprint)? {
            CacheLookup::Hit(raster) => Ok(raster),
            CacheLookup::Miss => Err(MarkerError::io(
                &path,
                std::io::Error::new(ErrorKind::InvalidData, "entry unreadable right after store"),
            )),
        }
    }

    /// Deletes the whole `markers/` tree, working artifacts included.
    ///
    /// Returns false when there was nothing to delete.
    pub fn clear(&self) -> MarkerResult<bool> {
        let dir = self.markers_dir();
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MarkerError::io(&dir, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(6, 4, |x, y| Rgba([x as u8 * 40, y as u8 * 60, 7, 200]))
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("nothing");
        assert_eq!(cache.fetch(Namespace::Markers, &fp).unwrap(), CacheLookup::Miss);
    }

    #[test]
    fn store_then_fetch_hits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("entry");

        let stored = cache.store(Namespace::Markers, &fp, &sample()).unwrap();
        assert_eq!(stored.path, dir.path().join("markers").join(fp.file_name()));
        assert_eq!(stored.image, sample());

        match cache.fetch(Namespace::Markers, &fp).unwrap() {
            CacheLookup::Hit(raster) => assert_eq!(raster, stored),
            CacheLookup::Miss => panic!("expected a hit"),
        }
    }

    #[test]
    fn namespaces_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("shared");

        let stored = cache.store(Namespace::Workspace, &fp, &sample()).unwrap();
        assert_eq!(
            stored.path,
            dir.path().join("markers/_workspace").join(fp.file_name())
        );
        assert!(!cache.fetch(Namespace::Markers, &fp).unwrap().is_hit());
        assert!(cache.fetch(Namespace::Workspace, &fp).unwrap().is_hit());
    }

    #[test]
    fn store_leaves_only_the_png() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("tidy");
        cache.store(Namespace::Markers, &fp, &sample()).unwrap();

        let names: Vec<_> = fs::read_dir(cache.markers_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![fp.file_name()]);
    }

    #[test]
    fn overwrite_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("twice");
        let first = cache.store(Namespace::Markers, &fp, &sample()).unwrap();
        let bytes = fs::read(&first.path).unwrap();
        let second = cache.store(Namespace::Markers, &fp, &sample()).unwrap();
        assert_eq!(fs::read(&second.path).unwrap(), bytes);
    }

    #[test]
    fn failed_encode_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("empty");

        // PNG cannot encode a zero-width image.
        assert!(matches!(
            cache.store(Namespace::Markers, &fp, &RgbaImage::new(0, 0)),
            Err(MarkerError::Image { .. })
        ));
        assert_eq!(fs::read_dir(cache.markers_dir()).unwrap().count(), 0);
    }

    #[test]
    fn locate_and_read_do_not_decode() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("raw");
        assert_eq!(cache.locate(Namespace::Markers, &fp), None);
        assert_eq!(cache.read(Namespace::Markers, &fp).unwrap(), None);

        ensure_dir(&cache.markers_dir()).unwrap();
        fs::write(cache.path(Namespace::Markers, &fp), b"opaque").unwrap();
        assert_eq!(
            cache.locate(Namespace::Markers, &fp),
            Some(cache.path(Namespace::Markers, &fp))
        );
        assert_eq!(
            cache.read(Namespace::Markers, &fp).unwrap().as_deref(),
            Some(&b"opaque"[..])
        );
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        let fp = Fingerprint::of_str("corrupt");
        ensure_dir(&cache.markers_dir()).unwrap();
        fs::write(cache.path(Namespace::Markers, &fp), b"not a png").unwrap();
        assert_eq!(cache.fetch(Namespace::Markers, &fp).unwrap(), CacheLookup::Miss);
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn ensure_dir_fails_on_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(ensure_dir(&file).is_err());
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        assert!(!cache.clear().unwrap());

        cache.store(Namespace::Markers, &Fingerprint::of_str("a"), &sample()).unwrap();
        cache.store(Namespace::Workspace, &Fingerprint::of_str("b"), &sample()).unwrap();
        assert!(cache.clear().unwrap());
        assert!(!cache.markers_dir().exists());
    }
}
