//! Template lookup across ordered search roots.

use std::path::{Component, Path, PathBuf};

/// Resolves a logical template name to a file on disk.
pub trait TemplateResolver: Send + Sync {
    /// Returns the path of the first matching file, or `None` when no root
    /// contains it.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Searches a list of directories in order; the first existing file wins.
///
/// Names must be relative and free of `..` components, so a lookup can never
/// escape its root.
#[derive(Debug, Clone, Default)]
pub struct SearchPathResolver {
    roots: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a root searched after the existing ones.
    pub fn push_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl TemplateResolver for SearchPathResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_contained(Path::new(name)) {
            tracing::debug!(template = name, "rejected template name");
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|candidate| candidate.is_file())
    }
}

fn is_contained(name: &Path) -> bool {
    let mut components = name.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
