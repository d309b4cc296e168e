use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::package::Package;

/// Filesystem-level package resolution with no knowledge of rewritten packages.
///
/// Implementations are expected to memoise manifest parses so that repeated lookups of the same
/// root are cheap; callers must not rely on them returning the same `Arc` twice.
pub trait PlainResolver: Send + Sync {
    /// Root directory of the application whose package graph is being resolved.
    fn app_root(&self) -> &Path;

    /// The package rooted exactly at `root`.
    fn get(&self, root: &Path) -> Result<Arc<Package>>;

    /// Resolve the dependency `name` as seen from `from`.
    ///
    /// Fails with [`crate::PackageError::NotFound`] when nothing satisfies `name`.
    fn resolve(&self, name: &str, from: &Package) -> Result<Arc<Package>>;

    /// The package that owns `file`, if any.
    fn owner_of_file(&self, file: &Path) -> Result<Option<Arc<Package>>>;
}
