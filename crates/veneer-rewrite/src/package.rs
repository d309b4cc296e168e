use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use veneer_packages::{Package, PackageFlags};

/// A package that physically lives at a rewritten root.
///
/// Descriptive attributes come straight from the package at the rewritten location; graph
/// operations (`dependencies`, `find_descendants`) are answered by the
/// [`crate::OverlayResolver`] that handed the package out, so that they resolve from the
/// original location.
#[derive(Debug)]
pub struct MovedPackage {
    plain: Arc<Package>,
    original_root: PathBuf,
}

impl MovedPackage {
    pub(crate) fn new(plain: Arc<Package>, original_root: PathBuf) -> Self {
        Self {
            plain,
            original_root,
        }
    }

    /// The plain package at the rewritten root.
    pub fn plain(&self) -> &Arc<Package> {
        &self.plain
    }

    /// Root of the package before it was rewritten.
    pub fn original_root(&self) -> &Path {
        &self.original_root
    }
}

/// A package as seen through the overlay.
///
/// Both variants answer the same questions; callers should not need to care which one they
/// hold. Equality and hashing follow the package root, so handles for the same root compare
/// equal even when the plain resolver parsed the manifest twice. Per-package caches downstream
/// key on this.
#[derive(Debug, Clone)]
pub enum OverlayPackage {
    /// A package that was never rewritten.
    Plain(Arc<Package>),
    /// A package served from its rewritten root.
    Moved(Arc<MovedPackage>),
}

impl OverlayPackage {
    /// The underlying package data.
    pub fn package(&self) -> &Package {
        match self {
            OverlayPackage::Plain(pkg) => pkg,
            OverlayPackage::Moved(moved) => &moved.plain,
        }
    }

    pub fn root(&self) -> &Path {
        self.package().root()
    }

    pub fn name(&self) -> &str {
        self.package().name()
    }

    pub fn version(&self) -> Option<&str> {
        self.package().version()
    }

    pub fn manifest(&self) -> &serde_json::Value {
        self.package().manifest()
    }

    pub fn framework_meta(&self) -> Option<&serde_json::Value> {
        self.package().framework_meta()
    }

    pub fn flags(&self) -> PackageFlags {
        self.package().flags()
    }

    pub fn is_app(&self) -> bool {
        self.package().is_app()
    }

    pub fn dependency_names(&self) -> &[String] {
        self.package().dependency_names()
    }

    /// Whether the package declares `name` in its own manifest.
    ///
    /// Extra resolution edges are not consulted: a package that relies on one is expected to
    /// declare the dependency as well.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.package().has_dependency(name)
    }

    pub fn is_moved(&self) -> bool {
        matches!(self, OverlayPackage::Moved(_))
    }

    pub fn as_moved(&self) -> Option<&MovedPackage> {
        match self {
            OverlayPackage::Moved(moved) => Some(moved),
            OverlayPackage::Plain(_) => None,
        }
    }

    fn identity(&self) -> (bool, &Path) {
        (self.is_moved(), self.root())
    }
}

impl PartialEq for OverlayPackage {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for OverlayPackage {}

impl Hash for OverlayPackage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}
