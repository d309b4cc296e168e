use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexSet;
use veneer_config::RewriteConfig;
use veneer_packages::{Package, PlainResolver, Result};

use crate::index::{IndexError, RewriteIndex};
use crate::package::OverlayPackage;
use crate::wrapped::WrappedPackages;

/// Resolves packages as if every rewritten package had always lived at its rewritten root.
///
/// Wraps a [`PlainResolver`] and consults the [`RewriteIndex`] on every query. Packages that
/// were never rewritten fall straight through to the plain resolver; results that have a
/// rewritten counterpart are swapped for it ("moved substitution"), and rewritten packages come
/// back as [`OverlayPackage::Moved`] handles that are identical across calls.
///
/// A resolver is a snapshot of one completed rewrite pass: the index is read once at
/// construction and never refreshed.
pub struct OverlayResolver {
    plain: Arc<dyn PlainResolver>,
    index: RewriteIndex,
    wrapped: WrappedPackages,
}

impl OverlayResolver {
    /// Load the rewrite index for the plain resolver's app root from the default location.
    pub fn new(plain: Arc<dyn PlainResolver>) -> std::result::Result<Self, IndexError> {
        Self::with_config(plain, &RewriteConfig::default())
    }

    pub fn with_config(
        plain: Arc<dyn PlainResolver>,
        config: &RewriteConfig,
    ) -> std::result::Result<Self, IndexError> {
        let index = RewriteIndex::load_with_config(plain.app_root(), config)?;
        Ok(Self::with_index(plain, index))
    }

    pub fn with_index(plain: Arc<dyn PlainResolver>, index: RewriteIndex) -> Self {
        Self {
            plain,
            index,
            wrapped: WrappedPackages::default(),
        }
    }

    pub fn app_root(&self) -> &Path {
        self.plain.app_root()
    }

    pub fn index(&self) -> &RewriteIndex {
        &self.index
    }

    /// Number of rewritten packages handed out so far.
    pub fn moved_package_count(&self) -> usize {
        self.wrapped.len()
    }

    /// Resolve the dependency `name` as seen from `from`.
    ///
    /// For a rewritten `from`, extra resolution edges are checked first (in declaration order)
    /// and shadow organic dependencies of the same name; otherwise `name` is resolved from the
    /// package's original root. Either way the result is moved-substituted.
    ///
    /// `NotFound` from the plain resolver is returned unchanged. Every extra resolution target
    /// of a rewritten `from` is loaded on each call, so a target whose manifest is missing or
    /// malformed fails every lookup from that package, including lookups of unrelated names.
    pub fn resolve(&self, name: &str, from: &OverlayPackage) -> Result<OverlayPackage> {
        let Some(old_root) = self.index.old_root(from.root()) else {
            let found = self.plain.resolve(name, from.package())?;
            return self.maybe_moved(found);
        };

        for target in self.index.extra_resolutions(from.root()) {
            let candidate = self.plain.get(target)?;
            if candidate.name() == name {
                tracing::trace!(
                    target: "veneer.rewrite",
                    name,
                    from = %from.root().display(),
                    root = %candidate.root().display(),
                    "resolved through extra resolution"
                );
                return self.maybe_moved(candidate);
            }
        }

        let original = self.plain.get(old_root)?;
        let found = self.plain.resolve(name, &original)?;
        self.maybe_moved(found)
    }

    /// The package rooted exactly at `root`.
    pub fn get(&self, root: &Path) -> Result<OverlayPackage> {
        let pkg = self.plain.get(root)?;
        self.maybe_moved(pkg)
    }

    /// The package at its pre-rewrite location, or `None` if `pkg` was never rewritten.
    pub fn original(&self, pkg: &OverlayPackage) -> Result<Option<OverlayPackage>> {
        match self.index.old_root(pkg.root()) {
            Some(old_root) => Ok(Some(OverlayPackage::Plain(self.plain.get(old_root)?))),
            None => Ok(None),
        }
    }

    /// The package owning `file`, moved-substituted.
    pub fn owner_of_file(&self, file: &Path) -> Result<Option<OverlayPackage>> {
        match self.plain.owner_of_file(file)? {
            Some(owner) => self.maybe_moved(owner).map(Some),
            None => Ok(None),
        }
    }

    /// Resolved dependencies of `pkg`, in declaration order.
    ///
    /// Each declared name is resolved through [`OverlayResolver::resolve`] from `pkg` itself, so
    /// transitively rewritten dependencies come back wrapped. Names that cannot be found are
    /// dropped; any other failure aborts.
    pub fn dependencies(&self, pkg: &OverlayPackage) -> Result<Vec<OverlayPackage>> {
        let mut deps = Vec::with_capacity(pkg.dependency_names().len());
        for name in pkg.dependency_names() {
            match self.resolve(name, pkg) {
                Ok(dep) => deps.push(dep),
                Err(err) if err.is_not_found() => {
                    tracing::debug!(
                        target: "veneer.rewrite",
                        name = %name,
                        from = %pkg.root().display(),
                        "skipping unresolvable dependency"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(deps)
    }

    /// Every package reachable from `pkg` (excluding `pkg` itself), in breadth-first discovery
    /// order.
    pub fn find_descendants(&self, pkg: &OverlayPackage) -> Result<Vec<OverlayPackage>> {
        self.find_descendants_by(pkg, |_| true)
    }

    /// Like [`OverlayResolver::find_descendants`], but only follows dependencies accepted by
    /// `filter`. A package rejected by `filter` is neither returned nor traversed, even if it
    /// is also reachable some other way.
    pub fn find_descendants_by(
        &self,
        pkg: &OverlayPackage,
        mut filter: impl FnMut(&OverlayPackage) -> bool,
    ) -> Result<Vec<OverlayPackage>> {
        let mut seen: IndexSet<OverlayPackage> = IndexSet::new();
        let mut queue = VecDeque::from([pkg.clone()]);

        while let Some(current) = queue.pop_front() {
            if seen.contains(&current) {
                continue;
            }
            let deps = self.dependencies(&current)?;
            seen.insert(current);
            queue.extend(deps.into_iter().filter(|dep| filter(dep)));
        }

        seen.shift_remove(pkg);
        Ok(seen.into_iter().collect())
    }

    fn maybe_moved(&self, pkg: Arc<Package>) -> Result<OverlayPackage> {
        match self.index.new_root(pkg.root()) {
            Some(new_root) => {
                tracing::trace!(
                    target: "veneer.rewrite",
                    from = %pkg.root().display(),
                    to = %new_root.display(),
                    "substituting rewritten package"
                );
                let moved = self.plain.get(new_root)?;
                Ok(self.maybe_wrap(moved))
            }
            None => Ok(self.maybe_wrap(pkg)),
        }
    }

    fn maybe_wrap(&self, pkg: Arc<Package>) -> OverlayPackage {
        match self.index.old_root(pkg.root()) {
            Some(old_root) => OverlayPackage::Moved(self.wrapped.wrap(pkg, old_root)),
            None => OverlayPackage::Plain(pkg),
        }
    }
}
