use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{PackageError, Result};
use crate::package::{Package, MANIFEST_FILE};
use crate::resolver::PlainResolver;

const NODE_MODULES: &str = "node_modules";

/// The canonical form of `path` with symlinks resolved, or `path` unchanged when it does not
/// exist.
///
/// Package roots, the app root and rewrite index entries all go through this so that paths
/// reached via a symlink compare equal to the ones the resolver hands out.
pub fn canonicalize_or_keep(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// A [`PlainResolver`] that follows node's `node_modules` lookup rules.
///
/// Parsed manifests are cached per canonical root for the lifetime of the resolver.
#[derive(Debug)]
pub struct NodeResolver {
    app_root: PathBuf,
    packages: Mutex<HashMap<PathBuf, Arc<Package>>>,
}

impl NodeResolver {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: canonicalize_or_keep(&app_root.into()),
            packages: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, root: &Path) -> Option<Arc<Package>> {
        self.packages.lock().get(root).cloned()
    }
}

impl PlainResolver for NodeResolver {
    fn app_root(&self) -> &Path {
        &self.app_root
    }

    fn get(&self, root: &Path) -> Result<Arc<Package>> {
        if let Some(pkg) = self.cached(root) {
            return Ok(pkg);
        }
        let root = &canonicalize_or_keep(root);
        if let Some(pkg) = self.cached(root) {
            return Ok(pkg);
        }

        let pkg = Arc::new(Package::load(root, *root == self.app_root)?);
        // Another caller may have raced us here; keep whichever landed first so every caller
        // shares one instance per root.
        let mut packages = self.packages.lock();
        Ok(Arc::clone(
            packages.entry(root.to_path_buf()).or_insert(pkg),
        ))
    }

    fn resolve(&self, name: &str, from: &Package) -> Result<Arc<Package>> {
        let Some(segments) = package_name_segments(name) else {
            return Err(PackageError::not_found(name, from.root()));
        };

        for dir in from.root().ancestors() {
            if dir.file_name() == Some(OsStr::new(NODE_MODULES)) {
                continue;
            }

            let mut candidate = dir.join(NODE_MODULES);
            candidate.extend(&segments);
            if !candidate.join(MANIFEST_FILE).is_file() {
                continue;
            }

            let root = dunce::canonicalize(&candidate).map_err(|source| PackageError::Io {
                path: candidate.clone(),
                source,
            })?;
            tracing::trace!(
                target: "veneer.packages",
                name,
                from = %from.root().display(),
                root = %root.display(),
                "resolved package"
            );
            return self.get(&root);
        }

        Err(PackageError::not_found(name, from.root()))
    }

    fn owner_of_file(&self, file: &Path) -> Result<Option<Arc<Package>>> {
        let file = canonicalize_or_keep(file);
        for dir in file.ancestors() {
            if dir.as_os_str().is_empty() || dir.file_name() == Some(OsStr::new(NODE_MODULES)) {
                // Crossing a `node_modules` directory leaves the package the file lived in.
                break;
            }
            if let Some(pkg) = self.cached(dir) {
                return Ok(Some(pkg));
            }
            if dir.join(MANIFEST_FILE).is_file() {
                return self.get(dir).map(Some);
            }
        }
        Ok(None)
    }
}

/// Split a package name (`lodash`, `@scope/pkg`) into path segments.
///
/// Returns `None` for names that could escape `node_modules`.
fn package_name_segments(name: &str) -> Option<Vec<&str>> {
    if name.is_empty() || name.contains('\\') {
        return None;
    }
    let segments: Vec<&str> = name.split('/').collect();
    let valid_len = if name.starts_with('@') {
        segments.len() == 2
    } else {
        segments.len() == 1
    };
    if !valid_len
        || segments
            .iter()
            .any(|segment| segment.is_empty() || *segment == "." || *segment == "..")
    {
        return None;
    }
    Some(segments)
}
