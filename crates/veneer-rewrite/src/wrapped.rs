use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use veneer_packages::Package;

use crate::package::MovedPackage;

/// Hands out one [`MovedPackage`] per rewritten root.
///
/// Keyed by root rather than by the plain package allocation so that identity holds even when
/// the plain resolver returns a fresh `Arc` for a root it has seen before. Wrappers live as long
/// as the owning resolver.
#[derive(Debug, Default)]
pub(crate) struct WrappedPackages {
    by_root: Mutex<HashMap<PathBuf, Arc<MovedPackage>>>,
}

impl WrappedPackages {
    pub(crate) fn wrap(&self, plain: Arc<Package>, original_root: &Path) -> Arc<MovedPackage> {
        let mut by_root = self.by_root.lock();
        if let Some(existing) = by_root.get(plain.root()) {
            return Arc::clone(existing);
        }
        let root = plain.root().to_path_buf();
        let moved = Arc::new(MovedPackage::new(plain, original_root.to_path_buf()));
        by_root.insert(root, Arc::clone(&moved));
        moved
    }

    pub(crate) fn len(&self) -> usize {
        self.by_root.lock().len()
    }
}
