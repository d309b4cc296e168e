use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use veneer_config::RewriteConfig;
use veneer_packages::canonicalize_or_keep;

/// Directory under the tooling working directory that holds rewritten packages.
pub const REWRITTEN_PACKAGES_DIR: &str = "rewritten-packages";
pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read rewrite index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rewrite index {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("original package {root} is rewritten more than once")]
    DuplicateOriginal { root: PathBuf },

    #[error("rewritten root {root} is claimed by more than one original package")]
    DuplicateRewritten { root: PathBuf },
}

/// On-disk shape of `rewritten-packages/index.json`.
///
/// All paths are relative to the directory containing the index file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexFile {
    packages: IndexMap<String, String>,
    extra_resolutions: IndexMap<String, Vec<String>>,
}

/// The result of a completed rewrite pass: which packages moved where, and which synthetic
/// dependency edges rewritten packages gained.
///
/// Immutable once loaded. `old_to_new` and `new_to_old` are exact inverses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteIndex {
    old_to_new: BTreeMap<PathBuf, PathBuf>,
    new_to_old: BTreeMap<PathBuf, PathBuf>,
    extra_resolutions: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl RewriteIndex {
    /// An index with no rewriting in effect.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Location of the index file beneath a tooling working directory.
    pub fn index_path(working_dir: &Path) -> PathBuf {
        working_dir.join(REWRITTEN_PACKAGES_DIR).join(INDEX_FILE)
    }

    /// Load the index for `app_root` from the default working directory.
    pub fn load(app_root: &Path) -> Result<Self, IndexError> {
        Self::load_with_config(app_root, &RewriteConfig::default())
    }

    pub fn load_with_config(app_root: &Path, config: &RewriteConfig) -> Result<Self, IndexError> {
        Self::load_from(&Self::index_path(&config.working_dir(app_root)))
    }

    /// Load an index file. A missing file yields [`RewriteIndex::empty`].
    ///
    /// Relative entries are resolved against the directory holding the index file.
    pub fn load_from(index_path: &Path) -> Result<Self, IndexError> {
        let text = match std::fs::read_to_string(index_path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    target: "veneer.rewrite",
                    path = %index_path.display(),
                    "no rewrite index; packages are served unmodified"
                );
                return Ok(Self::empty());
            }
            Err(source) => {
                return Err(IndexError::Io {
                    path: index_path.to_path_buf(),
                    source,
                })
            }
        };

        let file: IndexFile = serde_json::from_str(&text).map_err(|err| IndexError::Parse {
            path: index_path.to_path_buf(),
            message: err.to_string(),
        })?;

        // Entries must match the canonical roots the plain resolver hands out.
        let base = canonicalize_or_keep(index_path.parent().unwrap_or_else(|| Path::new("")));
        let resolve = |entry: &str| canonicalize_or_keep(&normalize_path(&base.join(entry)));

        let index = Self::from_entries(
            file.packages
                .iter()
                .map(|(old, new)| (resolve(old), resolve(new))),
            file.extra_resolutions.iter().map(|(from, targets)| {
                (
                    resolve(from),
                    targets.iter().map(|target| resolve(target)).collect(),
                )
            }),
        )?;

        tracing::debug!(
            target: "veneer.rewrite",
            path = %index_path.display(),
            packages = index.old_to_new.len(),
            extra_resolutions = index.extra_resolutions.len(),
            "loaded rewrite index"
        );
        Ok(index)
    }

    /// Build an index from absolute `(original, rewritten)` root pairs and extra resolution
    /// edges keyed by rewritten root.
    pub fn from_entries(
        packages: impl IntoIterator<Item = (PathBuf, PathBuf)>,
        extra_resolutions: impl IntoIterator<Item = (PathBuf, Vec<PathBuf>)>,
    ) -> Result<Self, IndexError> {
        let mut index = Self::empty();
        for (old, new) in packages {
            if index.old_to_new.contains_key(&old) {
                return Err(IndexError::DuplicateOriginal { root: old });
            }
            if index.new_to_old.contains_key(&new) {
                return Err(IndexError::DuplicateRewritten { root: new });
            }
            index.old_to_new.insert(old.clone(), new.clone());
            index.new_to_old.insert(new, old);
        }
        for (from, targets) in extra_resolutions {
            index.extra_resolutions.entry(from).or_default().extend(targets);
        }
        Ok(index)
    }

    pub fn is_empty(&self) -> bool {
        self.old_to_new.is_empty() && self.extra_resolutions.is_empty()
    }

    /// The rewritten root for an original package root.
    pub fn new_root(&self, old_root: &Path) -> Option<&Path> {
        self.old_to_new.get(old_root).map(PathBuf::as_path)
    }

    /// The original root for a rewritten package root.
    pub fn old_root(&self, new_root: &Path) -> Option<&Path> {
        self.new_to_old.get(new_root).map(PathBuf::as_path)
    }

    pub fn is_rewritten(&self, root: &Path) -> bool {
        self.new_to_old.contains_key(root)
    }

    /// Synthetic dependency targets for a rewritten root, in priority order.
    pub fn extra_resolutions(&self, new_root: &Path) -> &[PathBuf] {
        self.extra_resolutions
            .get(new_root)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `(original, rewritten)` pairs ordered by original root.
    pub fn packages(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.old_to_new
            .iter()
            .map(|(old, new)| (old.as_path(), new.as_path()))
    }

    /// `(rewritten root, targets)` pairs ordered by rewritten root.
    pub fn all_extra_resolutions(&self) -> impl Iterator<Item = (&Path, &[PathBuf])> {
        self.extra_resolutions
            .iter()
            .map(|(from, targets)| (from.as_path(), targets.as_slice()))
    }
}

/// Lexically remove `.` and `..` components.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                );
                if at_root {
                    if !out.has_root() {
                        out.push("..");
                    }
                } else if out.ends_with("..") {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
