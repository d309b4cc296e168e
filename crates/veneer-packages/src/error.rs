use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PackageError>;

/// Errors produced while reading manifests or resolving packages.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// A dependency name could not be located from the given origin.
    ///
    /// This is the only kind that dependency-list computation tolerates; every other variant
    /// aborts it.
    #[error("cannot find package `{name}` from {from}")]
    NotFound { name: String, from: PathBuf },

    #[error("no package.json in {root}")]
    MissingManifest { root: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid package manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },
}

impl PackageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PackageError::NotFound { .. })
    }

    pub(crate) fn not_found(name: &str, from: impl Into<PathBuf>) -> Self {
        PackageError::NotFound {
            name: name.to_string(),
            from: from.into(),
        }
    }
}
