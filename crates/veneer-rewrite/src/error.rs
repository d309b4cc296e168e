use std::path::PathBuf;

use crate::index::IndexError;

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The same identifier was requested for two different application roots. This is a bug in
    /// the caller, not a runtime condition to recover from.
    #[error("bug: resolver `{identifier}` is bound to {existing}, but was requested for {requested}")]
    AppRootMismatch {
        identifier: String,
        existing: PathBuf,
        requested: PathBuf,
    },
}
