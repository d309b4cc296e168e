//! Package model and plain (non-rewritten) package resolution.
//!
//! A [`Package`] is a directory with a `package.json`; its root path is its identity. The
//! [`PlainResolver`] trait answers "which package does `name` resolve to from here" using only
//! what is on disk, and [`NodeResolver`] implements it with node's `node_modules` search.

mod error;
mod node;
mod package;
mod resolver;

pub use error::{PackageError, Result};
pub use node::{canonicalize_or_keep, NodeResolver};
pub use package::{
    Package, PackageFlags, ENGINE_KEYWORD, FRAMEWORK_KEYWORD, FRAMEWORK_META_KEY, MANIFEST_FILE,
};
pub use resolver::PlainResolver;
