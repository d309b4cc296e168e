//! Overlay package resolution for rewritten packages.
//!
//! A build step may copy some installed packages to new locations and rewrite them there (for
//! example, compiling legacy addons into a newer format). Once that pass has finished, it leaves
//! a [`RewriteIndex`] behind. [`OverlayResolver`] consults it so that every consumer sees the
//! rewritten copies in place of the originals, while dependency lookups from a rewritten copy
//! still behave as if it sat at its original location.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use veneer_packages::NodeResolver;
//! use veneer_rewrite::OverlayResolver;
//!
//! let app = Path::new("/work/my-app");
//! let resolver = OverlayResolver::new(Arc::new(NodeResolver::new(app)))?;
//! let app_pkg = resolver.get(app)?;
//! for dep in resolver.find_descendants(&app_pkg)? {
//!     println!("{} at {}", dep.name(), dep.root().display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod index;
mod overlay;
mod package;
mod registry;
mod wrapped;

pub use error::OverlayError;
pub use index::{IndexError, RewriteIndex, INDEX_FILE, REWRITTEN_PACKAGES_DIR};
pub use overlay::OverlayResolver;
pub use package::{MovedPackage, OverlayPackage};
pub use registry::ResolverRegistry;
