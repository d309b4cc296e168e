use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use veneer_config::RewriteConfig;
use veneer_packages::{canonicalize_or_keep, NodeResolver, PlainResolver};

use crate::error::OverlayError;
use crate::overlay::OverlayResolver;

type PlainResolverFactory = Box<dyn Fn(&Path) -> Arc<dyn PlainResolver> + Send + Sync>;

/// Shares one [`OverlayResolver`] per identifier between every component that asks for it.
///
/// Construct one registry at program start and pass it to whatever needs shared resolvers.
pub struct ResolverRegistry {
    factory: PlainResolverFactory,
    config: RewriteConfig,
    resolvers: Mutex<HashMap<String, Arc<OverlayResolver>>>,
}

impl ResolverRegistry {
    /// A registry backed by [`NodeResolver`] and the default rewrite configuration.
    pub fn new() -> Self {
        Self::with_factory(|app_root| Arc::new(NodeResolver::new(app_root)))
    }

    pub fn with_factory(
        factory: impl Fn(&Path) -> Arc<dyn PlainResolver> + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            config: RewriteConfig::default(),
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_rewrite_config(mut self, config: RewriteConfig) -> Self {
        self.config = config;
        self
    }

    /// The resolver registered under `identifier`, creating it for `app_root` on first use.
    ///
    /// Requesting an existing identifier with a different `app_root` fails with
    /// [`OverlayError::AppRootMismatch`]. Roots are compared after resolving symlinks.
    pub fn shared(
        &self,
        identifier: &str,
        app_root: &Path,
    ) -> Result<Arc<OverlayResolver>, OverlayError> {
        let app_root = canonicalize_or_keep(app_root);
        let app_root = app_root.as_path();
        let mut resolvers = self.resolvers.lock();
        if let Some(existing) = resolvers.get(identifier) {
            if existing.app_root() != app_root {
                tracing::error!(
                    target: "veneer.rewrite",
                    identifier,
                    existing = %existing.app_root().display(),
                    requested = %app_root.display(),
                    "resolver app root disagreement"
                );
                return Err(OverlayError::AppRootMismatch {
                    identifier: identifier.to_string(),
                    existing: existing.app_root().to_path_buf(),
                    requested: app_root.to_path_buf(),
                });
            }
            return Ok(Arc::clone(existing));
        }

        let resolver = Arc::new(OverlayResolver::with_config(
            (self.factory)(app_root),
            &self.config,
        )?);
        resolvers.insert(identifier.to_string(), Arc::clone(&resolver));
        Ok(resolver)
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
