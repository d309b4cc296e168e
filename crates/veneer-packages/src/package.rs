use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

use crate::error::{PackageError, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// Keyword marking a package as a framework addon.
pub const FRAMEWORK_KEYWORD: &str = "ember-addon";
/// Keyword marking a framework addon as an engine.
pub const ENGINE_KEYWORD: &str = "ember-engine";
/// Manifest key holding framework-specific package metadata.
pub const FRAMEWORK_META_KEY: &str = "ember-addon";

/// Capability flags derived from a package manifest.
///
/// These are location-independent facts: a rewritten copy of a package reports the same flags
/// as the original.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PackageFlags {
    pub is_framework_package: bool,
    pub is_engine: bool,
    pub is_lazy_engine: bool,
    pub is_v2_addon: bool,
    pub is_v2_app: bool,
}

impl PackageFlags {
    fn from_manifest(manifest: &PackageJson) -> Self {
        let has_keyword = |keyword: &str| {
            manifest
                .keywords
                .iter()
                .any(|value| value.as_str() == Some(keyword))
        };

        let is_framework_package = has_keyword(FRAMEWORK_KEYWORD);
        let is_engine = has_keyword(ENGINE_KEYWORD);
        let meta = manifest.framework_meta.as_ref();

        let is_lazy_engine = is_engine
            && meta
                .and_then(|meta| meta.lazy_loading.as_ref())
                .is_some_and(|lazy| lazy.enabled);

        let is_v2 = is_framework_package && meta.and_then(|meta| meta.version) == Some(2);
        let kind = meta.and_then(|meta| meta.kind.as_deref());

        Self {
            is_framework_package,
            is_engine,
            is_lazy_engine,
            // v2 packages without an explicit type are addons.
            is_v2_addon: is_v2 && matches!(kind, None | Some("addon")),
            is_v2_app: is_v2 && kind == Some("app"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    peer_dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    keywords: Vec<serde_json::Value>,
    #[serde(default, rename = "ember-addon")]
    framework_meta: Option<FrameworkMeta>,
}

#[derive(Debug, Default, Deserialize)]
struct FrameworkMeta {
    #[serde(default)]
    version: Option<u64>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default, rename = "lazy-loading")]
    lazy_loading: Option<LazyLoading>,
}

#[derive(Debug, Default, Deserialize)]
struct LazyLoading {
    #[serde(default)]
    enabled: bool,
}

/// A package rooted at a directory containing a `package.json`.
///
/// The root directory is the package's identity.
#[derive(Debug)]
pub struct Package {
    root: PathBuf,
    name: String,
    version: Option<String>,
    manifest: serde_json::Value,
    flags: PackageFlags,
    is_app: bool,
    dependency_names: Vec<String>,
}

impl Package {
    /// Read and parse `<root>/package.json`.
    pub fn load(root: &Path, is_app: bool) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackageError::MissingManifest {
                    root: root.to_path_buf(),
                });
            }
            Err(source) => return Err(PackageError::Io { path, source }),
        };
        Self::from_manifest_str(root.to_path_buf(), &text, is_app)
    }

    pub fn from_manifest_str(root: PathBuf, text: &str, is_app: bool) -> Result<Self> {
        let manifest_path = root.join(MANIFEST_FILE);
        let invalid = |message: String| PackageError::Manifest {
            path: manifest_path.clone(),
            message,
        };

        let manifest: serde_json::Value =
            serde_json::from_str(text).map_err(|err| invalid(err.to_string()))?;
        let parsed: PackageJson =
            serde_json::from_value(manifest.clone()).map_err(|err| invalid(err.to_string()))?;

        let name = match parsed.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(invalid("missing `name` field".to_string())),
        };

        // Peer dependencies come first, then runtime dependencies; dev dependencies are only
        // visible to the application itself.
        let mut names: IndexSet<String> = IndexSet::new();
        names.extend(parsed.peer_dependencies.keys().cloned());
        names.extend(parsed.dependencies.keys().cloned());
        if is_app {
            names.extend(parsed.dev_dependencies.keys().cloned());
        }

        Ok(Self {
            flags: PackageFlags::from_manifest(&parsed),
            version: parsed.version,
            dependency_names: names.into_iter().collect(),
            root,
            name,
            manifest,
            is_app,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The raw `package.json` contents.
    pub fn manifest(&self) -> &serde_json::Value {
        &self.manifest
    }

    /// Framework-specific metadata (the `ember-addon` manifest section), if any.
    pub fn framework_meta(&self) -> Option<&serde_json::Value> {
        self.manifest.get(FRAMEWORK_META_KEY)
    }

    pub fn flags(&self) -> PackageFlags {
        self.flags
    }

    pub fn is_app(&self) -> bool {
        self.is_app
    }

    /// Declared dependency names, in manifest order.
    pub fn dependency_names(&self) -> &[String] {
        &self.dependency_names
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependency_names.iter().any(|dep| dep == name)
    }
}
