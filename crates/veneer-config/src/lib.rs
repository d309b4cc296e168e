//! Configuration for veneer tools.
//!
//! Configuration lives in `veneer.toml` (or `.veneer.toml`) at the application root. Every
//! section is optional; a missing file means defaults everywhere.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! json = false
//!
//! [rewrite]
//! working_dir = "node_modules/.embroider"
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod logging;

pub use logging::{init_tracing, LoggingConfig};

/// Environment variable pointing at an explicit config file.
pub const VENEER_CONFIG_ENV_VAR: &str = "VENEER_CONFIG_PATH";

/// Environment variable overriding the build tooling working directory.
pub const WORKING_DIR_ENV_VAR: &str = "VENEER_WORKING_DIRECTORY";

/// Working directory used when neither config nor environment override it, relative to the
/// application root.
pub const DEFAULT_WORKING_DIR: &str = "node_modules/.embroider";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VeneerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rewrite: RewriteConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    /// Tooling working directory holding `rewritten-packages/` (relative to the app root
    /// unless absolute).
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl RewriteConfig {
    /// Resolve the working directory for `app_root`.
    ///
    /// Precedence: [`WORKING_DIR_ENV_VAR`], then `working_dir`, then [`DEFAULT_WORKING_DIR`].
    pub fn working_dir(&self, app_root: &Path) -> PathBuf {
        let configured = {
            let _guard = config_env_lock().lock();
            std::env::var_os(WORKING_DIR_ENV_VAR)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };
        let dir = configured
            .or_else(|| self.working_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKING_DIR));
        // `join` keeps absolute paths as-is.
        app_root.join(dir)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config {path}: {message}")]
    Toml { path: PathBuf, message: String },
}

impl VeneerConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|err| ConfigError::Toml {
            path: path.to_path_buf(),
            // `message()` omits the source snippet.
            message: err.message().to_string(),
        })
    }
}

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Run `f` while holding the config environment lock.
///
/// Tests that temporarily set [`VENEER_CONFIG_ENV_VAR`] or [`WORKING_DIR_ENV_VAR`] wrap the
/// mutation and the lookup in this helper so concurrent tests never observe each other's
/// overrides.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Discover the config file for an application root.
///
/// Search order:
/// 1) `VENEER_CONFIG_PATH` (absolute or relative to `app_root`)
/// 2) `veneer.toml` in `app_root`
/// 3) `.veneer.toml` in `app_root`
pub fn discover_config_path(app_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(VENEER_CONFIG_ENV_VAR) {
        let path = app_root.join(PathBuf::from(value));
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["veneer.toml", ".veneer.toml"]
        .into_iter()
        .map(|name| app_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the configuration for an application root.
///
/// If no config is present, returns [`VeneerConfig::default`] and `None`.
pub fn load_for_app(app_root: &Path) -> Result<(VeneerConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(app_root) else {
        return Ok((VeneerConfig::default(), None));
    };

    let config = VeneerConfig::load_from_path(&path)?;
    tracing::debug!(target: "veneer.config", path = %path.display(), "loaded config");
    Ok((config, Some(path)))
}
