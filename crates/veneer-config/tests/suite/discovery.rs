use std::ffi::OsString;
use std::path::Path;

use tempfile::tempdir;
use veneer_config::{
    discover_config_path, load_for_app, with_config_env_lock, ConfigError, VeneerConfig,
    VENEER_CONFIG_ENV_VAR,
};

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &Path) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn missing_config_yields_defaults() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(VENEER_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();

        let (config, path) = load_for_app(dir.path()).expect("defaults load");
        assert_eq!(config, VeneerConfig::default());
        assert!(path.is_none());
    });
}

#[test]
fn discovers_veneer_toml_in_app_root() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(VENEER_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("veneer.toml");
        std::fs::write(
            &config_path,
            "[logging]\nlevel = \"debug\"\n[rewrite]\nworking_dir = \"tmp/tooling\"\n",
        )
        .unwrap();

        let discovered = discover_config_path(dir.path()).expect("veneer.toml discovered");
        assert_eq!(discovered, config_path.canonicalize().unwrap_or(config_path));

        let (config, _) = load_for_app(dir.path()).expect("config loads");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.rewrite.working_dir.as_deref(),
            Some(Path::new("tmp/tooling"))
        );
    });
}

#[test]
fn env_override_wins_over_app_file() {
    with_config_env_lock(|| {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("veneer.toml"), "[logging]\njson = false\n").unwrap();

        let override_path = dir.path().join("override.toml");
        std::fs::write(&override_path, "[logging]\njson = true\n").unwrap();
        let _env = EnvVarGuard::set(VENEER_CONFIG_ENV_VAR, &override_path);

        let (config, path) = load_for_app(dir.path()).expect("config loads");
        assert!(config.logging.json);
        assert_eq!(
            path.expect("path reported"),
            override_path.canonicalize().unwrap()
        );
    });
}

#[test]
fn malformed_config_is_an_error() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(VENEER_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".veneer.toml"), "[logging\nlevel = 3").unwrap();

        let err = load_for_app(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }), "{err:?}");
    });
}
