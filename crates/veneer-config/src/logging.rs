use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for all veneer crates, or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr. When disabled no subscriber is installed.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
}

const DEFAULT_LEVEL: &str = "info";

impl LoggingConfig {
    fn default_level() -> String {
        DEFAULT_LEVEL.to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// Directive strings to try, most specific first.
    ///
    /// `RUST_LOG` directives are appended after the configured level so they win for any target
    /// both mention. If the combination does not parse, `RUST_LOG` alone and then the configured
    /// level alone are tried.
    fn filter_candidates(&self, rust_log: Option<&str>) -> Vec<String> {
        let configured = level_directive(&self.level);
        let mut candidates = Vec::with_capacity(3);
        if let Some(rust_log) = rust_log.map(str::trim).filter(|value| !value.is_empty()) {
            candidates.push(format!("{configured},{rust_log}"));
            candidates.push(rust_log.to_owned());
        }
        candidates.push(configured);
        candidates
    }

    /// The effective `tracing` filter for this config and the current `RUST_LOG`.
    pub fn env_filter(&self) -> EnvFilter {
        let rust_log = std::env::var("RUST_LOG").ok();
        self.filter_candidates(rust_log.as_deref())
            .into_iter()
            .find_map(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
    }
}

/// A bare level name in canonical spelling; anything else is taken as filter directives.
fn level_directive(level: &str) -> String {
    let trimmed = level.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" => DEFAULT_LEVEL.to_owned(),
        "warning" => "warn".to_owned(),
        bare @ ("off" | "error" | "warn" | "info" | "debug" | "trace") => bare.to_owned(),
        _ => trimmed.to_owned(),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global `tracing` subscriber.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        if !config.stderr {
            return;
        }

        let filter = config.env_filter();
        let registry = tracing_subscriber::registry().with(filter);
        let result = if config.json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
        };

        if let Err(err) = result {
            // Embedders may already have installed their own subscriber.
            eprintln!("veneer: tracing subscriber not installed: {err}");
        }
    });
}
