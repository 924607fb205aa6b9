//! `abi-check.toml` loading and logging setup.
//!
//! ```toml
//! [checker]
//! ignored_class_prefixes = ["sun."]
//!
//! [classpath]
//! include_jdk = true
//! entry_points = [{ name = "app", path = "build/classes/java/main" }]
//! entries = [{ name = "com.example:lib:1.2.0", path = "libs/lib-1.2.0.jar" }]
//!
//! [logging]
//! level = "debug"
//! ```

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Once;

use abi_checker::{ConflictCheckerConfiguration, DEFAULT_MAX_ENTRIES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        let message = err.message().trim_end();
        match err.span() {
            Some(span) => ConfigError::Toml(format!("{message} (at byte {})", span.start)),
            None => ConfigError::Toml(message.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbiCheckConfig {
    pub checker: ConflictCheckerConfiguration,
    pub classpath: ClasspathConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// One named classpath entry: a class directory or a jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClasspathEntry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClasspathConfig {
    /// Runtime classpath, in resolution order.
    pub entries: Vec<ClasspathEntry>,

    /// The project's own compiled output. Its classes seed reachability and
    /// the artifacts themselves are never reported.
    pub entry_points: Vec<ClasspathEntry>,

    /// Put the JDK's platform modules ahead of everything else.
    pub include_jdk: bool,

    /// JDK to read modules from. Discovered from `JAVA_HOME` or `PATH` when unset.
    pub jdk_home: Option<PathBuf>,

    /// Runtime feature version used for multi-release jars. Defaults to the
    /// JDK's own version.
    pub release: Option<u32>,
}

impl Default for ClasspathConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            entry_points: Vec::new(),
            include_jdk: true,
            jdk_home: None,
            release: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Decoded classes kept in memory at once.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    /// The configured filter, with `RUST_LOG` directives appended when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let config_directives = Self::normalize_level_directives(&self.level);
        let directives = match std::env::var("RUST_LOG") {
            Ok(env) if !env.trim().is_empty() => format!("{config_directives},{}", env.trim()),
            _ => config_directives,
        };

        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        })
    }
}

impl AbiCheckConfig {
    /// Loads a config file. Relative paths inside it are resolved against the
    /// file's directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::load_from_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: AbiCheckConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be at least 1".to_owned(),
            ));
        }

        let mut names = HashSet::new();
        for entry in self.classpath.entry_points.iter().chain(&self.classpath.entries) {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "classpath entry `{}` has an empty name",
                    entry.path.display()
                )));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "classpath entry name `{}` is used more than once",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        for entry in self
            .classpath
            .entries
            .iter_mut()
            .chain(self.classpath.entry_points.iter_mut())
        {
            resolve(&mut entry.path);
        }
        if let Some(home) = self.classpath.jdk_home.as_mut() {
            resolve(home);
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global stderr subscriber. Later calls are no-ops.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(config.env_filter())
            .with_writer(std::io::stderr)
            .with_ansi(false);
        let installed = if config.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if installed.is_err() {
            tracing::debug!(target = "abi.config", "a global subscriber was already installed");
        }
    });
}
