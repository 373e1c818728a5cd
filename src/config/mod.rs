//! Configuration management for bizcrawl using the prefer crate.
//!
//! One [`Config`] value is loaded at startup and handed to each component
//! when it is constructed; nothing reads configuration globally afterwards.

mod browser;
mod selectors;
mod timing;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use browser::{BrowserEngineConfig, BrowserEngineType};
pub use selectors::{SelectorTable, SiteConfig};
pub use timing::Timing;

/// Name used for config file discovery (`bizcrawl.toml`, `bizcrawl.yaml`, ...).
pub const CONFIG_NAME: &str = "bizcrawl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        format: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// Site, selector, timing and browser settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub selectors: SelectorTable,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    /// File this config was loaded from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration: an explicit path wins, then a discovered
    /// `bizcrawl.*` file, then built-in defaults.
    ///
    /// An explicit path that cannot be read or parsed is an error; a
    /// discovered file that fails to parse falls back to defaults.
    pub async fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_path(path).await,
            None => Ok(Self::load().await),
        }
    }

    /// Discover a config file with prefer, falling back to defaults.
    pub async fn load() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("Ignoring discovered config: {}", e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => {
                debug!("No {} config file found, using defaults", CONFIG_NAME);
                Self::default_with_env()
            }
        }
    }

    /// Default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        let mut config = Self::default();
        config.browser = config.browser.with_env_overrides();
        config
    }

    /// Load configuration from a specific file path.
    /// The format is picked by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        config.browser = config.browser.with_env_overrides();
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            format,
            path: path.to_path_buf(),
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_error("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_error("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_error("JSON", e.to_string())),
        }
    }
}

/// Everything one invocation needs: CLI choices plus the loaded [`Config`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub queries_path: PathBuf,
    pub output_path: PathBuf,
    pub debug: bool,
    pub headless: bool,
    pub config: Config,
}

impl RunConfig {
    /// `headless` from the command line forces headless mode on; otherwise
    /// the config file decides.
    pub fn new(
        queries_path: PathBuf,
        output_path: PathBuf,
        debug: bool,
        headless: bool,
        mut config: Config,
    ) -> Self {
        let headless = headless || config.browser.headless;
        config.browser.headless = headless;
        Self {
            queries_path,
            output_path,
            debug,
            headless,
            config,
        }
    }
}
