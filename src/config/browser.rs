//! Browser engine configuration.
//!
//! Lives outside the `browser` feature gate so config files parse the same
//! whether or not Chrome support is compiled in.

use serde::{Deserialize, Serialize};

/// Browser engine configuration (`[browser]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Browser engine type.
    #[serde(default)]
    pub engine: BrowserEngineType,

    /// Run in headless mode. Map sites render the result list more reliably
    /// with a visible window, so this is off unless `--headless` is passed.
    #[serde(default)]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// DevTools request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "http://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// User agent presented to the site.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngineType::default(),
            headless: false,
            proxy: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_timeout() -> u64 {
    30
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// `BROWSER_URL` replaces the configured remote DevTools endpoint; an
    /// empty value clears it.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("BROWSER_URL") {
            self.remote_url = if url.trim().is_empty() {
                None
            } else {
                Some(url)
            };
        }
        self
    }

    pub fn stealth(&self) -> bool {
        self.engine == BrowserEngineType::Stealth
    }
}

/// Browser engine types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngineType {
    /// Chromium with stealth patches (default).
    #[default]
    Stealth,

    /// No stealth patches (for debugging).
    Standard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_headed_stealth() {
        let config = BrowserEngineConfig::default();
        assert!(!config.headless);
        assert!(config.stealth());
        assert_eq!(config.timeout, 30);
        assert!(config.remote_url.is_none());
    }

    #[test]
    fn parses_engine_names() {
        let config: BrowserEngineConfig =
            toml::from_str("engine = \"standard\"\nheadless = true").unwrap();
        assert_eq!(config.engine, BrowserEngineType::Standard);
        assert!(config.headless);
        assert!(!config.user_agent.is_empty());
    }
}
