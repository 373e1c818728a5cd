//! Chrome-backed map session.
//!
//! Uses chromiumoxide (CDP) to launch a local Chrome or attach to a remote
//! DevTools endpoint, with stealth patches applied to every document.

#[cfg(feature = "browser")]
mod session;
#[cfg(feature = "browser")]
mod stealth;

#[cfg(feature = "browser")]
pub use session::ChromeSession;

#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use anyhow::{Context, Result};
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info};

#[cfg(feature = "browser")]
use crate::config::BrowserEngineConfig;

/// Common Chrome executable paths to check.
#[cfg(feature = "browser")]
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

#[cfg(feature = "browser")]
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Window size used for launched browsers; the result list only renders
/// fully on desktop layouts.
#[cfg(feature = "browser")]
const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// A running browser plus the task pumping its DevTools events.
#[cfg(feature = "browser")]
pub(crate) struct BrowserHandle {
    pub browser: Browser,
    pub handler: JoinHandle<()>,
    /// Attached to someone else's browser; never close it.
    pub remote: bool,
}

/// Find Chrome executable.
#[cfg(feature = "browser")]
fn find_chrome() -> Result<std::path::PathBuf> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(anyhow::anyhow!(
        "Chrome/Chromium not found. Please install it:\n\
         - Arch/Manjaro: sudo pacman -S chromium\n\
         - Ubuntu/Debian: sudo apt install chromium-browser\n\
         - Fedora: sudo dnf install chromium\n\
         - Or download from: https://www.google.com/chrome/"
    ))
}

/// Launch a local browser, or attach to `remote_url` when configured.
#[cfg(feature = "browser")]
pub(crate) async fn start_browser(config: &BrowserEngineConfig) -> Result<BrowserHandle> {
    if let Some(remote_url) = config.remote_url.as_deref() {
        return connect_remote(config, remote_url).await;
    }

    info!("Launching browser (headless={})", config.headless);
    let chrome_path = find_chrome()?;

    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .window_size(WINDOW_SIZE.0, WINDOW_SIZE.1)
        .request_timeout(Duration::from_secs(config.timeout));

    // with_head means NOT headless
    if !config.headless {
        builder = builder.with_head();
    }

    if let Some(ref proxy) = config.proxy {
        builder = builder.arg(format!("--proxy-server={}", proxy));
    }

    builder = builder
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-dev-shm-usage")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--metrics-recording-only")
        .arg("--no-sandbox");

    if config.headless {
        builder = builder.arg("--disable-gpu");
    }

    for arg in &config.chrome_args {
        builder = builder.arg(arg);
    }

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

    let (browser, handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    Ok(BrowserHandle {
        browser,
        handler: spawn_handler(handler),
        remote: false,
    })
}

/// Connect to a remote Chrome instance.
#[cfg(feature = "browser")]
async fn connect_remote(config: &BrowserEngineConfig, url: &str) -> Result<BrowserHandle> {
    info!(
        "Connecting to remote browser at {} (timeout: {}s)",
        url, config.timeout
    );

    // The WebSocket URL comes from the /json/version endpoint
    let http_url = url
        .replace("ws://", "http://")
        .replace("wss://", "https://");
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let client = reqwest::Client::new();
    let resp: serde_json::Value = client
        .get(&version_url)
        .send()
        .await
        .context("Failed to connect to remote browser")?
        .json()
        .await
        .context("Failed to parse browser version info")?;

    let ws_url = resp
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

    debug!("Connecting to WebSocket: {}", ws_url);

    let handler_config = chromiumoxide::handler::HandlerConfig {
        request_timeout: Duration::from_secs(config.timeout),
        ..Default::default()
    };

    let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
        .await
        .context("Failed to connect to remote browser")?;

    Ok(BrowserHandle {
        browser,
        handler: spawn_handler(handler),
        remote: true,
    })
}

#[cfg(feature = "browser")]
fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
        debug!("Browser event handler stopped");
    })
}
