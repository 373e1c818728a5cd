//! [`MapSession`] over a single chromiumoxide page.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use super::{start_browser, stealth, BrowserHandle};
use crate::config::{Config, SelectorTable, Timing};
use crate::scrapers::session::{DriverError, EntryHandle, ListSnapshot, MapSession};
use crate::scrapers::wait::poll_until;

/// Interval for element readiness polling.
const POLL_STEP: Duration = Duration::from_millis(250);

fn driver_error(e: CdpError) -> DriverError {
    DriverError::classify(e.to_string())
}

/// Ride out transient probe failures; give up on anything else.
fn probe_failure<T>(e: CdpError) -> Result<Option<T>, DriverError> {
    match driver_error(e) {
        DriverError::SessionClosed(message) => Err(DriverError::SessionClosed(message)),
        _ => Ok(None),
    }
}

/// A browser tab driving the map site.
pub struct ChromeSession {
    handle: BrowserHandle,
    page: Page,
    selectors: SelectorTable,
    timing: Timing,
}

impl ChromeSession {
    /// Start (or attach to) a browser and open a tab configured for crawling.
    pub async fn launch(config: &Config) -> Result<Self> {
        let handle = start_browser(&config.browser).await?;
        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open browser tab")?;

        page.execute(SetUserAgentOverrideParams::new(
            config.browser.user_agent.clone(),
        ))
        .await
        .context("Failed to set user agent")?;

        if config.browser.stealth() {
            debug!("Registering stealth scripts");
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
                stealth::combined(),
            ))
            .await
            .context("Failed to register stealth scripts")?;
        }

        Ok(Self {
            handle,
            page,
            selectors: config.selectors.clone(),
            timing: config.timing.clone(),
        })
    }

    async fn items(&self) -> Result<Vec<Element>, DriverError> {
        self.page
            .find_elements(self.selectors.result_item.as_str())
            .await
            .map_err(driver_error)
    }

    async fn item(&self, entry: EntryHandle) -> Result<Element, DriverError> {
        let mut items = self.items().await?;
        if entry.position >= items.len() {
            return Err(DriverError::Stale(format!(
                "entry {} no longer rendered ({} in list)",
                entry.position,
                items.len()
            )));
        }
        Ok(items.swap_remove(entry.position))
    }

    /// Wait until `selector` matches on the page.
    async fn wait_for(
        &self,
        what: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<Element, DriverError> {
        let page = &self.page;
        poll_until(what, timeout, POLL_STEP, || async move {
            match page.find_element(selector).await {
                Ok(element) => Ok(Some(element)),
                Err(e) => probe_failure(e),
            }
        })
        .await
    }

    async fn evaluate_bool(&self, script: String) -> Result<bool, DriverError> {
        self.page
            .evaluate(script)
            .await
            .map_err(driver_error)?
            .into_value::<bool>()
            .map_err(|e| DriverError::Other(format!("unexpected script result: {}", e)))
    }
}

/// Quote a Rust string as a JavaScript string literal.
fn js_string(value: &str) -> Result<String, DriverError> {
    serde_json::to_string(value).map_err(|e| DriverError::Other(e.to_string()))
}

#[async_trait]
impl MapSession for ChromeSession {
    async fn open(&mut self, url: &str) -> Result<(), DriverError> {
        self.page.goto(url).await.map_err(driver_error)?;
        self.page.wait_for_navigation().await.map_err(driver_error)?;
        Ok(())
    }

    async fn submit_search(&mut self, query: &str) -> Result<(), DriverError> {
        let input = self
            .wait_for(
                "search input",
                &self.selectors.search_input,
                self.timing.element_wait(),
            )
            .await?;

        input.click().await.map_err(driver_error)?;
        input
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(driver_error)?;
        input.type_str(query).await.map_err(driver_error)?;
        input.press_key("Enter").await.map_err(driver_error)?;
        debug!("Submitted search '{}'", query);
        Ok(())
    }

    async fn wait_for_results(&mut self) -> Result<(), DriverError> {
        self.wait_for(
            "result list",
            &self.selectors.result_list,
            self.timing.list_wait(),
        )
        .await
        .map(|_| ())
    }

    async fn snapshot(&mut self) -> Result<ListSnapshot, DriverError> {
        Ok(ListSnapshot::new(self.items().await?.len()))
    }

    async fn entry_markup(&mut self, entry: EntryHandle) -> Result<String, DriverError> {
        self.item(entry)
            .await?
            .outer_html()
            .await
            .map_err(driver_error)?
            .ok_or_else(|| DriverError::Stale(format!("entry {} has no markup", entry.position)))
    }

    async fn activate(&mut self, entry: EntryHandle) -> Result<(), DriverError> {
        let item = self.item(entry).await?;
        let target = match self.selectors.click_target.as_deref() {
            Some(selector) => item.find_element(selector).await.map_err(driver_error)?,
            None => item,
        };

        target.scroll_into_view().await.map_err(driver_error)?;
        tokio::time::sleep(self.timing.scroll_into_view()).await;

        let target_ref = &target;
        let point = poll_until(
            "entry to become clickable",
            self.timing.element_wait(),
            POLL_STEP,
            || async move {
                match target_ref.clickable_point().await {
                    Ok(point) => Ok(Some(point)),
                    Err(e) => match driver_error(e) {
                        DriverError::Stale(m) => Err(DriverError::Stale(m)),
                        DriverError::SessionClosed(m) => Err(DriverError::SessionClosed(m)),
                        _ => Ok(None),
                    },
                }
            },
        )
        .await?;

        // Overlays (cookie banners, popups) would swallow the click
        let hit_test = format!(
            "function() {{ const hit = document.elementFromPoint({}, {}); \
             return !!hit && (hit === this || this.contains(hit)); }}",
            point.x, point.y
        );
        let on_top = target
            .call_js_fn(hit_test, false)
            .await
            .map_err(driver_error)?
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if !on_top {
            return Err(DriverError::ClickIntercepted(format!(
                "entry {} is covered at ({:.0}, {:.0})",
                entry.position, point.x, point.y
            )));
        }

        target.click().await.map_err(driver_error)?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        let script = format!(
            "(() => {{ const items = document.querySelectorAll({}); \
             const last = items[items.length - 1]; \
             if (last) {{ last.scrollIntoView({{ block: 'end' }}); }} \
             return items.length; }})()",
            js_string(&self.selectors.result_item)?
        );
        self.page.evaluate(script).await.map_err(driver_error)?;
        Ok(())
    }

    async fn has_end_sentinel(&mut self) -> Result<bool, DriverError> {
        if self.selectors.end_sentinel.is_empty() {
            return Ok(false);
        }
        let script = format!(
            "document.body ? document.body.innerText.includes({}) : false",
            js_string(&self.selectors.end_sentinel)?
        );
        self.evaluate_bool(script).await
    }

    async fn document(&mut self) -> Result<String, DriverError> {
        self.page.content().await.map_err(driver_error)
    }

    async fn current_url(&mut self) -> Result<Option<String>, DriverError> {
        self.page.url().await.map_err(driver_error)
    }

    async fn back(&mut self) -> Result<(), DriverError> {
        self.page
            .evaluate("window.history.back()".to_string())
            .await
            .map_err(driver_error)?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("Closing tab failed: {}", e);
        }
        if self.handle.remote {
            info!("Detached from remote browser");
        } else {
            if let Err(e) = self.handle.browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = self.handle.browser.wait().await {
                debug!("Waiting for browser exit failed: {}", e);
            }
        }
        self.handle.handler.abort();
    }
}
