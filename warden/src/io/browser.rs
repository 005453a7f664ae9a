//! Browser scanner: headless page visits with console and error capture.
//!
//! The [`Scanner`] trait decouples cycle orchestration from the browser
//! backend. The real implementation drives headless Chrome over CDP; tests
//! use scripted scanners that return predetermined results.
//!
//! Event capture is scoped per page: buffers live only for the tab's
//! lifetime and are read out on every exit path, including navigation
//! failure. A missing browser degrades the scan to an empty result list and
//! never aborts the cycle.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Network, Page, Runtime};
use headless_chrome::{Browser, LaunchOptions};
use tracing::{debug, info, instrument, warn};

use crate::core::types::PageScanResult;

/// Chars of rendered HTML kept per page.
const HTML_EXCERPT_CHARS: usize = 2000;

/// Parameters for one scan pass.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Fully qualified URLs to visit, in report order.
    pub urls: Vec<String>,
    /// Per-page navigation timeout.
    pub timeout: Duration,
    /// Where to store a screenshot of the first page, if anywhere.
    pub screenshot_path: Option<PathBuf>,
}

/// Abstraction over browser-driven page scanning.
pub trait Scanner {
    /// Visit each URL and report per-page results in request order.
    ///
    /// Returns an empty list when the browser capability is unavailable.
    fn scan(&self, request: &ScanRequest) -> Result<Vec<PageScanResult>>;
}

/// Scanner backed by a headless Chrome session.
pub struct ChromeScanner;

impl Scanner for ChromeScanner {
    #[instrument(skip_all, fields(pages = request.urls.len()))]
    fn scan(&self, request: &ScanRequest) -> Result<Vec<PageScanResult>> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .map_err(|e| anyhow!("assemble browser launch options: {e}"))?;
        let browser = match Browser::new(options) {
            Ok(browser) => browser,
            Err(e) => {
                warn!(err = %e, "headless browser unavailable, skipping page scan");
                return Ok(Vec::new());
            }
        };

        let mut results = Vec::with_capacity(request.urls.len());
        for (index, url) in request.urls.iter().enumerate() {
            let screenshot = if index == 0 {
                request.screenshot_path.as_deref()
            } else {
                None
            };
            results.push(scan_page(&browser, url, request.timeout, screenshot));
        }
        Ok(results)
    }
}

/// Per-page event buffers shared with the CDP listener.
#[derive(Default)]
struct PageBuffers {
    console: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    status: Mutex<Option<u16>>,
}

fn scan_page(
    browser: &Browser,
    url: &str,
    timeout: Duration,
    screenshot: Option<&Path>,
) -> PageScanResult {
    let mut result = PageScanResult::new(url);
    info!(url, "scanning page");

    let tab = match browser.new_tab() {
        Ok(tab) => tab,
        Err(e) => {
            result.errors.push(format!("open page failed: {e}"));
            return result;
        }
    };
    tab.set_default_timeout(timeout);

    let buffers = Arc::new(PageBuffers::default());
    attach_listeners(&tab, url, &buffers);

    match tab.navigate_to(url).and_then(|t| t.wait_until_navigated()) {
        Ok(_) => {
            result.html_excerpt = tab
                .get_content()
                .map(|html| html.chars().take(HTML_EXCERPT_CHARS).collect())
                .unwrap_or_default();
            if let Some(path) = screenshot {
                capture_screenshot(&tab, path);
            }
        }
        Err(e) => {
            // Recorded as a page error; scanning of later paths continues.
            result.errors.push(format!("navigation error: {e}"));
        }
    }

    result.http_status = buffers.status.lock().ok().and_then(|status| *status);
    if let Ok(console) = buffers.console.lock() {
        result.console_messages = console.clone();
    }
    if let Ok(errors) = buffers.errors.lock() {
        result.errors.extend(errors.iter().cloned());
    }

    if let Err(e) = tab.close(true) {
        debug!(err = %e, "closing tab failed");
    }
    result
}

fn attach_listeners(
    tab: &Arc<headless_chrome::Tab>,
    url: &str,
    buffers: &Arc<PageBuffers>,
) {
    if let Err(e) = tab.enable_runtime() {
        debug!(err = %e, "enable runtime domain failed");
    }
    if let Err(e) = tab.call_method(Network::Enable {
        max_total_buffer_size: None,
        max_resource_buffer_size: None,
        max_post_data_size: None,
        enable_durable_messages: None,
        report_direct_socket_traffic: None,
    }) {
        debug!(err = %e, "enable network domain failed");
    }

    let page_url = url.trim_end_matches('/').to_string();
    let shared = Arc::clone(buffers);
    let listener = tab.add_event_listener(Arc::new(move |event: &Event| match event {
        Event::RuntimeConsoleAPICalled(e) => {
            let severity = format!("{:?}", e.params.Type).to_lowercase();
            let text = e
                .params
                .args
                .iter()
                .map(render_remote_object)
                .collect::<Vec<_>>()
                .join(" ");
            if let Ok(mut console) = shared.console.lock() {
                console.push(format!("[{severity}] {text}"));
            }
        }
        Event::RuntimeExceptionThrown(e) => {
            let details = &e.params.exception_details;
            let text = details
                .exception
                .as_ref()
                .and_then(|exception| exception.description.clone())
                .unwrap_or_else(|| details.text.clone());
            if let Ok(mut errors) = shared.errors.lock() {
                errors.push(text);
            }
        }
        Event::NetworkResponseReceived(e) => {
            let response = &e.params.response;
            if response.url.trim_end_matches('/') == page_url {
                if let Ok(mut status) = shared.status.lock() {
                    status.get_or_insert(response.status as u16);
                }
            }
        }
        _ => {}
    }));
    if let Err(e) = listener {
        debug!(err = %e, "attaching page event listener failed");
    }
}

fn render_remote_object(object: &Runtime::RemoteObject) -> String {
    if let Some(value) = &object.value {
        return match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    }
    object
        .description
        .clone()
        .unwrap_or_else(|| "<object>".to_string())
}

fn capture_screenshot(tab: &headless_chrome::Tab, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(err = %e, "create screenshot dir failed");
            return;
        }
    }
    match tab.capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, false) {
        Ok(png) => {
            if let Err(e) = std::fs::write(path, png) {
                warn!(err = %e, path = %path.display(), "write screenshot failed");
            }
        }
        Err(e) => warn!(err = %e, "capture screenshot failed"),
    }
}
