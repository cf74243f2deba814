//! Headless-browser rendering through a single process-wide Chrome handle.
//!
//! The browser is expensive to start, so it is launched lazily on first use
//! and reused for the lifetime of the process. Page loads are serialized
//! through one handle to bound memory; the page is closed whether or not the
//! extraction that requested it succeeds.

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

struct SharedBrowser {
    browser: Browser,
    _event_loop: JoinHandle<()>,
}

/// Lazily-initialized, process-wide browser resource.
pub struct BrowserHandle {
    cell: OnceCell<SharedBrowser>,
    page_gate: Mutex<()>,
    navigation_timeout: Duration,
}

impl std::fmt::Debug for BrowserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserHandle")
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

impl BrowserHandle {
    pub fn new(navigation_timeout: Duration) -> Self {
        Self {
            cell: OnceCell::new(),
            page_gate: Mutex::new(()),
            navigation_timeout,
        }
    }

    async fn launch() -> Result<SharedBrowser> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(Error::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::Browser(format!("launch: {}", e)))?;

        let event_loop = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("headless browser launched");
        Ok(SharedBrowser {
            browser,
            _event_loop: event_loop,
        })
    }

    /// Load a page in the shared browser and return the rendered HTML.
    /// One page is in flight at a time.
    pub async fn render(&self, url: &str) -> Result<String> {
        let shared = self.cell.get_or_try_init(Self::launch).await?;
        let _gate = self.page_gate.lock().await;

        tracing::debug!(url, "rendering page in browser");
        let page = shared
            .browser
            .new_page(url)
            .await
            .map_err(|e| Error::Browser(format!("open {}: {}", url, e)))?;

        let result = tokio::time::timeout(self.navigation_timeout, async {
            page.wait_for_navigation()
                .await
                .map_err(|e| Error::Browser(format!("navigate {}: {}", url, e)))?;
            page.content()
                .await
                .map_err(|e| Error::Browser(format!("content {}: {}", url, e)))
        })
        .await
        .unwrap_or_else(|_| Err(Error::Network(format!("browser render of {} timed out", url))));

        // The page is released regardless of outcome; the browser itself
        // stays up for reuse.
        let _ = page.close().await;
        result
    }
}
