//! Fetch strategies and the shared fetch facade.
//!
//! Every source has a static default strategy. When a plain-HTTP extraction
//! fails with a parse error consistent with missing rendered content, the
//! caller escalates to the browser exactly once; a source that fails under
//! both strategies fails the request.

mod browser;
mod cookies;
mod http;

pub use browser::BrowserHandle;
pub use cookies::{CookieRecord, CookieStore};
pub use http::HttpFetcher;

use std::sync::Arc;

use crate::config::FetchConfig;
use crate::error::Result;
use crate::models::SourceKind;

/// How a landing page is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Plain HTTP GET.
    Http,
    /// Headless-browser page load, for client-rendered sources.
    Browser,
}

impl std::fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStrategy::Http => write!(f, "http"),
            FetchStrategy::Browser => write!(f, "browser"),
        }
    }
}

/// Static per-source strategy table. Every source answers plain HTTP first,
/// through an API or a static page; client-rendered landing pages are the
/// escalation path.
pub fn initial_strategy(kind: SourceKind) -> FetchStrategy {
    match kind {
        SourceKind::Arxiv => FetchStrategy::Http,
        SourceKind::Cvf => FetchStrategy::Http,
        SourceKind::Biorxiv => FetchStrategy::Http,
        SourceKind::Medrxiv => FetchStrategy::Http,
        SourceKind::Chemrxiv => FetchStrategy::Http,
    }
}

/// The single-level escalation: http may be retried as browser, browser is
/// terminal.
pub fn escalation(strategy: FetchStrategy) -> Option<FetchStrategy> {
    match strategy {
        FetchStrategy::Http => Some(FetchStrategy::Browser),
        FetchStrategy::Browser => None,
    }
}

/// Facade over the HTTP client and the shared browser handle, handed to
/// extractors so they stay free of transport wiring.
#[derive(Debug)]
pub struct Fetcher {
    http: HttpFetcher,
    browser: BrowserHandle,
}

impl Fetcher {
    pub fn new(cfg: &FetchConfig, cookies: Arc<CookieStore>) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(cfg, cookies)?,
            browser: BrowserHandle::new(cfg.request_timeout()),
        })
    }

    /// Fetch a page with the given strategy.
    pub async fn page(&self, url: &str, strategy: FetchStrategy) -> Result<String> {
        match strategy {
            FetchStrategy::Http => self.http.get_text(url).await,
            FetchStrategy::Browser => self.browser.render(url).await,
        }
    }

    /// Direct access for API calls and PDF downloads, which are always
    /// plain HTTP.
    pub fn http(&self) -> &HttpFetcher {
        &self.http
    }
}
