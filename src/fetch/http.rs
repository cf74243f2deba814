//! Plain-HTTP fetching, bounded by a small semaphore so concurrent requests
//! do not trigger remote rate limiting.

use reqwest::header::{HeaderValue, COOKIE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::fetch::cookies::CookieStore;

/// Shared HTTP client with per-host cookie injection from the side-channel
/// store.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    permits: Arc<Semaphore>,
    cookies: Arc<CookieStore>,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchConfig, cookies: Arc<CookieStore>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(cfg.max_concurrent_http.max(1))),
            cookies,
        })
    }

    async fn send(&self, url: &str, timeout: Option<Duration>) -> Result<reqwest::Response> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Network("fetch pool closed".to_string()))?;

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        if let Some(host) = url::Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
            if let Some(header) = self.cookies.header_for(&host) {
                if let Ok(value) = HeaderValue::from_str(&header) {
                    request = request.header(COOKIE, value);
                }
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("GET {}: {}", url, e)))?;
        Ok(response)
    }

    /// GET a page or API endpoint and return its body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url, None).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("GET {}: status {}", url, status)));
        }
        response
            .text()
            .await
            .map_err(|e| Error::Network(format!("reading {}: {}", url, e)))
    }

    /// GET and deserialize a JSON payload.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::parse("json", format!("{} from {}", e, url), &body))
    }

    /// GET raw bytes with a per-attempt timeout, returning the response
    /// content type alongside the body. Used by the PDF resolver; a timeout
    /// here is just a failed attempt.
    pub async fn get_bytes(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<(Option<String>, Vec<u8>)> {
        let response = self.send(url, Some(timeout)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("GET {}: status {}", url, status)));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("reading {}: {}", url, e)))?;
        Ok((content_type, bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchConfig::default(), Arc::new(CookieStore::new())).unwrap()
    }

    #[tokio::test]
    async fn get_text_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let err = fetcher()
            .get_text(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn get_json_deserializes_payload() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let value: serde_json::Value = fetcher()
            .get_json(&format!("{}/api", server.url()))
            .await
            .unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn stored_cookies_are_attached_for_matching_host() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/auth")
            .match_header("cookie", "session=xyz")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let cookies = Arc::new(CookieStore::new());
        // mockito serves on 127.0.0.1
        cookies.set("127.0.0.1", "session=xyz");
        let fetcher = HttpFetcher::new(&FetchConfig::default(), cookies).unwrap();

        let body = fetcher
            .get_text(&format!("{}/auth", server.url()))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }
}
