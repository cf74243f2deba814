//! PDF acquisition with bounded retry.
//!
//! Candidates are tried in the order the extractor produced them. Each
//! candidate gets a fixed number of attempts with exponential backoff
//! between them; a downloaded body must look like a PDF before it counts.
//! When every candidate is exhausted the caller degrades to a link
//! attachment, so failure here is typed, never fatal to the save.

use std::time::Duration;

use crate::config::PdfConfig;
use crate::error::{Error, Result};
use crate::fetch::HttpFetcher;
use crate::models::Attachment;

/// Retry shape for one candidate URL.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub attempt_timeout: Duration,
    pub min_bytes: usize,
}

impl RetryPolicy {
    pub fn from_config(cfg: &PdfConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            multiplier: cfg.backoff_multiplier,
            attempt_timeout: Duration::from_secs(cfg.attempt_timeout_secs),
            min_bytes: cfg.min_bytes,
        }
    }

    /// Delay before retrying after `attempt` failures (1s, 2s, 4s at the
    /// defaults).
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        self.base_delay.mul_f64(factor.max(1.0))
    }
}

impl From<&PdfConfig> for RetryPolicy {
    fn from(cfg: &PdfConfig) -> Self {
        Self::from_config(cfg)
    }
}

#[derive(Debug)]
pub struct PdfResolver {
    policy: RetryPolicy,
}

impl PdfResolver {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Content sniffing: servers label PDFs inconsistently, so the magic
    /// bytes decide and the header only rejects obvious HTML responses.
    fn validate(&self, content_type: Option<&str>, body: &[u8]) -> std::result::Result<(), String> {
        if let Some(ct) = content_type {
            let ct = ct.to_lowercase();
            let plausible =
                ct.contains("pdf") || ct.contains("octet-stream") || ct.contains("binary");
            if !plausible {
                return Err(format!("content-type {} is not a PDF", ct));
            }
        }
        if !body.starts_with(b"%PDF") {
            return Err("body lacks the %PDF magic".to_string());
        }
        if body.len() < self.policy.min_bytes {
            return Err(format!("body too small ({} bytes)", body.len()));
        }
        Ok(())
    }

    /// Try every candidate in order until one yields a valid PDF.
    ///
    /// Returns a downloaded attachment on success and
    /// `AttachmentUnavailable` when all candidates are exhausted.
    pub async fn resolve(&self, candidates: &[String], http: &HttpFetcher) -> Result<Attachment> {
        if candidates.is_empty() {
            return Err(Error::AttachmentUnavailable);
        }

        let mut total_attempts = 0u32;
        for candidate in candidates {
            let mut attachment = Attachment::pending_pdf(candidate.clone());
            for attempt in 0..self.policy.max_attempts {
                if attempt > 0 {
                    tokio::time::sleep(self.policy.delay_after(attempt - 1)).await;
                }
                total_attempts += 1;
                attachment.attempts = attempt + 1;

                match http.get_bytes(candidate, self.policy.attempt_timeout).await {
                    Ok((content_type, body)) => {
                        match self.validate(content_type.as_deref(), &body) {
                            Ok(()) => {
                                tracing::info!(
                                    url = candidate.as_str(),
                                    bytes = body.len(),
                                    attempt = attempt + 1,
                                    "PDF downloaded"
                                );
                                attachment.mark_downloaded(body)?;
                                return Ok(attachment);
                            }
                            Err(reason) => {
                                tracing::debug!(
                                    url = candidate.as_str(),
                                    attempt = attempt + 1,
                                    reason,
                                    "candidate rejected"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!(
                            url = candidate.as_str(),
                            attempt = attempt + 1,
                            error = %e,
                            "download attempt failed"
                        );
                    }
                }
            }
        }

        tracing::warn!(
            candidates = candidates.len(),
            attempts = total_attempts,
            "no candidate produced a valid PDF"
        );
        Err(Error::AttachmentUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::FetchConfig;
    use crate::fetch::CookieStore;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(5),
            min_bytes: 8,
        }
    }

    fn http() -> HttpFetcher {
        HttpFetcher::new(&FetchConfig::default(), Arc::new(CookieStore::new())).unwrap()
    }

    fn pdf_body() -> Vec<u8> {
        let mut body = b"%PDF-1.7\n".to_vec();
        body.extend_from_slice(&[0u8; 64]);
        body
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(1),
            ..fast_policy()
        };
        assert_eq!(policy.delay_after(0), Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[test]
    fn validation_requires_pdf_magic_and_size() {
        let resolver = PdfResolver::new(fast_policy());
        assert!(resolver.validate(Some("application/pdf"), &pdf_body()).is_ok());
        assert!(resolver.validate(None, &pdf_body()).is_ok());
        assert!(resolver
            .validate(Some("application/octet-stream"), &pdf_body())
            .is_ok());
        assert!(resolver.validate(Some("text/html"), &pdf_body()).is_err());
        assert!(resolver
            .validate(Some("application/pdf"), b"<html>soft 404</html>")
            .is_err());
        assert!(resolver.validate(Some("application/pdf"), b"%PDF").is_err());
    }

    #[tokio::test]
    async fn first_valid_candidate_wins() {
        let mut server = mockito::Server::new_async().await;
        let _bad = server
            .mock("GET", "/broken.pdf")
            .with_status(404)
            .expect(3)
            .create_async()
            .await;
        let _good = server
            .mock("GET", "/paper.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(pdf_body())
            .expect(1)
            .create_async()
            .await;

        let resolver = PdfResolver::new(fast_policy());
        let candidates = vec![
            format!("{}/broken.pdf", server.url()),
            format!("{}/paper.pdf", server.url()),
        ];
        let attachment = resolver.resolve(&candidates, &http()).await.unwrap();
        assert!(attachment.bytes.starts_with(b"%PDF"));
        assert_eq!(attachment.url, candidates[1]);
        assert_eq!(attachment.attempts, 1);
    }

    #[tokio::test]
    async fn exhausted_candidates_yield_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/gone.pdf")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let resolver = PdfResolver::new(fast_policy());
        let candidates = vec![format!("{}/gone.pdf", server.url())];
        let err = resolver.resolve(&candidates, &http()).await.unwrap_err();
        assert!(matches!(err, Error::AttachmentUnavailable));
    }

    #[tokio::test]
    async fn html_masquerading_as_pdf_is_retried_then_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/captcha.pdf")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>prove you are human</html>")
            .expect(3)
            .create_async()
            .await;

        let resolver = PdfResolver::new(fast_policy());
        let candidates = vec![format!("{}/captcha.pdf", server.url())];
        let err = resolver.resolve(&candidates, &http()).await.unwrap_err();
        assert!(matches!(err, Error::AttachmentUnavailable));
    }

    #[tokio::test]
    async fn empty_candidate_list_is_unavailable() {
        let resolver = PdfResolver::new(fast_policy());
        let err = resolver.resolve(&[], &http()).await.unwrap_err();
        assert!(matches!(err, Error::AttachmentUnavailable));
    }
}
