//! bioRxiv and medRxiv extractors.
//!
//! Both repositories share the Cold Spring Harbor platform: the same DOI
//! prefix, the same details API (served from api.biorxiv.org for both), and
//! the same Highwire meta tags on the landing page. One implementation
//! covers both servers; the public details API is tried first and the
//! rendered landing page is the escalation path when the API misses.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetch::{FetchStrategy, Fetcher};
use crate::models::{RawExtraction, SourceKind, SourceUrl};
use crate::sources::{meta_content, meta_contents, Extractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RxivServer {
    Biorxiv,
    Medrxiv,
}

impl RxivServer {
    fn api_name(self) -> &'static str {
        match self {
            RxivServer::Biorxiv => "biorxiv",
            RxivServer::Medrxiv => "medrxiv",
        }
    }

    fn host(self) -> &'static str {
        match self {
            RxivServer::Biorxiv => "www.biorxiv.org",
            RxivServer::Medrxiv => "www.medrxiv.org",
        }
    }

    fn kind(self) -> SourceKind {
        match self {
            RxivServer::Biorxiv => SourceKind::Biorxiv,
            RxivServer::Medrxiv => SourceKind::Medrxiv,
        }
    }
}

/// DOI and optional version parsed out of a content URL, e.g.
/// `/content/10.1101/2024.01.02.573943v2.full`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RxivDoi {
    pub doi: String,
    pub version: Option<u32>,
}

pub(crate) fn parse_doi(url: &str) -> Result<RxivDoi> {
    let re = regex::Regex::new(r"(10\.1101/(\d{4})\.(\d{2})\.(\d{2})\.\d+)(?:v(\d+))?")
        .map_err(|e| Error::Config(format!("doi pattern: {}", e)))?;
    let caps = re
        .captures(url)
        .ok_or_else(|| Error::parse("rxiv", "URL carries no 10.1101 DOI", url))?;
    Ok(RxivDoi {
        doi: caps[1].to_string(),
        version: caps.get(5).and_then(|m| m.as_str().parse().ok()),
    })
}

/// The submission date is embedded in the DOI suffix as YYYY.MM.DD.
pub(crate) fn date_from_doi(doi: &str) -> Option<String> {
    let re = regex::Regex::new(r"10\.1101/(\d{4})\.(\d{2})\.(\d{2})\.").ok()?;
    let caps = re.captures(doi)?;
    Some(format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]))
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    collection: Vec<DetailsEntry>,
}

#[derive(Debug, Deserialize)]
struct DetailsEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: String,
    #[serde(default, rename = "abstract")]
    abstract_text: String,
    #[serde(default)]
    doi: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug)]
struct RxivExtractor {
    server: RxivServer,
    api_url: String,
}

impl RxivExtractor {
    fn pdf_url(&self, doi: &str, version: Option<u32>) -> String {
        match version {
            Some(v) => format!("https://{}/content/{}v{}.full.pdf", self.server.host(), doi, v),
            None => format!("https://{}/content/{}.full.pdf", self.server.host(), doi),
        }
    }

    /// Details API path: richer metadata, no rendering.
    async fn extract_from_api(&self, parsed: &RxivDoi, fetch: &Fetcher) -> Result<RawExtraction> {
        let api_url = format!("{}/{}/{}", self.api_url, self.server.api_name(), parsed.doi);
        let response: DetailsResponse = fetch.http().get_json(&api_url).await?;

        // The API answers 200 with an empty collection for unknown DOIs;
        // a parse error here lets the caller escalate to the page scrape.
        let entry = response
            .collection
            .into_iter()
            .last()
            .filter(|e| !e.title.trim().is_empty())
            .ok_or_else(|| {
                Error::parse(
                    self.server.api_name(),
                    format!("details API has no record for {}", parsed.doi),
                    &api_url,
                )
            })?;

        let version = parsed.version.or_else(|| entry.version.parse().ok());
        Ok(RawExtraction {
            title: entry.title.trim().to_string(),
            authors_raw: entry.authors,
            abstract_text: entry.abstract_text,
            doi: Some(entry.doi).filter(|d| !d.is_empty()),
            subject: Some(entry.category).filter(|c| !c.is_empty()),
            comment: None,
            date: Some(entry.date)
                .filter(|d| !d.is_empty())
                .or_else(|| date_from_doi(&parsed.doi)),
            canonical_url: Some(format!(
                "https://{}/content/{}",
                self.server.host(),
                parsed.doi
            )),
            pdf_candidates: vec![self.pdf_url(&parsed.doi, version)],
            extractor: format!("{}-api", self.server.api_name()),
        })
    }

    /// Escalation path: rendered landing page, Highwire citation_* tags.
    async fn extract_from_page(
        &self,
        url: &SourceUrl,
        parsed: &RxivDoi,
        fetch: &Fetcher,
    ) -> Result<RawExtraction> {
        let body = fetch.page(&url.raw, FetchStrategy::Browser).await?;
        let doc = scraper::Html::parse_document(&body);

        let title = meta_content(&doc, "citation_title").ok_or_else(|| {
            Error::parse(
                self.server.api_name(),
                "rendered page has no citation_title tag",
                &body,
            )
        })?;

        let authors_raw = meta_contents(&doc, "citation_author").join("; ");
        let mut pdf_candidates = Vec::new();
        if let Some(pdf) = meta_content(&doc, "citation_pdf_url") {
            pdf_candidates.push(pdf);
        }
        let derived = self.pdf_url(&parsed.doi, parsed.version);
        if !pdf_candidates.contains(&derived) {
            pdf_candidates.push(derived);
        }

        Ok(RawExtraction {
            title,
            authors_raw,
            abstract_text: meta_content(&doc, "citation_abstract").unwrap_or_default(),
            doi: meta_content(&doc, "citation_doi").or_else(|| Some(parsed.doi.clone())),
            subject: None,
            comment: None,
            date: meta_content(&doc, "citation_publication_date")
                .map(|d| d.replace('/', "-"))
                .or_else(|| date_from_doi(&parsed.doi)),
            canonical_url: Some(format!(
                "https://{}/content/{}",
                self.server.host(),
                parsed.doi
            )),
            pdf_candidates,
            extractor: format!("{}-page", self.server.api_name()),
        })
    }
}

#[async_trait]
impl Extractor for RxivExtractor {
    fn kind(&self) -> SourceKind {
        self.server.kind()
    }

    async fn extract(
        &self,
        url: &SourceUrl,
        strategy: FetchStrategy,
        fetch: &Fetcher,
    ) -> Result<RawExtraction> {
        let parsed = parse_doi(&url.raw)?;
        match strategy {
            FetchStrategy::Http => self.extract_from_api(&parsed, fetch).await,
            FetchStrategy::Browser => self.extract_from_page(url, &parsed, fetch).await,
        }
    }
}

#[derive(Debug)]
pub struct BiorxivExtractor(RxivExtractor);

impl BiorxivExtractor {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self(RxivExtractor {
            server: RxivServer::Biorxiv,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl Extractor for BiorxivExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Biorxiv
    }

    async fn extract(
        &self,
        url: &SourceUrl,
        strategy: FetchStrategy,
        fetch: &Fetcher,
    ) -> Result<RawExtraction> {
        self.0.extract(url, strategy, fetch).await
    }
}

#[derive(Debug)]
pub struct MedrxivExtractor(RxivExtractor);

impl MedrxivExtractor {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self(RxivExtractor {
            server: RxivServer::Medrxiv,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl Extractor for MedrxivExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Medrxiv
    }

    async fn extract(
        &self,
        url: &SourceUrl,
        strategy: FetchStrategy,
        fetch: &Fetcher,
    ) -> Result<RawExtraction> {
        self.0.extract(url, strategy, fetch).await
    }
}
