//! ChemRxiv extractor.
//!
//! The default path talks to the public Engage item API, keyed by the item
//! id in the article-details URL. Landing pages are a client-rendered
//! Engage application, so the escalation path renders the page and reads
//! the Highwire meta tags the app injects.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetch::{FetchStrategy, Fetcher};
use crate::models::{RawExtraction, SourceKind, SourceUrl};
use crate::sources::{meta_content, meta_contents, Extractor};

#[derive(Debug, Deserialize)]
struct EngageItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<EngageAuthor>,
    #[serde(default, rename = "abstract")]
    abstract_text: String,
    #[serde(default)]
    doi: String,
    #[serde(default)]
    categories: Vec<EngageCategory>,
    #[serde(default, rename = "publishedDate")]
    published_date: String,
    asset: Option<EngageAsset>,
}

#[derive(Debug, Deserialize)]
struct EngageAuthor {
    #[serde(default, rename = "firstName")]
    first_name: String,
    #[serde(default, rename = "lastName")]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct EngageCategory {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct EngageAsset {
    original: Option<EngageFile>,
}

#[derive(Debug, Deserialize)]
struct EngageFile {
    #[serde(default)]
    url: String,
}

#[derive(Debug)]
pub struct ChemrxivExtractor {
    api_url: String,
}

impl ChemrxivExtractor {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    /// Item id from an article-details URL, e.g.
    /// `/engage/chemrxiv/article-details/6500f001b338ec988ea6a0a1`.
    pub(crate) fn parse_item_id(url: &str) -> Option<String> {
        url.split("/article-details/")
            .nth(1)?
            .split(['?', '#', '/'])
            .next()
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string())
    }

    async fn extract_from_api(&self, url: &SourceUrl, fetch: &Fetcher) -> Result<RawExtraction> {
        let item_id = Self::parse_item_id(&url.raw).ok_or_else(|| {
            Error::parse("chemrxiv", "URL carries no article-details item id", &url.raw)
        })?;
        let api_url = format!("{}/{}", self.api_url, item_id);
        let item: EngageItem = fetch.http().get_json(&api_url).await?;

        if item.title.trim().is_empty() {
            return Err(Error::parse(
                "chemrxiv",
                format!("item API has no record for {}", item_id),
                &api_url,
            ));
        }

        let authors_raw = item
            .authors
            .iter()
            .map(|a| format!("{} {}", a.first_name.trim(), a.last_name.trim()))
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join("; ");

        let mut pdf_candidates = Vec::new();
        if let Some(file) = item.asset.and_then(|a| a.original) {
            if !file.url.is_empty() {
                pdf_candidates.push(file.url);
            }
        }

        Ok(RawExtraction {
            title: item.title.trim().to_string(),
            authors_raw,
            abstract_text: item.abstract_text,
            doi: Some(item.doi).filter(|d| !d.is_empty()),
            subject: item
                .categories
                .into_iter()
                .map(|c| c.name)
                .find(|n| !n.is_empty()),
            comment: None,
            date: Some(item.published_date)
                .filter(|d| !d.is_empty())
                .map(|d| d.chars().take(10).collect()),
            canonical_url: Some(url.raw.clone()),
            pdf_candidates,
            extractor: "chemrxiv-api".to_string(),
        })
    }

    async fn extract_from_page(&self, url: &SourceUrl, fetch: &Fetcher) -> Result<RawExtraction> {
        let body = fetch.page(&url.raw, FetchStrategy::Browser).await?;
        let doc = scraper::Html::parse_document(&body);

        let title = meta_content(&doc, "citation_title")
            .ok_or_else(|| Error::parse("chemrxiv", "rendered page has no citation_title tag", &body))?;

        let authors_raw = meta_contents(&doc, "citation_author").join("; ");
        let mut pdf_candidates = Vec::new();
        if let Some(pdf) = meta_content(&doc, "citation_pdf_url") {
            pdf_candidates.push(pdf);
        }

        Ok(RawExtraction {
            title,
            authors_raw,
            abstract_text: meta_content(&doc, "citation_abstract").unwrap_or_default(),
            doi: meta_content(&doc, "citation_doi"),
            subject: None,
            comment: None,
            date: meta_content(&doc, "citation_publication_date").map(|d| d.replace('/', "-")),
            canonical_url: Some(url.raw.clone()),
            pdf_candidates,
            extractor: "chemrxiv-page".to_string(),
        })
    }
}

#[async_trait]
impl Extractor for ChemrxivExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Chemrxiv
    }

    async fn extract(
        &self,
        url: &SourceUrl,
        strategy: FetchStrategy,
        fetch: &Fetcher,
    ) -> Result<RawExtraction> {
        match strategy {
            FetchStrategy::Browser => self.extract_from_page(url, fetch).await,
            FetchStrategy::Http => self.extract_from_api(url, fetch).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_comes_from_article_details_path() {
        assert_eq!(
            ChemrxivExtractor::parse_item_id(
                "https://chemrxiv.org/engage/chemrxiv/article-details/6500f001b338ec988ea6a0a1"
            )
            .as_deref(),
            Some("6500f001b338ec988ea6a0a1")
        );
        assert_eq!(
            ChemrxivExtractor::parse_item_id(
                "https://chemrxiv.org/engage/chemrxiv/article-details/abc123?tab=versions"
            )
            .as_deref(),
            Some("abc123")
        );
        assert_eq!(
            ChemrxivExtractor::parse_item_id("https://chemrxiv.org/engage/chemrxiv/search"),
            None
        );
    }

    #[test]
    fn engage_item_json_deserializes() {
        let item: EngageItem = serde_json::from_str(
            r#"{
                "title": "A Greener Catalyst",
                "authors": [
                    {"firstName": "Maria", "lastName": "Rossi"},
                    {"firstName": "Ken", "lastName": "Tanaka"}
                ],
                "abstract": "We report a greener catalyst.",
                "doi": "10.26434/chemrxiv-2024-abcde",
                "categories": [{"name": "Catalysis"}],
                "publishedDate": "2024-03-05T12:00:00.000Z",
                "asset": {"original": {"url": "https://chemrxiv.org/files/catalyst.pdf"}}
            }"#,
        )
        .unwrap();

        assert_eq!(item.title, "A Greener Catalyst");
        assert_eq!(item.authors.len(), 2);
        assert_eq!(item.authors[1].last_name, "Tanaka");
        assert_eq!(item.categories[0].name, "Catalysis");
        assert_eq!(
            item.asset.unwrap().original.unwrap().url,
            "https://chemrxiv.org/files/catalyst.pdf"
        );
    }

    #[tokio::test]
    async fn http_strategy_reads_the_item_api() {
        use std::sync::Arc;

        use crate::config::FetchConfig;
        use crate::fetch::CookieStore;

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/items/6500f001b338ec988ea6a0a1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "title": "A Greener Catalyst",
                    "authors": [{"firstName": "Maria", "lastName": "Rossi"}],
                    "abstract": "We report a greener catalyst.",
                    "doi": "10.26434/chemrxiv-2024-abcde",
                    "categories": [{"name": "Catalysis"}],
                    "publishedDate": "2024-03-05T12:00:00.000Z",
                    "asset": {"original": {"url": "https://chemrxiv.org/files/catalyst.pdf"}}
                }"#,
            )
            .create_async()
            .await;

        let cookies = Arc::new(CookieStore::new());
        let fetcher = Fetcher::new(&FetchConfig::default(), cookies).unwrap();
        let extractor = ChemrxivExtractor::new(format!("{}/items", server.url()));
        let url = SourceUrl {
            raw: "https://chemrxiv.org/engage/chemrxiv/article-details/6500f001b338ec988ea6a0a1"
                .to_string(),
            normalized_host: "chemrxiv.org".to_string(),
            kind: SourceKind::Chemrxiv,
        };

        let raw = extractor
            .extract(&url, FetchStrategy::Http, &fetcher)
            .await
            .unwrap();
        assert_eq!(raw.title, "A Greener Catalyst");
        assert_eq!(raw.authors_raw, "Maria Rossi");
        assert_eq!(raw.extractor, "chemrxiv-api");
        assert_eq!(raw.date.as_deref(), Some("2024-03-05"));
        assert_eq!(
            raw.pdf_candidates,
            vec!["https://chemrxiv.org/files/catalyst.pdf".to_string()]
        );
    }
}
