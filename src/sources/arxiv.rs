//! arXiv extractor.
//!
//! Works entirely against the export API: the abstract or PDF URL is reduced
//! to an arXiv identifier, then `export.arxiv.org/api/query` returns an Atom
//! entry with richer metadata than the landing page, including the subject
//! classification and the author Comment field.

use async_trait::async_trait;
use feed_rs::parser;

use crate::error::{Error, Result};
use crate::fetch::{FetchStrategy, Fetcher};
use crate::models::{RawExtraction, SourceKind, SourceUrl};
use crate::sources::Extractor;

const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";

#[derive(Debug)]
pub struct ArxivExtractor {
    api_url: String,
}

impl ArxivExtractor {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    /// Reduce an abstract or PDF URL to a bare arXiv identifier.
    ///
    /// Handles `/abs/2301.12345`, `/pdf/2301.12345v2`, and a trailing
    /// `.pdf`; the version suffix is stripped so the API returns the
    /// latest revision.
    pub fn parse_id(url: &str) -> Result<String> {
        let lower = url.trim().to_lowercase();
        let after = lower
            .split_once("/abs/")
            .or_else(|| lower.split_once("/pdf/"))
            .map(|(_, rest)| rest)
            .ok_or_else(|| Error::parse("arxiv", "URL carries no /abs/ or /pdf/ path", url))?;

        let id = after
            .split(['?', '#'])
            .next()
            .unwrap_or(after)
            .trim_end_matches(".pdf")
            .trim_matches('/');

        let id = match regex::Regex::new(r"v\d+$").ok() {
            Some(re) => re.replace(id, "").to_string(),
            None => id.to_string(),
        };

        if id.is_empty() {
            return Err(Error::parse("arxiv", "empty arXiv identifier", url));
        }
        Ok(id)
    }

    /// Pull an `<arxiv:...>` extension element out of the raw Atom payload.
    /// feed-rs drops unknown namespaces, so these are read directly.
    fn extension(body: &str, element: &str) -> Option<String> {
        let pattern = format!(r"(?s)<arxiv:{e}[^>]*>(.*?)</arxiv:{e}>", e = element);
        let re = regex::Regex::new(&pattern).ok()?;
        re.captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl Extractor for ArxivExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Arxiv
    }

    async fn extract(
        &self,
        url: &SourceUrl,
        _strategy: FetchStrategy,
        fetch: &Fetcher,
    ) -> Result<RawExtraction> {
        let id = Self::parse_id(&url.raw)?;
        let api_url = format!("{}?id_list={}", self.api_url, urlencoding::encode(&id));

        let body = fetch.http().get_text(&api_url).await?;
        let feed = parser::parse(body.as_bytes())
            .map_err(|e| Error::parse("arxiv", format!("Atom feed: {}", e), &body))?;

        let entry = feed
            .entries
            .first()
            .ok_or_else(|| Error::parse("arxiv", format!("no entry for id {}", id), &body))?;

        // A deleted or unknown id comes back as an entry titled "Error".
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();
        if title.is_empty() || title == "Error" {
            return Err(Error::parse("arxiv", format!("id {} not found", id), &body));
        }

        let authors = entry
            .authors
            .iter()
            .map(|a| a.name.trim())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join("; ");

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().to_string())
            .unwrap_or_default();

        let subject = entry.categories.first().map(|c| c.term.clone());
        let date = entry.published.map(|d| d.format("%Y-%m-%d").to_string());

        // Site-provided PDF link first, derived forms after it.
        let mut pdf_candidates: Vec<String> = entry
            .links
            .iter()
            .filter(|l| l.media_type.as_deref() == Some("application/pdf"))
            .map(|l| l.href.clone())
            .collect();
        for derived in [
            format!("{}/{}.pdf", ARXIV_PDF_URL, id),
            format!("{}/{}", ARXIV_PDF_URL, id),
        ] {
            if !pdf_candidates.contains(&derived) {
                pdf_candidates.push(derived);
            }
        }

        Ok(RawExtraction {
            title,
            authors_raw: authors,
            abstract_text,
            doi: Self::extension(&body, "doi"),
            subject,
            comment: Self::extension(&body, "comment"),
            date,
            canonical_url: Some(format!("{}/{}", ARXIV_ABS_URL, id)),
            pdf_candidates,
            extractor: "arxiv-api".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_handles_abs_pdf_and_versions() {
        assert_eq!(
            ArxivExtractor::parse_id("https://arxiv.org/abs/2301.12345").unwrap(),
            "2301.12345"
        );
        assert_eq!(
            ArxivExtractor::parse_id("https://arxiv.org/pdf/2301.12345v2").unwrap(),
            "2301.12345"
        );
        assert_eq!(
            ArxivExtractor::parse_id("https://arxiv.org/pdf/2301.12345v1.pdf").unwrap(),
            "2301.12345"
        );
        assert_eq!(
            ArxivExtractor::parse_id("https://ARXIV.ORG/abs/2301.12345?context=cs").unwrap(),
            "2301.12345"
        );
    }

    #[test]
    fn parse_id_rejects_non_paper_paths() {
        assert!(ArxivExtractor::parse_id("https://arxiv.org/list/cs.AI/recent").is_err());
        assert!(ArxivExtractor::parse_id("https://arxiv.org/abs/").is_err());
    }

    #[test]
    fn extensions_come_from_raw_atom() {
        let body = r#"<feed xmlns:arxiv="http://arxiv.org/schemas/atom">
            <entry>
                <arxiv:comment xmlns:arxiv="http://arxiv.org/schemas/atom">15 pages,
                5 figures</arxiv:comment>
                <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.1234/test</arxiv:doi>
            </entry>
        </feed>"#;

        assert_eq!(
            ArxivExtractor::extension(body, "comment").as_deref(),
            Some("15 pages, 5 figures")
        );
        assert_eq!(
            ArxivExtractor::extension(body, "doi").as_deref(),
            Some("10.1234/test")
        );
        assert_eq!(ArxivExtractor::extension(body, "journal_ref"), None);
    }

    fn sample_feed() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
            <entry>
                <id>http://arxiv.org/abs/2301.12345v1</id>
                <title>Attention Is Not All You Need</title>
                <summary>  We revisit the transformer.  </summary>
                <published>2023-01-15T10:00:00Z</published>
                <author><name>John Smith</name></author>
                <author><name>Jane Doe</name></author>
                <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
                <arxiv:comment>22 pages</arxiv:comment>
                <link rel="related" type="application/pdf" href="http://arxiv.org/pdf/2301.12345v1"/>
            </entry>
        </feed>"#
    }

    #[test]
    fn sample_feed_parses_like_the_live_api() {
        let feed = parser::parse(sample_feed().as_bytes()).unwrap();
        let entry = &feed.entries[0];
        assert_eq!(
            entry.title.as_ref().unwrap().content,
            "Attention Is Not All You Need"
        );
        assert_eq!(entry.authors.len(), 2);
        assert_eq!(entry.categories[0].term, "cs.LG");
        assert_eq!(
            ArxivExtractor::extension(sample_feed(), "comment").as_deref(),
            Some("22 pages")
        );
    }
}
