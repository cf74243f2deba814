//! Per-source metadata extractors.
//!
//! Each supported repository implements the [`Extractor`] trait; new sources
//! are added by adding a variant and registering it, never by branching on
//! source inside shared logic. Extractors are side-effect-free beyond the
//! network fetches they perform: every invocation is independent and
//! retry-safe.

mod arxiv;
mod chemrxiv;
mod classify;
mod cvf;
mod registry;
mod rxiv;

pub use arxiv::ArxivExtractor;
pub use chemrxiv::ChemrxivExtractor;
pub use classify::classify;
pub use cvf::CvfExtractor;
pub use registry::ExtractorRegistry;
pub use rxiv::{BiorxivExtractor, MedrxivExtractor};

use async_trait::async_trait;

use crate::error::Result;
use crate::fetch::{FetchStrategy, Fetcher};
use crate::models::{RawExtraction, SourceKind, SourceUrl};

/// Capability interface for one preprint repository.
#[async_trait]
pub trait Extractor: Send + Sync + std::fmt::Debug {
    /// Which source this extractor handles.
    fn kind(&self) -> SourceKind;

    /// Fetch the landing page and/or API and parse it into a raw record.
    ///
    /// The strategy decides how landing pages are loaded; extractors that
    /// talk to a plain-HTTP API may ignore it for the API call itself.
    async fn extract(
        &self,
        url: &SourceUrl,
        strategy: FetchStrategy,
        fetch: &Fetcher,
    ) -> Result<RawExtraction>;
}

/// Stable per-paper key: the source id plus the identifier the source
/// itself uses, so spelling variants of the same paper (`/abs/` vs `/pdf/`,
/// version suffixes, mirror hosts) collapse to one key. Falls back to the
/// normalized host and lowercased path when no identifier can be parsed.
pub fn canonical_key(url: &SourceUrl) -> String {
    let ident = match url.kind {
        SourceKind::Arxiv => ArxivExtractor::parse_id(&url.raw).ok(),
        SourceKind::Biorxiv | SourceKind::Medrxiv => rxiv::parse_doi(&url.raw).ok().map(|d| d.doi),
        SourceKind::Chemrxiv => ChemrxivExtractor::parse_item_id(&url.raw),
        SourceKind::Cvf => None,
    };
    match ident {
        Some(id) => format!("{}:{}", url.kind.id(), id),
        None => {
            let path = url::Url::parse(&url.raw)
                .map(|u| u.path().trim_end_matches('/').to_lowercase())
                .unwrap_or_else(|_| url.raw.trim().to_lowercase());
            format!("{}:{}{}", url.kind.id(), url.normalized_host, path)
        }
    }
}

/// Shared helper: pull a `<meta name="..." content="...">` value out of a
/// parsed document. The *Rxiv and ChemRxiv pages expose Highwire
/// `citation_*` tags this way.
pub(crate) fn meta_content(doc: &scraper::Html, name: &str) -> Option<String> {
    let selector = scraper::Selector::parse(&format!(r#"meta[name="{}"]"#, name)).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// All values of a repeated meta tag, in document order.
pub(crate) fn meta_contents(doc: &scraper::Html, name: &str) -> Vec<String> {
    let Some(selector) = scraper::Selector::parse(&format!(r#"meta[name="{}"]"#, name)).ok() else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_helpers_read_highwire_tags() {
        let html = r#"<html><head>
            <meta name="citation_title" content="A Test Preprint" />
            <meta name="citation_author" content="Smith, John" />
            <meta name="citation_author" content="Doe, Jane" />
            <meta name="citation_pdf_url" content="" />
        </head><body></body></html>"#;
        let doc = scraper::Html::parse_document(html);

        assert_eq!(meta_content(&doc, "citation_title").as_deref(), Some("A Test Preprint"));
        assert_eq!(
            meta_contents(&doc, "citation_author"),
            vec!["Smith, John".to_string(), "Doe, Jane".to_string()]
        );
        // Empty content never counts as found.
        assert_eq!(meta_content(&doc, "citation_pdf_url"), None);
    }

    #[test]
    fn canonical_keys_collapse_url_variants() {
        let pairs = [
            (
                "https://arxiv.org/abs/2301.12345",
                "https://arxiv.org/pdf/2301.12345v2",
            ),
            (
                "https://arxiv.org/abs/2301.12345",
                "http://export.arxiv.org/abs/2301.12345",
            ),
            (
                "https://www.biorxiv.org/content/10.1101/2024.01.02.573943v1",
                "https://www.biorxiv.org/content/10.1101/2024.01.02.573943v2.full",
            ),
            (
                "https://chemrxiv.org/engage/chemrxiv/article-details/abc123",
                "https://chemrxiv.org/engage/chemrxiv/article-details/abc123?tab=versions",
            ),
        ];
        for (a, b) in pairs {
            let key_a = canonical_key(&classify(a).unwrap());
            let key_b = canonical_key(&classify(b).unwrap());
            assert_eq!(key_a, key_b, "for {} vs {}", a, b);
        }
    }

    #[test]
    fn canonical_keys_separate_distinct_papers() {
        let a = canonical_key(&classify("https://arxiv.org/abs/2301.12345").unwrap());
        let b = canonical_key(&classify("https://arxiv.org/abs/2301.99999").unwrap());
        assert_ne!(a, b);

        let c = canonical_key(
            &classify("https://www.biorxiv.org/content/10.1101/2024.01.02.573943v1").unwrap(),
        );
        let d = canonical_key(
            &classify("https://www.medrxiv.org/content/10.1101/2025.09.22.25336422v1").unwrap(),
        );
        assert_ne!(c, d);
    }
}
