//! CVF Open Access extractor.
//!
//! Conference pages (CVPR/ICCV/WACV) are static HTML with stable element
//! ids, so extraction is a straight scrape of the landing page. The site
//! links the PDF relative to the page; a derived absolute form backs it up.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{Error, Result};
use crate::fetch::{FetchStrategy, Fetcher};
use crate::models::{RawExtraction, SourceKind, SourceUrl};
use crate::sources::Extractor;

#[derive(Debug, Default)]
pub struct CvfExtractor;

impl CvfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn select_text(doc: &Html, css: &str) -> Option<String> {
        let selector = Selector::parse(css).ok()?;
        doc.select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
    }

    /// The [pdf] anchor on the page, resolved against the page URL.
    fn site_pdf_link(doc: &Html, page_url: &Url) -> Option<String> {
        let selector = Selector::parse("a").ok()?;
        doc.select(&selector)
            .filter(|el| {
                el.text()
                    .collect::<String>()
                    .trim()
                    .eq_ignore_ascii_case("pdf")
            })
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| page_url.join(href).ok())
            .map(|u| u.to_string())
            .next()
    }

    /// Derive the PDF path from the abstract path:
    /// `/content/X/html/Name_paper.html` becomes `/content/X/papers/Name_paper.pdf`.
    fn derived_pdf_link(page_url: &Url) -> Option<String> {
        let path = page_url.path();
        if !path.ends_with(".html") {
            return None;
        }
        let pdf_path = path.replace("/html/", "/papers/").replace(".html", ".pdf");
        let mut url = page_url.clone();
        url.set_path(&pdf_path);
        url.set_query(None);
        Some(url.to_string())
    }

    /// Conference and year from the path, e.g. `/content/CVPR2024/...`.
    fn venue_from_path(page_url: &Url) -> Option<String> {
        page_url
            .path_segments()?
            .skip_while(|s| *s != "content")
            .nth(1)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }
}

#[async_trait]
impl Extractor for CvfExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Cvf
    }

    async fn extract(
        &self,
        url: &SourceUrl,
        strategy: FetchStrategy,
        fetch: &Fetcher,
    ) -> Result<RawExtraction> {
        let page_url = Url::parse(&url.raw)?;
        let body = fetch.page(&url.raw, strategy).await?;
        let doc = Html::parse_document(&body);

        let title = Self::select_text(&doc, "#papertitle")
            .ok_or_else(|| Error::parse("cvf", "page has no #papertitle element", &body))?;

        // Author names sit in an <i> inside the #authors block, comma
        // separated.
        let authors_raw = Self::select_text(&doc, "#authors i")
            .or_else(|| Self::select_text(&doc, "#authors"))
            .unwrap_or_default();

        let abstract_text = Self::select_text(&doc, "#abstract").unwrap_or_default();

        let mut pdf_candidates = Vec::new();
        if let Some(link) = Self::site_pdf_link(&doc, &page_url) {
            pdf_candidates.push(link);
        }
        if let Some(link) = Self::derived_pdf_link(&page_url) {
            if !pdf_candidates.contains(&link) {
                pdf_candidates.push(link);
            }
        }

        Ok(RawExtraction {
            title,
            authors_raw,
            abstract_text,
            doi: None,
            subject: Self::venue_from_path(&page_url),
            comment: None,
            date: None,
            canonical_url: Some(url.raw.clone()),
            pdf_candidates,
            extractor: "cvf-page".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str =
        "https://openaccess.thecvf.com/content/CVPR2024/html/Doe_Masked_Things_CVPR_2024_paper.html";

    fn sample_page() -> &'static str {
        r#"<html><body>
            <div id="papertitle">
                Masked Things Considered
            </div>
            <div id="authors"><i>John Doe, Jane Smith</i>; Proceedings of CVPR 2024</div>
            <div id="abstract">We consider masked things.</div>
            <a href="../papers/Doe_Masked_Things_CVPR_2024_paper.pdf">pdf</a>
            <a href="bibtex">bibtex</a>
        </body></html>"#
    }

    #[test]
    fn scrapes_title_authors_abstract() {
        let doc = Html::parse_document(sample_page());
        assert_eq!(
            CvfExtractor::select_text(&doc, "#papertitle").as_deref(),
            Some("Masked Things Considered")
        );
        assert_eq!(
            CvfExtractor::select_text(&doc, "#authors i").as_deref(),
            Some("John Doe, Jane Smith")
        );
        assert_eq!(
            CvfExtractor::select_text(&doc, "#abstract").as_deref(),
            Some("We consider masked things.")
        );
    }

    #[test]
    fn site_pdf_link_resolves_relative_href() {
        let doc = Html::parse_document(sample_page());
        let page_url = Url::parse(PAGE_URL).unwrap();
        assert_eq!(
            CvfExtractor::site_pdf_link(&doc, &page_url).as_deref(),
            Some(
                "https://openaccess.thecvf.com/content/CVPR2024/papers/Doe_Masked_Things_CVPR_2024_paper.pdf"
            )
        );
    }

    #[test]
    fn derived_pdf_link_rewrites_html_path() {
        let page_url = Url::parse(PAGE_URL).unwrap();
        assert_eq!(
            CvfExtractor::derived_pdf_link(&page_url).as_deref(),
            Some(
                "https://openaccess.thecvf.com/content/CVPR2024/papers/Doe_Masked_Things_CVPR_2024_paper.pdf"
            )
        );
    }

    #[test]
    fn venue_comes_from_content_path() {
        let page_url = Url::parse(PAGE_URL).unwrap();
        assert_eq!(
            CvfExtractor::venue_from_path(&page_url).as_deref(),
            Some("CVPR2024")
        );
    }

    #[test]
    fn missing_title_is_a_parse_error() {
        let doc = Html::parse_document("<html><body><p>not a paper page</p></body></html>");
        assert_eq!(CvfExtractor::select_text(&doc, "#papertitle"), None);
    }
}
