//! Source classifier: maps an input URL to a known preprint repository.

use url::Url;

use crate::error::{Error, Result};
use crate::models::{SourceKind, SourceUrl};

/// Classify a URL by host/path pattern. Unknown hosts yield a typed
/// `UnsupportedSource` error so callers can report a clear capability
/// boundary instead of crashing.
pub fn classify(raw: &str) -> Result<SourceUrl> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| Error::UnsupportedSource(format!("{} ({})", raw.trim(), e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::UnsupportedSource(format!("URL has no host: {}", raw)))?
        .to_lowercase();
    let normalized_host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let path = parsed.path();

    let kind = match normalized_host.as_str() {
        // Abstract and PDF path forms, plus the export mirror.
        "arxiv.org" | "export.arxiv.org" => {
            if path.starts_with("/abs/") || path.starts_with("/pdf/") {
                Some(SourceKind::Arxiv)
            } else {
                None
            }
        }
        // e.g. /content/CVPR2024/html/Name_Title_CVPR_2024_paper.html
        "openaccess.thecvf.com" => {
            if path.starts_with("/content") {
                Some(SourceKind::Cvf)
            } else {
                None
            }
        }
        // DOI-resolving content paths: /content/10.1101/...
        "biorxiv.org" => path.contains("/content/10.1101/").then_some(SourceKind::Biorxiv),
        "medrxiv.org" => path.contains("/content/10.1101/").then_some(SourceKind::Medrxiv),
        "chemrxiv.org" => Some(SourceKind::Chemrxiv),
        _ => None,
    };

    match kind {
        Some(kind) => Ok(SourceUrl {
            raw: raw.trim().to_string(),
            normalized_host,
            kind,
        }),
        None => Err(Error::UnsupportedSource(format!(
            "{} (supported: arXiv, CVF Open Access, bioRxiv, medRxiv, ChemRxiv)",
            raw.trim()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_representative_urls() {
        let cases = [
            ("https://arxiv.org/abs/2301.12345", SourceKind::Arxiv),
            ("https://arxiv.org/pdf/2301.12345v2", SourceKind::Arxiv),
            ("http://export.arxiv.org/abs/2301.12345", SourceKind::Arxiv),
            (
                "https://openaccess.thecvf.com/content/CVPR2024/html/Doe_Title_CVPR_2024_paper.html",
                SourceKind::Cvf,
            ),
            (
                "https://www.biorxiv.org/content/10.1101/2024.01.02.573943v1",
                SourceKind::Biorxiv,
            ),
            (
                "https://www.medrxiv.org/content/10.1101/2025.09.22.25336422v1",
                SourceKind::Medrxiv,
            ),
            (
                "https://chemrxiv.org/engage/chemrxiv/article-details/6500f001b338ec988ea6a0a1",
                SourceKind::Chemrxiv,
            ),
        ];

        for (url, expected) in cases {
            let classified = classify(url).unwrap();
            assert_eq!(classified.kind, expected, "for {}", url);
            assert_eq!(classified.raw, url);
            assert!(!classified.normalized_host.starts_with("www."));
        }
    }

    #[test]
    fn unknown_hosts_are_typed_rejections() {
        for url in [
            "https://www.nature.com/articles/s41586-024-00001-1",
            "https://example.com/paper.pdf",
            "https://arxiv.org/list/cs.AI/recent",
        ] {
            match classify(url) {
                Err(Error::UnsupportedSource(_)) => {}
                other => panic!("expected UnsupportedSource for {}, got {:?}", url, other),
            }
        }
    }

    #[test]
    fn malformed_urls_never_crash() {
        assert!(matches!(
            classify("not a url"),
            Err(Error::UnsupportedSource(_))
        ));
    }

    #[test]
    fn host_is_normalized() {
        let classified = classify("https://WWW.BioRxiv.org/content/10.1101/2024.01.02.573943v1").unwrap();
        assert_eq!(classified.normalized_host, "biorxiv.org");
    }
}
