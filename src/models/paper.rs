//! Paper-side data model: classified URLs, raw extractions, normalized records.

use serde::{Deserialize, Serialize};

/// The preprint repository a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Arxiv,
    Cvf,
    Biorxiv,
    Medrxiv,
    Chemrxiv,
}

impl SourceKind {
    /// Identifier used in tool output and error messages.
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Arxiv => "arxiv",
            SourceKind::Cvf => "cvf",
            SourceKind::Biorxiv => "biorxiv",
            SourceKind::Medrxiv => "medrxiv",
            SourceKind::Chemrxiv => "chemrxiv",
        }
    }

    /// Human-readable repository name.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Arxiv => "arXiv",
            SourceKind::Cvf => "CVF Open Access",
            SourceKind::Biorxiv => "bioRxiv",
            SourceKind::Medrxiv => "medRxiv",
            SourceKind::Chemrxiv => "ChemRxiv",
        }
    }

    pub fn all() -> &'static [SourceKind] {
        &[
            SourceKind::Arxiv,
            SourceKind::Cvf,
            SourceKind::Biorxiv,
            SourceKind::Medrxiv,
            SourceKind::Chemrxiv,
        ]
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An input URL after classification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrl {
    /// The URL exactly as the user supplied it.
    pub raw: String,
    /// Lowercased host with any leading `www.` stripped.
    pub normalized_host: String,
    pub kind: SourceKind,
}

/// Source-specific bag of fields as discovered on the page or API.
///
/// Owned by the extractor that produced it and consumed exactly once by the
/// normalizer; nothing here is canonicalized yet.
#[derive(Debug, Clone, Default)]
pub struct RawExtraction {
    pub title: String,
    /// Author names in whatever shape the source exposed them.
    pub authors_raw: String,
    pub abstract_text: String,
    pub doi: Option<String>,
    /// Subject classification (e.g. an arXiv primary category).
    pub subject: Option<String>,
    /// Free-text author comment such as "15 pages, 5 figures".
    pub comment: Option<String>,
    /// Publication date in YYYY-MM-DD form when the source exposes one.
    pub date: Option<String>,
    /// Canonical landing-page URL when it differs from the input
    /// (e.g. a PDF link resolved back to its abstract page).
    pub canonical_url: Option<String>,
    /// PDF candidates in priority order: site-provided link first,
    /// derived/guessed URL last.
    pub pdf_candidates: Vec<String>,
    /// Name of the extractor that produced this, for provenance.
    pub extractor: String,
}

/// One parsed author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

impl Author {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Zotero item type carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    Preprint,
    JournalArticle,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Preprint => "preprint",
            ItemType::JournalArticle => "journalArticle",
        }
    }
}

/// Normalized, manager-schema-ready bibliographic record.
///
/// Invariant: `title` is non-empty and `source_url` is the classified input;
/// the normalizer fails the extraction rather than emit a record without them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: Vec<Author>,
    pub abstract_note: String,
    pub doi: Option<String>,
    pub subject: Option<String>,
    /// Extractor provenance and any caveats, mapped to the item's Extra field.
    pub comment: Option<String>,
    pub date: Option<String>,
    pub source_url: String,
    pub item_type: ItemType,
    pub repository: String,
    pub pdf_candidates: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ids_are_stable() {
        for kind in SourceKind::all() {
            assert!(!kind.id().is_empty());
            assert!(!kind.name().is_empty());
        }
        assert_eq!(SourceKind::Arxiv.id(), "arxiv");
        assert_eq!(SourceKind::Chemrxiv.name(), "ChemRxiv");
    }

    #[test]
    fn item_type_maps_to_zotero_names() {
        assert_eq!(ItemType::Preprint.as_str(), "preprint");
        assert_eq!(ItemType::JournalArticle.as_str(), "journalArticle");
    }
}
