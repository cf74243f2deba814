//! Extractor registry: one instance per supported source.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SourcesConfig;
use crate::error::{Error, Result};
use crate::models::SourceKind;
use crate::sources::{
    ArxivExtractor, BiorxivExtractor, ChemrxivExtractor, CvfExtractor, Extractor, MedrxivExtractor,
};

/// Holds the extractor for every supported source. Built once at startup
/// from the configured API endpoints and shared; lookups are by classified
/// source kind.
#[derive(Debug)]
pub struct ExtractorRegistry {
    extractors: HashMap<SourceKind, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new(sources: &SourcesConfig) -> Self {
        let mut extractors: HashMap<SourceKind, Arc<dyn Extractor>> = HashMap::new();
        extractors.insert(
            SourceKind::Arxiv,
            Arc::new(ArxivExtractor::new(&sources.arxiv_api_url)),
        );
        extractors.insert(SourceKind::Cvf, Arc::new(CvfExtractor::new()));
        extractors.insert(
            SourceKind::Biorxiv,
            Arc::new(BiorxivExtractor::new(&sources.rxiv_api_url)),
        );
        extractors.insert(
            SourceKind::Medrxiv,
            Arc::new(MedrxivExtractor::new(&sources.rxiv_api_url)),
        );
        extractors.insert(
            SourceKind::Chemrxiv,
            Arc::new(ChemrxivExtractor::new(&sources.chemrxiv_api_url)),
        );
        Self { extractors }
    }

    pub fn get(&self, kind: SourceKind) -> Result<Arc<dyn Extractor>> {
        self.extractors
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::UnsupportedSource(kind.name().to_string()))
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<_> = self.extractors.keys().copied().collect();
        kinds.sort_by_key(|k| k.id());
        kinds
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(&SourcesConfig::default())
    }
}
