//! Save orchestration: the pipeline from URL to committed library item.
//!
//! A save runs as a session with a monotonic state machine. Metadata
//! extraction and attachment resolution happen before the manager is
//! touched, so a failed extraction never leaves a half-saved item; once the
//! connector conversation starts, any error moves the session to `Failed`
//! with the cause preserved.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{escalation, initial_strategy, CookieStore, Fetcher};
use crate::models::{Attachment, AttachmentKind, PaperRecord};
use crate::normalize::normalize;
use crate::pdf::{PdfResolver, RetryPolicy};
use crate::sources::{canonical_key, classify, ExtractorRegistry};
use crate::zotero::{CollectionStore, ZoteroConnector};

/// Session lifecycle. Forward-only: `Failed` is reachable from any
/// non-terminal state and nothing leaves `Committed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    MetadataResolved,
    AttachmentResolved,
    Committed,
    Failed,
}

impl SessionState {
    fn is_terminal(self) -> bool {
        matches!(self, SessionState::Committed | SessionState::Failed)
    }

    fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Init, MetadataResolved)
            | (MetadataResolved, AttachmentResolved)
            | (AttachmentResolved, Committed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// One save in progress. Tracks state so transitions can be logged and
/// enforced in a single place.
#[derive(Debug)]
struct SaveSession {
    url: String,
    state: SessionState,
    connector_session: Option<String>,
}

impl SaveSession {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            state: SessionState::Init,
            connector_session: None,
        }
    }

    fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidRequest(format!(
                "session transition {:?} -> {:?} is not allowed",
                self.state, next
            )));
        }
        tracing::debug!(url = self.url.as_str(), from = ?self.state, to = ?next, "session transition");
        self.state = next;
        Ok(())
    }
}

/// What a completed save reports back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub state: SessionState,
    pub title: String,
    pub session_id: String,
    pub attachment: AttachmentKind,
    /// Download attempts spent on the winning candidate; 0 for links.
    pub download_attempts: u32,
    pub collection: Option<String>,
}

/// Liveness report for the status tool. Always produced: an unreachable
/// manager is a finding to report, not an error to propagate.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub reachable: bool,
    /// The manager's ping response when reachable, remediation text when not.
    pub detail: String,
    /// Collection count, when the library sqlite could be read.
    pub collections: Option<usize>,
    pub sources: Vec<String>,
}

/// Removes the key from the in-flight set when the save finishes, whatever
/// the outcome.
#[derive(Debug)]
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

pub struct SaveOrchestrator {
    config: Config,
    fetcher: Fetcher,
    registry: ExtractorRegistry,
    connector: ZoteroConnector,
    collections: CollectionStore,
    pdf: PdfResolver,
    cookies: Arc<CookieStore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl SaveOrchestrator {
    pub fn new(config: Config) -> Result<Self> {
        let cookies = Arc::new(CookieStore::new());
        let fetcher = Fetcher::new(&config.fetch, Arc::clone(&cookies))?;
        let connector = ZoteroConnector::new(&config.connector)?;
        let collections = CollectionStore::new(&config.library);
        let pdf = PdfResolver::new(RetryPolicy::from_config(&config.pdf));
        let registry = ExtractorRegistry::new(&config.sources);
        Ok(Self {
            config,
            fetcher,
            registry,
            connector,
            collections,
            pdf,
            cookies,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store a cookie payload for a site, to be replayed on matching
    /// fetches. The payload is opaque to the pipeline.
    pub fn set_cookies(&self, site: &str, cookie_header: &str) -> crate::fetch::CookieRecord {
        self.cookies.set(site, cookie_header)
    }

    /// Classify, extract, and normalize a URL without saving anything.
    ///
    /// When a plain-HTTP extraction fails in a way consistent with missing
    /// rendered content, the extraction is retried once with the browser.
    pub async fn resolve_metadata(&self, url: &str) -> Result<PaperRecord> {
        let source = classify(url)?;
        let extractor = self.registry.get(source.kind)?;
        let strategy = initial_strategy(source.kind);

        let raw = match extractor.extract(&source, strategy, &self.fetcher).await {
            Ok(raw) => raw,
            Err(e) if e.suggests_rendering() => {
                let Some(next) = escalation(strategy) else {
                    return Err(e);
                };
                tracing::info!(url, %strategy, error = %e, "escalating fetch strategy");
                extractor.extract(&source, next, &self.fetcher).await?
            }
            Err(e) => return Err(e),
        };

        normalize(raw, &source)
    }

    /// Collections as an indented listing for display.
    pub fn list_collections(&self) -> Result<Vec<String>> {
        self.collections.list()
    }

    /// Ping the manager and count the library's collections. Never fails:
    /// an unreachable manager comes back as a report with remediation text.
    pub async fn check_status(&self) -> StatusReport {
        let sources = self
            .registry
            .kinds()
            .iter()
            .map(|k| k.name().to_string())
            .collect();
        match self.connector.ping().await {
            Ok(manager) => {
                let collections = self
                    .collections
                    .tree()
                    .ok()
                    .map(|tree| tree.iter().map(|c| c.size()).sum());
                StatusReport {
                    reachable: true,
                    detail: manager,
                    collections,
                    sources,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "manager ping failed");
                StatusReport {
                    reachable: false,
                    detail: e.to_string(),
                    collections: None,
                    sources,
                }
            }
        }
    }

    /// Full pipeline: extract, fetch the PDF (degrading to a link when it
    /// cannot be had), and commit the item to the manager.
    pub async fn save_paper(&self, url: &str, collection: Option<&str>) -> Result<SaveOutcome> {
        // Classify up front so the in-flight slot is keyed on the paper,
        // not the URL spelling.
        let source = classify(url)?;
        let _guard = self.claim(&canonical_key(&source))?;
        let mut session = SaveSession::new(url);

        match self.run_save(&mut session, url, collection).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if !session.state.is_terminal() {
                    let _ = session.advance(SessionState::Failed);
                }
                tracing::warn!(url, error = %e, state = ?session.state, "save failed");
                Err(e)
            }
        }
    }

    async fn run_save(
        &self,
        session: &mut SaveSession,
        url: &str,
        collection: Option<&str>,
    ) -> Result<SaveOutcome> {
        // Resolve the collection before any network work so a typo fails
        // fast and leaves no session behind.
        let target = collection
            .map(|c| self.collections.resolve(c))
            .transpose()?;

        let record = self.resolve_metadata(url).await?;
        session.advance(SessionState::MetadataResolved)?;

        let attachment = match self
            .pdf
            .resolve(&record.pdf_candidates, self.fetcher.http())
            .await
        {
            Ok(pdf) => pdf,
            Err(Error::AttachmentUnavailable) => {
                tracing::info!(url, "PDF unavailable, degrading to link attachment");
                Attachment::link(record.source_url.clone())
            }
            Err(e) => return Err(e),
        };
        session.advance(SessionState::AttachmentResolved)?;

        let link_fallback = match attachment.kind {
            AttachmentKind::Link => Some(attachment.url.as_str()),
            AttachmentKind::Pdf => None,
        };
        let session_id = self.connector.create_session(&record, link_fallback).await?;
        session.connector_session = Some(session_id.clone());

        if let Some(target) = &target {
            self.connector
                .update_session(&session_id, &target.tree_view_id)
                .await?;
        }

        if attachment.kind == AttachmentKind::Pdf {
            self.connector
                .upload_attachment(
                    &session_id,
                    "Full Text PDF",
                    &attachment.url,
                    attachment.bytes.clone(),
                )
                .await?;
        }

        session.advance(SessionState::Committed)?;
        tracing::info!(
            url,
            session = session_id.as_str(),
            attachment = ?attachment.kind,
            "save committed"
        );

        Ok(SaveOutcome {
            state: session.state,
            title: record.title,
            session_id,
            attachment: attachment.kind,
            download_attempts: attachment.attempts,
            collection: target.map(|t| t.tree_view_id),
        })
    }

    /// One save per paper at a time, keyed on the canonical source
    /// identifier. A second request for the same paper while the first is
    /// running is rejected, not queued.
    fn claim(&self, key: &str) -> Result<InFlightGuard> {
        let key = key.to_string();
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| Error::InvalidRequest("in-flight set poisoned".to_string()))?;
        if !set.insert(key.clone()) {
            return Err(Error::DuplicateSaveInProgress(key));
        }
        Ok(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            key,
        })
    }
}

impl std::fmt::Debug for SaveOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveOrchestrator")
            .field("connector", &self.config.connector.base_url)
            .finish()
    }
}
