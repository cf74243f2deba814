//! # refdrop
//!
//! A Model Context Protocol (MCP) server that saves preprints into a local
//! Zotero library: give it an arXiv, CVF Open Access, bioRxiv, medRxiv, or
//! ChemRxiv URL and it extracts the metadata, fetches the PDF, and files
//! the item through Zotero's connector automation API.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (PaperRecord, Attachment, Collection)
//! - [`sources`]: URL classifier and per-repository extractors
//! - [`fetch`]: HTTP client, cookie store, and headless-browser rendering
//! - [`pdf`]: PDF download with retry and validation
//! - [`normalize`]: Author parsing and record normalization
//! - [`zotero`]: Connector client and read-only collection store
//! - [`save`]: The save session state machine
//! - [`mcp`]: MCP protocol implementation and server
//! - [`config`]: Configuration management

pub mod config;
pub mod error;
pub mod fetch;
pub mod mcp;
pub mod models;
pub mod normalize;
pub mod pdf;
pub mod save;
pub mod sources;
pub mod zotero;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::{PaperRecord, SourceKind};
pub use save::{SaveOrchestrator, SaveOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
