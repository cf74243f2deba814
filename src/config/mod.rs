//! Configuration, resolved once at startup and passed by reference into the
//! pipeline. Core logic never reads ambient process state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Zotero connector endpoint settings.
    #[serde(default)]
    pub connector: ConnectorConfig,

    /// Zotero library (data directory) settings.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Network fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// PDF download retry settings.
    #[serde(default)]
    pub pdf: PdfConfig,

    /// Source API endpoints.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Local Zotero connector automation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Base URL of the connector server.
    #[serde(default = "default_connector_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_connector_timeout")]
    pub timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_connector_url(),
            timeout_secs: default_connector_timeout(),
        }
    }
}

impl ConnectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_connector_url() -> String {
    "http://127.0.0.1:23119".to_string()
}

fn default_connector_timeout() -> u64 {
    15
}

/// Where zotero.sqlite lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Zotero data directory (contains zotero.sqlite).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl LibraryConfig {
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("zotero.sqlite")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Zotero")
}

/// Remote fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Bound on concurrent plain-HTTP fetches; keeps remote rate limiters calm.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_http: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_http: default_max_concurrent(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_max_concurrent() -> usize {
    3
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// PDF download policy. Kept as plain data so the resolver's retry behavior
/// is independently testable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Download attempts per candidate URL.
    #[serde(default = "default_pdf_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled thereafter.
    #[serde(default = "default_pdf_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_pdf_multiplier")]
    pub backoff_multiplier: f64,

    /// Per-attempt timeout in seconds; a timed-out attempt is a failed attempt.
    #[serde(default = "default_pdf_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Responses smaller than this fail validation.
    #[serde(default = "default_pdf_min_bytes")]
    pub min_bytes: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_pdf_attempts(),
            base_delay_ms: default_pdf_base_delay(),
            backoff_multiplier: default_pdf_multiplier(),
            attempt_timeout_secs: default_pdf_attempt_timeout(),
            min_bytes: default_pdf_min_bytes(),
        }
    }
}

fn default_pdf_attempts() -> u32 {
    3
}

fn default_pdf_base_delay() -> u64 {
    1000
}

fn default_pdf_multiplier() -> f64 {
    2.0
}

fn default_pdf_attempt_timeout() -> u64 {
    60
}

fn default_pdf_min_bytes() -> usize {
    1024
}

/// Remote source API endpoints. Production defaults, overridable so the
/// pipeline can be pointed at local servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// arXiv export API query endpoint.
    #[serde(default = "default_arxiv_api_url")]
    pub arxiv_api_url: String,

    /// Cold Spring Harbor details API root; serves bioRxiv and medRxiv.
    #[serde(default = "default_rxiv_api_url")]
    pub rxiv_api_url: String,

    /// ChemRxiv Engage public item API root.
    #[serde(default = "default_chemrxiv_api_url")]
    pub chemrxiv_api_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            arxiv_api_url: default_arxiv_api_url(),
            rxiv_api_url: default_rxiv_api_url(),
            chemrxiv_api_url: default_chemrxiv_api_url(),
        }
    }
}

fn default_arxiv_api_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

fn default_rxiv_api_url() -> String {
    "https://api.biorxiv.org/details".to_string()
}

fn default_chemrxiv_api_url() -> String {
    "https://chemrxiv.org/engage/chemrxiv/public-api/v1/items".to_string()
}

/// Load configuration from an optional TOML file plus `REFDROP_*` environment
/// variables; missing values fall back to defaults.
pub fn load_config(path: Option<&PathBuf>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    builder = builder.add_source(config::Environment::with_prefix("REFDROP").separator("__"));
    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.connector.base_url, "http://127.0.0.1:23119");
        assert_eq!(cfg.pdf.max_attempts, 3);
        assert_eq!(cfg.pdf.base_delay_ms, 1000);
        assert_eq!(cfg.fetch.max_concurrent_http, 3);
        assert!(cfg.library.sqlite_path().ends_with("zotero.sqlite"));
        assert!(cfg.sources.arxiv_api_url.contains("export.arxiv.org"));
        assert!(cfg.sources.chemrxiv_api_url.contains("chemrxiv.org"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let cfg = load_config(None).expect("defaults should deserialize");
        assert_eq!(cfg.pdf.backoff_multiplier, 2.0);
    }
}
