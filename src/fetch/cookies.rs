//! Cookie side-channel store.
//!
//! Records arrive out-of-band as `{site, cookies, timestamp}` and are treated
//! as opaque credentials: attached verbatim as a `Cookie` header for matching
//! hosts, never parsed for content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// One opaque cookie record for a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub site: String,
    /// Raw `Cookie` header value, e.g. `"a=1; b=2"`. Opaque to this crate.
    pub cookies: String,
    pub timestamp: DateTime<Utc>,
}

/// Process-wide store of side-channel cookies, keyed by site.
#[derive(Debug, Default)]
pub struct CookieStore {
    inner: Mutex<HashMap<String, CookieRecord>>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for a site. The site key is lowercased; the cookie
    /// payload is stored untouched.
    pub fn set(&self, site: &str, cookies: &str) -> CookieRecord {
        let record = CookieRecord {
            site: site.trim().to_lowercase(),
            cookies: cookies.trim().to_string(),
            timestamp: Utc::now(),
        };
        let mut inner = self.inner.lock().expect("cookie store lock poisoned");
        inner.insert(record.site.clone(), record.clone());
        record
    }

    /// Cookie header value for a host, if a stored site matches it by suffix
    /// (`biorxiv.org` matches `www.biorxiv.org`).
    pub fn header_for(&self, host: &str) -> Option<String> {
        let host = host.to_lowercase();
        let inner = self.inner.lock().expect("cookie store lock poisoned");
        inner
            .values()
            .find(|r| host == r.site || host.ends_with(&format!(".{}", r.site)))
            .map(|r| r.cookies.clone())
    }

    /// Sites with stored credentials and when they arrived.
    pub fn sites(&self) -> Vec<(String, DateTime<Utc>)> {
        let inner = self.inner.lock().expect("cookie store lock poisoned");
        let mut sites: Vec<_> = inner
            .values()
            .map(|r| (r.site.clone(), r.timestamp))
            .collect();
        sites.sort_by(|a, b| a.0.cmp(&b.0));
        sites
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_matching_includes_subdomains() {
        let store = CookieStore::new();
        store.set("biorxiv.org", "session=abc; consent=1");

        assert_eq!(
            store.header_for("www.biorxiv.org").as_deref(),
            Some("session=abc; consent=1")
        );
        assert_eq!(
            store.header_for("biorxiv.org").as_deref(),
            Some("session=abc; consent=1")
        );
        assert!(store.header_for("medrxiv.org").is_none());
    }

    #[test]
    fn payload_is_kept_verbatim() {
        let store = CookieStore::new();
        let odd = "weird stuff;; not=really<cookies>";
        store.set("Example.COM", odd);
        assert_eq!(store.header_for("example.com").as_deref(), Some(odd));
    }

    #[test]
    fn set_replaces_previous_record() {
        let store = CookieStore::new();
        store.set("arxiv.org", "a=1");
        store.set("arxiv.org", "a=2");
        assert_eq!(store.header_for("arxiv.org").as_deref(), Some("a=2"));
        assert_eq!(store.sites().len(), 1);
    }
}
