//! Client for the reference manager's local connector API.
//!
//! Zotero exposes the same HTTP endpoints its browser connector uses, on
//! 127.0.0.1:23119. A save is a short conversation: `saveItems` opens a
//! session with the bibliographic record, `updateSession` moves it into a
//! collection, and `saveAttachment` streams the PDF into the session.

mod collections;

pub use collections::CollectionStore;

use serde_json::{json, Value};

use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::models::PaperRecord;

#[derive(Debug, Clone)]
pub struct ZoteroConnector {
    base_url: String,
    client: reqwest::Client,
}

impl ZoteroConnector {
    pub fn new(cfg: &ConnectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| Error::Config(format!("connector client: {}", e)))?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/connector/{}", self.base_url, path)
    }

    fn unreachable(&self, path: &str, detail: impl std::fmt::Display) -> Error {
        Error::ManagerUnreachable {
            endpoint: self.endpoint(path),
            detail: detail.to_string(),
        }
    }

    /// Liveness probe. Returns the manager's ping response body, which
    /// identifies the application and version.
    pub async fn ping(&self) -> Result<String> {
        let url = self.endpoint("ping");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unreachable("ping", e))?;
        if !response.status().is_success() {
            return Err(self.unreachable("ping", format!("status {}", response.status())));
        }
        response
            .text()
            .await
            .map_err(|e| self.unreachable("ping", e))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<()> {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.unreachable(path, e))?;
        if !response.status().is_success() {
            return Err(self.unreachable(path, format!("status {}", response.status())));
        }
        Ok(())
    }

    /// Open a save session carrying the record. Returns the session id for
    /// the follow-up calls.
    ///
    /// When the PDF could not be fetched the caller passes a fallback URL
    /// and the item carries a non-snapshot link attachment instead.
    pub async fn create_session(
        &self,
        record: &PaperRecord,
        link_fallback: Option<&str>,
    ) -> Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let item = Self::item_payload(record, link_fallback);
        let body = json!({
            "sessionID": session_id,
            "uri": record.source_url,
            "items": [item],
        });

        self.post_json("saveItems", &body).await?;
        tracing::info!(session = session_id.as_str(), title = record.title.as_str(), "save session opened");
        Ok(session_id)
    }

    /// Move the session's item into a collection. `target` is the
    /// manager's collection key, e.g. `C42`.
    pub async fn update_session(&self, session_id: &str, target: &str) -> Result<()> {
        let body = json!({
            "sessionID": session_id,
            "target": target,
        });
        self.post_json("updateSession", &body).await
    }

    /// Stream a downloaded PDF into the session.
    pub async fn upload_attachment(
        &self,
        session_id: &str,
        title: &str,
        source_url: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let url = format!(
            "{}?sessionID={}",
            self.endpoint("saveAttachment"),
            urlencoding::encode(session_id)
        );
        let metadata = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "title": title,
            "url": source_url,
            "contentType": "application/pdf",
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/pdf")
            .header("X-Metadata", metadata.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| self.unreachable("saveAttachment", e))?;
        if !response.status().is_success() {
            return Err(self.unreachable(
                "saveAttachment",
                format!("status {}", response.status()),
            ));
        }
        Ok(())
    }

    fn item_payload(record: &PaperRecord, link_fallback: Option<&str>) -> Value {
        let creators: Vec<Value> = record
            .authors
            .iter()
            .map(|a| {
                json!({
                    "creatorType": "author",
                    "firstName": a.first_name,
                    "lastName": a.last_name,
                })
            })
            .collect();

        let mut item = json!({
            "itemType": record.item_type.as_str(),
            "title": record.title,
            "creators": creators,
            "abstractNote": record.abstract_note,
            "url": record.source_url,
            "repository": record.repository,
            "libraryCatalog": record.repository,
            "accessDate": chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            "attachments": [],
        });

        if let Some(doi) = &record.doi {
            item["DOI"] = json!(doi);
        }
        if let Some(date) = &record.date {
            item["date"] = json!(date);
        }
        if let Some(comment) = &record.comment {
            item["extra"] = json!(comment);
        }
        if let Some(subject) = &record.subject {
            item["tags"] = json!([{ "tag": subject }]);
        }
        if let Some(url) = link_fallback {
            item["attachments"] = json!([{
                "title": format!("{} (link)", record.repository),
                "url": url,
                "mimeType": "text/html",
                "snapshot": false,
            }]);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::{Author, ItemType};

    fn sample_record() -> PaperRecord {
        PaperRecord {
            title: "Attention Is Not All You Need".to_string(),
            authors: vec![Author::new("John", "Smith"), Author::new("Jane", "Doe")],
            abstract_note: "We revisit the transformer.".to_string(),
            doi: Some("10.48550/arXiv.2301.12345".to_string()),
            subject: Some("cs.LG".to_string()),
            comment: Some("22 pages [arxiv-api]".to_string()),
            date: Some("2023-01-15".to_string()),
            source_url: "https://arxiv.org/abs/2301.12345".to_string(),
            item_type: ItemType::Preprint,
            repository: "arXiv".to_string(),
            pdf_candidates: vec![],
        }
    }

    fn connector_for(url: &str) -> ZoteroConnector {
        ZoteroConnector::new(&ConnectorConfig {
            base_url: url.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn item_payload_maps_record_fields() {
        let item = ZoteroConnector::item_payload(&sample_record(), None);
        assert_eq!(item["itemType"], "preprint");
        assert_eq!(item["title"], "Attention Is Not All You Need");
        assert_eq!(item["creators"].as_array().unwrap().len(), 2);
        assert_eq!(item["creators"][0]["creatorType"], "author");
        assert_eq!(item["creators"][1]["lastName"], "Doe");
        assert_eq!(item["DOI"], "10.48550/arXiv.2301.12345");
        assert_eq!(item["extra"], "22 pages [arxiv-api]");
        assert_eq!(item["libraryCatalog"], "arXiv");
        assert!(item["attachments"].as_array().unwrap().is_empty());
    }

    #[test]
    fn link_fallback_becomes_non_snapshot_attachment() {
        let item = ZoteroConnector::item_payload(
            &sample_record(),
            Some("https://arxiv.org/abs/2301.12345"),
        );
        let attachments = item["attachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0]["mimeType"], "text/html");
        assert_eq!(attachments[0]["snapshot"], false);
    }

    #[tokio::test]
    async fn ping_reports_unreachable_manager() {
        let connector = connector_for("http://127.0.0.1:1");
        let err = connector.ping().await.unwrap_err();
        assert!(matches!(err, Error::ManagerUnreachable { .. }));
    }

    #[tokio::test]
    async fn save_conversation_hits_connector_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let _ping = server
            .mock("GET", "/connector/ping")
            .with_status(200)
            .with_body("Zotero is running")
            .create_async()
            .await;
        let _save = server
            .mock("POST", "/connector/saveItems")
            .match_header("content-type", mockito::Matcher::Regex("json".to_string()))
            .with_status(201)
            .create_async()
            .await;
        let _update = server
            .mock("POST", "/connector/updateSession")
            .with_status(200)
            .create_async()
            .await;
        let _attach = server
            .mock(
                "POST",
                mockito::Matcher::Regex(r"^/connector/saveAttachment\?sessionID=.*".to_string()),
            )
            .match_header("content-type", "application/pdf")
            .with_status(201)
            .create_async()
            .await;

        let connector = connector_for(&server.url());
        assert_eq!(connector.ping().await.unwrap(), "Zotero is running");

        let session = connector
            .create_session(&sample_record(), None)
            .await
            .unwrap();
        assert!(!session.is_empty());

        connector.update_session(&session, "C42").await.unwrap();
        connector
            .upload_attachment(
                &session,
                "Full Text PDF",
                "https://arxiv.org/pdf/2301.12345.pdf",
                b"%PDF-1.7".to_vec(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn connector_error_status_is_typed() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/connector/saveItems")
            .with_status(500)
            .create_async()
            .await;

        let connector = connector_for(&server.url());
        let err = connector
            .create_session(&sample_record(), None)
            .await
            .unwrap_err();
        match err {
            Error::ManagerUnreachable { endpoint, .. } => {
                assert!(endpoint.ends_with("/connector/saveItems"));
            }
            other => panic!("expected ManagerUnreachable, got {:?}", other),
        }
    }
}
