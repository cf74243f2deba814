//! Tool handlers bridging MCP calls to the save orchestrator.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::save::SaveOrchestrator;

use super::tools::ToolHandler;

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing '{}' parameter", key))
}

/// Handler for the manager liveness probe.
#[derive(Debug)]
pub struct StatusHandler {
    pub orchestrator: Arc<SaveOrchestrator>,
}

#[async_trait::async_trait]
impl ToolHandler for StatusHandler {
    async fn execute(&self, _args: Value) -> Result<Value, String> {
        let report = self.orchestrator.check_status().await;
        serde_json::to_value(report).map_err(|e| e.to_string())
    }
}

/// Handler for listing the collection tree.
#[derive(Debug)]
pub struct ListCollectionsHandler {
    pub orchestrator: Arc<SaveOrchestrator>,
}

#[async_trait::async_trait]
impl ToolHandler for ListCollectionsHandler {
    async fn execute(&self, _args: Value) -> Result<Value, String> {
        let lines = self
            .orchestrator
            .list_collections()
            .map_err(|e| e.to_string())?;
        Ok(json!({
            "count": lines.len(),
            "collections": lines.join("\n"),
        }))
    }
}

/// Handler for extraction without a save.
#[derive(Debug)]
pub struct ExtractMetadataHandler {
    pub orchestrator: Arc<SaveOrchestrator>,
}

#[async_trait::async_trait]
impl ToolHandler for ExtractMetadataHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let url = required_str(&args, "url")?;
        let record = self
            .orchestrator
            .resolve_metadata(url)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(record).map_err(|e| e.to_string())
    }
}

/// Handler for the full save pipeline.
#[derive(Debug)]
pub struct SavePaperHandler {
    pub orchestrator: Arc<SaveOrchestrator>,
}

#[async_trait::async_trait]
impl ToolHandler for SavePaperHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let url = required_str(&args, "url")?;
        let collection = args
            .get("collection")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let outcome = self
            .orchestrator
            .save_paper(url, collection)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(outcome).map_err(|e| e.to_string())
    }
}

/// Handler for storing site cookies.
#[derive(Debug)]
pub struct SetCookiesHandler {
    pub orchestrator: Arc<SaveOrchestrator>,
}

#[async_trait::async_trait]
impl ToolHandler for SetCookiesHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let site = required_str(&args, "site")?;
        let cookies = required_str(&args, "cookies")?;
        let record = self.orchestrator.set_cookies(site, cookies);
        Ok(json!({
            "site": record.site,
            "stored_at": record.timestamp.to_rfc3339(),
        }))
    }
}
