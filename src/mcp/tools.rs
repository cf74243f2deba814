//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::save::SaveOrchestrator;

use super::handlers::{
    ExtractMetadataHandler, ListCollectionsHandler, SavePaperHandler, SetCookiesHandler,
    StatusHandler,
};

/// An MCP tool that can be called by the client.
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "save_paper").
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// JSON Schema for input parameters.
    pub input_schema: Value,

    /// Handler function to execute the tool.
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// Registry for all MCP tools.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create the registry with every tool bound to the orchestrator.
    pub fn from_orchestrator(orchestrator: Arc<SaveOrchestrator>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "check_status".to_string(),
            description:
                "Check that the local Zotero instance is reachable and report the supported preprint sources."
                    .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(StatusHandler {
                orchestrator: orchestrator.clone(),
            }),
        });

        registry.register(Tool {
            name: "list_collections".to_string(),
            description:
                "List the Zotero collection tree. Each line carries the collection key (e.g. 'C42') usable as a save target."
                    .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(ListCollectionsHandler {
                orchestrator: orchestrator.clone(),
            }),
        });

        registry.register(Tool {
            name: "extract_metadata".to_string(),
            description:
                "Extract bibliographic metadata from a preprint URL (arXiv, CVF Open Access, bioRxiv, medRxiv, ChemRxiv) without saving anything."
                    .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Abstract or PDF page URL of the paper"
                    }
                },
                "required": ["url"]
            }),
            handler: Arc::new(ExtractMetadataHandler {
                orchestrator: orchestrator.clone(),
            }),
        });

        registry.register(Tool {
            name: "save_paper".to_string(),
            description:
                "Save a preprint to the local Zotero library: extracts metadata, downloads the PDF (falling back to a link when the PDF cannot be fetched), and files the item in a collection when one is given."
                    .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Abstract or PDF page URL of the paper"
                    },
                    "collection": {
                        "type": "string",
                        "description": "Target collection: a key from list_collections (e.g. 'C42'), a collection name, or a 'Parent/Child' path"
                    }
                },
                "required": ["url"]
            }),
            handler: Arc::new(SavePaperHandler {
                orchestrator: orchestrator.clone(),
            }),
        });

        registry.register(Tool {
            name: "set_cookies".to_string(),
            description:
                "Store a Cookie header for a site, replayed on subsequent fetches to that site. Useful when a repository sits behind an anti-bot check."
                    .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "site": {
                        "type": "string",
                        "description": "Host the cookies belong to (e.g. 'chemrxiv.org')"
                    },
                    "cookies": {
                        "type": "string",
                        "description": "Cookie header value, passed through verbatim"
                    }
                },
                "required": ["site", "cookies"]
            }),
            handler: Arc::new(SetCookiesHandler { orchestrator }),
        });

        registry
    }

    fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// All registered tools.
    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;

    fn registry() -> ToolRegistry {
        let orchestrator = Arc::new(SaveOrchestrator::new(Config::default()).unwrap());
        ToolRegistry::from_orchestrator(orchestrator)
    }

    #[test]
    fn registers_the_full_tool_surface() {
        let registry = registry();
        for name in [
            "check_status",
            "list_collections",
            "extract_metadata",
            "save_paper",
            "set_cookies",
        ] {
            assert!(registry.get(name).is_some(), "missing tool {}", name);
        }
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn schemas_declare_required_parameters() {
        let registry = registry();
        let save = registry.get("save_paper").unwrap();
        assert_eq!(save.input_schema["required"][0], "url");

        let cookies = registry.get("set_cookies").unwrap();
        let required = cookies.input_schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
    }
}
