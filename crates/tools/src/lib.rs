use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use docsum_llm::ToolDefinition;
use serde::{Deserialize, Serialize};

pub mod builtins;
pub mod document;
pub mod store;

pub use builtins::{READ_TEXT_FILE, ReadTextFileTool, SAVE_SUMMARY, SaveSummaryTool};
pub use document::{
    DocumentError, MAX_FILE_SIZE_BYTES, SUMMARY_CONTENT_TYPE, SaveReceipt, SaveStatus,
    read_text_file, s3_uri, save_summary,
};
#[cfg(any(test, feature = "test-support"))]
pub use store::{InMemoryObjectStore, StoredObject};
pub use store::{ObjectStore, S3ObjectStore, StoreError};

// ── Tool trait and registry ──────────────────────────────────────────────────

/// Describes a single parameter that a tool accepts.  Arguments reach
/// tools as strings, so every parameter is a JSON string in the schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ToolParam {
    /// Required string parameter.
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Static metadata about a tool, used by the model to decide which tool to call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
}

impl ToolSpec {
    /// JSON Schema object describing the tool's arguments.
    ///
    /// ```json
    /// {
    ///   "type": "object",
    ///   "properties": { "bucket": { "type": "string", "description": "..." } },
    ///   "required": ["bucket"]
    /// }
    /// ```
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<String> = Vec::new();

        for p in &self.params {
            properties.insert(
                p.name.clone(),
                serde_json::json!({
                    "type": "string",
                    "description": p.description,
                }),
            );
            if p.required {
                required.push(p.name.clone());
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }
}

/// The result returned after a tool runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn run(&self, args: &HashMap<String, String>) -> Result<ToolOutput>;
}

/// The tools offered to the model for one conversation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.spec().to_definition()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.spec().name == name)
            .map(|t| t.as_ref())
    }
}

// ── ToolRegistry tests ───────────────────────────────────────────────────────
