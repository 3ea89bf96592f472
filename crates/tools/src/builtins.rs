use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::document::{MAX_FILE_SIZE_BYTES, read_text_file, save_summary};
use crate::store::ObjectStore;
use crate::{Tool, ToolOutput, ToolParam, ToolSpec};

pub const READ_TEXT_FILE: &str = "read_text_file";
pub const SAVE_SUMMARY: &str = "save_summary";

fn required_arg<'a>(args: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    args.get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("missing required param: {name}"))
}

// ── read_text_file ───────────────────────────────────────────────────────────

pub struct ReadTextFileTool {
    store: Arc<dyn ObjectStore>,
    max_bytes: u64,
}

impl ReadTextFileTool {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            max_bytes: MAX_FILE_SIZE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl Tool for ReadTextFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: READ_TEXT_FILE.to_string(),
            description: "Read a UTF-8 text file (.txt or .md) from S3 and return its contents."
                .to_string(),
            params: vec![
                ToolParam::required("bucket", "S3 bucket name, e.g. my-document-bucket"),
                ToolParam::required("key", "S3 object key, e.g. alice/uploads/report.txt"),
            ],
        }
    }

    async fn run(&self, args: &HashMap<String, String>) -> Result<ToolOutput> {
        let bucket = required_arg(args, "bucket")?;
        let key = required_arg(args, "key")?;
        let content = read_text_file(self.store.as_ref(), bucket, key, self.max_bytes).await?;
        Ok(ToolOutput {
            success: true,
            output: content,
        })
    }
}

// ── save_summary ─────────────────────────────────────────────────────────────

pub struct SaveSummaryTool {
    store: Arc<dyn ObjectStore>,
}

impl SaveSummaryTool {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SaveSummaryTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: SAVE_SUMMARY.to_string(),
            description: "Save the finished summary to S3 as UTF-8 text. Returns a JSON receipt \
                          with status, location and message."
                .to_string(),
            params: vec![
                ToolParam::required("bucket", "S3 bucket name"),
                ToolParam::required(
                    "key",
                    "Destination key, e.g. alice/summaries/report.txt.summary.txt",
                ),
                ToolParam::required("summary", "The summary text to save"),
            ],
        }
    }

    async fn run(&self, args: &HashMap<String, String>) -> Result<ToolOutput> {
        let bucket = required_arg(args, "bucket")?;
        let key = required_arg(args, "key")?;
        let summary = args
            .get("summary")
            .ok_or_else(|| anyhow!("missing required param: summary"))?;

        let receipt = save_summary(self.store.as_ref(), bucket, key, summary).await;
        Ok(ToolOutput {
            success: receipt.is_success(),
            output: serde_json::to_string(&receipt)?,
        })
    }
}
