//! Hosted model access.
//!
//! The summarizer talks to the model through [`ModelClient`], a single
//! request/response call carrying the conversation so far and the tool
//! definitions.  [`BedrockConverseClient`] implements it over the Bedrock
//! Converse API; tests substitute scripted clients.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod bedrock;
pub mod document;

pub use bedrock::BedrockConverseClient;

// ── Conversation types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        id: String,
        output: String,
        is_error: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    /// The assistant turn that requested `calls`, with any text it produced
    /// alongside them.  The model expects to see its own request echoed back
    /// before the matching results.
    pub fn assistant_tool_calls(text: &str, calls: &[ToolCall]) -> Self {
        let mut parts = Vec::with_capacity(calls.len() + 1);
        if !text.trim().is_empty() {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        parts.extend(calls.iter().map(|call| ContentPart::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        }));
        Self {
            role: Role::Assistant,
            parts,
        }
    }

    /// A user turn carrying one result per executed tool call.
    pub fn tool_results(results: Vec<ToolResultPart>) -> Self {
        Self {
            role: Role::User,
            parts: results
                .into_iter()
                .map(|r| ContentPart::ToolResult {
                    id: r.id,
                    output: r.output,
                    is_error: r.is_error,
                })
                .collect(),
        }
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultPart {
    pub id: String,
    pub output: String,
    pub is_error: bool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Tool description handed to the model.  `input_schema` is a JSON Schema
/// object describing the arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct ConverseRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    /// Empty means the model must answer in text.
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other,
}

/// The model's reply to one [`ConverseRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
}

impl ModelTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
            stop_reason: StopReason::ToolUse,
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    fn model_id(&self) -> &str;
    async fn converse(&self, request: &ConverseRequest) -> Result<ModelTurn>;
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_tool_calls_skips_blank_text() {
        let calls = vec![ToolCall {
            id: "t1".into(),
            name: "read_text_file".into(),
            input: json!({"bucket": "b", "key": "k"}),
        }];
        let msg = ChatMessage::assistant_tool_calls("  ", &calls);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.parts.len(), 1);
        assert!(matches!(msg.parts[0], ContentPart::ToolUse { .. }));

        let msg = ChatMessage::assistant_tool_calls("Reading the file.", &calls);
        assert_eq!(msg.parts.len(), 2);
        assert_eq!(msg.text(), "Reading the file.");
    }

    #[test]
    fn tool_results_are_user_turns() {
        let msg = ChatMessage::tool_results(vec![
            ToolResultPart { id: "a".into(), output: "ok".into(), is_error: false },
            ToolResultPart { id: "b".into(), output: "boom".into(), is_error: true },
        ]);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.parts.len(), 2);
        assert_eq!(
            msg.parts[1],
            ContentPart::ToolResult { id: "b".into(), output: "boom".into(), is_error: true }
        );
        assert!(msg.text().is_empty());
    }

    #[test]
    fn content_parts_serialize_with_type_tag() {
        let part = ContentPart::Text { text: "hi".into() };
        assert_eq!(serde_json::to_value(&part).unwrap(), json!({"type": "text", "text": "hi"}));
    }
}
