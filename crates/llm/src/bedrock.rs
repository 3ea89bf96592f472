use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    self as bedrock, ContentBlock, ConversationRole, InferenceConfiguration, SystemContentBlock,
    ToolConfiguration, ToolInputSchema, ToolResultBlock, ToolResultContentBlock, ToolResultStatus,
    ToolSpecification, ToolUseBlock,
};
use tracing::debug;

use crate::document::{document_to_json, json_to_document};
use crate::{
    ChatMessage, ContentPart, ConverseRequest, ModelClient, ModelTurn, Role, StopReason, ToolCall,
    ToolDefinition,
};

/// [`ModelClient`] backed by the Bedrock Converse API.
#[derive(Clone)]
pub struct BedrockConverseClient {
    client: Client,
    model_id: String,
}

impl BedrockConverseClient {
    pub fn new(sdk_config: &SdkConfig, model_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(sdk_config),
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl ModelClient for BedrockConverseClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn converse(&self, request: &ConverseRequest) -> Result<ModelTurn> {
        let messages = request
            .messages
            .iter()
            .map(to_bedrock_message)
            .collect::<Result<Vec<_>>>()?;

        let mut call = self
            .client
            .converse()
            .model_id(&self.model_id)
            .set_messages(Some(messages));

        if !request.system.is_empty() {
            call = call.system(SystemContentBlock::Text(request.system.clone()));
        }
        if !request.tools.is_empty() {
            call = call.tool_config(to_tool_config(&request.tools)?);
        }
        if let Some(max_tokens) = request.max_tokens {
            call = call.inference_config(InferenceConfiguration::builder().max_tokens(max_tokens).build());
        }

        debug!(
            model = %self.model_id,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "bedrock converse request"
        );

        let output = call
            .send()
            .await
            .map_err(|e| anyhow!("bedrock converse failed: {}", DisplayErrorContext(&e)))?;

        let stop_reason = map_stop_reason(output.stop_reason());
        let message = output
            .output()
            .and_then(|o| o.as_message().ok())
            .context("bedrock converse returned no message")?;

        let turn = from_bedrock_message(message, stop_reason);
        debug!(
            model = %self.model_id,
            stop_reason = ?turn.stop_reason,
            tool_calls = turn.tool_calls.len(),
            text_chars = turn.text.chars().count(),
            "bedrock converse response"
        );
        Ok(turn)
    }
}

// ── Mapping ──────────────────────────────────────────────────────────────────

fn to_bedrock_message(message: &ChatMessage) -> Result<bedrock::Message> {
    let role = match message.role {
        Role::User => ConversationRole::User,
        Role::Assistant => ConversationRole::Assistant,
    };
    let content = message
        .parts
        .iter()
        .map(to_content_block)
        .collect::<Result<Vec<_>>>()?;
    bedrock::Message::builder()
        .role(role)
        .set_content(Some(content))
        .build()
        .context("building bedrock message")
}

fn to_content_block(part: &ContentPart) -> Result<ContentBlock> {
    Ok(match part {
        ContentPart::Text { text } => ContentBlock::Text(text.clone()),
        ContentPart::ToolUse { id, name, input } => ContentBlock::ToolUse(
            ToolUseBlock::builder()
                .tool_use_id(id)
                .name(name)
                .input(json_to_document(input))
                .build()
                .context("building tool use block")?,
        ),
        ContentPart::ToolResult { id, output, is_error } => {
            let status = if *is_error {
                ToolResultStatus::Error
            } else {
                ToolResultStatus::Success
            };
            ContentBlock::ToolResult(
                ToolResultBlock::builder()
                    .tool_use_id(id)
                    .content(ToolResultContentBlock::Text(output.clone()))
                    .status(status)
                    .build()
                    .context("building tool result block")?,
            )
        }
    })
}

fn to_tool_config(tools: &[ToolDefinition]) -> Result<ToolConfiguration> {
    let specs = tools
        .iter()
        .map(|tool| {
            let spec = ToolSpecification::builder()
                .name(&tool.name)
                .description(&tool.description)
                .input_schema(ToolInputSchema::Json(json_to_document(&tool.input_schema)))
                .build()
                .with_context(|| format!("building tool spec for {}", tool.name))?;
            Ok(bedrock::Tool::ToolSpec(spec))
        })
        .collect::<Result<Vec<_>>>()?;
    ToolConfiguration::builder()
        .set_tools(Some(specs))
        .build()
        .context("building tool configuration")
}

fn from_bedrock_message(message: &bedrock::Message, stop_reason: StopReason) -> ModelTurn {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in message.content() {
        match block {
            ContentBlock::Text(t) => text.push_str(t),
            ContentBlock::ToolUse(tool_use) => tool_calls.push(ToolCall {
                id: tool_use.tool_use_id().to_string(),
                name: tool_use.name().to_string(),
                input: document_to_json(tool_use.input()),
            }),
            _ => {}
        }
    }
    ModelTurn {
        text,
        tool_calls,
        stop_reason,
    }
}

fn map_stop_reason(reason: &bedrock::StopReason) -> StopReason {
    match reason {
        bedrock::StopReason::EndTurn | bedrock::StopReason::StopSequence => StopReason::EndTurn,
        bedrock::StopReason::ToolUse => StopReason::ToolUse,
        bedrock::StopReason::MaxTokens => StopReason::MaxTokens,
        _ => StopReason::Other,
    }
}
