//! Structured tool calling loop.
//!
//! Sends the conversation with tool definitions to the model, executes any
//! requested tool calls (in parallel when several arrive together), feeds
//! the results back as a user turn, and repeats until the model answers in
//! plain text.  Tool definitions stay on every request because Bedrock
//! rejects a history with tool blocks when no tool config is sent.

use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info, warn};

use docsum_llm::{ChatMessage, ContentPart, ConverseRequest, ModelClient, ToolCall, ToolResultPart};

/// Appended to the last tool results before the final round.
pub const FINAL_ROUND_NOTICE: &str =
    "Tool call limit reached. Do not call any more tools; reply with your final answer as text.";
use docsum_tools::ToolRegistry;

/// Result of the tool loop: the model's final text plus every tool
/// execution along the way.
#[derive(Debug, Clone)]
pub struct ToolLoopResult {
    pub content: String,
    pub tool_executions: Vec<ToolExecution>,
    pub rounds: usize,
}

impl ToolLoopResult {
    /// Successful executions of `tool_name`, in order.
    pub fn successful(&self, tool_name: &str) -> impl Iterator<Item = &ToolExecution> {
        self.tool_executions
            .iter()
            .filter(move |e| e.success && e.tool_name == tool_name)
    }
}

/// Record of a single tool execution within the loop.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    pub tool_name: String,
    pub args: HashMap<String, String>,
    pub success: bool,
    pub output: String,
}

/// Run the tool loop for at most `max_rounds` model calls.
///
/// Before the last round the model is told to stop calling tools.  Tool
/// calls it still makes in that round are not executed; its text becomes
/// the result.  `messages` holds the full conversation afterwards.
pub async fn run_tool_loop(
    model: &dyn ModelClient,
    system: &str,
    messages: &mut Vec<ChatMessage>,
    registry: &ToolRegistry,
    max_rounds: usize,
    max_tokens: Option<i32>,
) -> Result<ToolLoopResult> {
    let max_rounds = max_rounds.max(1);
    let definitions = registry.definitions();
    let mut all_executions: Vec<ToolExecution> = Vec::new();
    let mut final_content = String::new();
    let mut rounds = 0;

    for round in 0..max_rounds {
        rounds = round + 1;
        debug!(round, msg_count = messages.len(), "tool loop iteration");

        let last_round = round + 1 == max_rounds;

        let request = ConverseRequest {
            system: system.to_string(),
            messages: messages.clone(),
            tools: definitions.clone(),
            max_tokens,
        };
        let turn = model.converse(&request).await?;

        if turn.tool_calls.is_empty() || last_round {
            if !turn.tool_calls.is_empty() {
                warn!(
                    max_rounds,
                    ignored = turn.tool_calls.len(),
                    "tool loop hit max rounds, dropping tool calls"
                );
            }
            final_content = turn.text;
            messages.push(ChatMessage::assistant(final_content.clone()));
            break;
        }

        info!(round, count = turn.tool_calls.len(), "model requested tool calls");
        messages.push(ChatMessage::assistant_tool_calls(&turn.text, &turn.tool_calls));

        let executions = execute_tool_calls(&turn.tool_calls, registry).await;
        let results = turn
            .tool_calls
            .iter()
            .zip(executions.iter())
            .map(|(call, exec)| ToolResultPart {
                id: call.id.clone(),
                output: exec.output.clone(),
                is_error: !exec.success,
            })
            .collect();
        let mut feedback = ChatMessage::tool_results(results);
        if round + 2 == max_rounds {
            feedback.parts.push(ContentPart::Text {
                text: FINAL_ROUND_NOTICE.to_string(),
            });
        }
        messages.push(feedback);

        all_executions.extend(executions);
    }

    Ok(ToolLoopResult {
        content: final_content,
        tool_executions: all_executions,
        rounds,
    })
}

/// Execute a batch of tool calls concurrently.  Results keep call order.
async fn execute_tool_calls(calls: &[ToolCall], registry: &ToolRegistry) -> Vec<ToolExecution> {
    let futs: Vec<_> = calls
        .iter()
        .map(|call| async move {
            let args = json_value_to_string_map(&call.input);
            let result = match registry.get(&call.name) {
                Some(tool) => tool.run(&args).await,
                None => Err(anyhow::anyhow!("unknown tool: {}", call.name)),
            };
            let (success, output) = match result {
                Ok(o) => (o.success, o.output),
                Err(e) => (false, format!("{e:#}")),
            };
            debug!(tool = %call.name, success, output_chars = output.chars().count(), "tool finished");
            ToolExecution {
                tool_name: call.name.clone(),
                args,
                success,
                output,
            }
        })
        .collect();

    futures::future::join_all(futs).await
}

/// Convert a JSON object value to `HashMap<String, String>` for tool execution.
fn json_value_to_string_map(val: &serde_json::Value) -> HashMap<String, String> {
    val.as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    let s = match v {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Number(n) => n.to_string(),
                        serde_json::Value::Bool(b) => b.to_string(),
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k.clone(), s)
                })
                .collect()
        })
        .unwrap_or_default()
}
