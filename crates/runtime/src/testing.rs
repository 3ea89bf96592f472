//! Fakes shared by the runtime's unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use docsum_llm::{ConverseRequest, ModelClient, ModelTurn, ToolCall};
use docsum_memory::{Fact, LongTermMemory, TurnRole};
use serde_json::json;

/// Model that replays a fixed list of turns and records every request.
pub struct ScriptedModel {
    turns: Mutex<VecDeque<ModelTurn>>,
    requests: Mutex<Vec<ConverseRequest>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reads `key`, then saves `summary` to `summary_key`, then answers.
    pub fn summarizing(bucket: &str, key: &str, summary_key: &str, summary: &str) -> Self {
        Self::new(vec![
            ModelTurn::tool_calls(vec![ToolCall {
                id: "read-1".into(),
                name: "read_text_file".into(),
                input: json!({"bucket": bucket, "key": key}),
            }]),
            ModelTurn::tool_calls(vec![ToolCall {
                id: "save-1".into(),
                name: "save_summary".into(),
                input: json!({"bucket": bucket, "key": summary_key, "summary": summary}),
            }]),
            ModelTurn::text(summary),
        ])
    }

    pub fn requests(&self) -> Vec<ConverseRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn converse(&self, request: &ConverseRequest) -> Result<ModelTurn> {
        self.requests.lock().unwrap().push(request.clone());
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTurn {
    pub actor_id: String,
    pub session_id: String,
    pub role: TurnRole,
    pub text: String,
}

/// Memory that serves canned facts and records what it is asked.
#[derive(Default)]
pub struct RecordingMemory {
    facts: Vec<Fact>,
    fail: bool,
    queries: Mutex<Vec<(String, String, u32)>>,
    turns: Mutex<Vec<RecordedTurn>>,
}

impl RecordingMemory {
    pub fn with_facts(facts: Vec<Fact>) -> Self {
        Self {
            facts,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<(String, String, u32)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn turns(&self) -> Vec<RecordedTurn> {
        self.turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl LongTermMemory for RecordingMemory {
    async fn retrieve_facts(&self, namespace: &str, query: &str, top_k: u32) -> Result<Vec<Fact>> {
        self.queries
            .lock()
            .unwrap()
            .push((namespace.to_string(), query.to_string(), top_k));
        if self.fail {
            bail!("memory service unavailable");
        }
        Ok(self.facts.clone())
    }

    async fn record_turn(
        &self,
        actor_id: &str,
        session_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<()> {
        if self.fail {
            bail!("memory service unavailable");
        }
        self.turns.lock().unwrap().push(RecordedTurn {
            actor_id: actor_id.to_string(),
            session_id: session_id.to_string(),
            role,
            text: text.to_string(),
        });
        Ok(())
    }
}
