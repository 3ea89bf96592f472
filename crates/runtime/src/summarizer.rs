//! One document in, one summary out.
//!
//! [`Summarizer::process_document`] pulls related facts from long-term
//! memory, lets the model read and summarize the document through the two
//! S3 tools, makes sure a summary actually landed at the destination key,
//! and records the exchange so the memory service can extract new facts.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use docsum_config::RuntimeConfig;
use docsum_core::{InvocationResult, ObjectKey};
use docsum_llm::{ChatMessage, ModelClient};
use docsum_memory::{Fact, LongTermMemory, TurnRole, render_facts_block, select_relevant};
use docsum_tools::{
    ObjectStore, ReadTextFileTool, SAVE_SUMMARY, SaveSummaryTool, ToolRegistry, save_summary,
};
use tracing::{debug, error, info, warn};

use crate::prompt::{system_prompt, user_prompt};
use crate::tool_loop::{ToolLoopResult, run_tool_loop};

#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub max_file_bytes: u64,
    pub retrieval_top_k: u32,
    pub retrieval_min_score: f64,
    pub max_tool_rounds: usize,
    pub max_tokens: i32,
    pub language: String,
    pub memory_enabled: bool,
}

impl From<&RuntimeConfig> for SummarizerSettings {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
            retrieval_top_k: config.retrieval_top_k,
            retrieval_min_score: config.retrieval_min_score,
            max_tool_rounds: config.max_tool_rounds,
            max_tokens: config.max_tokens,
            language: config.summary_language.clone(),
            memory_enabled: config.memory_enabled(),
        }
    }
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

pub struct Summarizer {
    model: Arc<dyn ModelClient>,
    store: Arc<dyn ObjectStore>,
    memory: Arc<dyn LongTermMemory>,
    settings: SummarizerSettings,
}

impl Summarizer {
    pub fn new(
        model: Arc<dyn ModelClient>,
        store: Arc<dyn ObjectStore>,
        memory: Arc<dyn LongTermMemory>,
        settings: SummarizerSettings,
    ) -> Self {
        Self {
            model,
            store,
            memory,
            settings,
        }
    }

    /// Summarize `key` from `bucket`.  Never fails: errors are reported in
    /// the returned result.
    pub async fn process_document(
        &self,
        bucket: &str,
        key: &ObjectKey,
        session_id: &str,
    ) -> InvocationResult {
        let summary_key = key.summary_key();
        info!(bucket, key = %key, %summary_key, session_id, model = self.model.model_id(), "summarizing document");

        match self.summarize(bucket, key, &summary_key, session_id).await {
            Ok(rounds) => {
                info!(bucket, %summary_key, rounds, "summary saved");
                InvocationResult::completed(summary_key, session_id.to_string(), "summary generated")
            }
            Err(e) => {
                error!(bucket, key = %key, error = %format!("{e:#}"), "summarization failed");
                InvocationResult {
                    session_id: Some(session_id.to_string()),
                    ..InvocationResult::failure(format!("summarization failed: {e:#}"))
                }
            }
        }
    }

    async fn summarize(
        &self,
        bucket: &str,
        key: &ObjectKey,
        summary_key: &str,
        session_id: &str,
    ) -> Result<usize> {
        let request = user_prompt(bucket, key.as_str(), summary_key, "");
        let facts = self.related_facts(key, &request).await;
        let prompt = if facts.is_empty() {
            request.clone()
        } else {
            user_prompt(bucket, key.as_str(), summary_key, &render_facts_block(&facts))
        };

        let mut messages = vec![ChatMessage::user(prompt)];
        let result = run_tool_loop(
            self.model.as_ref(),
            &system_prompt(&self.settings.language),
            &mut messages,
            &self.registry(),
            self.settings.max_tool_rounds,
            Some(self.settings.max_tokens),
        )
        .await
        .context("model conversation failed")?;

        if !saved_to(&result, bucket, summary_key) {
            self.save_final_reply(bucket, summary_key, &result.content).await?;
        }

        self.record_conversation(key, session_id, &request, &result.content)
            .await;
        Ok(result.rounds)
    }

    fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(Box::new(
            ReadTextFileTool::new(self.store.clone()).with_max_bytes(self.settings.max_file_bytes),
        ));
        registry.register(Box::new(SaveSummaryTool::new(self.store.clone())));
        registry
    }

    async fn related_facts(&self, key: &ObjectKey, query: &str) -> Vec<Fact> {
        if !self.settings.memory_enabled {
            return Vec::new();
        }
        let namespace = key.memory_namespace();
        match self
            .memory
            .retrieve_facts(&namespace, query, self.settings.retrieval_top_k)
            .await
        {
            Ok(facts) => {
                let retrieved = facts.len();
                let kept = select_relevant(facts, self.settings.retrieval_min_score);
                debug!(%namespace, retrieved, kept = kept.len(), "related facts");
                kept
            }
            Err(e) => {
                warn!(%namespace, error = %format!("{e:#}"), "fact retrieval failed, continuing without facts");
                Vec::new()
            }
        }
    }

    async fn save_final_reply(&self, bucket: &str, summary_key: &str, reply: &str) -> Result<()> {
        let summary = reply.trim();
        if summary.is_empty() {
            bail!("model returned no summary");
        }
        warn!(bucket, summary_key, "model did not save the summary, saving its final reply");
        let receipt = save_summary(self.store.as_ref(), bucket, summary_key, summary).await;
        if !receipt.is_success() {
            bail!("{}", receipt.message);
        }
        Ok(())
    }

    async fn record_conversation(&self, key: &ObjectKey, session_id: &str, request: &str, reply: &str) {
        if !self.settings.memory_enabled {
            return;
        }
        let actor_id = key.actor_id();
        let mut turns = vec![(TurnRole::User, request)];
        if !reply.trim().is_empty() {
            turns.push((TurnRole::Assistant, reply));
        }
        for (role, text) in turns {
            if let Err(e) = self.memory.record_turn(actor_id, session_id, role, text).await {
                warn!(actor_id, session_id, ?role, error = %format!("{e:#}"), "recording memory event failed");
                return;
            }
        }
        debug!(actor_id, session_id, "conversation recorded");
    }
}

/// Whether the model saved a summary to exactly `bucket/summary_key`.
fn saved_to(result: &ToolLoopResult, bucket: &str, summary_key: &str) -> bool {
    result.successful(SAVE_SUMMARY).any(|exec| {
        exec.args.get("bucket").map(String::as_str) == Some(bucket)
            && exec.args.get("key").map(String::as_str) == Some(summary_key)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingMemory, ScriptedModel};
    use chrono::{TimeZone, Utc};
    use docsum_core::TaskStatus;
    use docsum_llm::{ModelTurn, ToolCall};
    use docsum_tools::InMemoryObjectStore;
    use serde_json::json;

    const BUCKET: &str = "docs";
    const KEY: &str = "alice/uploads/report.md";
    const SUMMARY_KEY: &str = "alice/summaries/report.md.summary.txt";

    fn settings(memory_enabled: bool) -> SummarizerSettings {
        SummarizerSettings {
            memory_enabled,
            ..SummarizerSettings::default()
        }
    }

    fn store_with_document() -> Arc<InMemoryObjectStore> {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert(BUCKET, KEY, "# Report\nRevenue grew 12% in Q3.");
        store
    }

    fn session_id(key: &ObjectKey) -> String {
        key.session_id(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap())
    }

    fn fact(content: &str, score: f64) -> Fact {
        Fact {
            content: content.to_string(),
            score: Some(score),
            namespace: "/facts/alice".to_string(),
        }
    }

    #[tokio::test]
    async fn model_saves_summary_through_tool() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::summarizing(BUCKET, KEY, SUMMARY_KEY, "## Summary\nRevenue up"));
        let memory = Arc::new(RecordingMemory::default());
        let summarizer = Summarizer::new(model.clone(), store.clone(), memory.clone(), settings(true));
        let key = ObjectKey::parse(KEY).unwrap();

        let result = summarizer.process_document(BUCKET, &key, &session_id(&key)).await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.summary_key.as_deref(), Some(SUMMARY_KEY));
        assert_eq!(result.session_id.as_deref(), Some("report_20260102_030405"));
        assert_eq!(result.status, Some(TaskStatus::Completed));
        assert_eq!(store.text(BUCKET, SUMMARY_KEY).as_deref(), Some("## Summary\nRevenue up"));

        let first = &model.requests()[0];
        assert!(first.system.contains("Japanese"));
        assert_eq!(first.tools.len(), 2);
    }

    #[tokio::test]
    async fn relevant_facts_are_prepended_to_the_prompt() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::summarizing(BUCKET, KEY, SUMMARY_KEY, "s"));
        let memory = Arc::new(RecordingMemory::with_facts(vec![
            fact("Q2 revenue grew 8%", 0.9),
            fact("Office moved to Osaka", 0.2),
        ]));
        let summarizer = Summarizer::new(model.clone(), store, memory.clone(), settings(true));
        let key = ObjectKey::parse(KEY).unwrap();

        summarizer.process_document(BUCKET, &key, "s1").await;

        let queries = memory.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].0, "/facts/alice");
        assert_eq!(queries[0].2, 10);

        let prompt = model.requests()[0].messages[0].text();
        assert!(prompt.starts_with("[Related facts"));
        assert!(prompt.contains("Q2 revenue grew 8%"));
        assert!(!prompt.contains("Osaka"));
    }

    #[tokio::test]
    async fn conversation_is_recorded_without_the_facts_block() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::summarizing(BUCKET, KEY, SUMMARY_KEY, "final summary"));
        let memory = Arc::new(RecordingMemory::with_facts(vec![fact("old fact", 0.9)]));
        let summarizer = Summarizer::new(model, store, memory.clone(), settings(true));
        let key = ObjectKey::parse(KEY).unwrap();

        summarizer.process_document(BUCKET, &key, "s1").await;

        let turns = memory.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].actor_id, "alice");
        assert_eq!(turns[0].session_id, "s1");
        assert_eq!(turns[0].role, TurnRole::User);
        assert!(!turns[0].text.contains("old fact"));
        assert_eq!(turns[1].role, TurnRole::Assistant);
        assert_eq!(turns[1].text, "final summary");
    }

    #[tokio::test]
    async fn memory_failures_do_not_fail_the_document() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::summarizing(BUCKET, KEY, SUMMARY_KEY, "s"));
        let summarizer = Summarizer::new(model, store.clone(), Arc::new(RecordingMemory::failing()), settings(true));
        let key = ObjectKey::parse(KEY).unwrap();

        let result = summarizer.process_document(BUCKET, &key, "s1").await;
        assert!(result.success);
        assert!(store.text(BUCKET, SUMMARY_KEY).is_some());
    }

    #[tokio::test]
    async fn disabled_memory_is_never_called() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::summarizing(BUCKET, KEY, SUMMARY_KEY, "s"));
        let memory = Arc::new(RecordingMemory::default());
        let summarizer = Summarizer::new(model, store, memory.clone(), settings(false));
        let key = ObjectKey::parse(KEY).unwrap();

        assert!(summarizer.process_document(BUCKET, &key, "s1").await.success);
        assert!(memory.queries().is_empty());
        assert!(memory.turns().is_empty());
    }

    #[tokio::test]
    async fn final_reply_is_saved_when_model_skips_the_tool() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::new(vec![ModelTurn::text("  plain summary  ")]));
        let summarizer = Summarizer::new(model, store.clone(), Arc::new(RecordingMemory::default()), settings(false));
        let key = ObjectKey::parse(KEY).unwrap();

        let result = summarizer.process_document(BUCKET, &key, "s1").await;
        assert!(result.success);
        assert_eq!(store.text(BUCKET, SUMMARY_KEY).as_deref(), Some("plain summary"));
    }

    #[tokio::test]
    async fn save_to_another_key_does_not_count() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::new(vec![
            ModelTurn::tool_calls(vec![ToolCall {
                id: "s".into(),
                name: "save_summary".into(),
                input: json!({"bucket": BUCKET, "key": "alice/summaries/wrong.txt", "summary": "x"}),
            }]),
            ModelTurn::text("the real summary"),
        ]));
        let summarizer = Summarizer::new(model, store.clone(), Arc::new(RecordingMemory::default()), settings(false));
        let key = ObjectKey::parse(KEY).unwrap();

        assert!(summarizer.process_document(BUCKET, &key, "s1").await.success);
        assert_eq!(store.text(BUCKET, SUMMARY_KEY).as_deref(), Some("the real summary"));
    }

    #[tokio::test]
    async fn empty_reply_without_save_is_a_failure() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::new(vec![ModelTurn::text("")]));
        let summarizer = Summarizer::new(model, store.clone(), Arc::new(RecordingMemory::default()), settings(false));
        let key = ObjectKey::parse(KEY).unwrap();

        let result = summarizer.process_document(BUCKET, &key, "s1").await;
        assert!(!result.success);
        assert_eq!(result.message, "summarization failed: model returned no summary");
        assert_eq!(result.session_id.as_deref(), Some("s1"));
        assert!(store.text(BUCKET, SUMMARY_KEY).is_none());
    }

    #[tokio::test]
    async fn model_errors_become_failed_results() {
        let store = store_with_document();
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        let summarizer = Summarizer::new(model, store, Arc::new(RecordingMemory::default()), settings(false));
        let key = ObjectKey::parse(KEY).unwrap();

        let result = summarizer.process_document(BUCKET, &key, "s1").await;
        assert!(!result.success);
        assert!(result.message.contains("model conversation failed"));
        assert!(result.message.contains("script exhausted"));
    }

    #[tokio::test]
    async fn failed_fallback_save_is_reported() {
        let store = Arc::new(InMemoryObjectStore::failing_puts());
        store.insert(BUCKET, KEY, "text");
        let model = Arc::new(ScriptedModel::new(vec![ModelTurn::text("summary")]));
        let summarizer = Summarizer::new(model, store, Arc::new(RecordingMemory::default()), settings(false));
        let key = ObjectKey::parse(KEY).unwrap();

        let result = summarizer.process_document(BUCKET, &key, "s1").await;
        assert!(!result.success);
        assert!(result.message.starts_with("summarization failed: "));
    }
}
