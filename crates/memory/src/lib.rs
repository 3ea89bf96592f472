//! Long-term memory for the summarizer.
//!
//! Facts extracted from earlier documents live in an AgentCore Memory
//! resource under `/facts/{actor_id}`.  The summarizer retrieves the ones
//! relevant to the current document before calling the model, and records
//! each finished conversation as events so the memory's semantic strategy
//! can extract new facts from it.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod agentcore;
pub mod provision;

pub use agentcore::AgentCoreMemory;
pub use provision::{
    AgentCoreMemoryControl, MemoryControl, MemorySpec, MemoryStatus, ProvisionError,
    ProvisionedMemory, default_memory_name, provision_memory, validate_memory_name,
    wait_for_active,
};

// ── Types ────────────────────────────────────────────────────────────────────

/// A fact retrieved from long-term memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub content: String,
    /// Relevance to the query, when the backend reports one.
    pub score: Option<f64>,
    pub namespace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[async_trait]
pub trait LongTermMemory: Send + Sync {
    /// Up to `top_k` facts from `namespace` ranked by relevance to `query`.
    async fn retrieve_facts(&self, namespace: &str, query: &str, top_k: u32) -> Result<Vec<Fact>>;

    /// Append one conversation turn to the actor's session.
    async fn record_turn(
        &self,
        actor_id: &str,
        session_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<()>;
}

/// Memory backend used when no memory resource is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMemory;

#[async_trait]
impl LongTermMemory for NoopMemory {
    async fn retrieve_facts(&self, _namespace: &str, _query: &str, _top_k: u32) -> Result<Vec<Fact>> {
        Ok(Vec::new())
    }

    async fn record_turn(
        &self,
        _actor_id: &str,
        _session_id: &str,
        _role: TurnRole,
        _text: &str,
    ) -> Result<()> {
        Ok(())
    }
}

// ── Selection and rendering ──────────────────────────────────────────────────

/// Keep facts scoring at least `min_score`, best first.  Facts without a
/// score are kept and sorted last.  Blank facts are dropped.
pub fn select_relevant(facts: Vec<Fact>, min_score: f64) -> Vec<Fact> {
    let mut kept: Vec<Fact> = facts
        .into_iter()
        .filter(|f| !f.content.trim().is_empty())
        .filter(|f| f.score.is_none_or(|s| s >= min_score))
        .collect();
    kept.sort_by(|a, b| {
        let a = a.score.unwrap_or(f64::NEG_INFINITY);
        let b = b.score.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    kept
}

/// Prompt block listing `facts`, or an empty string when there are none.
pub fn render_facts_block(facts: &[Fact]) -> String {
    if facts.is_empty() {
        return String::new();
    }
    let mut block = String::from("[Related facts from previously processed documents]\n");
    for fact in facts {
        block.push_str("- ");
        block.push_str(fact.content.trim());
        if let Some(score) = fact.score {
            block.push_str(&format!(" (relevance {score:.2})"));
        }
        block.push('\n');
    }
    block
}
