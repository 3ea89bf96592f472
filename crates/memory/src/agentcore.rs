use anyhow::{Context, Result};
use async_trait::async_trait;
use docsum_agentcore::{EventRole, MemoryClient, MemoryRecordSummary};
use tracing::debug;

use crate::{Fact, LongTermMemory, TurnRole};

/// [`LongTermMemory`] backed by one AgentCore Memory resource.
#[derive(Clone)]
pub struct AgentCoreMemory {
    client: MemoryClient,
    memory_id: String,
}

impl AgentCoreMemory {
    pub fn new(client: MemoryClient, memory_id: impl Into<String>) -> Self {
        Self {
            client,
            memory_id: memory_id.into(),
        }
    }
}

fn to_fact(record: MemoryRecordSummary, namespace: &str) -> Fact {
    Fact {
        content: record.content.text,
        score: record.score,
        namespace: record
            .namespaces
            .into_iter()
            .next()
            .unwrap_or_else(|| namespace.to_string()),
    }
}

#[async_trait]
impl LongTermMemory for AgentCoreMemory {
    async fn retrieve_facts(&self, namespace: &str, query: &str, top_k: u32) -> Result<Vec<Fact>> {
        let records = self
            .client
            .retrieve_memory_records(&self.memory_id, namespace, query, top_k)
            .await
            .with_context(|| format!("retrieving memory records from {namespace}"))?;
        debug!(memory_id = %self.memory_id, namespace, count = records.len(), "facts retrieved");
        Ok(records.into_iter().map(|r| to_fact(r, namespace)).collect())
    }

    async fn record_turn(
        &self,
        actor_id: &str,
        session_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<()> {
        let role = match role {
            TurnRole::User => EventRole::User,
            TurnRole::Assistant => EventRole::Assistant,
        };
        self.client
            .create_event(&self.memory_id, actor_id, session_id, role, text)
            .await
            .with_context(|| format!("recording {role:?} turn for session {session_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsum_agentcore::memory::MemoryContent;

    #[test]
    fn record_maps_to_fact_with_own_namespace() {
        let record = MemoryRecordSummary {
            memory_record_id: "r1".into(),
            content: MemoryContent { text: "Budget approved".into() },
            namespaces: vec!["/facts/bob".into()],
            score: Some(0.7),
        };
        let fact = to_fact(record, "/facts/alice");
        assert_eq!(fact.content, "Budget approved");
        assert_eq!(fact.namespace, "/facts/bob");
        assert_eq!(fact.score, Some(0.7));
    }

    #[test]
    fn record_without_namespace_uses_query_namespace() {
        let fact = to_fact(MemoryRecordSummary::default(), "/facts/alice");
        assert_eq!(fact.namespace, "/facts/alice");
        assert!(fact.score.is_none());
    }
}
