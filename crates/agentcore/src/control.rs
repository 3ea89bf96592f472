//! AgentCore control plane: creating memory resources and reading their status.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::SignedClient;
use crate::error::AgentCoreResult;
use crate::runtime::encode_segment;

pub fn control_plane_endpoint(region: &str) -> String {
    format!("https://bedrock-agentcore-control.{region}.amazonaws.com")
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemoryRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Days before short-term events expire.
    pub event_expiry_duration: u32,
    pub memory_strategies: Vec<MemoryStrategyInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemoryStrategyInput {
    SemanticMemoryStrategy(StrategyDefinition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryEnvelope {
    #[serde(default)]
    pub memory: MemoryDescription,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDescription {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// `CREATING`, `ACTIVE`, `FAILED` or `DELETING`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ControlClient {
    client: SignedClient,
    endpoint: String,
}

impl ControlClient {
    pub fn new(client: SignedClient) -> Self {
        let endpoint = control_plane_endpoint(client.region());
        Self { client, endpoint }
    }

    pub async fn create_memory(
        &self,
        request: &CreateMemoryRequest,
    ) -> AgentCoreResult<MemoryDescription> {
        let url = format!("{}/memories/create", self.endpoint.trim_end_matches('/'));
        let envelope: MemoryEnvelope = self.client.post_json(&url, request).await?;
        info!(
            memory_id = %envelope.memory.id,
            status = %envelope.memory.status,
            "memory create accepted"
        );
        Ok(envelope.memory)
    }

    pub async fn get_memory(&self, memory_id: &str) -> AgentCoreResult<MemoryDescription> {
        let url = format!(
            "{}/memories/{}/details",
            self.endpoint.trim_end_matches('/'),
            encode_segment(memory_id)
        );
        let envelope: MemoryEnvelope = self.client.get_json(&url).await?;
        Ok(envelope.memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_wraps_strategy_in_union_member() {
        let request = CreateMemoryRequest {
            name: "docsum_1700000000".into(),
            description: Some("facts".into()),
            event_expiry_duration: 90,
            memory_strategies: vec![MemoryStrategyInput::SemanticMemoryStrategy(
                StrategyDefinition {
                    name: "FactExtractor".into(),
                    description: None,
                    namespaces: vec!["/facts/{actorId}".into()],
                },
            )],
            client_token: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "name": "docsum_1700000000",
                "description": "facts",
                "eventExpiryDuration": 90,
                "memoryStrategies": [
                    {"semanticMemoryStrategy": {"name": "FactExtractor", "namespaces": ["/facts/{actorId}"]}}
                ]
            })
        );
    }

    #[test]
    fn memory_envelope_reads_status() {
        let envelope: MemoryEnvelope = serde_json::from_value(json!({
            "memory": {"id": "docsum_1-abc", "status": "FAILED", "failureReason": "quota"}
        }))
        .unwrap();
        assert_eq!(envelope.memory.id, "docsum_1-abc");
        assert_eq!(envelope.memory.status, "FAILED");
        assert_eq!(envelope.memory.failure_reason.as_deref(), Some("quota"));
    }
}
