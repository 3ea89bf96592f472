//! AgentCore Memory data plane: retrieving long-term records and appending
//! conversation events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::SignedClient;
use crate::error::AgentCoreResult;
use crate::runtime::{data_plane_endpoint, encode_segment};

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveMemoryRecordsRequest {
    pub namespace: String,
    pub search_criteria: SearchCriteria,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub search_query: String,
    pub top_k: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveMemoryRecordsResponse {
    #[serde(default)]
    pub memory_record_summaries: Vec<MemoryRecordSummary>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecordSummary {
    #[serde(default)]
    pub memory_record_id: String,
    #[serde(default)]
    pub content: MemoryContent,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryContent {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventRole {
    User,
    Assistant,
    Tool,
    Other,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub actor_id: String,
    pub session_id: String,
    /// Epoch seconds.
    pub event_timestamp: i64,
    pub payload: Vec<EventPayload>,
    pub client_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub conversational: ConversationalPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationalPayload {
    pub content: MemoryContent,
    pub role: EventRole,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEventResponse {
    #[serde(default)]
    pub event: EventSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(default)]
    pub event_id: String,
}

impl CreateEventRequest {
    pub fn conversational(
        actor_id: &str,
        session_id: &str,
        role: EventRole,
        text: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            session_id: session_id.to_string(),
            event_timestamp: at.timestamp(),
            payload: vec![EventPayload {
                conversational: ConversationalPayload {
                    content: MemoryContent {
                        text: text.to_string(),
                    },
                    role,
                },
            }],
            client_token: uuid::Uuid::new_v4().to_string(),
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MemoryClient {
    client: SignedClient,
    endpoint: String,
}

impl MemoryClient {
    pub fn new(client: SignedClient) -> Self {
        let endpoint = data_plane_endpoint(client.region());
        Self { client, endpoint }
    }

    fn memory_url(&self, memory_id: &str, action: &str) -> String {
        format!(
            "{}/memories/{}/{action}",
            self.endpoint.trim_end_matches('/'),
            encode_segment(memory_id)
        )
    }

    /// Semantic search over the records stored under `namespace`.
    pub async fn retrieve_memory_records(
        &self,
        memory_id: &str,
        namespace: &str,
        query: &str,
        top_k: u32,
    ) -> AgentCoreResult<Vec<MemoryRecordSummary>> {
        let request = RetrieveMemoryRecordsRequest {
            namespace: namespace.to_string(),
            search_criteria: SearchCriteria {
                search_query: query.to_string(),
                top_k,
            },
            max_results: Some(top_k),
        };
        let response: RetrieveMemoryRecordsResponse = self
            .client
            .post_json(&self.memory_url(memory_id, "retrieve"), &request)
            .await?;
        debug!(
            memory_id,
            namespace,
            records = response.memory_record_summaries.len(),
            "memory records retrieved"
        );
        Ok(response.memory_record_summaries)
    }

    /// Append one conversational event to a session's short-term memory.
    pub async fn create_event(
        &self,
        memory_id: &str,
        actor_id: &str,
        session_id: &str,
        role: EventRole,
        text: &str,
    ) -> AgentCoreResult<String> {
        let request =
            CreateEventRequest::conversational(actor_id, session_id, role, text, Utc::now());
        let response: CreateEventResponse = self
            .client
            .post_json(&self.memory_url(memory_id, "events"), &request)
            .await?;
        debug!(memory_id, actor_id, session_id, event_id = %response.event.event_id, "memory event created");
        Ok(response.event.event_id)
    }
}
