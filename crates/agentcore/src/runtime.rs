//! AgentCore Runtime data plane: invoking a hosted agent.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use tracing::info;

use crate::client::SignedClient;
use crate::error::AgentCoreResult;

pub const SESSION_ID_HEADER: &str = "X-Amzn-Bedrock-AgentCore-Runtime-Session-Id";

/// Runtime session ids must be at least this long.
pub const MIN_SESSION_ID_LEN: usize = 33;

/// Unreserved URI characters stay as-is; everything else (notably `:` and
/// `/` in ARNs) is escaped so the ARN fits in one path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn data_plane_endpoint(region: &str) -> String {
    format!("https://bedrock-agentcore.{region}.amazonaws.com")
}

pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

pub fn invocation_url(endpoint: &str, runtime_arn: &str, qualifier: &str) -> String {
    format!(
        "{}/runtimes/{}/invocations?qualifier={}",
        endpoint.trim_end_matches('/'),
        encode_segment(runtime_arn),
        encode_segment(qualifier)
    )
}

/// A fresh session id that satisfies the runtime's minimum length.
pub fn new_runtime_session_id() -> String {
    // A hyphenated v4 UUID is 36 characters.
    uuid::Uuid::new_v4().to_string()
}

#[derive(Clone)]
pub struct RuntimeClient {
    client: SignedClient,
    endpoint: String,
}

impl RuntimeClient {
    pub fn new(client: SignedClient) -> Self {
        let endpoint = data_plane_endpoint(client.region());
        Self { client, endpoint }
    }

    /// Invoke the agent runtime `runtime_arn` with a JSON payload and return
    /// its JSON reply.  A reply that is not JSON is returned as a string value.
    pub async fn invoke_agent_runtime(
        &self,
        runtime_arn: &str,
        qualifier: &str,
        session_id: &str,
        payload: &serde_json::Value,
    ) -> AgentCoreResult<serde_json::Value> {
        let url = invocation_url(&self.endpoint, runtime_arn, qualifier);
        info!(runtime_arn, qualifier, session_id, "invoking agent runtime");
        let body = serde_json::to_vec(payload)?;
        let bytes = self
            .client
            .send(
                Method::POST,
                &url,
                &[(SESSION_ID_HEADER, session_id), ("accept", "application/json")],
                body,
            )
            .await?;
        Ok(serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())))
    }
}
