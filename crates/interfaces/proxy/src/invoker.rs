//! Ways of handing one document to the agent runtime.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use docsum_agentcore::{RuntimeClient, new_runtime_session_id};
use docsum_core::{InvocationRequest, InvocationResult};
use tracing::{debug, info};
use url::Url;

#[async_trait]
pub trait RuntimeInvoker: Send + Sync {
    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult>;
}

// ── AgentCore ────────────────────────────────────────────────────────────────

/// Invokes a hosted runtime by ARN through the signed AgentCore API.
pub struct AgentCoreRuntimeInvoker {
    client: RuntimeClient,
    runtime_arn: String,
    qualifier: String,
}

impl AgentCoreRuntimeInvoker {
    pub fn new(client: RuntimeClient, runtime_arn: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            client,
            runtime_arn: runtime_arn.into(),
            qualifier: qualifier.into(),
        }
    }
}

#[async_trait]
impl RuntimeInvoker for AgentCoreRuntimeInvoker {
    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult> {
        // Every document gets its own runtime session.
        let session_id = new_runtime_session_id();
        let payload = serde_json::to_value(request)?;
        let reply = self
            .client
            .invoke_agent_runtime(&self.runtime_arn, &self.qualifier, &session_id, &payload)
            .await
            .with_context(|| format!("AgentCore runtime invocation failed (session {session_id})"))?;
        debug!(%session_id, %reply, "runtime reply");
        parse_reply(reply)
    }
}

/// Reads the runtime reply, which may arrive as a JSON document or as a
/// string holding one.
fn parse_reply(reply: serde_json::Value) -> Result<InvocationResult> {
    let value = match reply {
        serde_json::Value::String(text) => serde_json::from_str(&text)
            .map_err(|_| anyhow!("runtime returned a non-JSON reply: {text}"))?,
        other => other,
    };
    serde_json::from_value(value).context("runtime reply is not an invocation result")
}

// ── Plain HTTP ───────────────────────────────────────────────────────────────

/// Posts to `{endpoint}/invocations` of a runtime reachable over HTTP.
pub struct HttpRuntimeInvoker {
    http: reqwest::Client,
    url: Url,
}

impl HttpRuntimeInvoker {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let url = invocations_url(endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn invocations_url(endpoint: &str) -> Result<Url> {
    let mut base = Url::parse(endpoint.trim())
        .with_context(|| format!("invalid runtime endpoint: {endpoint}"))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("invocations")?)
}

#[async_trait]
impl RuntimeInvoker for HttpRuntimeInvoker {
    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult> {
        info!(url = %self.url, key = request.key.as_deref().unwrap_or(""), "invoking runtime over HTTP");
        let response = self
            .http
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?;
        let status = response.status();
        let body = response.text().await.context("failed to read runtime reply")?;
        if !status.is_success() {
            bail!("runtime returned HTTP {}: {}", status.as_u16(), body.trim());
        }
        serde_json::from_str(&body).context("runtime reply is not an invocation result")
    }
}
