//! One-time provisioning of the memory resource.
//!
//! Creation is asynchronous on the service side: `create_memory` returns an
//! id in `CREATING` state and [`wait_for_active`] polls until the resource is
//! usable, fails, or the deadline passes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docsum_agentcore::{
    AgentCoreError, ControlClient, CreateMemoryRequest, MemoryStrategyInput, StrategyDefinition,
};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

pub const FACT_STRATEGY_NAME: &str = "FactExtractor";
pub const FACT_NAMESPACE_TEMPLATE: &str = "/facts/{actorId}";
pub const DEFAULT_EVENT_EXPIRY_DAYS: u32 = 90;
pub const MAX_MEMORY_NAME_LEN: usize = 48;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("AgentCore request failed: {0}")]
    Api(#[from] AgentCoreError),
    #[error("memory {memory_id} entered status {status}")]
    Failed { memory_id: String, status: String },
    #[error("memory {memory_id} not active after {waited_secs}s")]
    Timeout { memory_id: String, waited_secs: u64 },
    #[error("create_memory returned no memory id")]
    MissingId,
    #[error("invalid memory name {name:?}: expected [a-zA-Z][a-zA-Z0-9_]{{0,47}}")]
    InvalidName { name: String },
}

// ── Spec ─────────────────────────────────────────────────────────────────────

/// What to create.  [`MemorySpec::to_request`] builds the control-plane
/// request.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySpec {
    pub name: String,
    pub description: String,
    pub event_expiry_days: u32,
    pub strategy_name: String,
    pub namespaces: Vec<String>,
}

impl MemorySpec {
    /// A memory with one semantic strategy extracting facts per actor.
    pub fn semantic_facts(name: impl Into<String>, event_expiry_days: u32) -> Self {
        Self {
            name: name.into(),
            description: "Long-term memory for the document summarizer; keeps facts extracted \
                          from earlier documents."
                .to_string(),
            event_expiry_days,
            strategy_name: FACT_STRATEGY_NAME.to_string(),
            namespaces: vec![FACT_NAMESPACE_TEMPLATE.to_string()],
        }
    }

    pub fn to_request(&self, client_token: Option<String>) -> CreateMemoryRequest {
        CreateMemoryRequest {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            event_expiry_duration: self.event_expiry_days,
            memory_strategies: vec![MemoryStrategyInput::SemanticMemoryStrategy(
                StrategyDefinition {
                    name: self.strategy_name.clone(),
                    description: None,
                    namespaces: self.namespaces.clone(),
                },
            )],
            client_token,
        }
    }
}

/// Check `name` against `[a-zA-Z][a-zA-Z0-9_]{0,47}`.
pub fn validate_memory_name(name: &str) -> Result<(), ProvisionError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= MAX_MEMORY_NAME_LEN;
    if valid {
        Ok(())
    } else {
        Err(ProvisionError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// `{prefix}_{unix_seconds}`.  Memory names allow only letters, digits and
/// underscores and must start with a letter.
pub fn default_memory_name(prefix: &str, now: DateTime<Utc>) -> String {
    let mut name: String = prefix
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert(0, 'm');
    }
    format!("{name}_{}", now.timestamp())
}

// ── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryStatus {
    Creating,
    Active,
    Failed,
    Deleting,
    Unknown(String),
}

impl MemoryStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CREATING" => Self::Creating,
            "ACTIVE" => Self::Active,
            "FAILED" => Self::Failed,
            "DELETING" | "DELETED" => Self::Deleting,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
            Self::Deleting => "DELETING",
            Self::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for MemoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Control seam ─────────────────────────────────────────────────────────────

#[async_trait]
pub trait MemoryControl: Send + Sync {
    /// Start creating a memory; returns its id.
    async fn create_memory(&self, spec: &MemorySpec) -> Result<String, ProvisionError>;
    async fn memory_status(&self, memory_id: &str) -> Result<MemoryStatus, ProvisionError>;
}

/// [`MemoryControl`] over the AgentCore control plane.
#[derive(Clone)]
pub struct AgentCoreMemoryControl {
    client: ControlClient,
}

impl AgentCoreMemoryControl {
    pub fn new(client: ControlClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MemoryControl for AgentCoreMemoryControl {
    async fn create_memory(&self, spec: &MemorySpec) -> Result<String, ProvisionError> {
        let request = spec.to_request(Some(uuid::Uuid::new_v4().to_string()));
        let memory = self.client.create_memory(&request).await?;
        if memory.id.is_empty() {
            return Err(ProvisionError::MissingId);
        }
        Ok(memory.id)
    }

    async fn memory_status(&self, memory_id: &str) -> Result<MemoryStatus, ProvisionError> {
        let memory = self.client.get_memory(memory_id).await?;
        if let Some(reason) = memory.failure_reason.as_deref() {
            warn!(memory_id, reason, "memory reports a failure reason");
        }
        Ok(MemoryStatus::parse(&memory.status))
    }
}

// ── Polling ──────────────────────────────────────────────────────────────────

/// Poll `memory_id` every `interval` until it is `ACTIVE`.
///
/// `FAILED` and `DELETING` end the wait with an error.  Transient lookup
/// errors (throttling, 5xx, connection failures) are logged and retried until
/// `timeout` elapses; any other error ends the wait.
pub async fn wait_for_active(
    control: &dyn MemoryControl,
    memory_id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<MemoryStatus, ProvisionError> {
    let started = Instant::now();
    let mut last_status: Option<MemoryStatus> = None;

    loop {
        match control.memory_status(memory_id).await {
            Ok(status) => {
                if last_status.as_ref() != Some(&status) {
                    info!(memory_id, status = %status, elapsed_secs = started.elapsed().as_secs(), "memory status");
                    last_status = Some(status.clone());
                }
                match status {
                    MemoryStatus::Active => return Ok(status),
                    MemoryStatus::Failed | MemoryStatus::Deleting => {
                        return Err(ProvisionError::Failed {
                            memory_id: memory_id.to_string(),
                            status: status.to_string(),
                        });
                    }
                    MemoryStatus::Creating | MemoryStatus::Unknown(_) => {}
                }
            }
            Err(ProvisionError::Api(err)) if err.is_transient() => {
                warn!(memory_id, error = %err, "memory status lookup failed; retrying")
            }
            Err(err) => return Err(err),
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(ProvisionError::Timeout {
                memory_id: memory_id.to_string(),
                waited_secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionedMemory {
    pub memory_id: String,
    pub memory_name: String,
    pub status: String,
}

/// Create the memory described by `spec` and wait for it to become active.
pub async fn provision_memory(
    control: &dyn MemoryControl,
    spec: &MemorySpec,
    interval: Duration,
    timeout: Duration,
) -> Result<ProvisionedMemory, ProvisionError> {
    validate_memory_name(&spec.name)?;
    info!(name = %spec.name, "creating memory");
    let memory_id = control.create_memory(spec).await?;
    info!(memory_id = %memory_id, "memory creation started");

    let status = wait_for_active(control, &memory_id, interval, timeout).await?;
    Ok(ProvisionedMemory {
        memory_id,
        memory_name: spec.name.clone(),
        status: status.to_string(),
    })
}
