//! Minimal client for the Bedrock AgentCore REST APIs.
//!
//! Requests are JSON, SigV4-signed with the credentials resolved by
//! `aws-config`.  Three clients share one [`SignedClient`]:
//!
//! - [`RuntimeClient`]: invoke a hosted agent runtime by ARN.
//! - [`MemoryClient`]: retrieve long-term memory records, append events.
//! - [`ControlClient`]: create memory resources and poll their status.

pub mod client;
pub mod control;
pub mod error;
pub mod memory;
pub mod runtime;

pub use client::{SERVICE_NAME, SignedClient};
pub use control::{
    ControlClient, CreateMemoryRequest, MemoryDescription, MemoryStrategyInput,
    StrategyDefinition,
};
pub use error::{AgentCoreError, AgentCoreResult};
pub use memory::{EventRole, MemoryClient, MemoryRecordSummary};
pub use runtime::{RuntimeClient, SESSION_ID_HEADER, new_runtime_session_id};

use aws_config::SdkConfig;

/// Build all three clients from one shared AWS configuration.
pub fn clients(sdk_config: &SdkConfig) -> (RuntimeClient, MemoryClient, ControlClient) {
    let signed = SignedClient::new(sdk_config, SERVICE_NAME);
    (
        RuntimeClient::new(signed.clone()),
        MemoryClient::new(signed.clone()),
        ControlClient::new(signed),
    )
}
