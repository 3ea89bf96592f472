use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Utc;
use docsum_config::AppConfig;
use docsum_memory::{
    AgentCoreMemoryControl, MemoryControl, MemorySpec, ProvisionedMemory, default_memory_name,
    provision_memory, validate_memory_name,
};

pub struct CreateMemoryArgs {
    pub name: Option<String>,
    pub timeout_secs: Option<u64>,
    pub interval_secs: Option<u64>,
}

/// Spec the `create-memory` command submits.  Fails on a name the service
/// would reject.
pub fn memory_spec(config: &AppConfig, name: Option<String>) -> Result<MemorySpec> {
    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_memory_name(&config.provision.name_prefix, Utc::now()));
    validate_memory_name(&name)?;
    Ok(MemorySpec::semantic_facts(name, config.provision.event_expiry_days))
}

/// The create request as sent to the control plane, without a client token.
pub fn request_json(spec: &MemorySpec) -> Result<String> {
    Ok(serde_json::to_string_pretty(&spec.to_request(None))?)
}

pub async fn run_create_memory(
    config: &AppConfig,
    control: &AgentCoreMemoryControl,
    args: CreateMemoryArgs,
) -> Result<()> {
    let spec = memory_spec(config, args.name)?;
    let interval = Duration::from_secs(args.interval_secs.unwrap_or(config.provision.poll_interval_secs).max(1));
    let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(config.provision.timeout_secs));

    println!("Creating AgentCore memory in {}:", config.aws.region);
    println!("{}", request_json(&spec)?);

    match provision_memory(control, &spec, interval, timeout).await {
        Ok(provisioned) => {
            println!();
            println!("{}", next_steps(&provisioned));
            Ok(())
        }
        Err(e) => bail!("memory creation failed: {e}"),
    }
}

pub async fn run_memory_status(control: &AgentCoreMemoryControl, memory_id: &str) -> Result<()> {
    let status = control.memory_status(memory_id).await?;
    println!("{memory_id}: {status}");
    Ok(())
}

pub fn next_steps(memory: &ProvisionedMemory) -> String {
    format!(
        "memory ready\n\
         - id:     {id}\n\
         - name:   {name}\n\
         - status: {status}\n\n\
         Next steps:\n\
         1. export AGENTCORE_MEMORY_ID={id}\n\
         2. set AGENTCORE_MEMORY_ID on the agent runtime and redeploy it",
        id = memory.memory_id,
        name = memory.memory_name,
        status = memory.status,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_name_wins_over_generated_one() {
        let config = AppConfig::default();
        let spec = memory_spec(&config, Some("summaries_prod".into())).unwrap();
        assert_eq!(spec.name, "summaries_prod");
        assert_eq!(spec.event_expiry_days, 90);
    }

    #[test]
    fn generated_name_uses_prefix() {
        let config = AppConfig::default();
        let spec = memory_spec(&config, Some("  ".into())).unwrap();
        assert!(spec.name.starts_with("docsum_"));
    }

    #[test]
    fn invalid_explicit_name_is_rejected_up_front() {
        let config = AppConfig::default();
        for name in ["my-custom-memory", "1st", "docs um"] {
            let err = memory_spec(&config, Some(name.into())).unwrap_err();
            assert!(err.to_string().contains("invalid memory name"), "{err}");
        }
    }

    #[test]
    fn printed_request_uses_control_plane_field_names() {
        let spec = memory_spec(&AppConfig::default(), Some("summaries_prod".into())).unwrap();
        let json: serde_json::Value = serde_json::from_str(&request_json(&spec).unwrap()).unwrap();
        assert_eq!(json["name"], "summaries_prod");
        assert_eq!(json["eventExpiryDuration"], 90);
        assert_eq!(json["memoryStrategies"][0]["semanticMemoryStrategy"]["name"], "FactExtractor");
        assert!(json.get("event_expiry_days").is_none());
        assert!(json.get("clientToken").is_none());
    }

    #[test]
    fn next_steps_print_export_line() {
        let text = next_steps(&ProvisionedMemory {
            memory_id: "mem-123".into(),
            memory_name: "docsum_1".into(),
            status: "ACTIVE".into(),
        });
        assert!(text.contains("export AGENTCORE_MEMORY_ID=mem-123"));
    }
}
