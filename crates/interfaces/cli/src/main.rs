mod memory_cmds;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use docsum_agentcore::{ControlClient, RuntimeClient, SERVICE_NAME, SignedClient};
use docsum_config::AppConfig;
use docsum_core::{InvocationMode, InvocationRequest};
use docsum_memory::AgentCoreMemoryControl;
use docsum_proxy::{AgentCoreRuntimeInvoker, HttpRuntimeInvoker, RuntimeInvoker};

use memory_cmds::CreateMemoryArgs;

#[derive(Debug, Parser)]
#[command(
    name = "docsum",
    version,
    about = "Set up and exercise the docsum summarization pipeline"
)]
struct Cli {
    /// AWS region; overrides AWS_REGION and the config file.
    #[arg(long, global = true)]
    region: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the long-term memory resource and wait until it is active.
    CreateMemory {
        #[arg(long)]
        name: Option<String>,
        /// Seconds to wait for the memory to become active.
        #[arg(long)]
        timeout: Option<u64>,
        /// Seconds between status checks.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Print the status of an existing memory.
    MemoryStatus {
        #[arg(long)]
        memory_id: String,
    },
    /// Send one invocation to a runtime and print the result.
    Invoke {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
        /// Runtime HTTP endpoint, e.g. http://localhost:8080.
        #[arg(long, conflicts_with = "arn")]
        endpoint: Option<String>,
        /// AgentCore runtime ARN.
        #[arg(long)]
        arn: Option<String>,
        #[arg(long, value_enum)]
        mode: Option<CliMode>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Sync,
    Async,
}

impl From<CliMode> for InvocationMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Sync => InvocationMode::Sync,
            CliMode::Async => InvocationMode::Async,
        }
    }
}

async fn sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

async fn run_invoke(
    config: &AppConfig,
    request: InvocationRequest,
    endpoint: Option<String>,
    arn: Option<String>,
) -> Result<()> {
    let timeout = Duration::from_secs(config.proxy.timeout_secs);
    let endpoint = endpoint.or_else(|| {
        Some(config.proxy.runtime_endpoint.clone()).filter(|e| !e.trim().is_empty())
    });
    let arn = arn.or_else(|| Some(config.proxy.runtime_arn.clone()).filter(|a| !a.trim().is_empty()));

    let invoker: Arc<dyn RuntimeInvoker> = match (endpoint, arn) {
        (Some(endpoint), _) => Arc::new(HttpRuntimeInvoker::new(&endpoint, timeout)?),
        (None, Some(arn)) => {
            let sdk = sdk_config(&config.aws.region).await;
            let signed = SignedClient::new(&sdk, SERVICE_NAME).with_timeout(timeout)?;
            Arc::new(AgentCoreRuntimeInvoker::new(
                RuntimeClient::new(signed),
                arn,
                config.proxy.qualifier.clone(),
            ))
        }
        (None, None) => bail!("pass --endpoint or --arn (or set AGENTCORE_RUNTIME_ENDPOINT / AGENTCORE_RUNTIME_ARN)"),
    };

    let result = invoker.invoke(&request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        bail!("invocation failed: {}", result.message);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(region) = cli.region {
        config.aws.region = region;
    }
    config.telemetry.init_tracing();
    for warning in config.warnings() {
        warn!("{warning}");
    }

    match cli.command {
        Commands::CreateMemory {
            name,
            timeout,
            interval,
        } => {
            let sdk = sdk_config(&config.aws.region).await;
            let control = AgentCoreMemoryControl::new(ControlClient::new(SignedClient::new(&sdk, SERVICE_NAME)));
            let args = CreateMemoryArgs {
                name,
                timeout_secs: timeout,
                interval_secs: interval,
            };
            memory_cmds::run_create_memory(&config, &control, args).await
        }
        Commands::MemoryStatus { memory_id } => {
            let sdk = sdk_config(&config.aws.region).await;
            let control = AgentCoreMemoryControl::new(ControlClient::new(SignedClient::new(&sdk, SERVICE_NAME)));
            memory_cmds::run_memory_status(&control, &memory_id).await
        }
        Commands::Invoke {
            bucket,
            key,
            endpoint,
            arn,
            mode,
        } => {
            let mode = mode.map(InvocationMode::from).unwrap_or(config.proxy.mode);
            let request = InvocationRequest::new(bucket, key, mode);
            run_invoke(&config, request, endpoint, arn).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
