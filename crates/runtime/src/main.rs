use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use tracing::{info, warn};

use docsum_agentcore::{MemoryClient, SERVICE_NAME, SignedClient};
use docsum_config::AppConfig;
use docsum_llm::BedrockConverseClient;
use docsum_memory::{AgentCoreMemory, LongTermMemory, NoopMemory};
use docsum_runtime::{AppState, Summarizer, SummarizerSettings, TaskTracker, serve};
use docsum_tools::S3ObjectStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    config.telemetry.init_tracing();
    for warning in config.warnings() {
        warn!("{warning}");
    }

    let sdk = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws.region.clone()))
        .load()
        .await;

    let runtime = &config.runtime;
    let memory: Arc<dyn LongTermMemory> = if runtime.memory_enabled() {
        info!(memory_id = %runtime.memory_id, "long-term memory enabled");
        let client = MemoryClient::new(SignedClient::new(&sdk, SERVICE_NAME));
        Arc::new(AgentCoreMemory::new(client, runtime.memory_id.clone()))
    } else {
        warn!("AGENTCORE_MEMORY_ID not set, running without long-term memory");
        Arc::new(NoopMemory)
    };

    let summarizer = Summarizer::new(
        Arc::new(BedrockConverseClient::new(&sdk, runtime.model_id.clone())),
        Arc::new(S3ObjectStore::new(&sdk)),
        memory,
        SummarizerSettings::from(runtime),
    );
    let state = Arc::new(AppState {
        summarizer: Arc::new(summarizer),
        tasks: Arc::new(TaskTracker::new()),
        default_bucket: runtime.default_bucket.clone(),
        default_mode: runtime.default_mode,
    });

    info!(
        region = %config.aws.region,
        model = %runtime.model_id,
        default_mode = runtime.default_mode.as_str(),
        "starting docsum runtime"
    );
    serve(&runtime.bind_addr, state).await
}
